//! Wire types for the hilite host/page boundary.
//!
//! The host coordinator and the in-page agent live in different trust
//! domains with no shared memory; everything that crosses between them is
//! defined here so both sides agree on names and shapes:
//!
//! - [`HighlighterMode`] - the single value driving agent behavior
//! - [`AgentCommand`] - tagged command payload dispatched inside the page
//! - [`AgentStatus`] - plain record returned by the read-only probe
//! - script builders ([`command_script`], [`probe_script`],
//!   [`presence_probe_script`]) producing the JavaScript actually executed
//!   in the page context
//! - page-global / DOM naming constants and timing constants shared by the
//!   coordinator and the agent
//!
//! Only primitives and plain records cross the boundary; the host never
//! depends on structured objects beyond what [`AgentStatus`] describes.

mod command;
mod mode;
mod probe;

pub use command::{AgentCommand, command_script};
pub use mode::{HighlighterMode, UnknownMode};
pub use probe::{AgentStatus, presence_probe_script, probe_script};

/// Name of the page-global object the agent registers after installation.
///
/// Carries `initialized`, `mode`, `highlightCount` and the `dispatch`
/// function; the existence of this global (with `initialized === true`) is
/// what the presence probe checks.
pub const AGENT_GLOBAL: &str = "__hiliteAgent";

/// Page-global flag set while agent installation is in progress.
///
/// Together with `initialized` on [`AGENT_GLOBAL`] this forms the two-flag
/// idempotency guard: a script injected while either flag is set is a no-op.
pub const INSTALLING_FLAG: &str = "__hiliteInstalling";

/// Element id of the hover overlay rectangle.
pub const OVERLAY_ID: &str = "hilite-overlay";

/// Element id of the hover tooltip.
pub const TOOLTIP_ID: &str = "hilite-tooltip";

/// Element id of the injected stylesheet.
pub const STYLE_ID: &str = "hilite-styles";

/// Element id of the transient mode indicator.
pub const INDICATOR_ID: &str = "hilite-mode-indicator";

/// Class added to elements highlighted in detail mode.
pub const HIGHLIGHT_CLASS: &str = "hilite-detail-highlight";

/// Class carried by mark elements wrapping text-only selections.
pub const MARK_CLASS: &str = "hilite-text-highlight";

/// Body class while element-select mode is active.
pub const ELEMENT_CURSOR_CLASS: &str = "element-mode-cursor";

/// Body class while detail-select mode is active.
pub const DETAIL_CURSOR_CLASS: &str = "detail-mode-cursor";

/// Delay between a page's ready signal and the injection attempt.
///
/// The first ready signal can fire before the DOM is stable enough to host
/// the agent's overlay nodes.
pub const READY_SETTLE_MS: u64 = 100;

/// Delay before re-applying a non-off mode to a freshly injected agent,
/// letting the overlay/tooltip nodes attach before being driven.
pub const MODE_REAPPLY_MS: u64 = 200;

/// Debounce between mouseup and the selection-commit step in detail mode.
pub const SELECTION_COMMIT_MS: i32 = 10;

/// How long the mode indicator stays visible after switching to off.
pub const INDICATOR_HIDE_MS: i32 = 2000;

/// Duration of the outline flash on a clicked element in element mode.
pub const CLICK_FLASH_MS: i32 = 1000;

/// Delay between agent init retries while `document.body` is missing.
pub const INIT_RETRY_DELAY_MS: i32 = 100;

/// Init retries before the agent gives up and clears the installing flag.
pub const INIT_RETRY_LIMIT: u32 = 20;
