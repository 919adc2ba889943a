//! Host-side core of the hilite element-highlighting overlay.
//!
//! An embedder (a desktop shell with embedded, navigable web pages) gives
//! this crate one [`PageHost`] capability per open page and feeds it page
//! lifecycle events. In return the [`Coordinator`] guarantees the in-page
//! agent is present in each page exactly once per navigation epoch, keeps
//! every injected agent's mode in sync with the process-wide mirror, and
//! recovers from injection failures without ever surfacing them as fatal.
//!
//! The crate is deliberately narrow: it does not render, navigate, or own
//! windows. Pages are untrusted and fully isolated; the only communication
//! is one-way command submission and repeated read-only probes, both built
//! in [`hilite_protocol`].
//!
//! # Example
//!
//! ```ignore
//! let coordinator = Coordinator::new(CoordinatorConfig::new(agent_bundle));
//! coordinator.register_page(page_id, host, "https://example.com");
//! // wire the embedder's page events:
//! coordinator.handle_event(page_id, PageEvent::Ready);
//! // user toggles element-select mode:
//! coordinator.handle_shortcut(Shortcut::ToggleElement).await;
//! ```

mod config;
mod coordinator;
mod diagnostics;
mod error;
mod events;
mod host;
mod session;
pub mod testing;

pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use diagnostics::{check_agent, verify_mode_roundtrip, HealthMonitor};
pub use error::{Error, Result};
pub use events::{ConsoleLevel, ConsoleMessage, PageEvent, Shortcut};
pub use host::{PageHost, PageId};
pub use session::{InjectionStatus, SessionSnapshot};

pub use hilite_protocol as protocol;
pub use hilite_protocol::{AgentCommand, AgentStatus, HighlighterMode};
