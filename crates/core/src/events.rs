//! Page lifecycle events and host-level input.

use hilite_protocol::HighlighterMode;

/// Lifecycle event of one embedded page, as reported by the embedder.
///
/// The embedder translates whatever its page mechanism emits (`dom-ready`,
/// `did-finish-load`, `did-navigate`, ...) into these and forwards them via
/// [`Coordinator::handle_event`](crate::Coordinator::handle_event).
#[derive(Debug, Clone)]
pub enum PageEvent {
	/// The page's DOM is ready. Primary injection trigger (debounced).
	Ready,
	/// The page finished loading entirely. Secondary safety trigger: the
	/// coordinator re-probes agent presence here.
	FullyLoaded,
	/// A navigation committed. Main-frame navigations invalidate all
	/// in-page state; subframe navigations are ignored.
	Navigated {
		url: String,
		is_main_frame: bool,
	},
	/// Same-document navigation (anchor jump, history API). Does not
	/// invalidate the agent.
	NavigatedInPage {
		url: String,
	},
	/// The page failed to load.
	Failed {
		code: i32,
		description: String,
	},
	/// A console message from the page, forwarded for diagnostics.
	Console(ConsoleMessage),
}

/// Console message emitted inside a page.
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
	/// Severity of the message.
	pub level: ConsoleLevel,
	/// Text content.
	pub text: String,
	/// Source location, when the embedder reports one.
	pub source: Option<String>,
}

/// Severity of a page console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
	Debug,
	Log,
	Info,
	Warning,
	Error,
}

impl ConsoleLevel {
	/// Parses the level strings embedders commonly report.
	pub fn from_str(s: &str) -> Self {
		match s {
			"debug" => Self::Debug,
			"info" => Self::Info,
			"warning" | "warn" => Self::Warning,
			"error" => Self::Error,
			_ => Self::Log,
		}
	}
}

impl std::fmt::Display for ConsoleLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Debug => "debug",
			Self::Log => "log",
			Self::Info => "info",
			Self::Warning => "warning",
			Self::Error => "error",
		};
		f.write_str(s)
	}
}

/// Host-level keyboard input, already resolved to its meaning.
///
/// The embedder owns the concrete key bindings; the coordinator only sees
/// the semantic action. Each toggle returns to off when its mode is
/// already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
	/// Toggle element-select mode.
	ToggleElement,
	/// Toggle detail-select mode.
	ToggleDetail,
	/// Force the highlighter off (Escape).
	ForceOff,
}

impl Shortcut {
	/// Returns the mode this shortcut produces from `current`.
	pub fn next_mode(&self, current: HighlighterMode) -> HighlighterMode {
		match self {
			Self::ToggleElement if current == HighlighterMode::Element => HighlighterMode::Off,
			Self::ToggleElement => HighlighterMode::Element,
			Self::ToggleDetail if current == HighlighterMode::Detail => HighlighterMode::Off,
			Self::ToggleDetail => HighlighterMode::Detail,
			Self::ForceOff => HighlighterMode::Off,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn console_level_from_str() {
		assert_eq!(ConsoleLevel::from_str("error"), ConsoleLevel::Error);
		assert_eq!(ConsoleLevel::from_str("warn"), ConsoleLevel::Warning);
		assert_eq!(ConsoleLevel::from_str("warning"), ConsoleLevel::Warning);
		assert_eq!(ConsoleLevel::from_str("anything"), ConsoleLevel::Log);
	}

	#[test]
	fn shortcut_toggles_back_to_off() {
		let s = Shortcut::ToggleElement;
		assert_eq!(s.next_mode(HighlighterMode::Off), HighlighterMode::Element);
		assert_eq!(s.next_mode(HighlighterMode::Element), HighlighterMode::Off);
		assert_eq!(s.next_mode(HighlighterMode::Detail), HighlighterMode::Element);
	}

	#[test]
	fn force_off_is_absorbing() {
		assert_eq!(
			Shortcut::ForceOff.next_mode(HighlighterMode::Off),
			HighlighterMode::Off
		);
		assert_eq!(
			Shortcut::ForceOff.next_mode(HighlighterMode::Detail),
			HighlighterMode::Off
		);
	}
}
