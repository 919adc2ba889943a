//! Commands pushed from the coordinator into a page's agent.
//!
//! Commands cross the boundary as a fixed-shape JSON payload (command name
//! plus optional mode value) embedded in a small script that calls the
//! agent's `dispatch` function if the agent global is present and no-ops
//! silently otherwise. The agent deserializes the payload and dispatches it
//! through a single switch, so no interpolated JavaScript is ever built
//! from user-influenced strings.

use serde::{Deserialize, Serialize};

use crate::mode::HighlighterMode;
use crate::AGENT_GLOBAL;

/// Command executed by the in-page agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AgentCommand {
	/// Switch the agent to `mode`.
	SetMode {
		/// Target mode.
		mode: HighlighterMode,
	},
	/// Remove all active highlights, restoring the original DOM.
	ClearHighlights,
}

/// Builds the script delivering `command` to a page's agent.
///
/// The script evaluates to `true` when the agent received the command and
/// `false` when no agent is installed (a silent no-op, not an error).
pub fn command_script(command: &AgentCommand) -> String {
	// The payload is JSON produced from a closed enum, but escape anyway so
	// the embedding in a single-quoted JS string can never break.
	let payload = serde_json::to_string(command).expect("command serialization cannot fail");
	let payload = escape_single_quoted(&payload);
	format!(
		r#"(() => {{
    const agent = window.{AGENT_GLOBAL};
    if (!agent || typeof agent.dispatch !== "function") {{
        return false;
    }}
    agent.dispatch('{payload}');
    return true;
}})()"#
	)
}

fn escape_single_quoted(s: &str) -> String {
	s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_mode_serializes_with_cmd_tag() {
		let cmd = AgentCommand::SetMode {
			mode: HighlighterMode::Detail,
		};
		let json = serde_json::to_string(&cmd).unwrap();
		assert_eq!(json, r#"{"cmd":"set_mode","mode":"detail"}"#);
	}

	#[test]
	fn clear_highlights_serializes_with_cmd_tag() {
		let json = serde_json::to_string(&AgentCommand::ClearHighlights).unwrap();
		assert_eq!(json, r#"{"cmd":"clear_highlights"}"#);
	}

	#[test]
	fn command_payload_round_trips() {
		let cmd = AgentCommand::SetMode {
			mode: HighlighterMode::Element,
		};
		let json = serde_json::to_string(&cmd).unwrap();
		let back: AgentCommand = serde_json::from_str(&json).unwrap();
		assert_eq!(back, cmd);
	}

	#[test]
	fn command_script_embeds_payload_and_guards_missing_agent() {
		let script = command_script(&AgentCommand::SetMode {
			mode: HighlighterMode::Element,
		});
		assert!(script.contains(r#"window.__hiliteAgent"#));
		assert!(script.contains(r#"{"cmd":"set_mode","mode":"element"}"#));
		assert!(script.contains("return false"));
	}

	#[test]
	fn escape_single_quoted_handles_quotes_and_backslashes() {
		assert_eq!(escape_single_quoted(r#"a'b\c"#), r#"a\'b\\c"#);
	}
}
