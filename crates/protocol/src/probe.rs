//! Read-only probes evaluated in the page context.
//!
//! Probes are the host's only view into a page's agent: plain expressions
//! returning primitives or the [`AgentStatus`] record. They never mutate
//! page state, so the coordinator may re-run them at any time.

use serde::{Deserialize, Serialize};

use crate::mode::HighlighterMode;
use crate::{AGENT_GLOBAL, OVERLAY_ID};

/// Snapshot of a page agent's state as reported by [`probe_script`].
///
/// When no agent is installed the probe returns the [`Default`] value
/// (`installed: false`, mode off, zero highlights) rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
	/// Whether an agent finished installation in this page context.
	pub installed: bool,
	/// The agent's current mode.
	pub mode: HighlighterMode,
	/// Number of active highlights tracked by the agent.
	pub highlight_count: u32,
	/// Whether the overlay node is currently attached to the document.
	pub overlay_attached: bool,
}

/// Returns the boolean presence probe.
///
/// Evaluates to `true` only when the agent global exists and reports
/// `initialized`, i.e. installation completed (not merely started).
pub fn presence_probe_script() -> &'static str {
	concat!(
		"typeof window.__hiliteAgent !== \"undefined\"",
		" && window.__hiliteAgent.initialized === true"
	)
}

/// Returns the status probe, evaluating to an [`AgentStatus`]-shaped record.
pub fn probe_script() -> String {
	format!(
		r#"(() => {{
    const agent = window.{AGENT_GLOBAL};
    if (!agent) {{
        return {{ installed: false, mode: "off", highlightCount: 0, overlayAttached: false }};
    }}
    return {{
        installed: agent.initialized === true,
        mode: typeof agent.mode === "string" ? agent.mode : "off",
        highlightCount: typeof agent.highlightCount === "number" ? agent.highlightCount : 0,
        overlayAttached: !!document.getElementById("{OVERLAY_ID}"),
    }};
}})()"#
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_deserializes_from_camel_case() {
		let value = serde_json::json!({
			"installed": true,
			"mode": "detail",
			"highlightCount": 3,
			"overlayAttached": true,
		});
		let status: AgentStatus = serde_json::from_value(value).unwrap();
		assert!(status.installed);
		assert_eq!(status.mode, HighlighterMode::Detail);
		assert_eq!(status.highlight_count, 3);
		assert!(status.overlay_attached);
	}

	#[test]
	fn default_status_is_uninstalled_and_off() {
		let status = AgentStatus::default();
		assert!(!status.installed);
		assert_eq!(status.mode, HighlighterMode::Off);
		assert_eq!(status.highlight_count, 0);
	}

	#[test]
	fn presence_probe_checks_initialized_flag() {
		let probe = presence_probe_script();
		assert!(probe.contains("__hiliteAgent"));
		assert!(probe.contains("initialized === true"));
	}

	#[test]
	fn probe_script_reports_missing_agent_as_uninstalled() {
		let script = probe_script();
		assert!(script.contains(r#"installed: false"#));
		assert!(script.contains("hilite-overlay"));
	}
}
