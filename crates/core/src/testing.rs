//! Testing infrastructure for the hilite core.
//!
//! Provides [`MockPageHost`], a scriptable stand-in for an embedded page:
//! it records every executed script, simulates the agent contract (install,
//! presence/status probes, command dispatch), injects failures on demand,
//! and can hold executions behind a gate so tests can interleave
//! completions with navigation events deterministically.
//!
//! # Example
//!
//! ```ignore
//! let host = Arc::new(MockPageHost::new());
//! host.close_gate();                  // park the next execution
//! let inject = tokio::spawn(...);     // starts an injection
//! coordinator.on_navigate(page, url); // invalidate the epoch
//! host.open_gate();                   // let the stale attempt resolve
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use hilite_protocol::{presence_probe_script, probe_script, AgentCommand, HighlighterMode};

use crate::error::{Error, Result};
use crate::host::PageHost;

/// Stand-in for the built agent bundle in tests.
pub const AGENT_SCRIPT: &str = "/* hilite agent bundle (test stand-in) */";

#[derive(Debug, Default, Clone, Copy)]
struct SimulatedAgent {
	installed: bool,
	mode: HighlighterMode,
	highlight_count: u32,
}

/// Mock page host simulating the agent contract without a browser.
pub struct MockPageHost {
	agent: Mutex<SimulatedAgent>,
	executions: Mutex<Vec<String>>,
	pending_failures: Mutex<usize>,
	gate: watch::Sender<bool>,
}

impl Default for MockPageHost {
	fn default() -> Self {
		Self::new()
	}
}

impl MockPageHost {
	pub fn new() -> Self {
		let (gate, _) = watch::channel(true);
		Self {
			agent: Mutex::new(SimulatedAgent::default()),
			executions: Mutex::new(Vec::new()),
			pending_failures: Mutex::new(0),
			gate,
		}
	}

	/// Returns every script executed so far, in order.
	pub fn executions(&self) -> Vec<String> {
		self.executions.lock().clone()
	}

	/// Returns how many times the agent install script was executed.
	pub fn install_count(&self) -> usize {
		self.executions
			.lock()
			.iter()
			.filter(|s| s.as_str() == AGENT_SCRIPT)
			.count()
	}

	/// Returns how many executed scripts contain `needle`.
	pub fn executions_containing(&self, needle: &str) -> usize {
		self.executions
			.lock()
			.iter()
			.filter(|s| s.contains(needle))
			.count()
	}

	/// Returns the simulated agent's current mode.
	pub fn agent_mode(&self) -> HighlighterMode {
		self.agent.lock().mode
	}

	/// Returns whether the simulated agent is installed.
	pub fn agent_installed(&self) -> bool {
		self.agent.lock().installed
	}

	/// Sets the simulated highlight count (as if the user made selections).
	pub fn set_highlight_count(&self, count: u32) {
		self.agent.lock().highlight_count = count;
	}

	/// Simulates an in-page reload the host missed: the agent vanishes but
	/// nothing else changes.
	pub fn vanish_agent(&self) {
		*self.agent.lock() = SimulatedAgent::default();
	}

	/// Makes the next `n` executions fail after being recorded.
	pub fn fail_next_executions(&self, n: usize) {
		*self.pending_failures.lock() = n;
	}

	/// Parks subsequent executions until [`open_gate`](Self::open_gate).
	pub fn close_gate(&self) {
		self.gate.send_replace(false);
	}

	/// Releases all parked executions.
	pub fn open_gate(&self) {
		self.gate.send_replace(true);
	}

	fn simulate(&self, code: &str) -> Result<Value> {
		if code == presence_probe_script() {
			return Ok(Value::Bool(self.agent.lock().installed));
		}
		if code == probe_script() {
			let agent = *self.agent.lock();
			return Ok(serde_json::json!({
				"installed": agent.installed,
				"mode": agent.mode.as_str(),
				"highlightCount": agent.highlight_count,
				"overlayAttached": agent.installed,
			}));
		}
		if let Some(payload) = extract_dispatch_payload(code) {
			let mut agent = self.agent.lock();
			if !agent.installed {
				return Ok(Value::Bool(false));
			}
			let command: AgentCommand = serde_json::from_str(&payload)
				.map_err(|e| Error::ScriptExecution(format!("bad command payload: {e}")))?;
			match command {
				AgentCommand::SetMode { mode } => agent.mode = mode,
				AgentCommand::ClearHighlights => agent.highlight_count = 0,
			}
			return Ok(Value::Bool(true));
		}
		// Anything else is treated as the (idempotent) agent install script.
		let mut agent = self.agent.lock();
		if !agent.installed {
			*agent = SimulatedAgent {
				installed: true,
				..SimulatedAgent::default()
			};
		}
		Ok(Value::Null)
	}
}

#[async_trait]
impl PageHost for MockPageHost {
	async fn execute_script(&self, code: &str) -> Result<Value> {
		self.executions.lock().push(code.to_string());

		let mut gate = self.gate.subscribe();
		while !*gate.borrow_and_update() {
			gate.changed().await.expect("gate sender outlives executions");
		}

		{
			let mut failures = self.pending_failures.lock();
			if *failures > 0 {
				*failures -= 1;
				return Err(Error::ScriptExecution("mock execution failure".into()));
			}
		}

		self.simulate(code)
	}
}

fn extract_dispatch_payload(code: &str) -> Option<String> {
	let start = code.find(".dispatch('")? + ".dispatch('".len();
	let end = code[start..].find("')")? + start;
	Some(code[start..end].replace("\\'", "'").replace("\\\\", "\\"))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use hilite_protocol::command_script;

	#[tokio::test]
	async fn install_script_installs_the_agent_once() {
		let host = MockPageHost::new();
		assert!(!host.agent_installed());

		host.execute_script(AGENT_SCRIPT).await.unwrap();
		assert!(host.agent_installed());
		assert_eq!(host.agent_mode(), HighlighterMode::Off);

		// Idempotent: a second install does not reset anything.
		host.execute_script(&command_script(&AgentCommand::SetMode {
			mode: HighlighterMode::Detail,
		}))
		.await
		.unwrap();
		host.execute_script(AGENT_SCRIPT).await.unwrap();
		assert_eq!(host.agent_mode(), HighlighterMode::Detail);
		assert_eq!(host.install_count(), 2);
	}

	#[tokio::test]
	async fn dispatch_before_install_is_a_silent_no_op() {
		let host = MockPageHost::new();
		let result = host
			.execute_script(&command_script(&AgentCommand::SetMode {
				mode: HighlighterMode::Element,
			}))
			.await
			.unwrap();
		assert_eq!(result, Value::Bool(false));
		assert_eq!(host.agent_mode(), HighlighterMode::Off);
	}

	#[tokio::test]
	async fn probes_reflect_simulated_state() {
		let host = MockPageHost::new();
		let present = host.execute_script(presence_probe_script()).await.unwrap();
		assert_eq!(present, Value::Bool(false));

		host.execute_script(AGENT_SCRIPT).await.unwrap();
		host.set_highlight_count(2);

		let status = host.execute_script(&probe_script()).await.unwrap();
		assert_eq!(status["installed"], Value::Bool(true));
		assert_eq!(status["highlightCount"], serde_json::json!(2));
	}

	#[tokio::test]
	async fn failure_injection_fails_after_recording() {
		let host = MockPageHost::new();
		host.fail_next_executions(1);

		let err = host.execute_script(AGENT_SCRIPT).await.unwrap_err();
		assert!(matches!(err, Error::ScriptExecution(_)));
		assert_eq!(host.install_count(), 1);
		assert!(!host.agent_installed());

		host.execute_script(AGENT_SCRIPT).await.unwrap();
		assert!(host.agent_installed());
	}

	#[tokio::test]
	async fn gate_parks_and_releases_executions() {
		let host = Arc::new(MockPageHost::new());
		host.close_gate();

		let parked = {
			let host = Arc::clone(&host);
			tokio::spawn(async move { host.execute_script(AGENT_SCRIPT).await })
		};
		tokio::task::yield_now().await;
		assert_eq!(host.install_count(), 1);
		assert!(!host.agent_installed());

		host.open_gate();
		parked.await.unwrap().unwrap();
		assert!(host.agent_installed());
	}

	#[test]
	fn dispatch_payload_extraction_unescapes() {
		let script = command_script(&AgentCommand::ClearHighlights);
		let payload = extract_dispatch_payload(&script).unwrap();
		assert_eq!(payload, r#"{"cmd":"clear_highlights"}"#);
		assert_eq!(extract_dispatch_payload("no dispatch here"), None);
	}
}
