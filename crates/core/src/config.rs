//! Coordinator configuration.

use std::sync::Arc;
use std::time::Duration;

use hilite_protocol::{MODE_REAPPLY_MS, READY_SETTLE_MS};

/// Configuration for a [`Coordinator`](crate::Coordinator).
///
/// The agent script is the embedder's built agent bundle (the wasm loader
/// plus glue, or any script implementing the agent contract); the
/// coordinator treats it as opaque. Timing defaults come from
/// [`hilite_protocol`] so both sides share one source of truth.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
	/// Script installing the agent into a page context. Must be idempotent;
	/// the agent's own two-flag guard makes repeated execution a no-op.
	pub agent_script: Arc<str>,
	/// Delay between a ready signal and the injection attempt.
	pub ready_settle_delay: Duration,
	/// Delay before re-applying a non-off mode to a fresh agent.
	pub mode_reapply_delay: Duration,
}

impl CoordinatorConfig {
	/// Creates a configuration with default timing.
	pub fn new(agent_script: impl Into<Arc<str>>) -> Self {
		Self {
			agent_script: agent_script.into(),
			ready_settle_delay: Duration::from_millis(READY_SETTLE_MS),
			mode_reapply_delay: Duration::from_millis(MODE_REAPPLY_MS),
		}
	}

	/// Sets the ready settle delay.
	pub fn ready_settle_delay(mut self, delay: Duration) -> Self {
		self.ready_settle_delay = delay;
		self
	}

	/// Sets the mode re-apply delay.
	pub fn mode_reapply_delay(mut self, delay: Duration) -> Self {
		self.mode_reapply_delay = delay;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_come_from_protocol_constants() {
		let config = CoordinatorConfig::new("// agent");
		assert_eq!(
			config.ready_settle_delay,
			Duration::from_millis(READY_SETTLE_MS)
		);
		assert_eq!(
			config.mode_reapply_delay,
			Duration::from_millis(MODE_REAPPLY_MS)
		);
	}

	#[test]
	fn builder_overrides_delays() {
		let config = CoordinatorConfig::new("// agent")
			.ready_settle_delay(Duration::ZERO)
			.mode_reapply_delay(Duration::from_millis(5));
		assert_eq!(config.ready_settle_delay, Duration::ZERO);
		assert_eq!(config.mode_reapply_delay, Duration::from_millis(5));
	}
}
