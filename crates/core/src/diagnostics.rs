//! Agent diagnostics: structured state checks and a periodic health
//! monitor. Debug tooling only; nothing here participates in the
//! injection state machine.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use hilite_protocol::{command_script, probe_script, AgentCommand, AgentStatus, HighlighterMode};

use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::host::{PageHost, PageId};

/// Probes a page's agent and returns its status snapshot.
pub async fn check_agent<H: PageHost + ?Sized>(host: &H) -> Result<AgentStatus> {
	let value = host.execute_script(&probe_script()).await?;
	let status: AgentStatus =
		serde_json::from_value(value.clone()).map_err(|_| Error::ProbeShape(value.to_string()))?;
	debug!(
		installed = status.installed,
		mode = %status.mode,
		highlights = status.highlight_count,
		overlay = status.overlay_attached,
		"agent status"
	);
	Ok(status)
}

/// Drives the page agent to `mode` and probes that it took effect.
///
/// Bypasses the coordinator's mode mirror on purpose; this is the "is the
/// command path alive at all" debug check, not a user-facing operation.
pub async fn verify_mode_roundtrip<H: PageHost + ?Sized>(
	host: &H,
	mode: HighlighterMode,
) -> Result<bool> {
	host.execute_script(&command_script(&AgentCommand::SetMode { mode }))
		.await?;
	let status = check_agent(host).await?;
	Ok(status.installed && status.mode == mode)
}

/// Cancel-on-drop guard for a running health monitor.
pub struct HealthMonitor {
	cancel: Option<oneshot::Sender<()>>,
}

impl HealthMonitor {
	/// Explicitly stops the monitor. Equivalent to dropping.
	pub fn cancel(mut self) {
		if let Some(tx) = self.cancel.take() {
			let _ = tx.send(());
		}
	}
}

impl Drop for HealthMonitor {
	fn drop(&mut self) {
		if let Some(tx) = self.cancel.take() {
			let _ = tx.send(());
		}
	}
}

impl<H: PageHost + 'static> Coordinator<H> {
	/// Probes `page`'s agent and returns its status.
	pub async fn check_agent(&self, page: PageId) -> Result<AgentStatus> {
		let host = self.host_for(page).ok_or(Error::UnknownPage(page))?;
		check_agent(host.as_ref()).await
	}

	/// Starts a periodic read-only health probe of `page`, logging the
	/// agent status every `every`. Returns [`None`] for unknown pages.
	///
	/// The monitor holds a page-handle clone until the returned guard is
	/// dropped; drop it when closing the tab.
	pub fn monitor_health(&self, page: PageId, every: Duration) -> Option<HealthMonitor> {
		let host = self.host_for(page)?;
		let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(every);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
			// The first tick fires immediately and doubles as the initial
			// state check.
			loop {
				tokio::select! {
					_ = &mut cancel_rx => break,
					_ = ticker.tick() => {
						match check_agent(host.as_ref()).await {
							Ok(status) if status.installed => {
								debug!(page = %page, mode = %status.mode, highlights = status.highlight_count, "health ok");
							}
							Ok(_) => {
								debug!(page = %page, "health check: agent missing");
							}
							Err(err) => {
								debug!(page = %page, error = %err, "health check failed");
							}
						}
					}
				}
			}
			debug!(page = %page, "health monitor stopped");
		});

		Some(HealthMonitor {
			cancel: Some(cancel_tx),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::testing::{MockPageHost, AGENT_SCRIPT};

	#[tokio::test]
	async fn check_agent_reports_uninstalled_default() {
		let host = MockPageHost::new();
		let status = check_agent(&host).await.unwrap();
		assert!(!status.installed);
		assert_eq!(status.mode, HighlighterMode::Off);
	}

	#[tokio::test]
	async fn mode_roundtrip_succeeds_on_installed_agent() {
		let host = MockPageHost::new();
		host.execute_script(AGENT_SCRIPT).await.unwrap();

		assert!(
			verify_mode_roundtrip(&host, HighlighterMode::Detail)
				.await
				.unwrap()
		);
		assert_eq!(host.agent_mode(), HighlighterMode::Detail);
	}

	#[tokio::test]
	async fn mode_roundtrip_fails_without_agent() {
		let host = MockPageHost::new();
		assert!(
			!verify_mode_roundtrip(&host, HighlighterMode::Element)
				.await
				.unwrap()
		);
	}

	#[tokio::test]
	async fn health_monitor_probes_until_dropped() {
		let host = Arc::new(MockPageHost::new());
		let coordinator = Coordinator::new(crate::CoordinatorConfig::new(AGENT_SCRIPT));
		let page = PageId::new(1);
		coordinator.register_page(page, Arc::clone(&host), "https://a.example");

		let monitor = coordinator
			.monitor_health(page, Duration::from_millis(1))
			.unwrap();
		tokio::time::sleep(Duration::from_millis(10)).await;
		let probes = host.executions_containing("installed");
		assert!(probes >= 1);

		monitor.cancel();
		tokio::time::sleep(Duration::from_millis(20)).await;
		let after_cancel = host.executions_containing("installed");
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(host.executions_containing("installed"), after_cancel);
	}

	#[test]
	fn unknown_page_has_no_monitor() {
		let coordinator: Coordinator<MockPageHost> =
			Coordinator::new(crate::CoordinatorConfig::new(AGENT_SCRIPT));
		assert!(
			coordinator
				.monitor_health(PageId::new(5), Duration::from_secs(1))
				.is_none()
		);
	}
}
