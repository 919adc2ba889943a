//! The injection coordinator.
//!
//! One [`Coordinator`] serves one application window. It owns the tab
//! registry, decides when to (re-)inject the agent into each page, keeps
//! the host-visible mode mirror in sync with every injected page, and
//! reconciles state after navigations.
//!
//! The concurrency model is cooperative: lifecycle handlers run on the
//! embedder's event loop and issue fire-and-forget script executions. The
//! per-page [`InjectionStatus`] guard prevents two concurrent in-flight
//! injections, and the per-page generation counter discards completions
//! that resolve after a navigation invalidated their epoch. Locks are
//! never held across an await point.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use hilite_protocol::{command_script, presence_probe_script, AgentCommand, HighlighterMode};

use crate::config::CoordinatorConfig;
use crate::error::{Error, Result};
use crate::events::{ConsoleLevel, ConsoleMessage, PageEvent, Shortcut};
use crate::host::{PageHost, PageId};
use crate::session::{InjectionStatus, PageSession, SessionSnapshot};

/// Host-side coordinator guaranteeing the agent is present in each page
/// exactly once per navigation epoch.
///
/// Cheap to clone; clones share the same registry and mode mirror.
pub struct Coordinator<H: PageHost> {
	inner: Arc<Inner<H>>,
}

struct Inner<H: PageHost> {
	config: CoordinatorConfig,
	/// Last mode requested by the user; process-wide, not per tab.
	mode: Mutex<HighlighterMode>,
	sessions: Mutex<IndexMap<PageId, PageSession<H>>>,
}

impl<H: PageHost> Clone for Coordinator<H> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

enum InjectPlan<H> {
	/// An attempt is already in flight for this epoch.
	Skip,
	/// Marked injected; re-verify the agent actually survived.
	Verify(Arc<H>),
	/// Install now, completing under `generation`.
	Install { host: Arc<H>, generation: u64 },
}

impl<H: PageHost + 'static> Coordinator<H> {
	pub fn new(config: CoordinatorConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				config,
				mode: Mutex::new(HighlighterMode::Off),
				sessions: Mutex::new(IndexMap::new()),
			}),
		}
	}

	/// Registers a newly opened tab. Replaces any previous session under
	/// the same id.
	pub fn register_page(&self, page: PageId, host: Arc<H>, url: impl Into<String>) {
		let url = url.into();
		debug!(page = %page, url = %url, "page registered");
		let previous = self
			.inner
			.sessions
			.lock()
			.insert(page, PageSession::new(host, url));
		if previous.is_some() {
			warn!(page = %page, "replaced an existing session under the same page id");
		}
	}

	/// Removes a closed tab's session. Any in-flight injection task for it
	/// drops its page handle clone at its next registry check.
	pub fn remove_page(&self, page: PageId) -> bool {
		let removed = self.inner.sessions.lock().shift_remove(&page).is_some();
		if removed {
			debug!(page = %page, "page removed");
		}
		removed
	}

	/// Returns the process-wide mirrored mode.
	pub fn mode(&self) -> HighlighterMode {
		*self.inner.mode.lock()
	}

	/// Returns the injection status of `page`, if registered.
	pub fn injection_status(&self, page: PageId) -> Option<InjectionStatus> {
		self.inner.sessions.lock().get(&page).map(|s| s.status)
	}

	/// Returns read-only snapshots of all sessions, in registration order.
	pub fn sessions(&self) -> Vec<SessionSnapshot> {
		self.inner
			.sessions
			.lock()
			.iter()
			.map(|(id, s)| SessionSnapshot {
				page: *id,
				status: s.status,
				generation: s.generation,
				url: s.current_url.clone(),
			})
			.collect()
	}

	/// Ensures the agent is present in `page` for the current epoch.
	///
	/// No-op while an attempt is in flight. A page already marked injected
	/// is re-verified by probing the agent global; if the probe reports it
	/// missing (an in-page reload the navigation listener missed), the
	/// session is demoted and injection retried immediately. Script
	/// failures revert the session so a later lifecycle event retries;
	/// stale completions never touch the new epoch's status.
	pub async fn inject(&self, page: PageId) -> Result<()> {
		loop {
			let plan = {
				let mut sessions = self.inner.sessions.lock();
				let Some(session) = sessions.get_mut(&page) else {
					return Err(Error::UnknownPage(page));
				};
				match session.status {
					InjectionStatus::Injecting => InjectPlan::Skip,
					InjectionStatus::Injected => InjectPlan::Verify(session.host.clone()),
					InjectionStatus::NotInjected | InjectionStatus::VerifyFailed => {
						session.status = InjectionStatus::Injecting;
						InjectPlan::Install {
							host: session.host.clone(),
							generation: session.generation,
						}
					}
				}
			};

			match plan {
				InjectPlan::Skip => {
					trace!(page = %page, "injection already in flight; skipping");
					return Ok(());
				}
				InjectPlan::Verify(host) => {
					if self.agent_present(&host).await {
						return Ok(());
					}
					let mut sessions = self.inner.sessions.lock();
					match sessions.get_mut(&page) {
						Some(session) if session.status == InjectionStatus::Injected => {
							debug!(page = %page, "agent missing on a page marked injected; re-injecting");
							session.status = InjectionStatus::VerifyFailed;
						}
						// Navigated or closed while probing; that flow owns
						// the session now.
						_ => return Ok(()),
					}
				}
				InjectPlan::Install { host, generation } => {
					return self.install(page, host, generation).await;
				}
			}
		}
	}

	async fn install(&self, page: PageId, host: Arc<H>, generation: u64) -> Result<()> {
		let result = host.execute_script(&self.inner.config.agent_script).await;
		{
			let mut sessions = self.inner.sessions.lock();
			let Some(session) = sessions.get_mut(&page) else {
				trace!(page = %page, "injection completed for a closed page; dropping");
				return Ok(());
			};
			if session.generation != generation {
				debug!(
					page = %page,
					stale = generation,
					current = session.generation,
					"stale injection result discarded"
				);
				return Ok(());
			}
			match &result {
				Ok(_) => session.status = InjectionStatus::Injected,
				Err(err) => {
					warn!(page = %page, error = %err, "agent injection failed; will retry on next lifecycle event");
					session.status = InjectionStatus::NotInjected;
					return Ok(());
				}
			}
		}
		debug!(page = %page, generation, "agent injected");

		if self.mode() != HighlighterMode::Off {
			// Let the freshly created overlay/tooltip attach before driving
			// the agent.
			tokio::time::sleep(self.inner.config.mode_reapply_delay).await;
			self.reapply_mode(page, generation).await;
		}
		Ok(())
	}

	async fn reapply_mode(&self, page: PageId, generation: u64) {
		let host = {
			let sessions = self.inner.sessions.lock();
			match sessions.get(&page) {
				Some(s) if s.generation == generation && s.status == InjectionStatus::Injected => {
					Some(s.host.clone())
				}
				_ => None,
			}
		};
		let Some(host) = host else {
			trace!(page = %page, "mode re-apply skipped; epoch ended during settle delay");
			return;
		};
		// Re-read the mirror at apply time; the user may have toggled off
		// during the settle delay.
		let mode = self.mode();
		if mode == HighlighterMode::Off {
			return;
		}
		let script = command_script(&AgentCommand::SetMode { mode });
		if let Err(err) = host.execute_script(&script).await {
			debug!(page = %page, error = %err, "mode re-apply failed");
		}
	}

	/// Updates the mirrored mode and pushes it to every injected page,
	/// active tab or not. Uninjected pages pick the mode up automatically
	/// when their injection completes.
	pub async fn set_mode(&self, mode: HighlighterMode) {
		*self.inner.mode.lock() = mode;
		let targets = self.injected_hosts();
		debug!(mode = %mode, pages = targets.len(), "pushing mode to injected pages");
		let script = command_script(&AgentCommand::SetMode { mode });
		for (page, host) in targets {
			if let Err(err) = host.execute_script(&script).await {
				debug!(page = %page, error = %err, "mode push failed; page resyncs on next injection");
			}
		}
	}

	/// Pushes a clear-highlights command to every injected page.
	pub async fn clear_highlights(&self) {
		let targets = self.injected_hosts();
		let script = command_script(&AgentCommand::ClearHighlights);
		for (page, host) in targets {
			if let Err(err) = host.execute_script(&script).await {
				debug!(page = %page, error = %err, "clear-highlights push failed");
			}
		}
	}

	/// Resolves a host-level shortcut against the mirror and applies it.
	pub async fn handle_shortcut(&self, shortcut: Shortcut) {
		let next = shortcut.next_mode(self.mode());
		self.set_mode(next).await;
	}

	/// Top-level navigation: invalidates all in-page state for `page` and
	/// starts a new epoch. In-page anchor jumps go through
	/// [`on_navigate_in_page`](Self::on_navigate_in_page) instead.
	pub fn on_navigate(&self, page: PageId, url: impl Into<String>) {
		let url = url.into();
		let mut sessions = self.inner.sessions.lock();
		let Some(session) = sessions.get_mut(&page) else {
			trace!(page = %page, "navigation for unknown page ignored");
			return;
		};
		session.begin_epoch(Some(url.clone()));
		debug!(page = %page, url = %url, generation = session.generation, "navigation; agent state invalidated");
	}

	/// Same-document navigation: updates the displayed URL only.
	pub fn on_navigate_in_page(&self, page: PageId, url: impl Into<String>) {
		let mut sessions = self.inner.sessions.lock();
		if let Some(session) = sessions.get_mut(&page) {
			session.current_url = url.into();
		}
	}

	/// Primary injection trigger, debounced because the DOM is sometimes
	/// not stable at the first ready signal.
	pub async fn on_page_ready(&self, page: PageId) -> Result<()> {
		tokio::time::sleep(self.inner.config.ready_settle_delay).await;
		self.inject(page).await
	}

	/// Secondary safety trigger after the page fully loads: probes agent
	/// presence and, when absent, treats it as a fresh navigation and
	/// re-injects. Covers pages whose ready signal fired before the DOM or
	/// whose script execution was blocked earlier.
	pub async fn on_page_fully_loaded(&self, page: PageId) -> Result<()> {
		let host = {
			let sessions = self.inner.sessions.lock();
			let Some(session) = sessions.get(&page) else {
				return Err(Error::UnknownPage(page));
			};
			if session.status == InjectionStatus::Injecting {
				// The in-flight attempt owns this epoch; probing under it
				// would race its completion.
				return Ok(());
			}
			session.host.clone()
		};

		if self.agent_present(&host).await {
			return Ok(());
		}

		{
			let mut sessions = self.inner.sessions.lock();
			match sessions.get_mut(&page) {
				Some(session) if session.status != InjectionStatus::Injecting => {
					debug!(page = %page, "agent absent after full load; starting a fresh epoch");
					session.begin_epoch(None);
				}
				_ => return Ok(()),
			}
		}
		self.inject(page).await
	}

	/// Load failure: recorded for diagnostics; the session keeps retrying
	/// on future lifecycle events.
	pub fn on_page_failed(&self, page: PageId, code: i32, description: &str) {
		debug!(page = %page, code, description, "page load failed");
	}

	/// Forwards a page console message to tracing.
	pub fn on_console(&self, page: PageId, message: &ConsoleMessage) {
		match message.level {
			ConsoleLevel::Error | ConsoleLevel::Warning => {
				debug!(
					target: "hilite::page_console",
					page = %page,
					level = %message.level,
					source = message.source.as_deref().unwrap_or(""),
					"{}",
					message.text
				);
			}
			_ => {
				trace!(
					target: "hilite::page_console",
					page = %page,
					level = %message.level,
					"{}",
					message.text
				);
			}
		}
	}

	/// Re-applies the mirrored mode to a newly activated tab so switching
	/// tabs keeps the user's mode without re-injection.
	pub async fn on_tab_activated(&self, page: PageId) {
		let host = {
			let sessions = self.inner.sessions.lock();
			match sessions.get(&page) {
				Some(s) if s.status == InjectionStatus::Injected => Some(s.host.clone()),
				_ => None,
			}
		};
		let Some(host) = host else { return };
		let script = command_script(&AgentCommand::SetMode { mode: self.mode() });
		if let Err(err) = host.execute_script(&script).await {
			debug!(page = %page, error = %err, "mode sync on tab switch failed");
		}
	}

	/// Single dispatch point for embedder lifecycle events. Ready and
	/// fully-loaded handlers are spawned fire-and-forget; the rest run
	/// synchronously on the caller's task.
	pub fn handle_event(&self, page: PageId, event: PageEvent) {
		match event {
			PageEvent::Ready => {
				let coordinator = self.clone();
				tokio::spawn(async move {
					if let Err(err) = coordinator.on_page_ready(page).await {
						debug!(page = %page, error = %err, "ready-triggered injection failed");
					}
				});
			}
			PageEvent::FullyLoaded => {
				let coordinator = self.clone();
				tokio::spawn(async move {
					if let Err(err) = coordinator.on_page_fully_loaded(page).await {
						debug!(page = %page, error = %err, "load-triggered verification failed");
					}
				});
			}
			PageEvent::Navigated { url, is_main_frame } => {
				if is_main_frame {
					self.on_navigate(page, url);
				}
			}
			PageEvent::NavigatedInPage { url } => self.on_navigate_in_page(page, url),
			PageEvent::Failed { code, description } => {
				self.on_page_failed(page, code, &description)
			}
			PageEvent::Console(message) => self.on_console(page, &message),
		}
	}

	pub(crate) fn host_for(&self, page: PageId) -> Option<Arc<H>> {
		self.inner.sessions.lock().get(&page).map(|s| s.host.clone())
	}

	async fn agent_present(&self, host: &Arc<H>) -> bool {
		match host.execute_script(presence_probe_script()).await {
			Ok(value) => value.as_bool().unwrap_or(false),
			Err(err) => {
				trace!(error = %err, "presence probe failed; treating agent as absent");
				false
			}
		}
	}

	fn injected_hosts(&self) -> Vec<(PageId, Arc<H>)> {
		self.inner
			.sessions
			.lock()
			.iter()
			.filter(|(_, s)| s.status == InjectionStatus::Injected)
			.map(|(id, s)| (*id, s.host.clone()))
			.collect()
	}
}

impl<H: PageHost> std::fmt::Debug for Coordinator<H> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Coordinator")
			.field("mode", &*self.inner.mode.lock())
			.field("pages", &self.inner.sessions.lock().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockPageHost;

	fn coordinator() -> Coordinator<MockPageHost> {
		Coordinator::new(
			CoordinatorConfig::new(crate::testing::AGENT_SCRIPT)
				.ready_settle_delay(std::time::Duration::ZERO)
				.mode_reapply_delay(std::time::Duration::ZERO),
		)
	}

	#[test]
	fn register_and_remove_round_trip() {
		let coordinator = coordinator();
		let page = PageId::new(1);
		coordinator.register_page(page, Arc::new(MockPageHost::new()), "https://a.example");

		assert_eq!(
			coordinator.injection_status(page),
			Some(InjectionStatus::NotInjected)
		);
		assert!(coordinator.remove_page(page));
		assert!(!coordinator.remove_page(page));
		assert_eq!(coordinator.injection_status(page), None);
	}

	#[test]
	fn navigation_for_unknown_page_is_ignored() {
		let coordinator = coordinator();
		coordinator.on_navigate(PageId::new(42), "https://nowhere.example");
		assert!(coordinator.sessions().is_empty());
	}

	#[tokio::test]
	async fn inject_unknown_page_errors() {
		let coordinator = coordinator();
		let err = coordinator.inject(PageId::new(9)).await.unwrap_err();
		assert!(matches!(err, Error::UnknownPage(_)));
	}

	#[tokio::test]
	async fn navigate_in_page_updates_url_without_invalidating() {
		let coordinator = coordinator();
		let page = PageId::new(1);
		let host = Arc::new(MockPageHost::new());
		coordinator.register_page(page, host, "https://a.example");
		coordinator.inject(page).await.unwrap();
		assert_eq!(
			coordinator.injection_status(page),
			Some(InjectionStatus::Injected)
		);

		coordinator.on_navigate_in_page(page, "https://a.example#section");
		let sessions = coordinator.sessions();
		assert_eq!(sessions[0].url, "https://a.example#section");
		assert_eq!(sessions[0].status, InjectionStatus::Injected);
		assert_eq!(sessions[0].generation, 0);
	}
}
