//! The capability seam between the coordinator and an embedded page.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Opaque stable identifier for an open tab.
///
/// Identifies the tab for its whole lifetime, not the page's navigation
/// identity; the same [`PageId`] survives arbitrarily many navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(u64);

impl PageId {
	pub const fn new(id: u64) -> Self {
		Self(id)
	}
}

impl std::fmt::Display for PageId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Capability to execute script in one page's context.
///
/// The embedder implements this over whatever embedded-page mechanism it
/// uses (a webview's `executeJavaScript`, a remote debugging session, a
/// test double). Each call is asynchronous, may fail, and may resolve out
/// of order with respect to navigation events; the coordinator's
/// generation counter handles the reordering.
#[async_trait]
pub trait PageHost: Send + Sync {
	/// Evaluates `code` in the page context and returns its result as JSON.
	///
	/// Only primitives and plain records are expected back; anything the
	/// host cannot serialize should surface as
	/// [`Error::ScriptExecution`](crate::Error::ScriptExecution).
	async fn execute_script(&self, code: &str) -> Result<Value>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn page_id_displays_as_number() {
		assert_eq!(PageId::new(7).to_string(), "7");
	}
}
