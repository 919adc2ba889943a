use thiserror::Error;

use crate::host::PageId;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the hilite core.
///
/// Injection and verification failures are recovered internally by the
/// coordinator and logged rather than returned; callers only see errors
/// for operations that cannot proceed at all.
#[derive(Debug, Error)]
pub enum Error {
	/// Script execution in the page context was rejected by the host.
	#[error("script execution failed: {0}")]
	ScriptExecution(String),

	/// The page id is not (or no longer) registered.
	#[error("unknown page: {0}")]
	UnknownPage(PageId),

	/// A probe returned a value that does not match the expected shape.
	#[error("malformed probe result: {0}")]
	ProbeShape(String),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
