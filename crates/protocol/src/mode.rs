//! [`HighlighterMode`] - the single value driving agent behavior.

use serde::{Deserialize, Serialize};

/// Highlighter mode, the sole driver of in-page agent behavior.
///
/// The host keeps a process-wide mirror of the last requested mode; each
/// page's agent keeps its own authoritative copy. The wire form is the
/// lowercase string (`"element"`, `"detail"`, `"off"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlighterMode {
	/// No overlay, no tooltip, default cursor.
	#[default]
	Off,
	/// Hover tracking: overlay + tooltip follow the pointer target, clicks
	/// are suppressed and replaced by a selection report.
	Element,
	/// Text/element selection: pointer selections are committed as
	/// persistent highlights.
	Detail,
}

impl HighlighterMode {
	/// Returns the wire string for this mode.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Off => "off",
			Self::Element => "element",
			Self::Detail => "detail",
		}
	}
}

impl std::fmt::Display for HighlighterMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for HighlighterMode {
	type Err = UnknownMode;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"off" => Ok(Self::Off),
			"element" => Ok(Self::Element),
			"detail" => Ok(Self::Detail),
			other => Err(UnknownMode(other.to_string())),
		}
	}
}

/// Error returned when parsing an unrecognized mode string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl std::fmt::Display for UnknownMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "unknown highlighter mode: {:?}", self.0)
	}
}

impl std::error::Error for UnknownMode {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mode_round_trips_through_wire_string() {
		for mode in [
			HighlighterMode::Off,
			HighlighterMode::Element,
			HighlighterMode::Detail,
		] {
			let parsed: HighlighterMode = mode.as_str().parse().unwrap();
			assert_eq!(parsed, mode);
		}
	}

	#[test]
	fn mode_serializes_lowercase() {
		assert_eq!(
			serde_json::to_string(&HighlighterMode::Detail).unwrap(),
			r#""detail""#
		);
		assert_eq!(
			serde_json::from_str::<HighlighterMode>(r#""element""#).unwrap(),
			HighlighterMode::Element
		);
	}

	#[test]
	fn unknown_mode_is_rejected() {
		assert!("inspect".parse::<HighlighterMode>().is_err());
	}
}
