//! Configuration errors.
//!
//! Everything that can go wrong at runtime degrades to "show something
//! plausible"; the only hard failures are invalid configuration values, and
//! those are rejected before the first event is processed.

use crate::event::EventKind;
use thiserror::Error;

/// Errors raised while building engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The same event kinds appear in both the include and exclude lists.
    #[error("event types cannot be both included and excluded: {}", join_kinds(.0))]
    OverlappingFilter(Vec<EventKind>),

    /// A filter preset name that does not exist.
    #[error("invalid preset: {name}. Valid presets: {valid}")]
    UnknownPreset {
        /// The rejected name.
        name: String,
        /// Comma separated list of accepted names.
        valid: String,
    },

    /// An event type name that does not exist.
    #[error("invalid event type: {0}")]
    UnknownEventKind(String),

    /// A verbosity level that does not exist.
    #[error("invalid verbosity: {0} (expected minimal, normal, verbose or debug)")]
    UnknownVerbosity(String),

    /// An environment override that could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidOverride {
        /// Environment variable name.
        var: &'static str,
        /// The raw value found.
        value: String,
    },
}

fn join_kinds(kinds: &[EventKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_message_lists_kinds() {
        let err = ConfigError::OverlappingFilter(vec![EventKind::Ping, EventKind::Error]);
        assert_eq!(
            err.to_string(),
            "event types cannot be both included and excluded: ping, error"
        );
    }
}
