//! Engine configuration values.
//!
//! [`PerformanceConfig`] bounds memory and paces repaints. [`Verbosity`]
//! decides how much metadata each event block shows. Both are plain values
//! built once before the first event and never mutated afterwards.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Memory and pacing limits for the stream buffer and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceConfig {
    /// Maximum lines kept in a single rendered frame.
    pub max_display_lines: usize,
    /// Event log size after eviction.
    pub max_events_in_memory: usize,
    /// Per-event text cap before truncation.
    pub max_text_length_per_event: usize,
    /// Minimum interval between visible updates.
    pub update_throttle: Duration,
    /// Byte size at which an open text run is flushed.
    pub text_buffer_size: usize,
    /// Whether oversized payloads are truncated.
    pub auto_truncate: bool,
    /// Whether old events are evicted.
    pub auto_cleanup_old_events: bool,
    /// Event log size that triggers eviction.
    pub cleanup_threshold_events: usize,
    /// Whether text runs flush on the shorter progressive delay.
    pub progressive_render: bool,
    /// Event count at which an open text run is flushed.
    pub progressive_chunk_size: usize,
    /// Inactivity delay before a progressive flush.
    pub progressive_delay: Duration,
    /// Whether [`events_for_render`](crate::buffer::StreamBuffer::events_for_render) windows the log.
    pub enable_virtual_scrolling: bool,
    /// Window size for virtual scrolling.
    pub virtual_buffer_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_display_lines: 1000,
            max_events_in_memory: 5000,
            max_text_length_per_event: 10_000,
            update_throttle: Duration::from_millis(16),
            text_buffer_size: 100,
            auto_truncate: true,
            auto_cleanup_old_events: true,
            cleanup_threshold_events: 10_000,
            progressive_render: true,
            progressive_chunk_size: 50,
            progressive_delay: Duration::from_millis(5),
            enable_virtual_scrolling: true,
            virtual_buffer_size: 200,
        }
    }
}

impl PerformanceConfig {
    /// Environment variable overriding [`max_display_lines`](Self::max_display_lines).
    pub const ENV_MAX_DISPLAY_LINES: &'static str = "RALPH_MAX_DISPLAY_LINES";
    /// Environment variable overriding [`update_throttle`](Self::update_throttle), in milliseconds.
    pub const ENV_UPDATE_THROTTLE_MS: &'static str = "RALPH_UPDATE_THROTTLE_MS";
    /// Environment variable overriding [`auto_truncate`](Self::auto_truncate).
    pub const ENV_AUTO_TRUNCATE: &'static str = "RALPH_AUTO_TRUNCATE";
    /// Environment variable overriding [`progressive_render`](Self::progressive_render).
    pub const ENV_PROGRESSIVE_RENDER: &'static str = "RALPH_PROGRESSIVE_RENDER";
    /// Environment variable overriding [`enable_virtual_scrolling`](Self::enable_virtual_scrolling).
    pub const ENV_VIRTUAL_SCROLLING: &'static str = "RALPH_VIRTUAL_SCROLLING";

    /// Defaults with `RALPH_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(Self::ENV_MAX_DISPLAY_LINES) {
            self.max_display_lines = parse_number(Self::ENV_MAX_DISPLAY_LINES, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_UPDATE_THROTTLE_MS) {
            let millis = parse_number(Self::ENV_UPDATE_THROTTLE_MS, &value)?;
            self.update_throttle = Duration::from_millis(millis as u64);
        }
        if let Some(value) = lookup(Self::ENV_AUTO_TRUNCATE) {
            self.auto_truncate = parse_flag(Self::ENV_AUTO_TRUNCATE, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_PROGRESSIVE_RENDER) {
            self.progressive_render = parse_flag(Self::ENV_PROGRESSIVE_RENDER, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_VIRTUAL_SCROLLING) {
            self.enable_virtual_scrolling = parse_flag(Self::ENV_VIRTUAL_SCROLLING, &value)?;
        }
        Ok(self)
    }

    /// Delay before a scheduled text flush fires.
    #[inline]
    pub const fn text_flush_delay(&self) -> Duration {
        if self.progressive_render {
            self.progressive_delay
        } else {
            self.update_throttle
        }
    }

    /// Largest gap between deltas that still joins the open run.
    #[inline]
    pub fn coalesce_window(&self) -> Duration {
        self.update_throttle * 2
    }
}

fn parse_number(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidOverride {
        var,
        value: value.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            var,
            value: value.to_string(),
        }),
    }
}

/// How much detail event blocks show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    /// Text, tool names, error messages and the result headline.
    Minimal,
    /// Adds tool input and output, thinking, session info and result stats.
    #[default]
    Normal,
    /// Adds message lifecycle events and token usage.
    Verbose,
    /// Everything, including pings and raw unknown events.
    Debug,
}

impl Verbosity {
    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Normal => "normal",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }

    /// Whether this level shows at least as much as `other`.
    #[inline]
    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(Self::Minimal),
            "normal" => Ok(Self::Normal),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            _ => Err(ConfigError::UnknownVerbosity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PerformanceConfig::default();
        assert_eq!(config.max_events_in_memory, 5000);
        assert_eq!(config.cleanup_threshold_events, 10_000);
        assert_eq!(config.text_flush_delay(), Duration::from_millis(5));
        assert_eq!(config.coalesce_window(), Duration::from_millis(32));
    }

    #[test]
    fn test_overrides_apply() {
        let config = PerformanceConfig::default()
            .with_overrides(|var| match var {
                "RALPH_UPDATE_THROTTLE_MS" => Some("40".into()),
                "RALPH_PROGRESSIVE_RENDER" => Some("false".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.update_throttle, Duration::from_millis(40));
        assert!(!config.progressive_render);
        assert_eq!(config.text_flush_delay(), Duration::from_millis(40));
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = PerformanceConfig::default()
            .with_overrides(|var| (var == "RALPH_AUTO_TRUNCATE").then(|| "maybe".into()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidOverride {
                var: "RALPH_AUTO_TRUNCATE",
                value: "maybe".into()
            }
        );
    }

    #[test]
    fn test_verbosity_parse_and_order() {
        assert_eq!("Verbose".parse::<Verbosity>().unwrap(), Verbosity::Verbose);
        assert!("loud".parse::<Verbosity>().is_err());
        assert!(Verbosity::Debug.at_least(Verbosity::Normal));
        assert!(!Verbosity::Minimal.at_least(Verbosity::Normal));
    }
}
