//! Event filtering by kind.
//!
//! A [`FilterConfig`] is either a named [`FilterPreset`], explicit
//! include/exclude sets, or both. Explicit sets take priority over the
//! preset's, and an include set always wins over any exclude set.

use crate::error::ConfigError;
use crate::event::{EventKind, KindSet, StreamEvent};
use std::fmt;
use std::str::FromStr;

/// Named filter presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterPreset {
    /// Assistant text and the final result.
    TextOnly,
    /// Everything except keep-alives and lifecycle noise.
    NoSystem,
    /// Errors only.
    ErrorsOnly,
    /// Tool calls and results.
    Tools,
    /// Message and content-block events.
    Messages,
    /// No filtering.
    Debug,
    /// No filtering.
    All,
}

impl FilterPreset {
    /// Every preset, in display order.
    pub const ALL: [Self; 7] = [
        Self::TextOnly,
        Self::NoSystem,
        Self::ErrorsOnly,
        Self::Tools,
        Self::Messages,
        Self::Debug,
        Self::All,
    ];

    /// Preset name as accepted by [`FromStr`].
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TextOnly => "text-only",
            Self::NoSystem => "no-system",
            Self::ErrorsOnly => "errors-only",
            Self::Tools => "tools",
            Self::Messages => "messages",
            Self::Debug => "debug",
            Self::All => "all",
        }
    }

    /// Kinds this preset shows exclusively, if it has an include list.
    pub const fn include(self) -> Option<KindSet> {
        match self {
            Self::TextOnly => Some(KindSet::CONTENT_BLOCK_DELTA.union(KindSet::RESULT)),
            Self::ErrorsOnly => Some(KindSet::ERROR),
            Self::Tools => Some(KindSet::TOOL_USE.union(KindSet::TOOL_RESULT)),
            Self::Messages => Some(
                KindSet::MESSAGE_START
                    .union(KindSet::MESSAGE_DELTA)
                    .union(KindSet::MESSAGE_STOP)
                    .union(KindSet::USER)
                    .union(KindSet::ASSISTANT)
                    .union(KindSet::CONTENT_BLOCK_START)
                    .union(KindSet::CONTENT_BLOCK_DELTA)
                    .union(KindSet::CONTENT_BLOCK_STOP),
            ),
            Self::NoSystem | Self::Debug | Self::All => None,
        }
    }

    /// Kinds this preset hides, if it has an exclude list.
    pub const fn exclude(self) -> Option<KindSet> {
        match self {
            Self::NoSystem => Some(
                KindSet::PING
                    .union(KindSet::SYSTEM)
                    .union(KindSet::MESSAGE_START)
                    .union(KindSet::MESSAGE_STOP)
                    .union(KindSet::CONTENT_BLOCK_START)
                    .union(KindSet::CONTENT_BLOCK_STOP),
            ),
            _ => None,
        }
    }

    fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|preset| preset.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// A validated event filter.
///
/// Built through [`FilterConfig::new`], which rejects kinds present in
/// both the include and exclude sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterConfig {
    preset: Option<FilterPreset>,
    include: Option<KindSet>,
    exclude: Option<KindSet>,
}

impl FilterConfig {
    /// Validate and build a filter.
    pub fn new(
        preset: Option<FilterPreset>,
        include: Option<KindSet>,
        exclude: Option<KindSet>,
    ) -> Result<Self, ConfigError> {
        if let (Some(include), Some(exclude)) = (include, exclude) {
            let overlap = include & exclude;
            if !overlap.is_empty() {
                return Err(ConfigError::OverlappingFilter(overlap.kinds()));
            }
        }
        Ok(Self {
            preset,
            include,
            exclude,
        })
    }

    /// A filter that shows everything.
    pub const fn show_all() -> Self {
        Self {
            preset: None,
            include: None,
            exclude: None,
        }
    }

    /// A filter using only a preset.
    pub const fn preset(preset: FilterPreset) -> Self {
        Self {
            preset: Some(preset),
            include: None,
            exclude: None,
        }
    }

    /// Parse comma separated kind names into a set.
    pub fn parse_kinds(list: &str) -> Result<KindSet, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse::<EventKind>)
            .collect()
    }

    /// The configured preset.
    pub const fn preset_name(&self) -> Option<FilterPreset> {
        self.preset
    }

    fn effective_include(&self) -> Option<KindSet> {
        non_empty(self.include).or_else(|| self.preset.and_then(FilterPreset::include))
    }

    fn effective_exclude(&self) -> Option<KindSet> {
        non_empty(self.exclude).or_else(|| self.preset.and_then(FilterPreset::exclude))
    }

    /// Whether a kind passes this filter.
    pub fn allows(&self, kind: EventKind) -> bool {
        if let Some(include) = self.effective_include() {
            return include.has(kind);
        }
        if let Some(exclude) = self.effective_exclude() {
            return !exclude.has(kind);
        }
        true
    }
}

fn non_empty(set: Option<KindSet>) -> Option<KindSet> {
    set.filter(|set| !set.is_empty())
}

/// Whether an event passes the filter.
#[inline]
pub fn should_show(event: &StreamEvent, config: &FilterConfig) -> bool {
    config.allows(event.kind())
}

/// Keep the events that pass the filter, preserving order.
pub fn filter_events<'a>(events: &'a [StreamEvent], config: &FilterConfig) -> Vec<&'a StreamEvent> {
    events.iter().filter(|event| should_show(event, config)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_of(kind: EventKind) -> StreamEvent {
        match kind {
            EventKind::Ping => StreamEvent::Ping,
            EventKind::MessageStop => StreamEvent::MessageStop,
            EventKind::ContentBlockDelta => StreamEvent::TextDelta { index: None, text: "x".into() },
            EventKind::Error => StreamEvent::Error {
                message: "boom".into(),
                code: None,
                retry_after_seconds: None,
                overloaded: false,
            },
            other => StreamEvent::Unknown {
                raw: serde_json::json!({ "type": other.as_str() }),
            },
        }
    }

    #[test]
    fn test_include_round_trip() {
        let include: KindSet = [EventKind::Error, EventKind::ToolUse].into_iter().collect();
        let config = FilterConfig::new(None, Some(include), None).unwrap();
        for kind in EventKind::ALL {
            assert_eq!(should_show(&event_of(kind), &config), include.has(kind), "{kind}");
        }
    }

    #[test]
    fn test_overlap_is_rejected() {
        let include: KindSet = [EventKind::Ping, EventKind::Error].into_iter().collect();
        let exclude: KindSet = [EventKind::Ping].into_iter().collect();
        assert_eq!(
            FilterConfig::new(None, Some(include), Some(exclude)),
            Err(ConfigError::OverlappingFilter(vec![EventKind::Ping]))
        );
    }

    #[test]
    fn test_presets() {
        let text_only = FilterConfig::preset(FilterPreset::TextOnly);
        assert!(should_show(&event_of(EventKind::ContentBlockDelta), &text_only));
        assert!(!should_show(&event_of(EventKind::Ping), &text_only));

        let no_system = FilterConfig::preset(FilterPreset::NoSystem);
        assert!(!should_show(&event_of(EventKind::Ping), &no_system));
        assert!(!should_show(&event_of(EventKind::MessageStop), &no_system));
        assert!(should_show(&event_of(EventKind::Error), &no_system));

        let all = FilterConfig::preset(FilterPreset::All);
        assert!(EventKind::ALL.into_iter().all(|kind| all.allows(kind)));
    }

    #[test]
    fn test_explicit_include_beats_preset() {
        let include: KindSet = [EventKind::Ping].into_iter().collect();
        let config = FilterConfig::new(Some(FilterPreset::ErrorsOnly), Some(include), None).unwrap();
        assert!(config.allows(EventKind::Ping));
        assert!(!config.allows(EventKind::Error));
    }

    #[test]
    fn test_preset_include_beats_explicit_exclude() {
        let exclude: KindSet = [EventKind::Result].into_iter().collect();
        let config = FilterConfig::new(Some(FilterPreset::TextOnly), None, Some(exclude)).unwrap();
        assert!(config.allows(EventKind::Result));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!("tools".parse::<FilterPreset>().unwrap(), FilterPreset::Tools);
        let err = "loud".parse::<FilterPreset>().unwrap_err();
        assert!(err.to_string().contains("text-only, no-system"));
        assert!(FilterConfig::parse_kinds("ping, nope").is_err());
        assert_eq!(
            FilterConfig::parse_kinds("ping,error").unwrap(),
            KindSet::PING | KindSet::ERROR
        );
    }

    #[test]
    fn test_filter_events_preserves_order() {
        let events = vec![
            event_of(EventKind::Ping),
            event_of(EventKind::Error),
            event_of(EventKind::ContentBlockDelta),
        ];
        let config = FilterConfig::preset(FilterPreset::NoSystem);
        let kept = filter_events(&events, &config);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].kind(), EventKind::Error);
    }
}
