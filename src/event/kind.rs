//! Event kinds: the wire `type` tag, used for filtering.

use crate::error::ConfigError;
use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

/// The coarse type of an event as named on the wire.
///
/// All content-block deltas (text, tool input, thinking, signature) share
/// [`EventKind::ContentBlockDelta`], matching how the producer tags them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `message_start`
    MessageStart,
    /// `content_block_start`
    ContentBlockStart,
    /// `content_block_delta`
    ContentBlockDelta,
    /// `content_block_stop`
    ContentBlockStop,
    /// `message_delta`
    MessageDelta,
    /// `message_stop`
    MessageStop,
    /// `ping`
    Ping,
    /// `error` and every `*_error` flavour.
    Error,
    /// `result`
    Result,
    /// `system`
    System,
    /// `user`
    User,
    /// `assistant`
    Assistant,
    /// `tool_use`
    ToolUse,
    /// `tool_result`
    ToolResult,
    /// `text` (plain lines that were not JSON)
    Text,
    /// Anything else.
    Unknown,
}

impl EventKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::MessageStart,
        Self::ContentBlockStart,
        Self::ContentBlockDelta,
        Self::ContentBlockStop,
        Self::MessageDelta,
        Self::MessageStop,
        Self::Ping,
        Self::Error,
        Self::Result,
        Self::System,
        Self::User,
        Self::Assistant,
        Self::ToolUse,
        Self::ToolResult,
        Self::Text,
        Self::Unknown,
    ];

    /// Wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageStart => "message_start",
            Self::ContentBlockStart => "content_block_start",
            Self::ContentBlockDelta => "content_block_delta",
            Self::ContentBlockStop => "content_block_stop",
            Self::MessageDelta => "message_delta",
            Self::MessageStop => "message_stop",
            Self::Ping => "ping",
            Self::Error => "error",
            Self::Result => "result",
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolUse => "tool_use",
            Self::ToolResult => "tool_result",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }

    /// Resolve a wire name, folding error flavours into [`EventKind::Error`].
    ///
    /// Returns `None` for names this engine does not know.
    pub fn from_wire(name: &str) -> Option<Self> {
        let kind = match name {
            "message_start" => Self::MessageStart,
            "content_block_start" => Self::ContentBlockStart,
            "content_block_delta" => Self::ContentBlockDelta,
            "content_block_stop" => Self::ContentBlockStop,
            "message_delta" => Self::MessageDelta,
            "message_stop" => Self::MessageStop,
            "ping" | "connection_ping" => Self::Ping,
            "error" | "request_too_large" => Self::Error,
            "result" => Self::Result,
            "system" => Self::System,
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "tool_use" | "tool_use_start" | "tool_use_delta" | "tool_use_stop" => Self::ToolUse,
            "tool_result" => Self::ToolResult,
            "text" | "content" => Self::Text,
            "unknown" => Self::Unknown,
            other if other.ends_with("_error") => Self::Error,
            _ => return None,
        };
        Some(kind)
    }

    /// The single-bit set for this kind.
    pub const fn bit(self) -> KindSet {
        match self {
            Self::MessageStart => KindSet::MESSAGE_START,
            Self::ContentBlockStart => KindSet::CONTENT_BLOCK_START,
            Self::ContentBlockDelta => KindSet::CONTENT_BLOCK_DELTA,
            Self::ContentBlockStop => KindSet::CONTENT_BLOCK_STOP,
            Self::MessageDelta => KindSet::MESSAGE_DELTA,
            Self::MessageStop => KindSet::MESSAGE_STOP,
            Self::Ping => KindSet::PING,
            Self::Error => KindSet::ERROR,
            Self::Result => KindSet::RESULT,
            Self::System => KindSet::SYSTEM,
            Self::User => KindSet::USER,
            Self::Assistant => KindSet::ASSISTANT,
            Self::ToolUse => KindSet::TOOL_USE,
            Self::ToolResult => KindSet::TOOL_RESULT,
            Self::Text => KindSet::TEXT,
            Self::Unknown => KindSet::UNKNOWN,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s.trim()).ok_or_else(|| ConfigError::UnknownEventKind(s.to_string()))
    }
}

bitflags! {
    /// A set of [`EventKind`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KindSet: u32 {
        /// `message_start`
        const MESSAGE_START       = 1 << 0;
        /// `content_block_start`
        const CONTENT_BLOCK_START = 1 << 1;
        /// `content_block_delta`
        const CONTENT_BLOCK_DELTA = 1 << 2;
        /// `content_block_stop`
        const CONTENT_BLOCK_STOP  = 1 << 3;
        /// `message_delta`
        const MESSAGE_DELTA       = 1 << 4;
        /// `message_stop`
        const MESSAGE_STOP        = 1 << 5;
        /// `ping`
        const PING                = 1 << 6;
        /// `error`
        const ERROR               = 1 << 7;
        /// `result`
        const RESULT              = 1 << 8;
        /// `system`
        const SYSTEM              = 1 << 9;
        /// `user`
        const USER                = 1 << 10;
        /// `assistant`
        const ASSISTANT           = 1 << 11;
        /// `tool_use`
        const TOOL_USE            = 1 << 12;
        /// `tool_result`
        const TOOL_RESULT         = 1 << 13;
        /// `text`
        const TEXT                = 1 << 14;
        /// `unknown`
        const UNKNOWN             = 1 << 15;
    }
}

impl KindSet {
    /// Check membership of a single kind.
    #[inline]
    pub const fn has(self, kind: EventKind) -> bool {
        self.contains(kind.bit())
    }

    /// The kinds in this set, in declaration order.
    pub fn kinds(self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }
}

impl FromIterator<EventKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, kind| set | kind.bit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_error_flavours_fold() {
        assert_eq!(EventKind::from_wire("overloaded_error"), Some(EventKind::Error));
        assert_eq!(EventKind::from_wire("rate_limit_error"), Some(EventKind::Error));
        assert_eq!(EventKind::from_wire("bogus"), None);
        assert!("bogus".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_kind_set_membership() {
        let set: KindSet = [EventKind::Ping, EventKind::ToolUse].into_iter().collect();
        assert!(set.has(EventKind::Ping));
        assert!(!set.has(EventKind::Error));
        assert_eq!(set.kinds(), vec![EventKind::Ping, EventKind::ToolUse]);
    }
}
