//! `BufferedTextRun`: consecutive text deltas merged by concatenation.

use crate::config::PerformanceConfig;
use crate::event::StreamEvent;
use std::time::Instant;

/// An open run of text deltas awaiting materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedTextRun {
    /// Concatenated text.
    pub text: String,
    /// When the first delta arrived.
    pub started_at: Instant,
    /// Number of deltas merged so far.
    pub source_event_count: usize,
    /// Block index of the first delta.
    pub index: Option<u32>,
}

impl BufferedTextRun {
    /// Open a run with its first fragment.
    pub fn open(index: Option<u32>, text: String, now: Instant) -> Self {
        Self {
            text,
            started_at: now,
            source_event_count: 1,
            index,
        }
    }

    /// Append a fragment.
    #[inline]
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.source_event_count += 1;
    }

    /// Whether the run has outgrown either size bound.
    #[inline]
    pub fn is_full(&self, config: &PerformanceConfig) -> bool {
        self.text.len() > config.text_buffer_size
            || self.source_event_count > config.progressive_chunk_size
    }

    /// Byte length of the buffered text.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    /// Materialize as a single `TextDelta`.
    pub fn into_event(self) -> StreamEvent {
        StreamEvent::TextDelta {
            index: self.index,
            text: self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_fills_by_events() {
        let config = PerformanceConfig {
            progressive_chunk_size: 2,
            ..PerformanceConfig::default()
        };
        let mut run = BufferedTextRun::open(Some(0), "a".into(), Instant::now());
        run.push("b");
        assert!(!run.is_full(&config));
        run.push("c");
        assert!(run.is_full(&config));
        assert_eq!(
            run.into_event(),
            StreamEvent::TextDelta { index: Some(0), text: "abc".into() }
        );
    }

    #[test]
    fn test_run_fills_by_bytes() {
        let config = PerformanceConfig::default();
        let run = BufferedTextRun::open(None, "x".repeat(101), Instant::now());
        assert!(run.is_full(&config));
        assert_eq!(run.byte_len(), 101);
    }
}
