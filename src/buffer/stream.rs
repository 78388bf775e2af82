//! `StreamBuffer`: Bounded event log with text coalescing.
//!
//! Text deltas that arrive close together are merged into one
//! [`BufferedTextRun`] before they reach the log, so the renderer sees a
//! handful of chunks instead of one event per token. Every other event
//! closes the open run and is appended directly.
//!
//! The buffer owns no threads. Deferred work is expressed as a single
//! deadline ([`StreamBuffer::next_deadline`]) that the host waits on and
//! then hands back through [`StreamBuffer::fire_due`], which keeps all
//! mutation on the caller's thread.

use super::run::BufferedTextRun;
use crate::config::PerformanceConfig;
use crate::event::StreamEvent;
use std::collections::VecDeque;
use std::time::Instant;
use unicode_segmentation::UnicodeSegmentation;

/// Appended to payloads cut by the truncation policy.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated for performance ...]";

/// Snapshot of buffer occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Events in the log (the open run is not counted).
    pub event_count: usize,
    /// Rough heap footprint of the log plus the open run.
    pub estimated_bytes: usize,
    /// Bytes waiting in the open run.
    pub open_run_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    /// Materialize the open run, then notify.
    Flush(Instant),
    /// Notify only.
    Update(Instant),
}

impl Pending {
    const fn deadline(self) -> Instant {
        match self {
            Self::Flush(at) | Self::Update(at) => at,
        }
    }
}

/// Event log with a coalescing front end.
#[derive(Debug)]
pub struct StreamBuffer {
    config: PerformanceConfig,
    log: VecDeque<StreamEvent>,
    run: Option<BufferedTextRun>,
    last_flush: Option<Instant>,
    /// Index of the first event not yet returned by `drain`.
    delivered: usize,
    pending: Option<Pending>,
    evicted: u64,
    disposed: bool,
}

impl StreamBuffer {
    /// Create an empty buffer.
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            log: VecDeque::with_capacity(config.max_events_in_memory.min(1024)),
            config,
            run: None,
            last_flush: None,
            delivered: 0,
            pending: None,
            evicted: 0,
            disposed: false,
        }
    }

    /// The configuration this buffer was built with.
    #[inline]
    pub const fn config(&self) -> &PerformanceConfig {
        &self.config
    }

    /// Take ownership of an event.
    pub fn ingest(&mut self, event: StreamEvent) {
        self.ingest_at(event, Instant::now());
    }

    /// [`ingest`](Self::ingest) with an explicit clock reading.
    pub fn ingest_at(&mut self, event: StreamEvent, now: Instant) {
        if self.disposed {
            tracing::debug!(kind = %event.kind(), "event ignored after dispose");
            return;
        }

        match event {
            StreamEvent::TextDelta { index, text } => {
                if text.is_empty() {
                    return;
                }
                self.push_text(index, text, now);
                self.schedule(Pending::Flush(now + self.config.text_flush_delay()));
            }
            other => {
                self.flush_run(now);
                self.append(other);
                self.schedule(Pending::Update(now + self.config.update_throttle));
            }
        }
    }

    fn push_text(&mut self, index: Option<u32>, text: String, now: Instant) {
        let window = self.config.coalesce_window();
        let joins = self.run.as_ref().is_some_and(|run| {
            let anchor = self
                .last_flush
                .map_or(run.started_at, |flushed| flushed.max(run.started_at));
            now.saturating_duration_since(anchor) <= window
        });

        if joins {
            if let Some(run) = self.run.as_mut() {
                run.push(&text);
            }
        } else {
            self.flush_run(now);
            self.run = Some(BufferedTextRun::open(index, text, now));
        }

        if self.run.as_ref().is_some_and(|run| run.is_full(&self.config)) {
            self.flush_run(now);
        }
    }

    fn flush_run(&mut self, now: Instant) {
        let Some(run) = self.run.take() else {
            return;
        };
        tracing::trace!(
            bytes = run.byte_len(),
            deltas = run.source_event_count,
            "text run flushed"
        );
        self.append(run.into_event());
        self.last_flush = Some(now);
    }

    fn append(&mut self, mut event: StreamEvent) {
        if self.config.auto_truncate {
            self.truncate_payload(&mut event);
        }
        self.log.push_back(event);
        self.enforce_memory_limits();
    }

    fn truncate_payload(&self, event: &mut StreamEvent) {
        let limit = self.config.max_text_length_per_event;
        for text in event.text_payloads_mut() {
            truncate_text(text, limit);
        }
    }

    fn enforce_memory_limits(&mut self) {
        // The threshold arms eviction; once armed the log is held at the cap.
        let limit = if self.evicted > 0 {
            self.config.max_events_in_memory
        } else {
            self.config.cleanup_threshold_events
        };
        if !self.config.auto_cleanup_old_events || self.log.len() <= limit {
            return;
        }

        let excess = self.log.len().saturating_sub(self.config.max_events_in_memory);
        if excess == 0 {
            return;
        }
        self.log.drain(..excess);
        self.delivered = self.delivered.saturating_sub(excess);
        self.evicted += excess as u64;
        tracing::debug!(
            dropped = excess,
            retained = self.log.len(),
            total_evicted = self.evicted,
            "evicted oldest events"
        );
    }

    /// Arm the deadline unless one is already pending.
    fn schedule(&mut self, pending: Pending) {
        if self.pending.is_none() {
            self.pending = Some(pending);
        }
    }

    /// When the host should call [`fire_due`](Self::fire_due) next.
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(Pending::deadline)
    }

    /// Run the pending deadline if it has passed.
    ///
    /// Returns `true` when new content may be visible and the host should
    /// render.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if pending.deadline() <= now => {
                self.pending = None;
                if matches!(pending, Pending::Flush(_)) || self.run.is_some() {
                    self.flush_run(now);
                }
                true
            }
            _ => false,
        }
    }

    /// Events not yet returned by a previous `drain`, in arrival order.
    ///
    /// Any open text run is materialized first.
    pub fn drain(&mut self) -> &[StreamEvent] {
        self.drain_at(Instant::now())
    }

    /// [`drain`](Self::drain) with an explicit clock reading.
    pub fn drain_at(&mut self, now: Instant) -> &[StreamEvent] {
        self.flush_run(now);
        let start = self.delivered.min(self.log.len());
        self.delivered = self.log.len();
        &self.log.make_contiguous()[start..]
    }

    /// A window of the log for virtual scrolling.
    ///
    /// Returns the whole log when virtual scrolling is disabled. `count`
    /// defaults to the configured window size.
    pub fn events_for_render(&mut self, start: usize, count: Option<usize>) -> &[StreamEvent] {
        self.flush_run(Instant::now());
        let events = self.log.make_contiguous();
        if !self.config.enable_virtual_scrolling {
            return events;
        }
        let count = count.unwrap_or(self.config.virtual_buffer_size);
        let start = start.min(events.len());
        let end = start.saturating_add(count).min(events.len());
        &events[start..end]
    }

    /// Events in the log plus the open run, if any.
    #[inline]
    pub fn event_count(&self) -> usize {
        self.log.len() + usize::from(self.run.is_some())
    }

    /// Total events dropped by eviction since creation.
    #[inline]
    pub const fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Current occupancy.
    pub fn memory_stats(&self) -> MemoryStats {
        let open_run_bytes = self.run.as_ref().map_or(0, BufferedTextRun::byte_len);
        MemoryStats {
            event_count: self.log.len(),
            estimated_bytes: self
                .log
                .iter()
                .map(StreamEvent::estimated_bytes)
                .sum::<usize>()
                + open_run_bytes,
            open_run_bytes,
        }
    }

    /// Drop every event and cancel the pending deadline.
    pub fn clear(&mut self) {
        self.log.clear();
        self.run = None;
        self.last_flush = None;
        self.delivered = 0;
        self.pending = None;
    }

    /// Clear and stop accepting events. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear();
        self.disposed = true;
        tracing::debug!(evicted = self.evicted, "stream buffer disposed");
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[inline]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new(PerformanceConfig::default())
    }
}

/// Cut `text` to at most `limit` characters on a grapheme boundary.
fn truncate_text(text: &mut String, limit: usize) {
    if text.len() <= limit {
        return;
    }

    let mut chars = 0;
    let mut cut = None;
    for (offset, grapheme) in text.grapheme_indices(true) {
        let next = chars + grapheme.chars().count();
        if next > limit {
            cut = Some(offset);
            break;
        }
        chars = next;
    }

    if let Some(cut) = cut {
        let original = text.len();
        text.truncate(cut);
        text.push_str(TRUNCATION_MARKER);
        tracing::debug!(original, kept = cut, "payload truncated");
    }
}
