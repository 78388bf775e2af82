//! LRU caches for formatted event blocks and wrapped display lines.
//!
//! Keys are 64-bit hashes of the input plus every context field that affects
//! the output, so a width or verbosity change never serves a stale block.

use super::format::format_event;
use super::style::RenderContext;
use super::text::wrap_line;
use crate::event::StreamEvent;
use lru::LruCache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;

/// Default number of entries per cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to render.
    pub misses: u64,
    /// Entries currently held across both caches.
    pub size: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit (0.0 when nothing was looked up).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoizes [`format_event`] and [`wrap_line`].
#[derive(Debug)]
pub struct RenderCache {
    events: LruCache<u64, Vec<String>>,
    lines: LruCache<u64, Vec<String>>,
    hits: u64,
    misses: u64,
}

impl RenderCache {
    /// Create a cache holding up to `capacity` entries of each kind.
    ///
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            events: LruCache::new(cap),
            lines: LruCache::new(cap),
            hits: 0,
            misses: 0,
        }
    }

    /// Formatted lines for `event`, rendering on a miss.
    pub fn event_lines(&mut self, event: &StreamEvent, ctx: &RenderContext) -> Vec<String> {
        let key = context_key(event.fingerprint(), ctx);
        if let Some(lines) = self.events.get(&key) {
            self.hits += 1;
            return lines.clone();
        }
        self.misses += 1;
        let lines = format_event(event, ctx);
        self.events.put(key, lines.clone());
        lines
    }

    /// One rendered line wrapped to the context width.
    ///
    /// A streaming frame is rebuilt on every update while most of its lines
    /// are unchanged, so these hit far more often than they miss.
    pub fn wrapped(&mut self, line: &str, ctx: &RenderContext) -> Vec<String> {
        let mut hasher = DefaultHasher::new();
        line.hash(&mut hasher);
        let key = context_key(hasher.finish(), ctx);
        if let Some(pieces) = self.lines.get(&key) {
            self.hits += 1;
            return pieces.clone();
        }
        self.misses += 1;
        let pieces = wrap_line(line, ctx.width);
        self.lines.put(key, pieces.clone());
        pieces
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.events.clear();
        self.lines.clear();
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.events.len() + self.lines.len(),
        }
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn context_key(content: u64, ctx: &RenderContext) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    ctx.color.hash(&mut hasher);
    ctx.width.hash(&mut hasher);
    ctx.verbosity.hash(&mut hasher);
    hasher.finish()
}
