//! Buffer module: event ingestion with coalescing and memory bounds.
//!
//! This module contains:
//! - [`StreamBuffer`]: the event log, open text run and flush deadline
//! - [`BufferedTextRun`]: consecutive text deltas merged before display
//! - [`MemoryStats`]: a snapshot of buffer occupancy

mod run;
mod stream;

pub use run::BufferedTextRun;
pub use stream::{MemoryStats, StreamBuffer, TRUNCATION_MARKER};
