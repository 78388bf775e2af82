//! # ralph-stream
//!
//! A flicker-free terminal renderer for streaming agent output.
//!
//! The producer (an agent CLI) writes newline-delimited JSON events: text
//! deltas, tool calls, tool results, errors and a final summary. This crate
//! turns that stream into terminal text that updates in place while the
//! assistant is still typing, without rewriting lines that did not change.
//!
//! ## Core Concepts
//!
//! - **Coalescing buffer**: small text deltas merge into runs, drawn on a throttle
//! - **Grouping**: consecutive text deltas form one unit; everything else stands alone
//! - **Markdown**: headers, lists, code fences and emphasis mapped to terminal glyphs
//! - **Prefix diff**: only the changed tail of the assistant block is erased and rewritten
//! - **Phase machine**: any other event closes the assistant block before it is drawn
//!
//! ## Example
//!
//! ```rust,no_run
//! use ralph_stream::{Session, SessionConfig};
//!
//! let mut session = Session::new(std::io::stdout(), SessionConfig::default());
//! session.run(std::io::stdin())?;
//! # Ok::<(), std::io::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod filter;
pub mod render;
pub mod terminal;

// Re-exports for convenience
pub use buffer::{MemoryStats, StreamBuffer};
pub use config::{PerformanceConfig, Verbosity};
pub use engine::{Display, DisplayConfig, PhaseMachine, Role, Session, SessionConfig, SessionStats};
pub use error::ConfigError;
pub use event::{parse_line, EventKind, KindSet, LineSplitter, StreamEvent};
pub use filter::{filter_events, should_show, FilterConfig, FilterPreset};
pub use render::{format_event, group, smart_render, RenderCache, RenderContext, Unit};
pub use terminal::{OutputBuffer, Repaint};
