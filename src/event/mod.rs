//! Event model and line decoding.
//!
//! - [`StreamEvent`]: the tagged union every other module consumes
//! - [`EventKind`] / [`KindSet`]: wire `type` tags for filtering
//! - [`parse_line`] / [`LineSplitter`]: newline-delimited JSON decoding

mod kind;
mod model;
mod parse;

pub use kind::{EventKind, KindSet};
pub use model::{AssistantBlock, BlockKind, CacheCreation, ResultSummary, StreamEvent, Usage};
pub use parse::{decode_value, extract_text, parse_line, LineSplitter};
