//! Turning events into display lines.
//!
//! - [`group`]: coalesce consecutive text deltas into runs
//! - [`markdown`]: terminal-friendly markdown for assistant text
//! - [`format`]: verbosity-gated blocks for every other event
//! - [`cache`]: LRU memoization of the two renderers above

pub mod cache;
pub mod format;
pub mod group;
pub mod markdown;
pub mod style;
pub mod text;

pub use cache::{CacheStats, RenderCache};
pub use format::{format_event, fragment, json_lines};
pub use group::{group, Unit};
pub use markdown::{looks_like_markdown, smart_render};
pub use style::{Modifiers, Palette, RenderContext, Rgb, Style};
pub use text::{expand_tabs, strip_ansi, visible_width, wrap_line};
