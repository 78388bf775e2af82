//! Terminal output: ANSI byte building and the incremental repaint engine.

mod output;
pub mod repaint;

pub use output::OutputBuffer;
pub use repaint::{Cursor, Repaint};
