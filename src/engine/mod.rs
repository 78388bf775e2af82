//! Engine: the phase machine, the display coordinator and the host loop.
//!
//! ```text
//! ┌──────────────┐  SourceMessage  ┌─────────┐  events  ┌─────────┐  bytes
//! │ LineReader   │ ──────────────▶ │ Session │ ───────▶ │ Display │ ──────▶ W
//! └──────────────┘                 └─────────┘          └─────────┘
//!                                       ▲   deadline        │
//!                                       └───────────────────┘
//! ```
//!
//! - **[`LineReader`]**: reads the producer's output on its own thread
//! - **[`Session`]**: selects between incoming lines and buffer deadlines
//! - **[`Display`]**: buffer → filter → group → render → phase → repaint
//! - **[`PhaseMachine`]**: decides finalize-or-continue per unit

mod display;
mod phase;
mod session;
mod source;

pub use display::{Display, DisplayConfig};
pub use phase::{PhaseMachine, Role, Transition};
pub use session::{Session, SessionConfig, SessionStats};
pub use source::{LineReader, SourceMessage};
