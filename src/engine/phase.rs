//! Role/phase state machine.
//!
//! Decides, per grouped unit, whether the open assistant block has to be
//! finalized before drawing and whether the unit is drawn through the diff
//! path or as a self-contained block.
//!
//! ```text
//!            text run                      text run
//!   None ───────────────▶ AssistantStreaming ◀──────┐
//!    ▲                      │        └──────────────┘
//!    │ block drawn          │ any other unit: finalize first
//!    │                      ▼
//!   User / ToolUse / ToolResult / ResultSummary / None
//! ```

use crate::event::StreamEvent;
use crate::render::Unit;
use std::time::Instant;

/// What kind of block is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Nothing open.
    #[default]
    None,
    /// A user message block.
    User,
    /// Assistant text being revised token by token.
    AssistantStreaming,
    /// A tool call block.
    ToolUse,
    /// A tool output block.
    ToolResult,
    /// The final result summary.
    ResultSummary,
}

impl Role {
    /// The role a single non-text event draws under.
    pub fn for_event(event: &StreamEvent) -> Self {
        match event {
            StreamEvent::ToolUse { .. } | StreamEvent::ToolInputDelta { .. } => Self::ToolUse,
            StreamEvent::ContentBlockStart { block_kind, .. } if block_kind.is_tool() => Self::ToolUse,
            StreamEvent::ToolResult { .. } => Self::ToolResult,
            StreamEvent::Result(_) => Self::ResultSummary,
            StreamEvent::User { .. } => Self::User,
            StreamEvent::TextDelta { .. } => Self::AssistantStreaming,
            _ => Self::None,
        }
    }
}

/// Outcome of feeding one unit to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The open assistant block must be finalized before drawing.
    pub finalize: bool,
    /// Role before the unit.
    pub from: Role,
    /// Role the unit is drawn under.
    pub to: Role,
}

impl Transition {
    /// Whether the unit is drawn through the repaint diff.
    #[inline]
    pub const fn is_diff(&self) -> bool {
        matches!(self.to, Role::AssistantStreaming)
    }

    /// Whether this unit opens a new assistant block.
    #[inline]
    pub const fn opens_stream(&self) -> bool {
        !matches!(self.from, Role::AssistantStreaming) && matches!(self.to, Role::AssistantStreaming)
    }
}

/// Tracks the current role across units.
#[derive(Debug, Default)]
pub struct PhaseMachine {
    role: Role,
    opened_at: Option<Instant>,
}

impl PhaseMachine {
    /// Create a machine in [`Role::None`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current role.
    pub const fn role(&self) -> Role {
        self.role
    }

    /// When the current block was opened.
    pub const fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// Feed one unit.
    ///
    /// Text runs enter or stay in [`Role::AssistantStreaming`]. Every other
    /// unit leaves it (finalizing first) and is drawn under its own role;
    /// call [`settle`](Self::settle) once that block is drawn.
    pub fn advance(&mut self, unit: &Unit<'_>) -> Transition {
        let from = self.role;
        let to = match unit {
            Unit::TextRun(_) => Role::AssistantStreaming,
            Unit::Single(event) => Role::for_event(event),
        };
        let transition = Transition {
            finalize: from == Role::AssistantStreaming && to != Role::AssistantStreaming,
            from,
            to,
        };
        if from != to || self.opened_at.is_none() {
            self.opened_at = Some(Instant::now());
        }
        self.role = to;
        transition
    }

    /// Return to [`Role::None`] after an append-only block was drawn.
    ///
    /// Has no effect while streaming assistant text.
    pub fn settle(&mut self) {
        if self.role != Role::AssistantStreaming {
            self.role = Role::None;
            self.opened_at = None;
        }
    }

    /// End of input: whether an assistant block is still open.
    ///
    /// Resets to [`Role::None`] either way.
    pub fn finish(&mut self) -> bool {
        let open = self.role == Role::AssistantStreaming;
        self.role = Role::None;
        self.opened_at = None;
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::BlockKind;

    fn text() -> StreamEvent {
        StreamEvent::TextDelta { index: None, text: "t".into() }
    }

    #[test]
    fn test_text_stays_streaming() {
        let mut machine = PhaseMachine::new();
        let event = text();
        let first = machine.advance(&Unit::TextRun(vec![&event]));
        assert!(first.opens_stream());
        assert!(first.is_diff());
        assert!(!first.finalize);

        let second = machine.advance(&Unit::TextRun(vec![&event]));
        assert!(!second.opens_stream());
        assert!(second.is_diff());
        assert_eq!(machine.role(), Role::AssistantStreaming);
    }

    #[test]
    fn test_non_text_finalizes_stream() {
        let mut machine = PhaseMachine::new();
        let event = text();
        machine.advance(&Unit::TextRun(vec![&event]));

        let tool = StreamEvent::ToolUse { name: "Bash".into(), input: serde_json::Value::Null };
        let step = machine.advance(&Unit::Single(&tool));
        assert!(step.finalize);
        assert_eq!(step.to, Role::ToolUse);
        assert!(!step.is_diff());

        machine.settle();
        assert_eq!(machine.role(), Role::None);
        assert!(machine.opened_at().is_none());
    }

    #[test]
    fn test_thinking_leaves_stream() {
        let mut machine = PhaseMachine::new();
        let event = text();
        machine.advance(&Unit::TextRun(vec![&event]));
        let thinking = StreamEvent::ThinkingDelta { index: None, text: "x".into() };
        let step = machine.advance(&Unit::Single(&thinking));
        assert!(step.finalize);
        assert_eq!(step.to, Role::None);
    }

    #[test]
    fn test_target_roles() {
        let start = StreamEvent::ContentBlockStart {
            index: Some(1),
            block_kind: BlockKind::ToolUse { name: "Read".into() },
        };
        assert_eq!(Role::for_event(&start), Role::ToolUse);
        let text_start = StreamEvent::ContentBlockStart { index: Some(0), block_kind: BlockKind::Text };
        assert_eq!(Role::for_event(&text_start), Role::None);
        let result = StreamEvent::ToolResult { id: None, output: String::new(), is_error: false };
        assert_eq!(Role::for_event(&result), Role::ToolResult);
        assert_eq!(Role::for_event(&StreamEvent::MessageStop), Role::None);
    }

    #[test]
    fn test_finish_reports_open_stream() {
        let mut machine = PhaseMachine::new();
        assert!(!machine.finish());
        let event = text();
        machine.advance(&Unit::TextRun(vec![&event]));
        assert!(machine.finish());
        assert_eq!(machine.role(), Role::None);
    }
}
