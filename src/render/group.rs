//! Grouping of consecutive text deltas.

use crate::event::StreamEvent;

/// One classified unit of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit<'a> {
    /// Any event that is not an assistant text delta.
    Single(&'a StreamEvent),
    /// Consecutive assistant text deltas, in order. Never empty.
    TextRun(Vec<&'a StreamEvent>),
}

impl Unit<'_> {
    /// Whether this unit continues assistant text.
    #[inline]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::TextRun(_))
    }

    /// Concatenated text of a run; `None` for single events.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::TextRun(events) => Some(
                events
                    .iter()
                    .filter_map(|event| event.delta_text())
                    .collect(),
            ),
            Self::Single(_) => None,
        }
    }
}

/// Group events into units.
///
/// Only `TextDelta` events coalesce; thinking and tool-input deltas always
/// stand alone. The result depends only on the input sequence.
pub fn group<'a, I>(events: I) -> Vec<Unit<'a>>
where
    I: IntoIterator<Item = &'a StreamEvent>,
{
    let mut units = Vec::new();
    let mut run: Vec<&'a StreamEvent> = Vec::new();

    for event in events {
        if event.is_text_delta() {
            run.push(event);
            continue;
        }
        if !run.is_empty() {
            units.push(Unit::TextRun(std::mem::take(&mut run)));
        }
        units.push(Unit::Single(event));
    }
    if !run.is_empty() {
        units.push(Unit::TextRun(run));
    }
    units
}
