//! Session: the host loop.
//!
//! ```text
//! ┌───────────────┐   SourceMessage   ┌──────────────────────────┐
//! │ Reader Thread │ ────────────────▶ │ select! { line, deadline }│ ──▶ Display ──▶ W
//! └───────────────┘                   └──────────────────────────┘
//! ```
//!
//! All display state is touched from the loop's thread only; the buffer's
//! deadlines re-enter through `crossbeam_channel::at`.

use super::display::{Display, DisplayConfig};
use super::source::{LineReader, SourceMessage};
use crate::event::parse_line;
use crossbeam_channel::{at, bounded, never, select};
use std::io::{self, Read, Write};
use std::time::Instant;

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Display settings.
    pub display: DisplayConfig,
    /// Lines the reader may queue ahead of the loop.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            channel_capacity: 1024,
        }
    }
}

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines received, blank ones included.
    pub lines: u64,
    /// Events handed to the display.
    pub events: u64,
    /// Deadlines that fired.
    pub deadlines: u64,
    /// Why reading stopped early, if it did.
    pub read_error: Option<String>,
}

/// What woke the loop.
enum Wake {
    /// A reader message; `None` once the reader hung up.
    Message(Option<SourceMessage>),
    /// The display's deadline passed.
    Deadline,
}

/// Drives a [`Display`] from a line-oriented byte stream.
pub struct Session<W: Write> {
    display: Display<W>,
    channel_capacity: usize,
    stats: SessionStats,
}

impl<W: Write> Session<W> {
    /// Create a session writing to `writer`.
    pub fn new(writer: W, config: SessionConfig) -> Self {
        Self {
            display: Display::new(writer, config.display),
            channel_capacity: config.channel_capacity.max(1),
            stats: SessionStats::default(),
        }
    }

    /// Decode one line and hand it to the display.
    pub fn handle_line(&mut self, line: &str) {
        self.stats.lines += 1;
        if let Some(event) = parse_line(line) {
            self.stats.events += 1;
            self.display.ingest(event);
        }
    }

    /// Read `reader` to the end, drawing as events arrive.
    ///
    /// A read failure ends the session early but is not an error: what was
    /// received is still drawn, and the reason is kept in
    /// [`SessionStats::read_error`].
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned or writing to
    /// the output fails.
    pub fn run<R>(&mut self, reader: R) -> io::Result<SessionStats>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = bounded(self.channel_capacity);
        let reader = LineReader::spawn(reader, tx)?;
        tracing::info!("session started");

        loop {
            let deadline = self.display.next_deadline().map_or_else(never, at);
            let wake = select! {
                recv(rx) -> message => Wake::Message(message.ok()),
                recv(deadline) -> _ => Wake::Deadline,
            };
            match wake {
                Wake::Message(Some(SourceMessage::Line(line))) => self.handle_line(&line),
                Wake::Message(Some(SourceMessage::Error(reason))) => {
                    self.stats.read_error = Some(reason);
                    break;
                }
                Wake::Message(Some(SourceMessage::Eof) | None) => break,
                Wake::Deadline => {
                    self.stats.deadlines += 1;
                    self.display.on_deadline(Instant::now())?;
                }
            }
        }

        reader.join();
        self.finish()?;
        tracing::info!(
            lines = self.stats.lines,
            events = self.stats.events,
            deadlines = self.stats.deadlines,
            "session finished"
        );
        Ok(self.stats.clone())
    }

    /// Draw what is left, close any open block and dispose the display.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.display.is_disposed() {
            return Ok(());
        }
        self.display.finish()?;
        self.display.dispose();
        Ok(())
    }

    /// Counters so far.
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// The display being driven.
    pub const fn display(&self) -> &Display<W> {
        &self.display
    }

    /// Consume the session and return the writer.
    pub fn into_writer(self) -> W {
        self.display.into_writer()
    }
}
