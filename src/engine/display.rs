//! Display: buffer, filter, render and repaint wired into one writer.
//!
//! The display owns no threads. The host feeds events with
//! [`Display::ingest`], waits until [`Display::next_deadline`], then calls
//! [`Display::on_deadline`]; everything runs in the caller's context.

use super::phase::{PhaseMachine, Role};
use crate::buffer::{MemoryStats, StreamBuffer};
use crate::config::PerformanceConfig;
use crate::event::StreamEvent;
use crate::filter::{filter_events, FilterConfig};
use crate::render::{fragment, group, smart_render, CacheStats, RenderCache, RenderContext, Unit};
use crate::terminal::{OutputBuffer, Repaint};
use std::io::{self, Write};
use std::mem::Discriminant;
use std::time::Instant;

/// Configuration for a [`Display`].
#[derive(Debug, Clone, Default)]
pub struct DisplayConfig {
    /// Buffering and memory policy.
    pub performance: PerformanceConfig,
    /// Which event kinds are drawn.
    pub filter: FilterConfig,
    /// Color, width and verbosity.
    pub context: RenderContext,
}

/// Streams events to a terminal writer.
pub struct Display<W: Write> {
    buffer: StreamBuffer,
    painter: Painter<W>,
}

impl<W: Write> Display<W> {
    /// Create a display writing to `writer`.
    pub fn new(writer: W, config: DisplayConfig) -> Self {
        let max_lines = config.performance.max_display_lines.max(1);
        Self {
            buffer: StreamBuffer::new(config.performance),
            painter: Painter {
                writer,
                ctx: config.context,
                filter: config.filter,
                cache: RenderCache::default(),
                phase: PhaseMachine::new(),
                repaint: Repaint::new(),
                assistant: String::new(),
                committed: 0,
                max_lines,
                fragment: None,
                out: OutputBuffer::new(),
            },
        }
    }

    /// Accept one event. Nothing is drawn until the next deadline.
    pub fn ingest(&mut self, event: StreamEvent) {
        self.buffer.ingest(event);
    }

    /// [`ingest`](Self::ingest) with an explicit clock reading.
    pub fn ingest_at(&mut self, event: StreamEvent, now: Instant) {
        self.buffer.ingest_at(event, now);
    }

    /// When [`on_deadline`](Self::on_deadline) should run next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.buffer.next_deadline()
    }

    /// Fire the buffer's deadline and draw whatever became visible.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn on_deadline(&mut self, now: Instant) -> io::Result<()> {
        if self.buffer.fire_due(now) {
            self.render_at(now)?;
        }
        Ok(())
    }

    /// Draw every event not drawn yet, flushing any open text run.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn render(&mut self) -> io::Result<()> {
        self.render_at(Instant::now())
    }

    /// [`render`](Self::render) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn render_at(&mut self, now: Instant) -> io::Result<()> {
        let events = self.buffer.drain_at(now);
        self.painter.paint(events)
    }

    /// Draw what is left and close any open block.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn finish(&mut self) -> io::Result<()> {
        let events = self.buffer.drain_at(Instant::now());
        self.painter.paint(events)?;
        self.painter.close()
    }

    /// Stop accepting events and cancel the pending deadline. Idempotent.
    pub fn dispose(&mut self) {
        self.buffer.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub const fn is_disposed(&self) -> bool {
        self.buffer.is_disposed()
    }

    /// Buffer occupancy.
    pub fn memory_stats(&self) -> MemoryStats {
        self.buffer.memory_stats()
    }

    /// Render cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.painter.cache.stats()
    }

    /// Drop cached renders. Output is unaffected.
    pub fn clear_cache(&mut self) {
        self.painter.cache.clear();
    }

    /// Current role of the phase machine.
    pub const fn role(&self) -> Role {
        self.painter.phase.role()
    }

    /// The render context in use.
    pub const fn context(&self) -> &RenderContext {
        &self.painter.ctx
    }

    /// The underlying writer.
    pub const fn writer(&self) -> &W {
        &self.painter.writer
    }

    /// Consume the display and return the writer.
    pub fn into_writer(self) -> W {
        self.painter.writer
    }
}

/// Everything except the buffer, so drained events can be borrowed while
/// drawing.
struct Painter<W: Write> {
    writer: W,
    ctx: RenderContext,
    filter: FilterConfig,
    cache: RenderCache,
    phase: PhaseMachine,
    repaint: Repaint,
    /// Text of the open assistant block.
    assistant: String,
    /// Leading frame lines frozen out of the diff.
    committed: usize,
    max_lines: usize,
    /// Kind of the streaming fragment line still open, if any.
    fragment: Option<Discriminant<StreamEvent>>,
    out: OutputBuffer,
}

impl<W: Write> Painter<W> {
    fn paint(&mut self, events: &[StreamEvent]) -> io::Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let visible = filter_events(events, &self.filter);
        for unit in group(visible) {
            self.draw(&unit);
        }
        self.flush()
    }

    fn draw(&mut self, unit: &Unit<'_>) {
        let step = self.phase.advance(unit);
        if step.finalize {
            self.end_stream();
        }

        match unit {
            Unit::TextRun(_) => {
                self.close_fragment();
                if step.opens_stream() {
                    self.assistant.clear();
                    self.committed = 0;
                    if self.ctx.color {
                        self.out.cursor_hide();
                    }
                }
                if let Some(text) = unit.text() {
                    self.assistant.push_str(&text);
                }
                self.repaint_stream();
            }
            Unit::Single(event) => {
                self.draw_block(event);
                self.phase.settle();
            }
        }
    }

    /// Diff the open assistant block against what is on screen.
    fn repaint_stream(&mut self) {
        let rendered = smart_render(&self.assistant, &self.ctx);
        let mut frame = Vec::new();
        for line in rendered.split('\n') {
            frame.extend(self.cache.wrapped(line, &self.ctx));
        }

        let start = self.committed.min(frame.len());
        let bytes = self.repaint.update(&frame[start..]);
        self.out.write_raw(&bytes);

        let excess = self.repaint.previous().len().saturating_sub(self.max_lines);
        if excess > 0 {
            self.repaint.commit(excess);
            self.committed += excess;
        }
    }

    fn end_stream(&mut self) {
        let bytes = self.repaint.finalize();
        self.out.write_raw(&bytes);
        if self.ctx.color {
            self.out.cursor_show();
        }
        self.assistant.clear();
        self.committed = 0;
    }

    fn draw_block(&mut self, event: &StreamEvent) {
        if let Some(piece) = fragment(event, &self.ctx) {
            let kind = std::mem::discriminant(event);
            if self.fragment.is_some_and(|open| open != kind) {
                self.close_fragment();
            }
            if !piece.is_empty() {
                self.out.write_str(&piece);
                self.fragment = Some(kind);
            }
            return;
        }

        let lines = self.cache.event_lines(event, &self.ctx);
        if lines.is_empty() {
            return;
        }
        self.close_fragment();
        for line in &lines {
            self.out.write_str(line);
            self.out.newline();
        }
    }

    fn close_fragment(&mut self) {
        if self.fragment.take().is_some() {
            self.out.newline();
        }
    }

    /// End of input.
    fn close(&mut self) -> io::Result<()> {
        if self.phase.finish() {
            self.end_stream();
        }
        self.close_fragment();
        self.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.out.is_empty() {
            return Ok(());
        }
        self.out.flush_to(&mut self.writer)?;
        self.out.clear();
        Ok(())
    }
}
