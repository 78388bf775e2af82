//! `OutputBuffer`: single-write output buffer for ANSI sequences.

use std::io::Write;

/// Pre-allocated buffer for building terminal output.
///
/// Everything for one update is accumulated here, then handed to the sink in
/// a single `write_all` so the terminal never shows a half-erased frame.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    /// Create a new output buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer sized for a typical update (4KB).
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Clear the buffer for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take the contents, leaving the buffer empty with its capacity intact.
    pub fn take(&mut self) -> Vec<u8> {
        let capacity = self.data.capacity();
        std::mem::replace(&mut self.data, Vec::with_capacity(capacity))
    }

    /// Get the buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write a string.
    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Write a line feed.
    #[inline]
    pub fn newline(&mut self) {
        self.data.push(b'\n');
    }

    /// Write `lines` separated by line feeds, with no trailing one.
    pub fn write_lines<S: AsRef<str>>(&mut self, lines: &[S]) {
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.newline();
            }
            self.write_str(line.as_ref());
        }
    }

    /// Move the cursor up `n` rows.
    #[inline]
    pub fn cursor_up(&mut self, n: usize) {
        if n > 0 {
            // CSI n A
            let _ = write!(self.data, "\x1b[{n}A");
        }
    }

    /// Move the cursor to column 1.
    #[inline]
    pub fn cursor_to_column_start(&mut self) {
        self.data.extend_from_slice(b"\x1b[G");
    }

    /// Clear the whole current line.
    #[inline]
    pub fn erase_line(&mut self) {
        self.data.extend_from_slice(b"\x1b[2K");
    }

    /// Erase `n` lines ending at the cursor's line, moving up between them.
    ///
    /// Leaves the cursor at column 1 of the topmost erased line.
    pub fn erase_lines(&mut self, n: usize) {
        for i in 0..n {
            self.erase_line();
            if i + 1 < n {
                self.cursor_up(1);
            }
        }
        if n > 0 {
            self.cursor_to_column_start();
        }
    }

    /// Hide cursor.
    #[inline]
    pub fn cursor_hide(&mut self) {
        self.data.extend_from_slice(b"\x1b[?25l");
    }

    /// Show cursor.
    #[inline]
    pub fn cursor_show(&mut self) {
        self.data.extend_from_slice(b"\x1b[?25h");
    }

    /// Flush to a writer in a single write.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn flush_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.data)?;
        writer.flush()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
