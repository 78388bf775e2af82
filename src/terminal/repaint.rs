//! Prefix-diff repaint of a growing block of lines.
//!
//! Each [`Repaint::update`] receives the complete frame rendered so far. The
//! longest common prefix with the previous frame stays on screen untouched;
//! only the tail that changed is erased and rewritten.
//!
//! # Cursor model
//!
//! Between updates the cursor is always in one of three places:
//!
//! - [`Cursor::Start`]: column 1 of the line where the frame begins (nothing drawn)
//! - [`Cursor::End`]: just after the last character of the last line drawn
//! - [`Cursor::Below`]: column 1 of a blank line right below the frame, after
//!   a shrink erased lines without writing new ones
//!
//! Tracking this lets the engine decide whether new content needs a leading
//! line feed and how many rows an erase has to cover.

use super::output::OutputBuffer;

/// Where the cursor sits relative to the drawn frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// At the start of the frame's first line.
    #[default]
    Start,
    /// At the end of the last drawn line.
    End,
    /// At the start of the blank line after the last drawn line.
    Below,
}

/// Diff-based repaint state for one visual block.
#[derive(Debug, Default)]
pub struct Repaint {
    previous: Vec<String>,
    cursor: Cursor,
    out: OutputBuffer,
}

impl Repaint {
    /// Create an empty repaint state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines currently on screen.
    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    /// Current cursor position.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Whether anything has been drawn since the last finalize.
    pub fn is_active(&self) -> bool {
        !self.previous.is_empty() || self.cursor != Cursor::Start
    }

    /// Bytes that turn the previous frame into `next`.
    ///
    /// Returns an empty vector when `next` equals the previous frame.
    pub fn update(&mut self, next: &[String]) -> Vec<u8> {
        let k = common_prefix(&self.previous, next);
        let erase = self.previous.len() - k;

        if erase > 0 {
            let parked = usize::from(self.cursor == Cursor::Below);
            self.out.erase_lines(erase + parked);
            self.cursor = if k == 0 { Cursor::Start } else { Cursor::Below };
        }

        let add = &next[k..];
        if !add.is_empty() {
            if self.cursor == Cursor::End {
                self.out.newline();
            }
            self.out.write_lines(add);
            self.cursor = Cursor::End;
        }

        if erase > 0 || !add.is_empty() {
            tracing::trace!(kept = k, erased = erase, added = add.len(), "repaint");
        }

        self.previous.truncate(k);
        self.previous.extend_from_slice(add);
        self.out.take()
    }

    /// Freeze the first `n` lines of the frame.
    ///
    /// They stay on screen but leave the diff, so later frames are passed
    /// without them. Used to cap how many lines an update can touch.
    pub fn commit(&mut self, n: usize) {
        let n = n.min(self.previous.len().saturating_sub(1));
        self.previous.drain(..n);
    }

    /// Close the block: move to a fresh line and reset.
    pub fn finalize(&mut self) -> Vec<u8> {
        if self.cursor == Cursor::End {
            self.out.newline();
        }
        tracing::debug!(lines = self.previous.len(), "finalize block");
        self.previous.clear();
        self.cursor = Cursor::Start;
        self.out.take()
    }
}

/// Length of the longest common prefix of two line lists.
pub fn common_prefix(a: &[String], b: &[String]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_string()).collect()
    }

    fn erases(bytes: &[u8]) -> usize {
        bytes.windows(4).filter(|w| *w == b"\x1b[2K").count()
    }

    #[test]
    fn test_first_frame_written_plain() {
        let mut repaint = Repaint::new();
        assert_eq!(repaint.update(&frame(&["a", "b"])), b"a\nb".to_vec());
        assert_eq!(repaint.cursor(), Cursor::End);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut repaint = Repaint::new();
        let n = frame(&["one", "two", "three"]);
        assert!(!repaint.update(&n).is_empty());
        assert!(repaint.update(&n).is_empty());
        assert!(repaint.update(&n).is_empty());
    }

    #[test]
    fn test_append_only_gets_leading_newline() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["a"]));
        let bytes = repaint.update(&frame(&["a", "b", "c"]));
        assert_eq!(bytes, b"\nb\nc".to_vec());
    }

    #[test]
    fn test_erase_count_matches_changed_tail() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["keep", "keep too", "old 1", "old 2"]));
        let bytes = repaint.update(&frame(&["keep", "keep too", "new"]));
        assert_eq!(erases(&bytes), 2);
        let text = String::from_utf8(bytes).unwrap();
        assert!(!text.contains("keep"));
        assert!(text.ends_with("new"));
    }

    #[test]
    fn test_growing_last_line_rewrites_only_it() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["# head", "partial"]));
        let bytes = repaint.update(&frame(&["# head", "partial line"]));
        assert_eq!(bytes, b"\x1b[2K\x1b[Gpartial line".to_vec());
    }

    #[test]
    fn test_shrink_parks_below_then_continues() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["a", "b", "c"]));
        let shrink = repaint.update(&frame(&["a"]));
        assert_eq!(erases(&shrink), 2);
        assert_eq!(repaint.cursor(), Cursor::Below);

        // Already on a fresh line: no extra line feed.
        assert_eq!(repaint.update(&frame(&["a", "x"])), b"x".to_vec());

        repaint.update(&frame(&["a"]));
        // Replacing the first line also clears the parked row.
        let bytes = repaint.update(&frame(&["z"]));
        assert_eq!(erases(&bytes), 2);
        assert!(bytes.ends_with(b"z"));
    }

    #[test]
    fn test_finalize_resets() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["a"]));
        assert_eq!(repaint.finalize(), b"\n".to_vec());
        assert!(!repaint.is_active());
        assert!(repaint.finalize().is_empty());
        assert_eq!(repaint.update(&frame(&["b"])), b"b".to_vec());
    }

    #[test]
    fn test_commit_keeps_tail_in_diff() {
        let mut repaint = Repaint::new();
        repaint.update(&frame(&["a", "b", "c"]));
        repaint.commit(2);
        assert_eq!(repaint.previous(), frame(&["c"]).as_slice());
        let bytes = repaint.update(&frame(&["c", "d"]));
        assert_eq!(bytes, b"\nd".to_vec());
        repaint.commit(10);
        assert_eq!(repaint.previous(), frame(&["d"]).as_slice());
    }

    #[test]
    fn test_common_prefix() {
        assert_eq!(common_prefix(&frame(&["a", "b"]), &frame(&["a", "c"])), 1);
        assert_eq!(common_prefix(&frame(&[]), &frame(&["a"])), 0);
    }
}
