//! Display-width helpers for ANSI-decorated text.

use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Columns between tab stops.
pub const TAB_WIDTH: usize = 8;

/// Split `s` into alternating escape sequences and visible graphemes.
fn segments(s: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = s;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        if let Some(len) = escape_len(rest) {
            let (head, tail) = rest.split_at(len);
            rest = tail;
            return Some((true, head));
        }
        let grapheme = rest.graphemes(true).next()?;
        rest = &rest[grapheme.len()..];
        Some((false, grapheme))
    })
}

/// Length of a CSI sequence at the start of `s`.
fn escape_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != 0x1b || bytes[1] != b'[' {
        return None;
    }
    bytes[2..]
        .iter()
        .position(|b| (0x40..=0x7e).contains(b))
        .map(|end| end + 3)
}

/// Columns occupied by `s` once escape sequences are removed.
pub fn visible_width(s: &str) -> usize {
    segments(s)
        .filter(|(escape, _)| !escape)
        .map(|(_, grapheme)| grapheme.width())
        .sum()
}

/// Remove CSI escape sequences.
pub fn strip_ansi(s: &str) -> String {
    segments(s)
        .filter(|(escape, _)| !escape)
        .map(|(_, grapheme)| grapheme)
        .collect()
}

/// Expand tabs to the next [`TAB_WIDTH`] stop and drop other control
/// characters.
///
/// The result advances the cursor by exactly [`visible_width`] columns.
/// CSI escape sequences are kept.
pub fn expand_tabs(line: &str) -> Cow<'_, str> {
    if !line.chars().any(char::is_control) {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len() + TAB_WIDTH);
    let mut columns = 0;
    for (escape, segment) in segments(line) {
        if escape {
            out.push_str(segment);
        } else if segment == "\t" {
            let pad = TAB_WIDTH - columns % TAB_WIDTH;
            out.push_str(&" ".repeat(pad));
            columns += pad;
        } else if !segment.chars().any(char::is_control) {
            out.push_str(segment);
            columns += segment.width();
        }
    }
    Cow::Owned(out)
}

/// Hard-wrap one line so no piece is wider than `width` columns.
///
/// Tabs are expanded first. Escape sequences are carried along without
/// counting toward the width.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let line = expand_tabs(line);
    if width == 0 || visible_width(&line) <= width {
        return vec![line.into_owned()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut columns = 0;
    for (escape, segment) in segments(&line) {
        if escape {
            current.push_str(segment);
            continue;
        }
        let w = segment.width();
        if columns + w > width && columns > 0 {
            pieces.push(std::mem::take(&mut current));
            columns = 0;
        }
        current.push_str(segment);
        columns += w;
    }
    pieces.push(current);
    pieces
}

/// Keep at most `max` characters, appending `...` when cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
