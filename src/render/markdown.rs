//! Markdown to terminal text.
//!
//! A line-oriented renderer: block rules (headers, rules, lists, quotes,
//! fences, tables) decide what a line is, then inline rules rewrite the
//! remaining prose. Inline rules operate on protected segments, so a
//! substitution made by one rule is never rewritten by a later one.
//!
//! The output keeps every source line except fence delimiters, which become
//! the top and bottom of a bordered box.

use super::style::{RenderContext, Style};
use regex::{Captures, Regex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;
use unicode_width::UnicodeWidthStr;

/// Detection patterns, checked in order.
static DETECTORS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("header", r"(?m)^#{1,6}\s+\S"),
        ("bold", r"\*\*[^*\n]+\*\*|__[^_\n]+__"),
        ("italic", r"(?:^|[^*\w])\*[^*\s][^*\n]*\*"),
        ("fenced code", r"(?m)^\s*```[^`\n]*$"),
        ("inline code", r"`[^`\n]+`"),
        ("unordered list", r"(?m)^\s*[-*+]\s+\S"),
        ("ordered list", r"(?m)^\s*\d+[.)]\s+\S"),
        ("blockquote", r"(?m)^\s*>\s"),
        ("link", r"\[[^\]\n]+\]\([^)\n]+\)"),
        ("horizontal rule", r"(?m)^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$"),
        ("table", r"(?m)^\s*\|.*\|\s*$"),
        ("task list", r"(?m)^\s*[-*+]\s+\[[ xX]\]"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, compile(pattern)))
    .collect()
});

static HEADER: LazyLock<Regex> = LazyLock::new(|| compile(r"^(#{1,6})\s+(.*?)(?:\s+#+)?\s*$"));
static RULE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})$")
});
static TASK: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\s*)[-*+]\s+\[([ xX])\]\s*(.*)$"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\s*)[-*+]\s+(.*)$"));
static ORDERED: LazyLock<Regex> = LazyLock::new(|| compile(r"^(\s*)(\d+)[.)]\s+(.*)$"));
static QUOTE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*>\s?(.*)$"));
// Backticks in the info string mean inline code, not a fence.
static FENCE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*```\s*([^`\s]*)[^`]*$"));
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*\|.*\|\s*$"));

static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| compile(r"`([^`]+)`"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| compile(r"\*\*([^*]+?)\*\*|__([^_]+?)__"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\*([^*\s](?:[^*]*[^*\s])?)\*|\b_([^_\s](?:[^_]*[^_\s])?)_\b"));
static LINK: LazyLock<Regex> = LazyLock::new(|| compile(r"\[([^\]]+)\]\(([^)\s]+)(?:\s+[^)]*)?\)"));

fn compile(pattern: &str) -> Regex {
    // Patterns are literals; a failure here is a programming error caught by tests.
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid markdown pattern {pattern:?}: {err}"))
}

/// Name of the first markdown construct found in `text`, if any.
pub fn detect(text: &str) -> Option<&'static str> {
    DETECTORS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(name, _)| *name)
}

/// Whether `text` contains any markdown construct.
#[inline]
pub fn looks_like_markdown(text: &str) -> bool {
    detect(text).is_some()
}

/// Render `text` only when it looks like markdown; otherwise return it as is.
pub fn smart_render(text: &str, ctx: &RenderContext) -> String {
    if looks_like_markdown(text) {
        render(text, ctx)
    } else {
        text.to_string()
    }
}

/// Render markdown into terminal text.
///
/// Never fails: if rendering panics, the input is returned unchanged.
pub fn render(text: &str, ctx: &RenderContext) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| Renderer::new(ctx).run(text))) {
        Ok(rendered) => rendered,
        Err(_) => {
            tracing::warn!(bytes = text.len(), "markdown rendering failed, showing raw text");
            text.to_string()
        }
    }
}

struct Fence {
    label: String,
    body: Vec<String>,
}

struct Renderer<'c> {
    ctx: &'c RenderContext,
    out: Vec<String>,
    fence: Option<Fence>,
}

impl<'c> Renderer<'c> {
    const fn new(ctx: &'c RenderContext) -> Self {
        Self {
            ctx,
            out: Vec::new(),
            fence: None,
        }
    }

    fn run(mut self, text: &str) -> String {
        for line in text.split('\n') {
            self.line(line.strip_suffix('\r').unwrap_or(line));
        }
        // An unterminated fence is still streaming in: draw it open-ended.
        if let Some(fence) = self.fence.take() {
            self.draw_fence(&fence, false);
        }
        self.out.join("\n")
    }

    fn line(&mut self, line: &str) {
        if let Some(fence) = self.fence.as_mut() {
            if line.trim_start().starts_with("```") {
                if let Some(fence) = self.fence.take() {
                    self.draw_fence(&fence, true);
                }
            } else {
                fence.body.push(line.to_string());
            }
            return;
        }

        if let Some(caps) = FENCE.captures(line) {
            self.fence = Some(Fence {
                label: caps[1].to_string(),
                body: Vec::new(),
            });
            return;
        }

        let rendered = self.block(line);
        self.out.push(rendered);
    }

    fn block(&self, line: &str) -> String {
        let palette = &self.ctx.palette;

        if let Some(caps) = HEADER.captures(line) {
            let marker = match caps[1].len() {
                1 => "▸▸▸ ",
                2 => "▸▸ ",
                3 => "▸ ",
                _ => "› ",
            };
            let title = Style::fg(palette.primary).bold();
            return format!("{}{}", self.ctx.paint(marker, title), self.inline(&caps[2]));
        }

        if RULE.is_match(line) {
            return self.ctx.muted(&"─".repeat(self.ctx.width));
        }

        if let Some(caps) = TASK.captures(line) {
            let glyph = if &caps[2] == " " { "☐" } else { "☑" };
            return format!(
                "{}  {} {}",
                &caps[1],
                self.ctx.fg(glyph, palette.secondary),
                self.inline(&caps[3])
            );
        }

        if let Some(caps) = BULLET.captures(line) {
            return format!(
                "{}  {} {}",
                &caps[1],
                self.ctx.fg("•", palette.secondary),
                self.inline(&caps[2])
            );
        }

        if let Some(caps) = ORDERED.captures(line) {
            let number = format!("{}.", &caps[2]);
            return format!(
                "{}  {} {}",
                &caps[1],
                self.ctx.fg(&number, palette.secondary),
                self.inline(&caps[3])
            );
        }

        if let Some(caps) = QUOTE.captures(line) {
            return format!("{}{}", self.ctx.muted("│ "), self.inline(&caps[1]));
        }

        if TABLE_ROW.is_match(line) {
            let bar = self.ctx.muted("│");
            return line
                .split('|')
                .map(|cell| self.inline(cell))
                .collect::<Vec<_>>()
                .join(&bar);
        }

        self.inline(line)
    }

    fn draw_fence(&mut self, fence: &Fence, closed: bool) {
        let border = |s: &str| self.ctx.muted(s);
        let label = if fence.label.is_empty() {
            String::new()
        } else {
            format!(" {} ", fence.label)
        };
        // Sized by the terminal, not the body, so borders hold still while streaming.
        let span = self.ctx.width.saturating_sub(2).max(label.width() + 2);

        let top_fill = span.saturating_sub(1 + label.width());
        let top = format!("┌─{label}{}", "─".repeat(top_fill));
        let mut lines = vec![border(&top)];
        lines.extend(fence.body.iter().map(|line| format!("{}{line}", border("│ "))));
        if closed {
            lines.push(border(&format!("└{}", "─".repeat(span))));
        }
        self.out.extend(lines);
    }

    fn inline(&self, text: &str) -> String {
        let palette = &self.ctx.palette;
        let mut segments = vec![Segment::Plain(text.to_string())];

        segments = substitute(segments, &INLINE_CODE, |caps| {
            self.ctx.fg(&format!("⟨{}⟩", &caps[1]), palette.success)
        });
        segments = substitute(segments, &BOLD, |caps| {
            let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            self.ctx.paint(&inner.to_uppercase(), Style::fg(palette.warning).bold())
        });
        segments = substitute(segments, &ITALIC, |caps| {
            let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            self.ctx.underline(inner)
        });
        segments = substitute(segments, &LINK, |caps| {
            format!("{} ↗", self.ctx.paint(&caps[1], Style::fg(palette.accent).underline()))
        });

        segments.into_iter().map(Segment::into_string).collect()
    }
}

/// Inline text split into rewritable and finished pieces.
enum Segment {
    Plain(String),
    Protected(String),
}

impl Segment {
    fn into_string(self) -> String {
        match self {
            Self::Plain(s) | Self::Protected(s) => s,
        }
    }
}

/// Apply one inline rule to every plain segment.
fn substitute<F>(segments: Vec<Segment>, pattern: &Regex, replace: F) -> Vec<Segment>
where
    F: Fn(&Captures<'_>) -> String,
{
    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let text = match segment {
            Segment::Plain(text) => text,
            protected @ Segment::Protected(_) => {
                out.push(protected);
                continue;
            }
        };

        let mut last = 0;
        for caps in pattern.captures_iter(&text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            if whole.start() > last {
                out.push(Segment::Plain(text[last..whole.start()].to_string()));
            }
            out.push(Segment::Protected(replace(&caps)));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Segment::Plain(text[last..].to_string()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Verbosity;

    fn plain(text: &str) -> String {
        render(text, &RenderContext::plain())
    }

    #[test]
    fn test_prose_is_untouched() {
        let prose = "The quick brown fox jumps over 3 lazy dogs. 2 * 3 = 6";
        assert!(!looks_like_markdown(prose));
        assert_eq!(smart_render(prose, &RenderContext::plain()), prose);
    }

    #[test]
    fn test_title_and_bold() {
        let out = plain("# Title\nThis is **bold**.");
        assert_eq!(out, "▸▸▸ Title\nThis is BOLD.");
        assert!(!out.contains("**"));
    }

    #[test]
    fn test_header_levels() {
        assert_eq!(plain("## Two"), "▸▸ Two");
        assert_eq!(plain("### Three"), "▸ Three");
        assert_eq!(plain("#### Four"), "› Four");
    }

    #[test]
    fn test_lists() {
        assert_eq!(plain("- one\n* two"), "  • one\n  • two");
        assert_eq!(plain("1. first\n2) second"), "  1. first\n  2. second");
        assert_eq!(plain("- [ ] todo\n- [x] done"), "  ☐ todo\n  ☑ done");
    }

    #[test]
    fn test_rule_spans_width() {
        let ctx = RenderContext::new(false, 30, Verbosity::Normal);
        assert_eq!(render("---", &ctx), "─".repeat(30));
        // Not confused with a bullet.
        assert_eq!(render("* * *", &ctx), "─".repeat(30));
    }

    #[test]
    fn test_blockquote_and_link() {
        assert_eq!(plain("> quoted"), "│ quoted");
        assert_eq!(plain("see [docs](https://example.com)"), "see docs ↗");
    }

    #[test]
    fn test_inline_code_is_protected() {
        assert_eq!(plain("run `a **b** c` now"), "run ⟨a **b** c⟩ now");
    }

    #[test]
    fn test_italic_plain_without_color() {
        assert_eq!(plain("an *emphasised* word"), "an emphasised word");
        let ctx = RenderContext::new(true, 80, Verbosity::Normal);
        assert!(render("an *emphasised* word", &ctx).contains("\x1b[4memphasised"));
    }

    #[test]
    fn test_fence_is_verbatim() {
        let out = plain("```rust\nlet x = **y**;\n# not a header\n```\nafter");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("┌─ rust "));
        assert_eq!(lines[1], "│ let x = **y**;");
        assert_eq!(lines[2], "│ # not a header");
        assert!(lines[3].starts_with("└─"));
        assert_eq!(lines[4], "after");
    }

    #[test]
    fn test_inline_triple_backticks_are_not_a_fence() {
        let out = plain("```ls``` lists files\n**next** line\nmore");
        assert!(!out.contains('┌'), "{out:?}");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "NEXT line");
        assert_eq!(lines[2], "more");
    }

    #[test]
    fn test_fence_border_ignores_body_width() {
        let short = plain("```sh\nls");
        let long = plain(&format!("```sh\n{}\n```", "x".repeat(40)));
        assert_eq!(short.lines().next(), long.lines().next());
        let top = long.lines().next().unwrap_or_default();
        let bottom = long.lines().last().unwrap_or_default();
        assert_eq!(top.width(), 79);
        assert_eq!(bottom.width(), 79);
    }

    #[test]
    fn test_open_fence_has_no_bottom() {
        let out = plain("```\ncode");
        assert_eq!(out.lines().count(), 2);
        assert!(!out.contains('└'));
    }

    #[test]
    fn test_table_pipes() {
        assert_eq!(plain("| a | **b** |"), "│ a │ B │");
    }

    #[test]
    fn test_detection_order() {
        assert_eq!(detect("# h"), Some("header"));
        assert_eq!(detect("- [ ] x"), Some("unordered list"));
        assert_eq!(detect("plain"), None);
    }

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(DETECTORS.len(), 12);
        for pattern in [&*HEADER, &*RULE, &*TASK, &*BULLET, &*ORDERED, &*QUOTE, &*FENCE] {
            assert!(!pattern.as_str().is_empty());
        }
    }
}
