//! Per-event blocks, gated by [`Verbosity`].
//!
//! Each event becomes zero or more display lines. An empty result means the
//! event is hidden at the current verbosity.
//!
//! | Level   | Adds                                                        |
//! |---------|-------------------------------------------------------------|
//! | minimal | text, tool names, error messages, result headline           |
//! | normal  | tool input/output, thinking, session info, error detail     |
//! | verbose | message lifecycle, content blocks, token usage, input JSON  |
//! | debug   | pings, signatures, raw unknown events                       |

use super::markdown::smart_render;
use super::style::{RenderContext, Style};
use super::text::ellipsize;
use crate::config::Verbosity;
use crate::event::{extract_text, AssistantBlock, BlockKind, EventKind, ResultSummary, StreamEvent, Usage};
use serde_json::Value;

/// Longest pretty-printed JSON shown before the footer.
pub const MAX_JSON_LINES: usize = 50;

const INDENT: &str = "  ";

/// Format one event into display lines.
pub fn format_event(event: &StreamEvent, ctx: &RenderContext) -> Vec<String> {
    let v = ctx.verbosity;
    let p = &ctx.palette;
    let mut out = Block::new(ctx);

    match event {
        StreamEvent::TextDelta { text, .. } => out.text(text),

        StreamEvent::ThinkingDelta { text, .. } if v.at_least(Verbosity::Normal) => {
            out.styled_text(text, Style::fg(p.info).dim());
        }

        StreamEvent::ToolInputDelta { partial_json, .. } if v.at_least(Verbosity::Verbose) => {
            out.raw(&ctx.fg(partial_json, p.warning));
        }

        StreamEvent::SignatureDelta { signature } if v.at_least(Verbosity::Debug) => {
            out.raw(&ctx.muted(&format!("✓ Signature: {}", ellipsize(signature, 16))));
        }

        StreamEvent::ContentBlockStart { index, block_kind } => {
            format_block_start(&mut out, *index, block_kind, v);
        }

        StreamEvent::ContentBlockStop { .. } if v.at_least(Verbosity::Verbose) => {
            out.raw(&ctx.muted("■ Block End"));
        }

        StreamEvent::MessageStart { id, model, usage } if v.at_least(Verbosity::Verbose) => {
            out.heading("✉ Message Started", Style::fg(p.secondary).bold());
            if let Some(model) = model {
                out.detail(&format!("Model: {model}"));
            }
            if let Some(id) = id {
                out.detail(&format!("Message ID: {id}"));
            }
            out.usage(usage.as_ref());
        }

        StreamEvent::MessageDelta { stop_reason, usage } if v.at_least(Verbosity::Verbose) => {
            if stop_reason.is_some() || usage.is_some() {
                out.heading("◆ Message Update", Style::fg(p.secondary));
                if let Some(reason) = stop_reason {
                    out.detail(&format!("Stop reason: {reason}"));
                }
                out.usage(usage.as_ref());
            }
        }

        StreamEvent::MessageStop if v.at_least(Verbosity::Verbose) => {
            out.heading("✓ Message Complete", Style::fg(p.success).bold());
        }

        StreamEvent::Ping if v.at_least(Verbosity::Debug) => out.raw(&ctx.muted("• ping")),

        StreamEvent::Error {
            message,
            code,
            retry_after_seconds,
            overloaded,
        } => format_error(&mut out, message, code.as_deref(), *retry_after_seconds, *overloaded),

        StreamEvent::ToolUse { name, input } => {
            out.heading(&format!("⚙ Tool Use: {name}"), Style::fg(p.warning));
            if v.at_least(Verbosity::Normal) && !input.is_null() {
                out.json(input);
            }
        }

        StreamEvent::ToolResult { id, output, is_error } if v.at_least(Verbosity::Normal) => {
            let status = if *is_error { "(err)" } else { "(ok)" };
            let id = id
                .as_deref()
                .map(|id| format!(" (ID: {})", ellipsize(id, 8)))
                .unwrap_or_default();
            let color = if *is_error { p.error } else { p.accent };
            out.heading(&format!("◇ Tool Result {status}{id}"), Style::fg(color));
            if output.is_empty() {
                out.detail("(No output)");
            } else {
                out.capped(output);
            }
        }

        StreamEvent::Result(summary) => format_result(&mut out, summary, v),

        StreamEvent::SystemInit {
            model,
            cwd,
            tool_count,
            mcp_server_count,
            permission_mode,
        } if v.at_least(Verbosity::Normal) => {
            out.heading("⚡ System Initialized", Style::fg(p.info).bold());
            if !model.is_empty() {
                out.detail(&format!("Model: {model}"));
            }
            if !cwd.is_empty() {
                out.detail(&format!("Directory: {cwd}"));
            }
            if *tool_count > 0 {
                out.detail(&format!("Tools: {tool_count} available"));
            }
            if *mcp_server_count > 0 {
                out.detail(&format!("MCP Servers: {mcp_server_count} connected"));
            }
            if let Some(mode) = permission_mode {
                out.detail(&format!("Permission mode: {mode}"));
            }
        }

        StreamEvent::User { content } if v.at_least(Verbosity::Normal) => {
            out.heading("❯ User", Style::fg(p.success).bold());
            match user_text(content) {
                Some(text) => out.indented_text(&text),
                None => out.json(content),
            }
        }

        StreamEvent::Assistant { blocks, usage } => format_assistant(&mut out, blocks, usage.as_ref(), v),

        StreamEvent::Unknown { raw } => format_unknown(&mut out, event.kind(), raw, v),

        _ => {}
    }

    out.lines
}

/// An append-only fragment for streaming deltas, if this event is one.
///
/// Thinking and tool-input deltas arrive a few characters at a time; they are
/// written in place rather than as one block per delta.
pub fn fragment(event: &StreamEvent, ctx: &RenderContext) -> Option<String> {
    let v = ctx.verbosity;
    match event {
        StreamEvent::ThinkingDelta { text, .. } if v.at_least(Verbosity::Normal) => {
            Some(ctx.paint(text, Style::fg(ctx.palette.info).dim()))
        }
        StreamEvent::ToolInputDelta { partial_json, .. } if v.at_least(Verbosity::Verbose) => {
            Some(ctx.fg(partial_json, ctx.palette.warning))
        }
        _ => None,
    }
}

fn format_block_start(out: &mut Block<'_>, index: Option<u32>, kind: &BlockKind, v: Verbosity) {
    let p = out.ctx.palette;
    let tool = match kind {
        BlockKind::ToolUse { name } => Some(format!("⚙ Tool: {name}")),
        BlockKind::ServerToolUse { name } => Some(format!("⚙ Server Tool: {name}")),
        _ => None,
    };
    if let Some(label) = tool {
        let style = Style::fg(p.warning);
        out.heading(&label, style);
        return;
    }
    if !v.at_least(Verbosity::Verbose) {
        return;
    }

    let annotation = match kind {
        BlockKind::Thinking => " ∴ Thinking...".to_string(),
        BlockKind::RedactedThinking => " ∴ Thinking (redacted)".to_string(),
        BlockKind::Image => " ▣ Image".to_string(),
        BlockKind::Document { name } => format!(" ▤ Document: {}", name.as_deref().unwrap_or("")),
        BlockKind::WebSearch => " ⌕ Web Search".to_string(),
        BlockKind::ToolResult => " ◇ Tool Result".to_string(),
        BlockKind::Other(name) => format!(" ({name})"),
        BlockKind::Text | BlockKind::ToolUse { .. } | BlockKind::ServerToolUse { .. } => String::new(),
    };
    let index = index.map(|i| format!(" #{i}")).unwrap_or_default();
    let label = format!("▶ Content Block{index}{annotation}");
    let style = Style::fg(p.accent);
    out.heading(&label, style);
}

fn format_error(
    out: &mut Block<'_>,
    message: &str,
    code: Option<&str>,
    retry_after: Option<u64>,
    overloaded: bool,
) {
    let ctx = out.ctx;
    let red = Style::fg(ctx.palette.error);
    let title = if overloaded { "API Overloaded" } else { "Error" };

    if !ctx.verbosity.at_least(Verbosity::Normal) {
        out.raw(&ctx.paint(&format!("✗ {title}: {message}"), red.bold()));
        return;
    }

    out.heading(&format!("✗ {title}"), red.bold());
    out.raw(&format!("{INDENT}{}", ctx.paint(message, red)));
    if let Some(code) = code {
        out.raw(&format!("{INDENT}{}", ctx.paint(&format!("Error code: {code}"), red.dim())));
    }
    if let Some(seconds) = retry_after {
        let warn = Style::fg(ctx.palette.warning);
        out.raw(&format!("{INDENT}{}", ctx.paint(&format!("retry after {seconds}s"), warn)));
    } else if overloaded {
        out.raw(&format!(
            "{INDENT}{}",
            ctx.paint("Try again in a few moments...", Style::fg(ctx.palette.warning).dim())
        ));
    }
}

fn format_result(out: &mut Block<'_>, summary: &ResultSummary, v: Verbosity) {
    let ctx = out.ctx;
    if summary.succeeded() {
        out.heading("✓ Task Complete", Style::fg(ctx.palette.success).bold());
    } else {
        out.heading("✗ Task Failed", Style::fg(ctx.palette.error).bold());
    }
    if !v.at_least(Verbosity::Normal) {
        return;
    }

    if summary.duration_ms > 0 {
        let api = summary
            .duration_api_ms
            .map(|api| format!(" (API: {})", seconds(api)))
            .unwrap_or_default();
        out.detail(&format!("Duration: {}{api}", seconds(summary.duration_ms)));
    }
    if let Some(turns) = summary.num_turns {
        out.detail(&format!("Turns: {turns}"));
    }
    if let Some(cost) = summary.cost_usd {
        out.detail(&format!("Cost: ${cost:.4}"));
    }
    if v.at_least(Verbosity::Verbose) {
        if let Some(session) = &summary.session_id {
            out.detail(&format!("Session: {}", ellipsize(session, 12)));
        }
        out.usage(summary.usage.as_ref());
    }
    if let Some(text) = &summary.result_text {
        out.indented_text(text);
    }
}

fn format_assistant(out: &mut Block<'_>, blocks: &[AssistantBlock], usage: Option<&Usage>, v: Verbosity) {
    let ctx = out.ctx;
    if v.at_least(Verbosity::Normal) {
        out.heading("❯ Assistant", Style::fg(ctx.palette.primary).bold());
    }
    for block in blocks {
        match block {
            AssistantBlock::Text(text) => out.indented_text(text),
            AssistantBlock::Thinking(text) if v.at_least(Verbosity::Normal) => {
                out.raw(&format!("{INDENT}{}", ctx.fg("∴ Thinking", ctx.palette.info)));
                for line in smart_render(text, ctx).lines() {
                    out.raw(&format!("{INDENT}{INDENT}{}", ctx.paint(line, Style::default().dim())));
                }
            }
            AssistantBlock::ToolUse { name, input } => {
                out.raw(&format!(
                    "{INDENT}{}",
                    ctx.fg(&format!("⚙ Using tool: {name}"), ctx.palette.warning)
                ));
                if v.at_least(Verbosity::Normal) && !input.is_null() {
                    for line in json_lines(input) {
                        out.raw(&format!("{INDENT}{INDENT}{}", ctx.muted(&line)));
                    }
                }
            }
            AssistantBlock::Thinking(_) => {}
        }
    }
    if v.at_least(Verbosity::Verbose) {
        out.usage(usage);
    }
}

fn format_unknown(out: &mut Block<'_>, kind: EventKind, raw: &Value, v: Verbosity) {
    if let Some(text) = extract_text(raw) {
        if kind == EventKind::Text || !v.at_least(Verbosity::Debug) {
            out.text(text);
            return;
        }
    }
    if v.at_least(Verbosity::Debug) {
        let ctx = out.ctx;
        let type_name = raw.get("type").and_then(Value::as_str).unwrap_or("unknown");
        out.raw(&ctx.muted(&format!("[{type_name}]")));
        for line in json_lines(raw) {
            out.raw(&ctx.muted(&line));
        }
    }
}

/// Readable text out of a user message payload.
fn user_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => item.get("text").and_then(Value::as_str).map(str::to_string),
                    Some("tool_result") => match item.get("content") {
                        Some(Value::String(s)) => Some(s.clone()),
                        Some(other) => user_text(other),
                        None => None,
                    },
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        _ => None,
    }
}

fn seconds(ms: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let secs = ms as f64 / 1000.0;
    format!("{secs:.1}s")
}

/// Pretty-print JSON, capped at [`MAX_JSON_LINES`].
pub fn json_lines(value: &Value) -> Vec<String> {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    cap_lines(&pretty, MAX_JSON_LINES)
}

/// Split into lines, keeping at most `max` and noting how many were dropped.
pub fn cap_lines(text: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max {
        return lines.into_iter().map(str::to_string).collect();
    }
    let hidden = lines.len() - max;
    lines[..max]
        .iter()
        .map(|line| (*line).to_string())
        .chain(std::iter::once(format!("... ({hidden} more lines)")))
        .collect()
}

/// Line accumulator for one event block.
struct Block<'c> {
    ctx: &'c RenderContext,
    lines: Vec<String>,
}

impl<'c> Block<'c> {
    const fn new(ctx: &'c RenderContext) -> Self {
        Self {
            ctx,
            lines: Vec::new(),
        }
    }

    fn raw(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn heading(&mut self, label: &str, style: Style) {
        self.lines.push(self.ctx.paint(label, style));
    }

    fn detail(&mut self, text: &str) {
        self.lines.push(format!("{INDENT}{}", self.ctx.muted(text)));
    }

    fn text(&mut self, text: &str) {
        let rendered = smart_render(text, self.ctx);
        self.lines.extend(rendered.lines().map(str::to_string));
    }

    fn styled_text(&mut self, text: &str, style: Style) {
        let rendered = smart_render(text, self.ctx);
        self.lines
            .extend(rendered.lines().map(|line| self.ctx.paint(line, style)));
    }

    fn indented_text(&mut self, text: &str) {
        let rendered = smart_render(text, self.ctx);
        self.lines
            .extend(rendered.lines().map(|line| format!("{INDENT}{line}")));
    }

    fn capped(&mut self, text: &str) {
        self.lines.extend(
            cap_lines(text, MAX_JSON_LINES)
                .into_iter()
                .map(|line| format!("{INDENT}{line}")),
        );
    }

    fn json(&mut self, value: &Value) {
        let lines: Vec<String> = json_lines(value)
            .into_iter()
            .map(|line| format!("{INDENT}{}", self.ctx.muted(&line)))
            .collect();
        self.lines.extend(lines);
    }

    fn usage(&mut self, usage: Option<&Usage>) {
        let Some(usage) = usage else {
            return;
        };
        if let Some(input) = usage.input_tokens {
            let cached = usage
                .cache_read_input_tokens
                .filter(|n| *n > 0)
                .map(|n| format!(" ({n} from cache)"))
                .unwrap_or_default();
            self.detail(&format!("Input tokens: {input}{cached}"));
        }
        if let Some(output) = usage.output_tokens {
            self.detail(&format!("Output tokens: {output}"));
        }
        if let Some(created) = usage.cache_creation_input_tokens.filter(|n| *n > 0) {
            self.detail(&format!("Cache created: {created} tokens"));
        }
        if let Some(cache) = &usage.cache_creation {
            if let Some(n) = cache.ephemeral_5m_input_tokens.filter(|n| *n > 0) {
                self.detail(&format!("Ephemeral 5m cache: {n} tokens"));
            }
            if let Some(n) = cache.ephemeral_1h_input_tokens.filter(|n| *n > 0) {
                self.detail(&format!("Ephemeral 1h cache: {n} tokens"));
            }
        }
        if let Some(tier) = &usage.service_tier {
            self.detail(&format!("Service tier: {tier}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(v: Verbosity) -> RenderContext {
        RenderContext::plain().with_verbosity(v)
    }

    fn retry_error() -> StreamEvent {
        StreamEvent::Error {
            message: "Rate limited".into(),
            code: Some("429".into()),
            retry_after_seconds: Some(30),
            overloaded: false,
        }
    }

    #[test]
    fn test_retry_line_above_minimal() {
        for v in [Verbosity::Normal, Verbosity::Verbose, Verbosity::Debug] {
            let lines = format_event(&retry_error(), &ctx(v));
            assert!(lines.iter().any(|l| l.contains("Rate limited")), "{v}");
            assert!(lines.iter().any(|l| l.trim() == "retry after 30s"), "{v}");
        }
    }

    #[test]
    fn test_minimal_error_is_message_only() {
        let lines = format_event(&retry_error(), &ctx(Verbosity::Minimal));
        assert_eq!(lines, vec!["✗ Error: Rate limited".to_string()]);
    }

    #[test]
    fn test_lifecycle_hidden_below_verbose() {
        assert!(format_event(&StreamEvent::MessageStop, &ctx(Verbosity::Normal)).is_empty());
        assert!(!format_event(&StreamEvent::MessageStop, &ctx(Verbosity::Verbose)).is_empty());
        assert!(format_event(&StreamEvent::Ping, &ctx(Verbosity::Verbose)).is_empty());
        assert_eq!(format_event(&StreamEvent::Ping, &ctx(Verbosity::Debug)), vec!["• ping"]);
    }

    #[test]
    fn test_tool_use_input_at_normal() {
        let event = StreamEvent::ToolUse {
            name: "Read".into(),
            input: json!({"path": "a.rs"}),
        };
        assert_eq!(format_event(&event, &ctx(Verbosity::Minimal)), vec!["⚙ Tool Use: Read"]);
        let lines = format_event(&event, &ctx(Verbosity::Normal));
        assert!(lines.iter().any(|l| l.contains("\"path\": \"a.rs\"")));
    }

    #[test]
    fn test_result_detail_levels() {
        let event = StreamEvent::Result(Box::new(ResultSummary {
            subtype: "success".into(),
            duration_ms: 1500,
            num_turns: Some(2),
            cost_usd: Some(0.01234),
            usage: Some(Usage {
                input_tokens: Some(10),
                cache_read_input_tokens: Some(4),
                ..Usage::default()
            }),
            ..ResultSummary::default()
        }));
        assert_eq!(format_event(&event, &ctx(Verbosity::Minimal)), vec!["✓ Task Complete"]);

        let normal = format_event(&event, &ctx(Verbosity::Normal)).join("\n");
        assert!(normal.contains("Duration: 1.5s"));
        assert!(normal.contains("Cost: $0.0123"));
        assert!(!normal.contains("Input tokens"));

        let verbose = format_event(&event, &ctx(Verbosity::Verbose)).join("\n");
        assert!(verbose.contains("Input tokens: 10 (4 from cache)"));
    }

    #[test]
    fn test_unknown_with_text_renders_as_text() {
        let event = StreamEvent::plain_text("**hi** there");
        assert_eq!(format_event(&event, &ctx(Verbosity::Minimal)), vec!["HI there"]);

        let opaque = StreamEvent::Unknown { raw: json!({"type": "mystery", "n": 1}) };
        assert!(format_event(&opaque, &ctx(Verbosity::Verbose)).is_empty());
        let debug = format_event(&opaque, &ctx(Verbosity::Debug));
        assert_eq!(debug[0], "[mystery]");
    }

    #[test]
    fn test_json_cap() {
        let big: Vec<u32> = (0..100).collect();
        let lines = json_lines(&json!(big));
        assert_eq!(lines.len(), MAX_JSON_LINES + 1);
        assert_eq!(lines.last().unwrap(), "... (52 more lines)");
    }

    #[test]
    fn test_fragments() {
        let thinking = StreamEvent::ThinkingDelta { index: None, text: "hm".into() };
        assert_eq!(fragment(&thinking, &ctx(Verbosity::Normal)).as_deref(), Some("hm"));
        assert!(fragment(&thinking, &ctx(Verbosity::Minimal)).is_none());
        assert!(fragment(&StreamEvent::Ping, &ctx(Verbosity::Debug)).is_none());
    }

    #[test]
    fn test_user_message_text() {
        let event = StreamEvent::User {
            content: json!([{"type": "tool_result", "content": "ok"}]),
        };
        assert_eq!(format_event(&event, &ctx(Verbosity::Normal)), vec!["❯ User", "  ok"]);
    }
}
