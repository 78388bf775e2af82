//! Line decoding: newline-delimited JSON into [`StreamEvent`]s.
//!
//! Decoding never fails. Lines that are not JSON become plain text events,
//! and JSON objects whose shape is not recognised become
//! [`StreamEvent::Unknown`] with the raw value preserved.

use super::model::{AssistantBlock, BlockKind, ResultSummary, StreamEvent, Usage};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Wire shape of the events we know how to decode.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Wire {
    MessageStart {
        #[serde(default)]
        message: WireMessage,
    },
    ContentBlockStart {
        #[serde(default)]
        index: Option<u32>,
        #[serde(default)]
        content_block: Option<WireBlock>,
    },
    ContentBlockDelta {
        #[serde(default)]
        index: Option<u32>,
        delta: WireDelta,
    },
    ContentBlockStop {
        #[serde(default)]
        index: Option<u32>,
    },
    MessageDelta {
        #[serde(default)]
        delta: WireMessageDelta,
        #[serde(default)]
        usage: Option<Usage>,
    },
    MessageStop,
    Ping,
    #[serde(alias = "connection_error")]
    Error {
        #[serde(default)]
        error: Option<WireError>,
        #[serde(default)]
        message: Option<String>,
    },
    Result(WireResult),
    System(WireSystem),
    User {
        #[serde(default)]
        message: WireMessage,
    },
    Assistant {
        #[serde(default)]
        message: WireMessage,
    },
    ToolUse {
        #[serde(default, alias = "name")]
        tool_name: Option<String>,
        #[serde(default, alias = "parameters", alias = "input")]
        tool_input: Option<Value>,
    },
    ToolResult {
        #[serde(default, alias = "id")]
        tool_use_id: Option<String>,
        #[serde(default)]
        tool_result: Option<Value>,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        output: Option<Value>,
        #[serde(default)]
        is_error: Option<bool>,
        #[serde(default)]
        status: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct WireMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct WireBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    document: Option<WireDocument>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta {
        #[serde(default)]
        text: String,
    },
    InputJsonDelta {
        #[serde(default)]
        partial_json: String,
    },
    ThinkingDelta {
        #[serde(default, alias = "thinking")]
        text: String,
    },
    SignatureDelta {
        #[serde(default)]
        signature: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct WireMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireError {
    Text(String),
    Detail {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        code: Option<Value>,
        #[serde(default, alias = "retry_after_seconds", deserialize_with = "lenient_seconds")]
        retry_after: Option<u64>,
    },
}

/// Whole seconds from a number or numeric string, rounded up.
///
/// Anything else reads as absent so one odd field cannot hide the error.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let seconds = match &value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().and_then(whole_seconds)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().and_then(whole_seconds),
        _ => None,
    };
    Ok(seconds)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.ceil() as u64)
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    is_error: Option<bool>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    duration_api_ms: Option<u64>,
    #[serde(default)]
    num_turns: Option<u32>,
    #[serde(default, alias = "cost_usd")]
    total_cost_usd: Option<f64>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct WireSystem {
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    tools: Option<Vec<Value>>,
    #[serde(default)]
    mcp_servers: Option<Vec<Value>>,
    #[serde(default, rename = "permissionMode", alias = "permission_mode")]
    permission_mode: Option<String>,
}

/// Decode one line of producer output.
///
/// Returns `None` for blank lines. Any other input yields an event.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Some(decode_value(value)),
        _ => Some(StreamEvent::plain_text(line.trim_end_matches(['\r', '\n']))),
    }
}

/// Decode an already-parsed JSON value.
pub fn decode_value(value: Value) -> StreamEvent {
    let type_name = value.get("type").and_then(Value::as_str).unwrap_or_default();

    // Error flavours (`overloaded_error`, `rate_limit_error`, ...) share a shape.
    if type_name.ends_with("_error") && type_name != "connection_error" {
        let overloaded = type_name == "overloaded_error";
        return decode_error_flavour(&value, type_name, overloaded);
    }

    match Wire::deserialize(&value) {
        Ok(wire) => from_wire(wire).unwrap_or(StreamEvent::Unknown { raw: value }),
        Err(_) => StreamEvent::Unknown { raw: value },
    }
}

fn from_wire(wire: Wire) -> Option<StreamEvent> {
    let event = match wire {
        Wire::MessageStart { message } => StreamEvent::MessageStart {
            id: message.id,
            model: message.model,
            usage: message.usage,
        },
        Wire::ContentBlockStart { index, content_block } => StreamEvent::ContentBlockStart {
            index,
            block_kind: content_block.map_or(BlockKind::Text, block_kind),
        },
        Wire::ContentBlockDelta { index, delta } => match delta {
            WireDelta::TextDelta { text } => StreamEvent::TextDelta { index, text },
            WireDelta::InputJsonDelta { partial_json } => {
                StreamEvent::ToolInputDelta { index, partial_json }
            }
            WireDelta::ThinkingDelta { text } => StreamEvent::ThinkingDelta { index, text },
            WireDelta::SignatureDelta { signature } => StreamEvent::SignatureDelta { signature },
        },
        Wire::ContentBlockStop { index } => StreamEvent::ContentBlockStop { index },
        Wire::MessageDelta { delta, usage } => StreamEvent::MessageDelta {
            stop_reason: delta.stop_reason,
            usage: delta.usage.or(usage),
        },
        Wire::MessageStop => StreamEvent::MessageStop,
        Wire::Ping => StreamEvent::Ping,
        Wire::Error { error, message } => error_event(error, message, false),
        Wire::Result(result) => StreamEvent::Result(Box::new(ResultSummary {
            is_error: result.is_error.unwrap_or(false)
                || result.subtype.as_deref() == Some("error"),
            subtype: result.subtype.unwrap_or_default(),
            duration_ms: result.duration_ms.unwrap_or(0),
            duration_api_ms: result.duration_api_ms,
            num_turns: result.num_turns,
            cost_usd: result.total_cost_usd,
            result_text: result.result,
            session_id: result.session_id,
            usage: result.usage,
        })),
        Wire::System(system) => {
            if system.subtype.as_deref().is_some_and(|s| s != "init") {
                return None;
            }
            StreamEvent::SystemInit {
                model: system.model.unwrap_or_default(),
                cwd: system.cwd.unwrap_or_default(),
                tool_count: system.tools.map_or(0, |tools| tools.len()),
                mcp_server_count: system.mcp_servers.map_or(0, |servers| servers.len()),
                permission_mode: system.permission_mode,
            }
        }
        Wire::User { message } => StreamEvent::User {
            content: message.content.unwrap_or(Value::Null),
        },
        Wire::Assistant { message } => StreamEvent::Assistant {
            blocks: message
                .content
                .as_ref()
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(assistant_block).collect())
                .unwrap_or_default(),
            usage: message.usage,
        },
        Wire::ToolUse { tool_name, tool_input } => StreamEvent::ToolUse {
            name: tool_name.unwrap_or_else(|| "unknown".to_string()),
            input: tool_input.unwrap_or(Value::Null),
        },
        Wire::ToolResult {
            tool_use_id,
            tool_result,
            content,
            output,
            is_error,
            status,
        } => StreamEvent::ToolResult {
            id: tool_use_id,
            output: tool_result
                .or(content)
                .or(output)
                .map(|value| output_text(&value))
                .unwrap_or_default(),
            is_error: is_error.unwrap_or(false) || status.as_deref() == Some("error"),
        },
    };
    Some(event)
}

fn block_kind(block: WireBlock) -> BlockKind {
    match block.kind.as_str() {
        "text" => BlockKind::Text,
        "thinking" => BlockKind::Thinking,
        "redacted_thinking" => BlockKind::RedactedThinking,
        "tool_use" => BlockKind::ToolUse {
            name: block.name.unwrap_or_default(),
        },
        "server_tool_use" => BlockKind::ServerToolUse {
            name: block.name.unwrap_or_default(),
        },
        "tool_result" => BlockKind::ToolResult,
        "image" => BlockKind::Image,
        "document" => BlockKind::Document {
            name: block.document.and_then(|doc| doc.name),
        },
        "web_search" => BlockKind::WebSearch,
        _ => BlockKind::Other(block.kind),
    }
}

fn assistant_block(item: &Value) -> Option<AssistantBlock> {
    match item.get("type").and_then(Value::as_str)? {
        "text" => Some(AssistantBlock::Text(str_field(item, "text")?.to_string())),
        "thinking" => {
            let text = str_field(item, "thinking").or_else(|| str_field(item, "text"))?;
            Some(AssistantBlock::Thinking(text.to_string()))
        }
        "tool_use" => Some(AssistantBlock::ToolUse {
            name: str_field(item, "name").unwrap_or("unknown").to_string(),
            input: item.get("input").cloned().unwrap_or(Value::Null),
        }),
        _ => None,
    }
}

fn decode_error_flavour(value: &Value, type_name: &str, overloaded: bool) -> StreamEvent {
    let error = value
        .get("error")
        .and_then(|raw| WireError::deserialize(raw).ok());
    let message = str_field(value, "message").map(str::to_string);
    match error_event(error, message, overloaded) {
        StreamEvent::Error {
            message,
            code,
            retry_after_seconds,
            overloaded,
        } if message == UNKNOWN_ERROR => StreamEvent::Error {
            message: format!("Stream error: {type_name}"),
            code,
            retry_after_seconds,
            overloaded,
        },
        event => event,
    }
}

const UNKNOWN_ERROR: &str = "Unknown error occurred";

fn error_event(error: Option<WireError>, message: Option<String>, overloaded: bool) -> StreamEvent {
    match error {
        Some(WireError::Text(text)) => StreamEvent::Error {
            message: text,
            code: None,
            retry_after_seconds: None,
            overloaded,
        },
        Some(WireError::Detail {
            kind,
            message: detail,
            code,
            retry_after,
        }) => StreamEvent::Error {
            message: detail
                .or(message)
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            code: code.map(|code| match code {
                Value::String(s) => s,
                other => other.to_string(),
            }),
            retry_after_seconds: retry_after,
            overloaded: overloaded || kind.as_deref() == Some("overloaded_error"),
        },
        None => StreamEvent::Error {
            message: message.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            code: None,
            retry_after_seconds: None,
            overloaded,
        },
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn output_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Best-effort extraction of human-readable text from an unrecognised event.
///
/// Looks at, in order: `text`, `content`, `message`, `result`, `delta.text`,
/// `message.content`, `error.message`. Returns the first non-empty string found.
pub fn extract_text(raw: &Value) -> Option<&str> {
    const TOP_LEVEL: [&str; 4] = ["text", "content", "message", "result"];

    TOP_LEVEL
        .iter()
        .filter_map(|key| str_field(raw, key))
        .chain(raw.get("delta").and_then(|delta| str_field(delta, "text")))
        .chain(raw.get("message").and_then(|message| str_field(message, "content")))
        .chain(raw.get("error").and_then(|error| str_field(error, "message")))
        .find(|text| !text.trim().is_empty())
}

/// Splits a byte stream into complete lines.
///
/// Partial trailing data is kept until the next chunk or [`LineSplitter::finish`].
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Create an empty splitter.
    pub const fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Feed a chunk and return every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Return the unterminated trailing line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_blank_lines_are_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   \t").is_none());
    }

    #[test]
    fn test_non_json_becomes_text() {
        let event = parse_line("plain output").unwrap();
        assert_eq!(event.kind(), EventKind::Text);
        let StreamEvent::Unknown { raw } = &event else {
            panic!("expected fallback event");
        };
        assert_eq!(extract_text(raw), Some("plain output"));
    }

    #[test]
    fn test_text_delta() {
        let event = parse_line(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
        )
        .unwrap();
        assert_eq!(event, StreamEvent::TextDelta { index: Some(0), text: "Hi".into() });
    }

    #[test]
    fn test_thinking_delta_accepts_thinking_field() {
        let event = parse_line(
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#,
        )
        .unwrap();
        assert_eq!(event, StreamEvent::ThinkingDelta { index: Some(1), text: "hmm".into() });
    }

    #[test]
    fn test_error_with_retry_after() {
        let event = parse_line(
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down","code":429,"retry_after":30}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Error {
                message: "slow down".into(),
                code: Some("429".into()),
                retry_after_seconds: Some(30),
                overloaded: false,
            }
        );
    }

    #[test]
    fn test_fractional_retry_after_rounds_up() {
        let event = parse_line(
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"Rate limited","retry_after":1.5}}"#,
        )
        .unwrap();
        let StreamEvent::Error { message, retry_after_seconds, .. } = event else {
            panic!("expected error, got {event:?}");
        };
        assert_eq!(message, "Rate limited");
        assert_eq!(retry_after_seconds, Some(2));
    }

    #[test]
    fn test_odd_retry_after_shapes() {
        let seconds = |raw: &str| match parse_line(raw).unwrap() {
            StreamEvent::Error { retry_after_seconds, .. } => retry_after_seconds,
            other => panic!("expected error, got {other:?}"),
        };
        assert_eq!(
            seconds(r#"{"type":"error","error":{"message":"m","retry_after":"30"}}"#),
            Some(30)
        );
        assert_eq!(
            seconds(r#"{"type":"error","error":{"message":"m","retry_after_seconds":-1}}"#),
            None
        );
        assert_eq!(
            seconds(r#"{"type":"error","error":{"message":"m","retry_after":{"s":1}}}"#),
            None
        );
    }

    #[test]
    fn test_overloaded_flavour() {
        let event = parse_line(r#"{"type":"overloaded_error"}"#).unwrap();
        match event {
            StreamEvent::Error { message, overloaded, .. } => {
                assert!(overloaded);
                assert_eq!(message, "Stream error: overloaded_error");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_result_summary() {
        let event = parse_line(
            r#"{"type":"result","subtype":"success","duration_ms":1500,"num_turns":3,"total_cost_usd":0.0123,"result":"Done"}"#,
        )
        .unwrap();
        let StreamEvent::Result(summary) = event else {
            panic!("expected result");
        };
        assert!(summary.succeeded());
        assert_eq!(summary.duration_ms, 1500);
        assert_eq!(summary.num_turns, Some(3));
        assert_eq!(summary.result_text.as_deref(), Some("Done"));
    }

    #[test]
    fn test_system_init_counts_tools() {
        let event = parse_line(
            r#"{"type":"system","subtype":"init","model":"m","cwd":"/w","tools":["a","b"],"mcp_servers":[]}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::SystemInit {
                model: "m".into(),
                cwd: "/w".into(),
                tool_count: 2,
                mcp_server_count: 0,
                permission_mode: None,
            }
        );
    }

    #[test]
    fn test_unrecognised_shape_keeps_raw() {
        let event = parse_line(r#"{"type":"search_result_start","foo":1}"#).unwrap();
        assert!(matches!(event, StreamEvent::Unknown { .. }));
        assert_eq!(event.kind(), EventKind::Unknown);
    }

    #[test]
    fn test_tool_result_json_output_is_pretty() {
        let event = parse_line(
            r#"{"type":"tool_result","tool_use_id":"toolu_1","tool_result":{"ok":true},"is_error":false}"#,
        )
        .unwrap();
        let StreamEvent::ToolResult { id, output, is_error } = event else {
            panic!("expected tool result");
        };
        assert_eq!(id.as_deref(), Some("toolu_1"));
        assert!(output.contains("\"ok\": true"));
        assert!(!is_error);
    }

    #[test]
    fn test_assistant_message_blocks() {
        let event = parse_line(
            r#"{"type":"assistant","message":{"content":[{"type":"text","text":"hi"},{"type":"tool_use","name":"Read","input":{"path":"a"}}]}}"#,
        )
        .unwrap();
        let StreamEvent::Assistant { blocks, .. } = event else {
            panic!("expected assistant");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], AssistantBlock::Text("hi".into()));
    }

    #[test]
    fn test_extract_text_order() {
        let raw = serde_json::json!({"type": "x", "delta": {"text": "from delta"}});
        assert_eq!(extract_text(&raw), Some("from delta"));
        let raw = serde_json::json!({"type": "x", "result": "r", "text": "  "});
        assert_eq!(extract_text(&raw), Some("r"));
        assert_eq!(extract_text(&serde_json::json!({"type": "x"})), None);
    }

    #[test]
    fn test_extract_text_reads_error_message() {
        let raw = serde_json::json!({"type": "x", "error": {"message": "bad gateway"}});
        assert_eq!(extract_text(&raw), Some("bad gateway"));
    }

    #[test]
    fn test_line_splitter_keeps_partial() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"{\"a\":1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(splitter.push(b":2}\r\ntail"), vec!["{\"b\":2}".to_string()]);
        assert_eq!(splitter.finish(), Some("tail".to_string()));
        assert_eq!(splitter.finish(), None);
    }
}
