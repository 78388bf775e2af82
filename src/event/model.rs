//! The decoded event model.
//!
//! These types define the protocol between the line decoder and the rest of
//! the engine. Every event is immutable once built; the stream buffer takes
//! ownership on ingest.

use super::kind::EventKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Token accounting attached to message and result events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens billed.
    #[serde(default)]
    pub input_tokens: Option<u64>,
    /// Completion tokens billed.
    #[serde(default)]
    pub output_tokens: Option<u64>,
    /// Tokens written to the prompt cache.
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u64>,
    /// Tokens served from the prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: Option<u64>,
    /// Cache creation split by lifetime.
    #[serde(default)]
    pub cache_creation: Option<CacheCreation>,
    /// Service tier (`standard`, `priority`, `batch`).
    #[serde(default)]
    pub service_tier: Option<String>,
}

/// Cache creation breakdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheCreation {
    /// Five minute ephemeral cache tokens.
    #[serde(default)]
    pub ephemeral_5m_input_tokens: Option<u64>,
    /// One hour ephemeral cache tokens.
    #[serde(default)]
    pub ephemeral_1h_input_tokens: Option<u64>,
}

impl Usage {
    /// Total input tokens including both cache directions.
    pub fn total_input(&self) -> u64 {
        self.input_tokens.unwrap_or(0)
            + self.cache_creation_input_tokens.unwrap_or(0)
            + self.cache_read_input_tokens.unwrap_or(0)
    }
}

/// What kind of content block a `content_block_start` opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Plain assistant text.
    Text,
    /// Extended thinking.
    Thinking,
    /// Thinking that the producer redacted.
    RedactedThinking,
    /// A client tool call.
    ToolUse {
        /// Tool name.
        name: String,
    },
    /// A server-side tool call.
    ServerToolUse {
        /// Tool name.
        name: String,
    },
    /// A tool result block.
    ToolResult,
    /// An image attachment.
    Image,
    /// A document attachment.
    Document {
        /// Document name, when given.
        name: Option<String>,
    },
    /// A web search block.
    WebSearch,
    /// Anything not listed above.
    Other(String),
}

impl BlockKind {
    /// Whether this block carries a tool invocation.
    pub const fn is_tool(&self) -> bool {
        matches!(self, Self::ToolUse { .. } | Self::ServerToolUse { .. })
    }
}

/// One block of a complete assistant message.
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantBlock {
    /// Text content.
    Text(String),
    /// Thinking content.
    Thinking(String),
    /// A tool call.
    ToolUse {
        /// Tool name.
        name: String,
        /// Tool arguments.
        input: Value,
    },
}

/// Completion summary emitted once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    /// Result subtype (`success`, `error`, ...).
    pub subtype: String,
    /// Whether the run failed.
    pub is_error: bool,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// Time spent waiting on the API.
    pub duration_api_ms: Option<u64>,
    /// Number of conversation turns.
    pub num_turns: Option<u32>,
    /// Total cost in US dollars.
    pub cost_usd: Option<f64>,
    /// Final result text.
    pub result_text: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Aggregate usage.
    pub usage: Option<Usage>,
}

impl ResultSummary {
    /// Whether this summary reports success.
    pub fn succeeded(&self) -> bool {
        !self.is_error && (self.subtype.is_empty() || self.subtype == "success")
    }
}

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A message began.
    MessageStart {
        /// Message identifier.
        id: Option<String>,
        /// Model name.
        model: Option<String>,
        /// Initial usage.
        usage: Option<Usage>,
    },
    /// A content block began.
    ContentBlockStart {
        /// Block index within the message.
        index: Option<u32>,
        /// What the block contains.
        block_kind: BlockKind,
    },
    /// Incremental assistant text.
    TextDelta {
        /// Block index within the message.
        index: Option<u32>,
        /// Text fragment.
        text: String,
    },
    /// Incremental tool input JSON.
    ToolInputDelta {
        /// Block index within the message.
        index: Option<u32>,
        /// Partial JSON fragment.
        partial_json: String,
    },
    /// Incremental thinking text.
    ThinkingDelta {
        /// Block index within the message.
        index: Option<u32>,
        /// Thinking fragment.
        text: String,
    },
    /// Thinking signature.
    SignatureDelta {
        /// Signature payload.
        signature: String,
    },
    /// A content block ended.
    ContentBlockStop {
        /// Block index within the message.
        index: Option<u32>,
    },
    /// Message-level update.
    MessageDelta {
        /// Why generation stopped.
        stop_reason: Option<String>,
        /// Updated usage.
        usage: Option<Usage>,
    },
    /// A message ended.
    MessageStop,
    /// Keep-alive.
    Ping,
    /// An error reported by the producer.
    Error {
        /// Human readable message.
        message: String,
        /// Error code, when given.
        code: Option<String>,
        /// Suggested wait before retrying.
        retry_after_seconds: Option<u64>,
        /// Whether the producer reported overload.
        overloaded: bool,
    },
    /// A complete tool call.
    ToolUse {
        /// Tool name.
        name: String,
        /// Tool arguments.
        input: Value,
    },
    /// A tool's output.
    ToolResult {
        /// Id of the originating tool call.
        id: Option<String>,
        /// Output text (JSON outputs are pretty-printed).
        output: String,
        /// Whether the tool failed.
        is_error: bool,
    },
    /// Completion summary.
    Result(Box<ResultSummary>),
    /// Session initialisation.
    SystemInit {
        /// Model name.
        model: String,
        /// Working directory.
        cwd: String,
        /// Number of tools available.
        tool_count: usize,
        /// Number of connected MCP servers.
        mcp_server_count: usize,
        /// Permission mode, when given.
        permission_mode: Option<String>,
    },
    /// A complete user message.
    User {
        /// Message content as sent.
        content: Value,
    },
    /// A complete assistant message.
    Assistant {
        /// Content blocks.
        blocks: Vec<AssistantBlock>,
        /// Usage for this message.
        usage: Option<Usage>,
    },
    /// Anything that could not be decoded into a known shape.
    Unknown {
        /// The raw JSON value (non-JSON lines are wrapped as `{"type":"text"}`).
        raw: Value,
    },
}

impl StreamEvent {
    /// Build a plain text event from a line that was not JSON.
    pub fn plain_text(line: &str) -> Self {
        Self::Unknown {
            raw: serde_json::json!({ "type": "text", "content": line }),
        }
    }

    /// The wire kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageStart { .. } => EventKind::MessageStart,
            Self::ContentBlockStart { .. } => EventKind::ContentBlockStart,
            Self::TextDelta { .. }
            | Self::ToolInputDelta { .. }
            | Self::ThinkingDelta { .. }
            | Self::SignatureDelta { .. } => EventKind::ContentBlockDelta,
            Self::ContentBlockStop { .. } => EventKind::ContentBlockStop,
            Self::MessageDelta { .. } => EventKind::MessageDelta,
            Self::MessageStop => EventKind::MessageStop,
            Self::Ping => EventKind::Ping,
            Self::Error { .. } => EventKind::Error,
            Self::ToolUse { .. } => EventKind::ToolUse,
            Self::ToolResult { .. } => EventKind::ToolResult,
            Self::Result(_) => EventKind::Result,
            Self::SystemInit { .. } => EventKind::System,
            Self::User { .. } => EventKind::User,
            Self::Assistant { .. } => EventKind::Assistant,
            Self::Unknown { raw } => raw
                .get("type")
                .and_then(Value::as_str)
                .and_then(EventKind::from_wire)
                .unwrap_or(EventKind::Unknown),
        }
    }

    /// Whether this is an incremental assistant text fragment.
    #[inline]
    pub const fn is_text_delta(&self) -> bool {
        matches!(self, Self::TextDelta { .. })
    }

    /// The text of a `TextDelta`, if this is one.
    pub fn delta_text(&self) -> Option<&str> {
        match self {
            Self::TextDelta { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Mutable access to every text payload the event carries.
    ///
    /// Used by the buffer's truncation policy. JSON payloads contribute each
    /// string value except their `type` tags.
    pub(crate) fn text_payloads_mut(&mut self) -> Vec<&mut String> {
        let mut payloads = Vec::new();
        match self {
            Self::TextDelta { text, .. } | Self::ThinkingDelta { text, .. } => payloads.push(text),
            Self::ToolResult { output, .. } => payloads.push(output),
            Self::Result(summary) => payloads.extend(summary.result_text.as_mut()),
            Self::Assistant { blocks, .. } => {
                for block in blocks {
                    if let AssistantBlock::Text(text) | AssistantBlock::Thinking(text) = block {
                        payloads.push(text);
                    }
                }
            }
            Self::User { content } => json_strings_mut(content, &mut payloads),
            Self::Unknown { raw } => json_strings_mut(raw, &mut payloads),
            _ => {}
        }
        payloads
    }

    /// Rough heap footprint in bytes, for memory statistics.
    pub fn estimated_bytes(&self) -> usize {
        const BASE: usize = std::mem::size_of::<StreamEvent>();
        let payload = match self {
            Self::MessageStart { id, model, .. } => opt_len(id.as_ref()) + opt_len(model.as_ref()),
            Self::ContentBlockStart { block_kind, .. } => match block_kind {
                BlockKind::ToolUse { name } | BlockKind::ServerToolUse { name } => name.len(),
                BlockKind::Document { name } => opt_len(name.as_ref()),
                BlockKind::Other(name) => name.len(),
                _ => 0,
            },
            Self::TextDelta { text, .. } | Self::ThinkingDelta { text, .. } => text.len(),
            Self::ToolInputDelta { partial_json, .. } => partial_json.len(),
            Self::SignatureDelta { signature } => signature.len(),
            Self::MessageDelta { stop_reason, .. } => opt_len(stop_reason.as_ref()),
            Self::Error { message, code, .. } => message.len() + opt_len(code.as_ref()),
            Self::ToolUse { name, input } => name.len() + json_len(input),
            Self::ToolResult { id, output, .. } => opt_len(id.as_ref()) + output.len(),
            Self::Result(summary) => {
                std::mem::size_of::<ResultSummary>()
                    + summary.subtype.len()
                    + opt_len(summary.result_text.as_ref())
                    + opt_len(summary.session_id.as_ref())
            }
            Self::SystemInit { model, cwd, .. } => model.len() + cwd.len(),
            Self::User { content } => json_len(content),
            Self::Assistant { blocks, .. } => blocks
                .iter()
                .map(|block| match block {
                    AssistantBlock::Text(text) | AssistantBlock::Thinking(text) => text.len(),
                    AssistantBlock::ToolUse { name, input } => name.len() + json_len(input),
                })
                .sum(),
            Self::Unknown { raw } => json_len(raw),
            Self::ContentBlockStop { .. } | Self::MessageStop | Self::Ping => 0,
        };
        BASE + payload
    }

    /// Structural fingerprint used as a cache key.
    ///
    /// Equal events always produce equal fingerprints.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        std::mem::discriminant(self).hash(&mut hasher);
        match self {
            Self::MessageStart { id, model, usage } => {
                (id, model, usage).hash(&mut hasher);
            }
            Self::ContentBlockStart { index, block_kind } => (index, block_kind).hash(&mut hasher),
            Self::TextDelta { index, text } | Self::ThinkingDelta { index, text } => {
                (index, text).hash(&mut hasher);
            }
            Self::ToolInputDelta { index, partial_json } => (index, partial_json).hash(&mut hasher),
            Self::SignatureDelta { signature } => signature.hash(&mut hasher),
            Self::ContentBlockStop { index } => index.hash(&mut hasher),
            Self::MessageDelta { stop_reason, usage } => (stop_reason, usage).hash(&mut hasher),
            Self::MessageStop | Self::Ping => {}
            Self::Error {
                message,
                code,
                retry_after_seconds,
                overloaded,
            } => (message, code, retry_after_seconds, overloaded).hash(&mut hasher),
            Self::ToolUse { name, input } => {
                name.hash(&mut hasher);
                input.to_string().hash(&mut hasher);
            }
            Self::ToolResult { id, output, is_error } => (id, output, is_error).hash(&mut hasher),
            Self::Result(summary) => {
                (
                    &summary.subtype,
                    summary.is_error,
                    summary.duration_ms,
                    summary.duration_api_ms,
                    summary.num_turns,
                    &summary.result_text,
                    &summary.session_id,
                    &summary.usage,
                )
                    .hash(&mut hasher);
                summary.cost_usd.map(f64::to_bits).hash(&mut hasher);
            }
            Self::SystemInit {
                model,
                cwd,
                tool_count,
                mcp_server_count,
                permission_mode,
            } => (model, cwd, tool_count, mcp_server_count, permission_mode).hash(&mut hasher),
            Self::User { content } => content.to_string().hash(&mut hasher),
            Self::Assistant { blocks, usage } => {
                for block in blocks {
                    match block {
                        AssistantBlock::Text(text) => (0u8, text).hash(&mut hasher),
                        AssistantBlock::Thinking(text) => (1u8, text).hash(&mut hasher),
                        AssistantBlock::ToolUse { name, input } => {
                            (2u8, name, input.to_string()).hash(&mut hasher);
                        }
                    }
                }
                usage.hash(&mut hasher);
            }
            Self::Unknown { raw } => raw.to_string().hash(&mut hasher),
        }
        hasher.finish()
    }
}

fn opt_len(value: Option<&String>) -> usize {
    value.map_or(0, String::len)
}

fn json_strings_mut<'a>(value: &'a mut Value, out: &mut Vec<&'a mut String>) {
    match value {
        Value::String(text) => out.push(text),
        Value::Array(items) => {
            for item in items {
                json_strings_mut(item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if key != "type" {
                    json_strings_mut(item, out);
                }
            }
        }
        _ => {}
    }
}

fn json_len(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => 8,
        Value::String(s) => s.len(),
        Value::Array(items) => items.iter().map(json_len).sum::<usize>() + 2,
        Value::Object(map) => map.iter().map(|(k, v)| k.len() + json_len(v)).sum::<usize>() + 2,
    }
}
