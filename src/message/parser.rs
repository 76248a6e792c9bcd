//! Message classifier for Codex JSON events
//!
//! Codex emits events with no stable schema across versions. The classifier
//! here is total and best-effort: every JSON object is mapped to exactly one
//! [`Message`] variant through a priority-ordered rule chain, and the raw
//! frame is always preserved on the result.

use serde_json::Value;

use crate::error::{CodexError, Result};
use crate::types::messages::Message;

/// Event types that mark the end of a turn
pub const FINAL_TYPES: &[&str] = &[
    "result",
    "final",
    "done",
    "completed",
    "response.completed",
    "response.done",
    "response.final",
    "turn.completed",
];

/// Status strings that mark the end of a turn
pub const FINAL_STATUSES: &[&str] = &[
    "completed",
    "done",
    "finished",
    "succeeded",
    "success",
    "failed",
    "error",
    "cancelled",
];

/// Event types classified as errors
pub const ERROR_TYPES: &[&str] = &["error", "response.error"];

/// Item types classified as conversational messages
pub const ITEM_MESSAGE_TYPES: &[&str] = &[
    "agent_message",
    "assistant_message",
    "assistant_message_delta",
    "assistant_message_chunk",
    "assistant_message_final",
    "reasoning",
    "thinking",
    "user_message",
];

/// Item types classified as tool activity
pub const ITEM_TOOL_TYPES: &[&str] = &[
    "command_execution",
    "commandExecution",
    "tool_call",
    "toolCall",
    "tool_result",
    "toolResult",
    "fileChange",
    "mcpToolCall",
    "webSearch",
    "imageView",
    "collabAgentToolCall",
];

/// Substrings that mark an event type as log-like
pub const LOG_TOKENS: &[&str] = &["log", "stdout", "stderr", "console"];

/// Item types whose role defaults to `assistant`
const ASSISTANT_ITEM_TYPES: &[&str] = &[
    "agent_message",
    "assistant_message",
    "assistant_message_delta",
    "assistant_message_chunk",
    "assistant_message_final",
    "reasoning",
    "thinking",
];

/// Raw event type: the first string among `type`, `event`, `kind`
#[must_use]
pub fn raw_type(raw: &Value) -> Option<&str> {
    for key in ["type", "event", "kind"] {
        if let Some(value) = raw.get(key).and_then(Value::as_str) {
            return Some(value);
        }
    }
    None
}

/// Session/thread id: the first string among the known id keys
#[must_use]
pub fn extract_session_id(raw: &Value) -> Option<String> {
    for key in [
        "session_id",
        "sessionId",
        "session",
        "conversation_id",
        "conversationId",
        "thread_id",
        "threadId",
    ] {
        if let Some(value) = raw.get(key).and_then(Value::as_str) {
            return Some(value.to_string());
        }
    }
    None
}

/// Recursively extract display text from a content value
///
/// Strings pass through; objects yield their `text` field or recurse into
/// `content`; arrays concatenate the text of their elements.
#[must_use]
pub fn extract_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            if let Some(text) = obj.get("text").and_then(Value::as_str) {
                return Some(text.to_string());
            }
            obj.get("content").and_then(extract_text)
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(extract_text)
                .filter(|part| !part.is_empty())
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.concat())
            }
        }
        _ => None,
    }
}

fn is_log_type(raw_type: Option<&str>) -> bool {
    raw_type.map_or(false, |t| LOG_TOKENS.iter().any(|token| t.contains(token)))
}

fn first_text(raw: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = raw.get(*key) {
            if let Some(text) = extract_text(value) {
                return Some(text);
            }
        }
    }
    None
}

fn first_value<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(value) = raw.get(*key) {
            if !value.is_null() {
                return Some(value);
            }
        }
    }
    None
}

/// Classify a raw JSON event into a [`Message`]
///
/// # Errors
/// Returns `MessageParse` if the value is not a JSON object. Objects never
/// fail: anything unrecognized falls through to [`Message::Raw`].
pub fn parse_message(data: Value) -> Result<Message> {
    if !data.is_object() {
        return Err(CodexError::message_parse(
            format!("Invalid message data type (expected object, got {data})"),
            Some(data),
        ));
    }

    let rt = raw_type(&data).map(str::to_string);
    let status = data.get("status").and_then(Value::as_str).map(str::to_string);
    let session_id = extract_session_id(&data);

    // Error detection
    if rt.as_deref().map_or(false, |t| ERROR_TYPES.contains(&t))
        || matches!(status.as_deref(), Some("error" | "failed"))
        || data.get("error").is_some()
    {
        let error = match data.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(Value::Object(obj.clone()).to_string())),
            _ => first_value(&data, &["error_message", "errorMessage"])
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        return Ok(Message::Error {
            event_type: rt.clone(),
            error,
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    // Thread/turn lifecycle
    if let Some(ref t) = rt {
        if t.starts_with("thread.") {
            return Ok(Message::Thread {
                event_type: t.clone(),
                status,
                session_id,
                raw: data,
            });
        }
        if t.starts_with("turn.") {
            return Ok(Message::Turn {
                event_type: rt.clone(),
                status,
                session_id,
                raw: data,
            });
        }
    }

    // Log-like events
    if is_log_type(rt.as_deref()) {
        let text = first_text(&data, &["message", "text", "content", "log"]);
        return Ok(Message::Log {
            event_type: rt.clone(),
            text,
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    // item.* events carrying an item object
    if matches!(rt.as_deref(), Some("item.completed" | "item.started")) {
        if let Some(item) = data.get("item").filter(|i| i.is_object()) {
            return Ok(classify_item(&data, item, rt, status, session_id));
        }
    }

    // Best-effort tool detection
    let mut tool_name: Option<String> = None;
    let mut tool_input: Option<Value> = None;
    let mut tool_output: Option<Value> = None;

    if rt.as_deref().map_or(false, |t| t.contains("tool")) {
        tool_name = first_value(&data, &["tool_name", "toolName", "name"])
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if let Some(tool_block) = data.get("tool").filter(|t| t.is_object()) {
        if tool_name.is_none() {
            tool_name = tool_block
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        tool_input = first_value(tool_block, &["input", "arguments"]).cloned();
        tool_output = first_value(tool_block, &["output", "result"]).cloned();
    }
    if tool_name.is_none() {
        tool_name = first_value(&data, &["tool_name", "toolName"])
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    if tool_input.is_none() {
        tool_input =
            first_value(&data, &["tool_input", "toolInput", "input", "arguments", "params"])
                .cloned();
    }
    if tool_output.is_none() {
        tool_output = first_value(&data, &["tool_output", "toolOutput", "output", "result"])
            .cloned();
    }

    if tool_name.is_some() || tool_input.is_some() || tool_output.is_some() {
        return Ok(Message::Tool {
            event_type: rt.clone(),
            item_type: None,
            tool_name,
            tool_input: tool_input.filter(Value::is_object),
            tool_output,
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    // Role-bearing message shapes
    let mut role = data.get("role").and_then(Value::as_str).map(str::to_string);
    let mut content = data.get("content").cloned();
    if let Some(message_block) = data.get("message").filter(|m| m.is_object()) {
        if role.is_none() {
            role = message_block
                .get("role")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        if content.is_none() {
            content = message_block.get("content").cloned();
        }
    }

    if let Some(role) = role {
        let text = content.as_ref().and_then(extract_text);
        return Ok(Message::Item {
            event_type: rt.clone(),
            item_type: None,
            role: Some(role),
            text,
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    // Delta shapes
    if rt.as_deref().map_or(false, |t| t.contains("delta")) || data.get("delta").is_some() {
        let delta = first_value(&data, &["delta", "text"]);
        let text = delta.and_then(extract_text);
        return Ok(Message::Item {
            event_type: rt.clone(),
            item_type: Some("delta".to_string()),
            role: None,
            text,
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    // Completion shapes without a turn.* type
    if rt.as_deref().map_or(false, |t| FINAL_TYPES.contains(&t))
        || data.get("final").and_then(Value::as_bool) == Some(true)
    {
        return Ok(Message::Turn {
            event_type: rt.clone(),
            status: status.or(rt),
            session_id,
            raw: data,
        });
    }

    if rt.is_none() && status.as_deref().map_or(false, |s| FINAL_STATUSES.contains(&s)) {
        return Ok(Message::Turn {
            event_type: None,
            status,
            session_id,
            raw: data,
        });
    }

    Ok(Message::Raw {
        event_type: rt,
        status,
        session_id,
        raw: data,
    })
}

/// Classify the `item` payload of an `item.*` event
fn classify_item(
    data: &Value,
    item: &Value,
    rt: Option<String>,
    status: Option<String>,
    session_id: Option<String>,
) -> Message {
    let item_type = first_value(item, &["type", "itemType"])
        .and_then(Value::as_str)
        .map(str::to_string);
    let item_status = item.get("status").and_then(Value::as_str).map(str::to_string);
    let role = item.get("role").and_then(Value::as_str).map(str::to_string);

    let effective_status = item_status.or(status).or_else(|| rt.clone());

    let is_message_item = item_type
        .as_deref()
        .map_or(false, |t| ITEM_MESSAGE_TYPES.contains(&t))
        || item.get("text").is_some()
        || item.get("content").is_some();

    if is_message_item {
        let inferred_role = role.or_else(|| match item_type.as_deref() {
            Some(t) if ASSISTANT_ITEM_TYPES.contains(&t) => Some("assistant".to_string()),
            Some("user_message") => Some("user".to_string()),
            _ => None,
        });
        return Message::Item {
            event_type: rt,
            item_type,
            role: inferred_role,
            text: first_text(item, &["text", "content"]),
            status: effective_status,
            session_id,
            raw: data.clone(),
        };
    }

    let is_tool_item = item_type.as_deref().map_or(false, |t| {
        ITEM_TOOL_TYPES.contains(&t) || t.contains("tool")
    });

    if is_tool_item {
        let tool_name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| item_type.clone());
        let tool_input = match item.get("input").filter(|i| i.is_object()) {
            Some(input) => Some(input.clone()),
            None => {
                let mut synthesized = serde_json::Map::new();
                for key in ["command", "args"] {
                    if let Some(value) = item.get(key) {
                        if !value.is_null() {
                            synthesized.insert(key.to_string(), value.clone());
                        }
                    }
                }
                if synthesized.is_empty() {
                    None
                } else {
                    Some(Value::Object(synthesized))
                }
            }
        };
        let tool_output =
            first_value(item, &["output", "result", "aggregated_output", "stdout"]).cloned();
        return Message::Tool {
            event_type: rt,
            item_type,
            tool_name,
            tool_input,
            tool_output,
            status: effective_status,
            session_id,
            raw: data.clone(),
        };
    }

    Message::Item {
        event_type: rt,
        item_type,
        role: None,
        text: None,
        status: effective_status,
        session_id,
        raw: data.clone(),
    }
}

/// Default stopping rule for `receive_response`
///
/// True for errors, completion-shaped frames, and completed `turn.*` events;
/// false for `item.*` and `thread.*` traffic, which continues a turn.
#[must_use]
pub fn default_final_event_predicate(message: &Message) -> bool {
    if matches!(message, Message::Error { .. }) {
        return true;
    }

    let raw = message.raw();
    let rt = raw_type(raw);
    let status = raw.get("status").and_then(Value::as_str);

    if rt.map_or(false, |t| FINAL_TYPES.contains(&t))
        || raw.get("final").and_then(Value::as_bool) == Some(true)
    {
        return true;
    }

    if let Some(t) = rt {
        if t.starts_with("turn.") {
            return t.ends_with("completed")
                || status.map_or(false, |s| FINAL_STATUSES.contains(&s));
        }
        if t.starts_with("item.") || t.starts_with("thread.") {
            return false;
        }
    }

    rt.is_none() && status.map_or(false, |s| FINAL_STATUSES.contains(&s))
}
