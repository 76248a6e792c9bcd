//! Server request handlers
//!
//! The app-server can call back into the client mid-turn: dynamic tool
//! invocations, user-input questions, and approval requests. Each handler
//! computes the `result` payload for the reply; errors become JSON-RPC style
//! error replies at the dispatch layer.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::{CodexError, Result};
use crate::types::approvals::UserInputResponse;
use crate::types::options::CodexAgentOptions;
use crate::types::tools::CodexTool;

use super::approvals::{resolve_approval, ResolvedApproval};

/// Handle an `item/tool/call` request against the registered tool map
///
/// Unknown tools and handler failures are reported inside the result
/// envelope, not as protocol errors, so the turn keeps going.
pub async fn handle_dynamic_tool_call(
    tools: &HashMap<String, CodexTool>,
    params: &Value,
) -> Result<Value> {
    let tool_name = params
        .get("tool")
        .and_then(Value::as_str)
        .ok_or_else(|| CodexError::connection("Dynamic tool call missing tool name"))?;

    let Some(tool) = tools.get(tool_name) else {
        return Ok(json!({
            "success": false,
            "output": format!("Unknown tool: {tool_name}"),
        }));
    };

    let args = match params.get("arguments") {
        Some(args) if args.is_object() => args.clone(),
        _ => json!({}),
    };

    match (tool.handler)(args).await {
        Ok(result) => Ok(json!({
            "success": true,
            "output": normalize_tool_output(&result),
        })),
        Err(e) => Ok(json!({
            "success": false,
            "output": e.to_string(),
        })),
    }
}

/// Handle an `item/tool/requestUserInput` request
///
/// A plain-text answer is wrapped into the per-question answer map; without
/// a callback the reply is an empty answer set.
pub async fn handle_tool_user_input(
    options: &CodexAgentOptions,
    params: Value,
) -> Result<Value> {
    let Some(ref callback) = options.request_user_input else {
        return Ok(json!({"answers": {}}));
    };

    let question_id = params
        .get("questionId")
        .and_then(Value::as_str)
        .unwrap_or("question")
        .to_string();

    match callback(params).await? {
        UserInputResponse::Answers(answers) => Ok(json!({"answers": answers})),
        UserInputResponse::Text(text) => Ok(json!({
            "answers": {question_id: {"answers": [text]}},
        })),
    }
}

/// Handle a modern approval request (`item/*/requestApproval`)
///
/// The wire vocabulary is `accept`/`deny`.
pub async fn handle_approval(
    options: &CodexAgentOptions,
    kind: &str,
    params: Value,
    callback_name: &str,
) -> Result<Value> {
    match resolve_approval(options, kind, params, callback_name).await? {
        ResolvedApproval::Raw(value) => Ok(value),
        ResolvedApproval::Allow => Ok(json!({"decision": "accept"})),
        ResolvedApproval::Deny => Ok(json!({"decision": "deny"})),
    }
}

/// Handle a legacy approval request (`execCommandApproval`/`applyPatchApproval`)
///
/// Same resolution as the modern path, but the wire vocabulary is
/// `approved`/`denied`.
pub async fn handle_legacy_approval(
    options: &CodexAgentOptions,
    method: &str,
    params: Value,
) -> Result<Value> {
    let kind = if method == "execCommandApproval" {
        "command"
    } else {
        "file_change"
    };
    let callback_name = format!("{method} approval callback");

    match resolve_approval(options, kind, params, &callback_name).await? {
        ResolvedApproval::Raw(value) => Ok(value),
        ResolvedApproval::Allow => Ok(json!({"decision": "approved"})),
        ResolvedApproval::Deny => Ok(json!({"decision": "denied"})),
    }
}

/// Flatten a tool handler result into the output string the wire expects
///
/// Strings pass through; MCP-style `{content: [{type: "text", ...}]}` blocks
/// are joined with newlines; everything else is JSON-serialized.
#[must_use]
pub fn normalize_tool_output(result: &Value) -> String {
    if let Some(text) = result.as_str() {
        return text.to_string();
    }

    if let Some(content) = result.get("content").and_then(Value::as_array) {
        let parts: Vec<&str> = content
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect();
        if !parts.is_empty() {
            return parts.join("\n");
        }
    }

    result.to_string()
}
