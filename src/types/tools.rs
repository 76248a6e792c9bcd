//! Dynamic tool definitions
//!
//! A dynamic tool is a caller-registered capability the app-server may invoke
//! mid-turn through an `item/tool/call` server request.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{CodexError, Result};
use crate::types::identifiers::ToolName;

/// Async handler invoked with the tool call arguments
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// Dynamic tool exposed to Codex via the app-server protocol
#[derive(Clone)]
pub struct CodexTool {
    /// Unique tool name
    pub name: ToolName,
    /// Human-readable description shown to the model
    pub description: String,
    /// Object-shaped JSON schema for the tool arguments
    pub input_schema: Value,
    /// Handler invoked on each call
    pub handler: ToolHandler,
}

impl CodexTool {
    /// Create a dynamic tool from a closure
    pub fn new<F, Fut>(
        name: impl Into<ToolName>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }
}

impl std::fmt::Debug for CodexTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodexTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("handler", &"<handler>")
            .finish()
    }
}

/// Normalize a tool input schema to the object JSON schema Codex accepts
///
/// Accepts a full object schema, a schema that carries `properties` without a
/// `type`, or the shorthand `{field_name: field_schema}` map.
///
/// # Errors
/// Returns `InvalidConfig` if the schema is not a JSON object or declares a
/// non-object `type`.
pub fn normalize_tool_input_schema(input_schema: &Value) -> Result<Value> {
    let obj = input_schema.as_object().ok_or_else(|| {
        CodexError::invalid_config("Tool input schema must be a JSON object or a properties map")
    })?;

    if obj.get("type").and_then(Value::as_str) == Some("object") {
        return Ok(input_schema.clone());
    }

    if obj.get("properties").map_or(false, Value::is_object) {
        let mut normalized = obj.clone();
        normalized
            .entry("type")
            .or_insert_with(|| json!("object"));
        return Ok(Value::Object(normalized));
    }

    if let Some(schema_type) = obj.get("type").and_then(Value::as_str) {
        return Err(CodexError::invalid_config(format!(
            "Tool input schema must be object-shaped; received schema type {schema_type:?}"
        )));
    }

    // Shorthand: {field_name: {field_schema...}}
    Ok(json!({
        "type": "object",
        "properties": input_schema.clone(),
    }))
}
