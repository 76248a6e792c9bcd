//! Structured message types
//!
//! Codex emits heterogeneous JSON events with no fixed schema. The classifier
//! in [`crate::message`] maps every raw frame into exactly one [`Message`]
//! variant; each variant keeps the original frame for lossless fallback.

use serde::Serialize;
use serde_json::Value;

/// Best-effort structured view of one Codex JSON event
///
/// Classification is total: every JSON object maps to exactly one variant,
/// chosen by the priority-ordered rules in [`crate::message::parse_message`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Message {
    /// An error event, or any frame carrying an `error` key
    Error {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Extracted error text
        error: Option<String>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// A `thread.*` lifecycle event
    Thread {
        /// Original frame
        raw: Value,
        /// Raw event type
        event_type: String,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// A `turn.*` lifecycle event, or a completion-shaped frame
    Turn {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// A conversational item (assistant/user message, reasoning, delta)
    Item {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Item type (`agent_message`, `delta`, ...), when known
        item_type: Option<String>,
        /// Message role, inferred for known agent/user item types
        role: Option<String>,
        /// Extracted message text
        text: Option<String>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// A tool invocation or tool result
    Tool {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Item type, when the frame was an `item.*` event
        item_type: Option<String>,
        /// Tool name
        tool_name: Option<String>,
        /// Tool input arguments
        tool_input: Option<Value>,
        /// Tool output, in whatever shape the frame carried
        tool_output: Option<Value>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// Log-like output (stdout/stderr/console events)
    Log {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Extracted log text
        text: Option<String>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
    /// Forward-compatibility fallback for unrecognized shapes
    Raw {
        /// Original frame
        raw: Value,
        /// Raw event type, when present
        event_type: Option<String>,
        /// Event status
        status: Option<String>,
        /// Session/thread id surfaced by the frame
        session_id: Option<String>,
    },
}

impl Message {
    /// Event kind string, used to key hook lists
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Thread { .. } => "thread",
            Self::Turn { .. } => "turn",
            Self::Item { .. } => "item",
            Self::Tool { .. } => "tool",
            Self::Log { .. } => "log",
            Self::Raw { .. } => "raw",
        }
    }

    /// The original JSON frame this message was classified from
    #[must_use]
    pub const fn raw(&self) -> &Value {
        match self {
            Self::Error { raw, .. }
            | Self::Thread { raw, .. }
            | Self::Turn { raw, .. }
            | Self::Item { raw, .. }
            | Self::Tool { raw, .. }
            | Self::Log { raw, .. }
            | Self::Raw { raw, .. } => raw,
        }
    }

    /// Raw event type string, when the frame carried one
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        match self {
            Self::Thread { event_type, .. } => Some(event_type.as_str()),
            Self::Error { event_type, .. }
            | Self::Turn { event_type, .. }
            | Self::Item { event_type, .. }
            | Self::Tool { event_type, .. }
            | Self::Log { event_type, .. }
            | Self::Raw { event_type, .. } => event_type.as_deref(),
        }
    }

    /// Event status, when the frame carried one
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Error { status, .. }
            | Self::Thread { status, .. }
            | Self::Turn { status, .. }
            | Self::Item { status, .. }
            | Self::Tool { status, .. }
            | Self::Log { status, .. }
            | Self::Raw { status, .. } => status.as_deref(),
        }
    }

    /// Session/thread id surfaced by the frame, when present
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Error { session_id, .. }
            | Self::Thread { session_id, .. }
            | Self::Turn { session_id, .. }
            | Self::Item { session_id, .. }
            | Self::Tool { session_id, .. }
            | Self::Log { session_id, .. }
            | Self::Raw { session_id, .. } => session_id.as_deref(),
        }
    }

    /// Extracted text, for variants that carry any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Item { text, .. } | Self::Log { text, .. } => text.as_deref(),
            _ => None,
        }
    }
}
