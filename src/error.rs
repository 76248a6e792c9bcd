//! Error types for the Codex Agent SDK

use std::time::Duration;

use thiserror::Error;

/// Main error type for the Codex Agent SDK
#[derive(Error, Debug)]
pub enum CodexError {
    /// Codex CLI not found or not installed
    #[error("Codex CLI not found: {0}")]
    CliNotFound(String),

    /// Connection error when communicating with the Codex CLI
    #[error("Connection error: {0}")]
    Connection(String),

    /// Process execution error with exit code and stderr
    #[error("Process error (exit code {exit_code}): {message}")]
    Process {
        /// Error message
        message: String,
        /// Process exit code
        exit_code: i32,
        /// Standard error output
        stderr: Option<String>,
    },

    /// JSON decode error when parsing CLI output
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// A buffered partial JSON object exceeded the configured limit
    #[error("JSON message exceeded maximum buffer size: {size} bytes > {limit} byte limit")]
    BufferOverflow {
        /// Size the buffer had reached when the limit was hit
        size: usize,
        /// Configured buffer limit
        limit: usize,
    },

    /// Message parse error with optional raw data
    #[error("Message parse error: {message}")]
    MessageParse {
        /// Error message
        message: String,
        /// Raw message data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// The app-server returned an error response, or a background stream failed
    #[error("Protocol stream error: {message}")]
    ProtocolStream {
        /// Error message
        message: String,
        /// Request method the error relates to, when known
        method: Option<String>,
        /// Structured error payload from the remote side
        payload: Option<serde_json::Value>,
    },

    /// No reply arrived for an app-server request within the configured bound
    #[error("Timed out waiting for app-server response for {method:?} after {timeout:?}")]
    RequestTimeout {
        /// Request method that timed out
        method: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// An approval callback returned an unusable decision
    #[error("Approval decision error: {0}")]
    ApprovalDecision(String),

    /// Raised by an event hook to abort streaming early
    #[error("Hook aborted streaming: {0}")]
    HookAbort(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Codex SDK operations
pub type Result<T> = std::result::Result<T, CodexError>;

impl CodexError {
    /// Create a CLI not found error with install guidance
    #[must_use]
    pub fn cli_not_found() -> Self {
        Self::CliNotFound(
            "Codex CLI not found. Install Codex and ensure `codex` is on PATH, \
             or set CodexAgentOptions::cli_path to the binary location."
                .to_string(),
        )
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a process error
    pub fn process(msg: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::Process {
            message: msg.into(),
            exit_code,
            stderr,
        }
    }

    /// Create a message parse error
    pub fn message_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::MessageParse {
            message: msg.into(),
            data,
        }
    }

    /// Create a protocol stream error without method/payload context
    pub fn protocol_stream(msg: impl Into<String>) -> Self {
        Self::ProtocolStream {
            message: msg.into(),
            method: None,
            payload: None,
        }
    }

    /// Create an approval decision error
    pub fn approval_decision(msg: impl Into<String>) -> Self {
        Self::ApprovalDecision(msg.into())
    }

    /// Create a hook abort signal
    pub fn hook_abort(reason: impl Into<String>) -> Self {
        Self::HookAbort(reason.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
