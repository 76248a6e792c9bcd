//! Type definitions for the Codex Agent SDK
//!
//! Organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `ToolName`, `RequestId`)
//! - [`approvals`] - Sandbox/approval policies, approval and user-input
//!   callbacks
//! - [`messages`] - Classified message variants
//! - [`tools`] - Dynamic tool definitions and schema normalization
//! - [`options`] - Main configuration options
//! - [`prompt`] - Prompt input (plain string or streamed chunks)

pub mod approvals;
pub mod identifiers;
pub mod messages;
pub mod options;
pub mod prompt;
pub mod tools;

// Re-export commonly used types
pub use approvals::{
    approval_callback, user_input_callback, ApprovalCallback, ApprovalPolicy, ApprovalResponse,
    ColorMode, SandboxMode, UserInputCallback, UserInputResponse,
};
pub use identifiers::{RequestId, SessionId, ToolName};
pub use messages::Message;
pub use options::{
    CodexAgentOptions, CodexAgentOptionsBuilder, EventParser, FinalEventPredicate, OutputSchema,
    StderrCallback,
};
pub use prompt::{PromptInput, PromptStream};
pub use tools::{normalize_tool_input_schema, CodexTool, ToolHandler};
