#![recursion_limit = "256"]

//! # Codex Agent SDK for Rust
//!
//! Rust SDK for driving the Codex CLI: one-shot streamed queries and
//! bidirectional app-server sessions with dynamic tools, approvals, and
//! user-input callbacks, built on tokio.
//!
//! ## Quick Start
//!
//! The simplest way to use this SDK is the [`query()`] function:
//!
//! ```no_run
//! use codex_agent_sdk::{query, CodexAgentOptions, Message};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut stream = std::pin::pin!(query("What is 2 + 2?", CodexAgentOptions::default()));
//!
//!     while let Some(message) = stream.next().await {
//!         if let Message::Item { text: Some(text), .. } = message? {
//!             println!("{text}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. One-shot queries with [`query()`]
//!
//! Spawns `codex exec`, frames the newline-delimited JSON events it emits,
//! and classifies each into a [`Message`] variant.
//!
//! ### 2. Session-style interactions with [`CodexSDKClient`]
//!
//! Tracks the latest session/thread id across calls and resumes follow-up
//! queries automatically:
//!
//! ```no_run
//! # use codex_agent_sdk::{CodexSDKClient, CodexAgentOptions};
//! # use futures::StreamExt;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = CodexSDKClient::new(CodexAgentOptions::default());
//! client.connect().await?;
//!
//! client.query("Find the bug in src/parser.rs").await?;
//! let mut response = std::pin::pin!(client.receive_response()?);
//! while let Some(message) = response.next().await {
//!     println!("{:?}", message?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### 3. Dynamic tools over the app-server protocol
//!
//! Register tools Codex can call back into mid-turn; registering any tool
//! switches [`query()`] to a bidirectional `codex app-server` session:
//!
//! ```no_run
//! # use codex_agent_sdk::{CodexAgentOptions, CodexTool};
//! # use serde_json::json;
//! let adder = CodexTool::new(
//!     "add",
//!     "Add two numbers",
//!     json!({"a": {"type": "number"}, "b": {"type": "number"}}),
//!     |args| async move {
//!         let sum = args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
//!         Ok(json!(sum.to_string()))
//!     },
//! );
//!
//! let options = CodexAgentOptions::builder().dynamic_tool(adder).build();
//! ```
//!
//! ### 4. Approval callbacks
//!
//! Decide interactively whether Codex may run a command or change a file;
//! unanswered requests fall back to the configured approval policy. See
//! [`types::approvals`].
//!
//! ### 5. Event hooks
//!
//! Observe classified messages as they stream, keyed by message kind, with a
//! `"*"` wildcard. A hook may abort streaming early. See [`hooks`].
//!
//! ## Architecture
//!
//! - [`types`]: Options, message variants, callbacks, newtypes
//! - [`query()`]: One-shot query function
//! - [`client`]: Session-style client
//! - [`app_server`]: Bidirectional app-server protocol engine
//! - [`hooks`]: Event hook registry
//! - [`transport`]: Subprocess plumbing for the Codex CLI
//! - [`message`]: Message classification
//! - [`error`]: Error types
//!
//! ## Requirements
//!
//! - Rust 1.75.0 or later
//! - The Codex CLI on PATH (or `CodexAgentOptions::cli_path`)
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, CodexError>`](Result), built
//! with `thiserror` for ergonomic matching:
//!
//! ```no_run
//! # use codex_agent_sdk::{query, CodexAgentOptions, CodexError};
//! # use futures::StreamExt;
//! # async fn example() {
//! let mut stream = std::pin::pin!(query("Hello", CodexAgentOptions::default()));
//! while let Some(message) = stream.next().await {
//!     match message {
//!         Ok(message) => log::info!("{message:?}"),
//!         Err(CodexError::CliNotFound(msg)) => log::error!("Codex not installed: {msg}"),
//!         Err(e) => log::error!("Error: {e}"),
//!     }
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app_server;
pub mod client;
pub mod error;
pub mod hooks;
pub mod message;
pub mod query;
pub mod transport;
pub mod types;

// Re-export commonly used types for the flat public API
pub use app_server::AppServerClient;
pub use client::{CodexSDKClient, QueryParams};
pub use error::{CodexError, Result};
pub use hooks::{event_hook, EventHook, EventHooks};
pub use message::{default_final_event_predicate, parse_message};
pub use query::{query, Query};
pub use transport::{SubprocessTransport, Transport};
pub use types::approvals::{
    approval_callback, user_input_callback, ApprovalCallback, ApprovalPolicy, ApprovalResponse,
    ColorMode, SandboxMode, UserInputCallback, UserInputResponse,
};
pub use types::identifiers::{RequestId, SessionId, ToolName};
pub use types::messages::Message;
pub use types::options::{
    CodexAgentOptions, CodexAgentOptionsBuilder, EventParser, FinalEventPredicate, OutputSchema,
    StderrCallback,
};
pub use types::prompt::{PromptInput, PromptStream};
pub use types::tools::{CodexTool, ToolHandler};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
