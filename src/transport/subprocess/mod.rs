//! Subprocess transport implementation using the Codex CLI
//!
//! Spawns the Codex CLI as a child process and communicates with it via
//! stdin/stdout, in either one-shot exec mode or app-server mode.

mod command;
mod config;
mod lifecycle;
mod reader;
mod transport;

// Re-export public types
pub use config::{PromptSpec, TransportMode, DEFAULT_MAX_BUFFER_SIZE};
pub use transport::SubprocessTransport;
