//! Configuration constants and types for the subprocess transport

/// Default maximum buffer size for one JSON message (1MB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Environment variable identifying the SDK to the CLI
pub const ENTRYPOINT_ENV_VAR: &str = "CODEX_SDK_ENTRYPOINT";

/// Environment variable carrying the SDK version
pub const VERSION_ENV_VAR: &str = "CODEX_SDK_VERSION";

/// Which CLI surface the subprocess speaks
#[derive(Debug)]
pub enum TransportMode {
    /// One-shot `codex exec` run streaming events until exit
    Exec(PromptSpec),
    /// Long-lived `codex app-server` bidirectional session
    AppServer,
}

/// How the prompt reaches a one-shot exec run
#[derive(Debug)]
pub enum PromptSpec {
    /// Prompt passed as the final CLI argument; stdin is closed after spawn
    Text(String),
    /// Prompt streamed over stdin (`codex exec -`)
    Stdin,
}

impl From<String> for PromptSpec {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PromptSpec {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
