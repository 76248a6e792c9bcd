//! Prompt input types
//!
//! A one-shot query takes either a plain prompt string (passed as a CLI
//! argument) or a stream of text chunks forwarded to the child's stdin.

use futures::stream::BoxStream;

/// Stream of prompt chunks written to the child's stdin
pub type PromptStream = BoxStream<'static, String>;

/// Prompt input for a one-shot query
pub enum PromptInput {
    /// Single prompt string, passed on the command line
    Text(String),
    /// Chunked input streamed over stdin (`codex exec -`)
    Stream(PromptStream),
}

impl From<String> for PromptInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<PromptStream> for PromptInput {
    fn from(stream: PromptStream) -> Self {
        Self::Stream(stream)
    }
}

impl std::fmt::Debug for PromptInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").field(&"<stream>").finish(),
        }
    }
}
