//! Approval-related type definitions
//!
//! The app-server asks the client to approve sensitive actions (command
//! execution, file changes). These types describe the policy that governs
//! unattended decisions and the callback shapes a caller can register to
//! make decisions interactively.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sandbox mode passed through to the Codex CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// Read-only filesystem access
    ReadOnly,
    /// Writes allowed inside the workspace
    WorkspaceWrite,
    /// No sandboxing at all
    DangerFullAccess,
}

impl SandboxMode {
    /// Wire string for this mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

/// Approval policy governing how the agent escalates sensitive actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalPolicy {
    /// Ask for everything not known to be safe
    Untrusted,
    /// Ask only after a sandboxed attempt failed
    OnFailure,
    /// Ask when the agent decides it needs approval
    OnRequest,
    /// Never ask
    Never,
}

impl ApprovalPolicy {
    /// Wire string for this policy
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Untrusted => "untrusted",
            Self::OnFailure => "on-failure",
            Self::OnRequest => "on-request",
            Self::Never => "never",
        }
    }
}

/// Terminal color mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
    /// Decide based on the terminal
    Auto,
}

impl ColorMode {
    /// Wire string for this mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
            Self::Auto => "auto",
        }
    }
}

/// Value returned by an approval callback
///
/// `Defer` never reaches the wire: it is resolved locally against the
/// configured [`ApprovalPolicy`] before a reply is written.
#[derive(Debug, Clone)]
pub enum ApprovalResponse {
    /// A decision word, normalized through the alias table
    /// (`"approve"`, `"yes"`, `"deny"`, `"defer"`, ...)
    Decision(String),
    /// A pre-shaped reply passed through to the wire verbatim
    Raw(serde_json::Value),
    /// No opinion; resolve via the configured policy
    Defer,
}

impl From<&str> for ApprovalResponse {
    fn from(s: &str) -> Self {
        Self::Decision(s.to_string())
    }
}

impl From<String> for ApprovalResponse {
    fn from(s: String) -> Self {
        Self::Decision(s)
    }
}

/// Async approval callback invoked with the server request params
pub type ApprovalCallback = Arc<
    dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<ApprovalResponse>> + Send>>
        + Send
        + Sync,
>;

/// Value returned by a user-input callback
#[derive(Debug, Clone)]
pub enum UserInputResponse {
    /// A plain answer, wrapped into the protocol shape keyed by the question id
    Text(String),
    /// A pre-shaped answer map passed through verbatim
    Answers(serde_json::Value),
}

/// Async callback answering an `item/tool/requestUserInput` server request
pub type UserInputCallback = Arc<
    dyn Fn(serde_json::Value) -> Pin<Box<dyn Future<Output = Result<UserInputResponse>> + Send>>
        + Send
        + Sync,
>;

/// Box a closure into an [`ApprovalCallback`]
pub fn approval_callback<F, Fut>(f: F) -> ApprovalCallback
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ApprovalResponse>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Box a closure into a [`UserInputCallback`]
pub fn user_input_callback<F, Fut>(f: F) -> UserInputCallback
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<UserInputResponse>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}
