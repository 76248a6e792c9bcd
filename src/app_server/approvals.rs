//! Approval decision resolution
//!
//! Approval callbacks can answer with a broad vocabulary of decision words;
//! these are normalized onto the accept/deny pair the wire expects. A
//! deferred (or absent) decision falls back to the configured approval
//! policy.

use serde_json::Value;

use crate::error::{CodexError, Result};
use crate::types::approvals::{ApprovalCallback, ApprovalPolicy, ApprovalResponse};
use crate::types::options::CodexAgentOptions;

/// Decision words accepted from approval callbacks, shown in error messages
pub const APPROVAL_DECISION_WORDS: &[&str] = &[
    "accept", "allow", "approve", "approved", "ask", "block", "default", "defer", "denied",
    "deny", "fallback", "n", "no", "reject", "rejected", "y", "yes",
];

/// Outcome of resolving an approval request against callbacks and policy
#[derive(Debug, Clone)]
pub enum ResolvedApproval {
    /// Let the action proceed
    Allow,
    /// Refuse the action
    Deny,
    /// A pre-shaped reply from the callback, passed through verbatim
    Raw(Value),
}

/// Map a decision word onto accept/deny/defer
fn decision_alias(raw: &str) -> Option<&'static str> {
    match raw.trim().to_lowercase().as_str() {
        "allow" | "accept" | "approve" | "approved" | "yes" | "y" => Some("accept"),
        "deny" | "denied" | "reject" | "rejected" | "block" | "no" | "n" => Some("deny"),
        "defer" | "default" | "fallback" | "ask" => Some("defer"),
        _ => None,
    }
}

/// Unattended decision derived from the configured approval policy
fn fallback_from_policy(options: &CodexAgentOptions) -> ResolvedApproval {
    match options.ask_for_approval {
        Some(ApprovalPolicy::Never) => ResolvedApproval::Allow,
        Some(
            ApprovalPolicy::Untrusted | ApprovalPolicy::OnFailure | ApprovalPolicy::OnRequest,
        )
        | None => ResolvedApproval::Deny,
    }
}

/// Look up the approval callback for a request kind
///
/// `command` falls back through `command_execution` to the legacy
/// `approve_command` field; `file_change` through `fileChange` to
/// `approve_file_change`.
fn callback_for_kind<'a>(
    options: &'a CodexAgentOptions,
    kind: &str,
) -> Option<&'a ApprovalCallback> {
    match kind {
        "command" => options
            .approval_callbacks
            .get("command")
            .or_else(|| options.approval_callbacks.get("command_execution"))
            .or(options.approve_command.as_ref()),
        "file_change" => options
            .approval_callbacks
            .get("file_change")
            .or_else(|| options.approval_callbacks.get("fileChange"))
            .or(options.approve_file_change.as_ref()),
        _ => None,
    }
}

/// Resolve one approval request
///
/// # Errors
/// Returns `ApprovalDecision` if the callback answered with an unknown
/// decision word; propagates callback errors.
pub async fn resolve_approval(
    options: &CodexAgentOptions,
    kind: &str,
    params: Value,
    callback_name: &str,
) -> Result<ResolvedApproval> {
    let Some(callback) = callback_for_kind(options, kind) else {
        return Ok(fallback_from_policy(options));
    };

    let response = callback(params).await?;

    match response {
        ApprovalResponse::Raw(value) => Ok(ResolvedApproval::Raw(value)),
        ApprovalResponse::Defer => Ok(fallback_from_policy(options)),
        ApprovalResponse::Decision(word) => {
            let Some(normalized) = decision_alias(&word) else {
                return Err(CodexError::approval_decision(format!(
                    "{callback_name} must return one of {APPROVAL_DECISION_WORDS:?}; got {word:?}"
                )));
            };
            match normalized {
                "accept" => Ok(ResolvedApproval::Allow),
                "deny" => Ok(ResolvedApproval::Deny),
                _ => Ok(fallback_from_policy(options)),
            }
        }
    }
}
