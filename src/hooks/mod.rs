//! Event hook system
//!
//! Hooks observe classified messages as they stream out of a query. They are
//! keyed by message kind (`"item"`, `"turn"`, ...) with a `"*"` wildcard that
//! fires for every message. A hook may abort streaming by returning
//! [`CodexError::HookAbort`]; the stream then ends cleanly instead of
//! surfacing the error to the consumer.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{CodexError, Result};
use crate::types::messages::Message;

/// Async callback invoked with each matching message
pub type EventHook =
    Arc<dyn Fn(Message) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Create an event hook from a closure
pub fn event_hook<F, Fut>(f: F) -> EventHook
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |message| Box::pin(f(message)))
}

/// Registered event hooks, keyed by message kind
#[derive(Clone, Default)]
pub struct EventHooks {
    hooks: HashMap<String, Vec<EventHook>>,
}

impl EventHooks {
    /// Create an empty hook registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for a message kind (`"*"` matches every message)
    pub fn register(&mut self, kind: impl Into<String>, hook: EventHook) {
        self.hooks.entry(kind.into()).or_default().push(hook);
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, kind: impl Into<String>, hook: EventHook) -> Self {
        self.register(kind, hook);
        self
    }

    /// Number of kinds with at least one hook
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Dispatch a message to matching hooks
    ///
    /// Wildcard hooks run first, then the kind-specific list, each in
    /// registration order. The first hook error stops dispatch.
    ///
    /// # Errors
    /// Propagates the first hook error, including [`CodexError::HookAbort`].
    pub async fn dispatch(&self, message: &Message) -> Result<()> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        if let Some(wildcard) = self.hooks.get("*") {
            for hook in wildcard {
                hook(message.clone()).await?;
            }
        }
        if let Some(for_kind) = self.hooks.get(message.kind()) {
            for hook in for_kind {
                hook(message.clone()).await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .hooks
            .iter()
            .map(|(kind, list)| (kind.as_str(), list.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("EventHooks").field("hooks", &counts).finish()
    }
}

/// Whether an error is the hook-abort signal
#[must_use]
pub fn is_hook_abort(error: &CodexError) -> bool {
    matches!(error, CodexError::HookAbort(_))
}
