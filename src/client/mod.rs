//! `CodexSDKClient` for one-shot and session-style interactions
//!
//! - One-shot: [`CodexSDKClient::run`] for prompt-in, event-stream-out calls.
//! - Session-style: [`CodexSDKClient::connect`] then
//!   [`CodexSDKClient::query`] then [`CodexSDKClient::receive_response`].
//!
//! The client tracks the latest session/thread id observed in events and
//! resumes follow-up calls with it automatically.
//!
//! # Example: one-shot
//!
//! ```no_run
//! use codex_agent_sdk::{query, CodexAgentOptions};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut stream = std::pin::pin!(query("What is 2 + 2?", CodexAgentOptions::default()));
//! while let Some(message) = stream.next().await {
//!     println!("{:?}", message?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example: session-style
//!
//! ```no_run
//! use codex_agent_sdk::{CodexAgentOptions, CodexSDKClient};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = CodexSDKClient::new(CodexAgentOptions::default());
//! client.connect().await?;
//!
//! client.query("Summarize this repository").await?;
//! let mut response = std::pin::pin!(client.receive_response()?);
//! while let Some(message) = response.next().await {
//!     println!("{:?}", message?);
//! }
//!
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};

use async_stream::stream;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};

use crate::app_server::AppServerClient;
use crate::error::{CodexError, Result};
use crate::message::{default_final_event_predicate, extract_session_id};
use crate::query::query;
use crate::types::identifiers::SessionId;
use crate::types::messages::Message;
use crate::types::options::CodexAgentOptions;
use crate::types::prompt::PromptInput;

/// Per-call overrides for [`CodexSDKClient::run`] and
/// [`CodexSDKClient::query`]
///
/// Unset fields fall back to the client's tracked session and configured
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    /// Session (thread) id to resume
    pub session_id: Option<SessionId>,
    /// Resume the most recent session
    pub resume_last: Option<bool>,
    /// Pick the session to resume interactively
    pub resume_all: Option<bool>,
    /// Model override for this call
    pub model: Option<String>,
}

/// Client for one-shot and session-style Codex interactions
pub struct CodexSDKClient {
    options: CodexAgentOptions,
    last_session_id: Arc<Mutex<Option<String>>>,
    connected: bool,
    session_model: Option<String>,
    connect_resume_session: Option<SessionId>,
    connect_resume_last: bool,
    connect_resume_all: bool,
    active_stream: Option<BoxStream<'static, Result<Message>>>,
}

impl CodexSDKClient {
    /// Create a client with the given options
    #[must_use]
    pub fn new(options: CodexAgentOptions) -> Self {
        Self {
            options,
            last_session_id: Arc::new(Mutex::new(None)),
            connected: false,
            session_model: None,
            connect_resume_session: None,
            connect_resume_last: false,
            connect_resume_all: false,
            active_stream: None,
        }
    }

    /// Latest session/thread id observed in events
    #[must_use]
    pub fn last_session_id(&self) -> Option<String> {
        self.last_session_id.lock().ok().and_then(|id| id.clone())
    }

    /// Enter session-style mode with default resume behavior
    ///
    /// Configures defaults for subsequent [`Self::query`] calls; it does not
    /// eagerly start a subprocess.
    ///
    /// # Errors
    /// Currently infallible; kept fallible for parity with
    /// [`Self::connect_with`].
    pub async fn connect(&mut self) -> Result<()> {
        self.connect_with(None, false, false, None).await
    }

    /// Enter session-style mode with explicit resume defaults
    ///
    /// # Errors
    /// Returns `Connection` if the resume arguments conflict.
    pub async fn connect_with(
        &mut self,
        session_id: Option<SessionId>,
        resume_last: bool,
        resume_all: bool,
        model: Option<String>,
    ) -> Result<()> {
        if session_id.is_some() && (resume_last || resume_all) {
            return Err(CodexError::connection(
                "Provide either session_id or resume_last/resume_all, not both.",
            ));
        }
        if resume_last && resume_all {
            return Err(CodexError::connection(
                "resume_last and resume_all cannot both be true.",
            ));
        }

        self.connected = true;
        self.session_model = model;
        self.connect_resume_session = session_id;
        self.connect_resume_last = resume_last;
        self.connect_resume_all = resume_all;
        Ok(())
    }

    /// Exit session-style mode and drop any in-flight response stream
    pub async fn disconnect(&mut self) {
        self.active_stream = None;
        self.connected = false;
        self.session_model = None;
        self.connect_resume_session = None;
        self.connect_resume_last = false;
        self.connect_resume_all = false;
    }

    /// Run a one-shot query, resuming the tracked session by default
    pub fn run(
        &self,
        prompt: impl Into<PromptInput>,
    ) -> impl Stream<Item = Result<Message>> + Send + 'static {
        self.run_with(prompt, QueryParams::default())
    }

    /// Run a one-shot query with per-call overrides
    pub fn run_with(
        &self,
        prompt: impl Into<PromptInput>,
        params: QueryParams,
    ) -> impl Stream<Item = Result<Message>> + Send + 'static {
        let prompt = prompt.into();
        let resume_last = params.resume_last.unwrap_or(false);
        let resume_all = params.resume_all.unwrap_or(false);
        let mut session_id = params.session_id;
        let last_session_id = self.last_session_id.clone();

        let mut options = self.options.clone();
        let model = params
            .model
            .or_else(|| self.session_model.clone())
            .or_else(|| options.model.clone());

        stream! {
            if session_id.is_some() && (resume_last || resume_all) {
                yield Err(CodexError::connection(
                    "Provide either session_id or resume_last/resume_all, not both.",
                ));
                return;
            }
            if resume_last && resume_all {
                yield Err(CodexError::connection(
                    "resume_last and resume_all cannot both be true.",
                ));
                return;
            }

            if session_id.is_none() && !resume_last && !resume_all {
                session_id = last_session_id
                    .lock()
                    .ok()
                    .and_then(|id| id.clone())
                    .map(SessionId::from);
            }

            if session_id.is_some() || resume_last || resume_all {
                options.resume_session = session_id;
                options.resume_last = resume_last;
                options.resume_all = resume_all;
            }
            options.model = model;

            let mut inner = std::pin::pin!(query(prompt, options));
            while let Some(result) = inner.next().await {
                if let Ok(ref message) = result {
                    update_session_id(&last_session_id, message);
                }
                yield result;
            }
        }
    }

    /// Send a request in session-style mode
    ///
    /// Consume the response via [`Self::receive_messages`] or
    /// [`Self::receive_response`].
    ///
    /// # Errors
    /// Returns `Connection` if not connected or a previous response is still
    /// active.
    pub async fn query(&mut self, prompt: impl Into<PromptInput>) -> Result<()> {
        self.query_with(prompt, QueryParams::default()).await
    }

    /// Send a request in session-style mode with per-call overrides
    ///
    /// # Errors
    /// Returns `Connection` if not connected or a previous response is still
    /// active.
    pub async fn query_with(
        &mut self,
        prompt: impl Into<PromptInput>,
        mut params: QueryParams,
    ) -> Result<()> {
        if !self.connected {
            return Err(CodexError::connection("Not connected. Call connect() first."));
        }
        if self.active_stream.is_some() {
            return Err(CodexError::connection(
                "A previous response is still active. Consume it via \
                 receive_messages()/receive_response() first.",
            ));
        }

        // Without per-call overrides or a tracked session, the connect-time
        // resume defaults apply.
        if params.session_id.is_none()
            && params.resume_last.is_none()
            && params.resume_all.is_none()
            && self.last_session_id().is_none()
        {
            params.session_id = self.connect_resume_session.clone();
            if params.session_id.is_none() {
                params.resume_last = Some(self.connect_resume_last);
                params.resume_all = Some(self.connect_resume_all);
            }
        }

        let stream = self.run_with(prompt, params);
        self.active_stream = Some(stream.boxed());
        Ok(())
    }

    /// All events for the active session-style request
    ///
    /// # Errors
    /// Returns `Connection` if not connected or no request is active.
    pub fn receive_messages(&mut self) -> Result<BoxStream<'static, Result<Message>>> {
        if !self.connected {
            return Err(CodexError::connection("Not connected. Call connect() first."));
        }
        self.active_stream.take().ok_or_else(|| {
            CodexError::connection("No active request. Call query(...) before receive_messages().")
        })
    }

    /// Events for the active request, ending after the final event
    ///
    /// The stopping rule is the configured `final_event_predicate`, falling
    /// back to [`default_final_event_predicate`].
    ///
    /// # Errors
    /// Returns `Connection` if not connected or no request is active.
    pub fn receive_response(
        &mut self,
    ) -> Result<impl Stream<Item = Result<Message>> + Send + 'static> {
        let mut inner = self.receive_messages()?;
        let predicate = self.options.final_event_predicate.clone();

        Ok(stream! {
            while let Some(result) = inner.next().await {
                match result {
                    Ok(message) => {
                        let is_final = match predicate {
                            Some(ref predicate) => predicate(&message),
                            None => default_final_event_predicate(&message),
                        };
                        yield Ok(message);
                        if is_final {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        })
    }

    /// Best-effort interruption by dropping the active response stream
    ///
    /// # Errors
    /// Returns `Connection` if not connected.
    pub async fn interrupt(&mut self) -> Result<()> {
        if !self.connected {
            return Err(CodexError::connection("Not connected. Call connect() first."));
        }
        self.active_stream = None;
        Ok(())
    }

    /// Set the session default model for subsequent [`Self::query`] calls
    ///
    /// # Errors
    /// Returns `Connection` if not connected.
    pub async fn set_model(&mut self, model: Option<String>) -> Result<()> {
        if !self.connected {
            return Err(CodexError::connection("Not connected. Call connect() first."));
        }
        self.session_model = model;
        Ok(())
    }

    /// List MCP server statuses via the Codex app-server
    ///
    /// # Errors
    /// Returns error if the app-server cannot be reached.
    pub async fn mcp_status_list(&self) -> Result<serde_json::Value> {
        let mut client = AppServerClient::spawn(self.options.clone())?;
        let result = client.mcp_status_list().await;
        let _ = client.close().await;
        result
    }

    /// Reload the MCP server configuration via the Codex app-server
    ///
    /// # Errors
    /// Returns error if the app-server cannot be reached.
    pub async fn mcp_reload(&self) -> Result<serde_json::Value> {
        let mut client = AppServerClient::spawn(self.options.clone())?;
        let result = client.mcp_reload().await;
        let _ = client.close().await;
        result
    }
}

/// Record the session id surfaced by an event, if any
fn update_session_id(slot: &Arc<Mutex<Option<String>>>, message: &Message) {
    let session_id = message
        .session_id()
        .map(str::to_string)
        .or_else(|| extract_session_id(message.raw()));
    if let Some(session_id) = session_id {
        if let Ok(mut slot) = slot.lock() {
            *slot = Some(session_id);
        }
    }
}
