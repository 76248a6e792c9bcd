//! Bidirectional app-server client
//!
//! Speaks the JSON-RPC-like app-server protocol over a long-lived Codex
//! process: client requests are correlated to replies through generated ids,
//! server requests (tool calls, approvals, user input) are answered
//! concurrently, and notifications flow into an event queue consumed by
//! [`AppServerClient::next_event`].

mod approvals;
mod handlers;

pub use approvals::{ResolvedApproval, APPROVAL_DECISION_WORDS};
pub use handlers::normalize_tool_output;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, warn};
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::{CodexError, Result};
use crate::query::QueueItem;
use crate::transport::{SubprocessTransport, Transport, TransportMode};
use crate::types::identifiers::RequestId;
use crate::types::options::{CodexAgentOptions, OutputSchema};
use crate::types::tools::{normalize_tool_input_schema, CodexTool};
use crate::VERSION;

/// Event queue capacity between the read loop and the consumer
const EVENT_QUEUE_CAPACITY: usize = 200;

/// State shared between the client and its background tasks
struct EngineShared {
    request_counter: AtomicU64,
    pending: Mutex<HashMap<RequestId, oneshot::Sender<Result<Value>>>>,
    closed: AtomicBool,
}

impl EngineShared {
    fn new() -> Self {
        Self {
            request_counter: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Fail every pending request with an error built per request
    async fn fail_pending(&self, make_error: impl Fn() -> CodexError) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(make_error()));
        }
    }
}

/// Client for the bidirectional app-server protocol
pub struct AppServerClient<T: Transport + 'static> {
    options: Arc<CodexAgentOptions>,
    transport: Arc<Mutex<T>>,
    shared: Arc<EngineShared>,
    tools: Arc<HashMap<String, CodexTool>>,
    events: mpsc::Receiver<QueueItem>,
    events_tx: mpsc::Sender<QueueItem>,
    read_task: Option<JoinHandle<()>>,
    started: bool,
}

impl AppServerClient<SubprocessTransport> {
    /// Create a client backed by a spawned `codex app-server` process
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found.
    pub fn spawn(options: CodexAgentOptions) -> Result<Self> {
        let transport = SubprocessTransport::new(TransportMode::AppServer, options.clone())?;
        Ok(Self::new(transport, options))
    }
}

impl<T: Transport + 'static> AppServerClient<T> {
    /// Create a client over an existing transport
    pub fn new(transport: T, options: CodexAgentOptions) -> Self {
        let tools: HashMap<String, CodexTool> = options
            .dynamic_tools
            .iter()
            .map(|tool| (tool.name.as_str().to_string(), tool.clone()))
            .collect();
        let (events_tx, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        Self {
            options: Arc::new(options),
            transport: Arc::new(Mutex::new(transport)),
            shared: Arc::new(EngineShared::new()),
            tools: Arc::new(tools),
            events,
            events_tx,
            read_task: None,
            started: false,
        }
    }

    /// Connect, start the read loop, and perform the initialize handshake
    ///
    /// Idempotent: a second call on a started client is a no-op.
    ///
    /// # Errors
    /// Returns error if the transport fails or the handshake is rejected.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        self.transport.lock().await.connect().await?;

        let raw_rx = self.transport.lock().await.read_messages();
        self.read_task = Some(spawn_read_loop(
            raw_rx,
            self.shared.clone(),
            self.events_tx.clone(),
            self.transport.clone(),
            self.options.clone(),
            self.tools.clone(),
        ));

        let init_params = json!({
            "clientInfo": {
                "name": "codex-agent-sdk",
                "version": VERSION,
            },
            "capabilities": {
                "experimentalApi": true,
            },
        });
        self.send_request("initialize", Some(init_params)).await?;
        self.send_notification("initialized", None).await?;
        self.started = true;
        Ok(())
    }

    /// Send a request and wait for its correlated reply
    ///
    /// # Errors
    /// Returns `RequestTimeout` when no reply arrives within the configured
    /// bound, `ProtocolStream` for error replies, and `Connection` if the
    /// stream closes first.
    pub async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let n = self.shared.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = RequestId::new(format!("req_{n}"));

        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .await
            .insert(request_id.clone(), tx);

        let mut payload = json!({"id": request_id.as_str(), "method": method});
        if let Some(params) = params {
            payload["params"] = params;
        }
        if let Err(e) = self.send(&payload).await {
            self.shared.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        // A zero timeout disables the bound entirely
        let timeout = self.options.request_timeout.filter(|t| !t.is_zero());
        let reply = match timeout {
            None => rx.await,
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.shared.pending.lock().await.remove(&request_id);
                    return Err(CodexError::RequestTimeout {
                        method: method.to_string(),
                        timeout: duration,
                    });
                }
            },
        };

        match reply {
            Ok(result) => result,
            Err(_) => Err(CodexError::connection(
                "App-server connection closed before response.",
            )),
        }
    }

    /// Send a fire-and-forget notification
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<()> {
        let mut payload = json!({"method": method});
        if let Some(params) = params {
            payload["params"] = params;
        }
        self.send(&payload).await
    }

    async fn send(&self, payload: &Value) -> Result<()> {
        let mut line = payload.to_string();
        line.push('\n');
        self.transport.lock().await.write(&line).await
    }

    /// Start a thread and turn for the prompt; events then flow through
    /// [`Self::next_event`] until the end sentinel
    ///
    /// # Errors
    /// Returns `Connection` if the app-server yields no thread id, and
    /// propagates handshake/request failures.
    pub async fn run_query(&mut self, prompt: &str) -> Result<()> {
        self.start().await?;

        let mut thread_params = Map::new();
        if let Some(policy) = self.options.ask_for_approval {
            thread_params.insert("approvalPolicy".into(), json!(policy.as_str()));
        }
        if let Some(ref cwd) = self.options.cwd {
            thread_params.insert("cwd".into(), json!(cwd.to_string_lossy()));
        }
        if let Some(ref model) = self.options.model {
            thread_params.insert("model".into(), json!(model));
        }
        if let Some(sandbox) = self.options.sandbox {
            thread_params.insert("sandbox".into(), json!(sandbox.as_str()));
        }
        if let Some(tools) = self.serialize_dynamic_tools()? {
            thread_params.insert("dynamicTools".into(), tools);
        }
        if !self.options.config_overrides.is_empty() {
            thread_params.insert(
                "config".into(),
                Value::Object(self.options.config_overrides.clone().into_iter().collect()),
            );
        }

        let thread_result = match self.options.resume_session {
            Some(ref session) => {
                thread_params.insert("threadId".into(), json!(session.as_str()));
                self.send_request("thread/resume", Some(Value::Object(thread_params)))
                    .await?
            }
            None => {
                self.send_request("thread/start", Some(Value::Object(thread_params)))
                    .await?
            }
        };

        let thread_id = thread_result
            .get("thread")
            .and_then(|thread| thread.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                CodexError::connection("Failed to obtain thread id from app-server")
            })?;

        let mut turn_params = Map::new();
        turn_params.insert("threadId".into(), json!(thread_id));
        turn_params.insert(
            "input".into(),
            json!([{
                "type": "text",
                "text": prompt,
                "text_elements": [],
            }]),
        );
        if let Some(policy) = self.options.ask_for_approval {
            turn_params.insert("approvalPolicy".into(), json!(policy.as_str()));
        }
        if let Some(ref cwd) = self.options.cwd {
            turn_params.insert("cwd".into(), json!(cwd.to_string_lossy()));
        }
        if let Some(ref model) = self.options.model {
            turn_params.insert("model".into(), json!(model));
        }
        if let Some(schema) = load_output_schema(&self.options) {
            turn_params.insert("outputSchema".into(), schema);
        }
        self.send_request("turn/start", Some(Value::Object(turn_params)))
            .await?;

        Ok(())
    }

    /// Next event from the stream, or `None` once it ends
    ///
    /// # Errors
    /// Returns `ProtocolStream` if the read loop failed.
    pub async fn next_event(&mut self) -> Option<Result<Value>> {
        match self.events.recv().await? {
            QueueItem::Frame(frame) => Some(Ok(frame)),
            QueueItem::End => None,
            QueueItem::Error(text) => Some(Err(CodexError::protocol_stream(format!(
                "App-server stream failed: {text}"
            )))),
        }
    }

    /// List configured MCP servers and their status
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn mcp_status_list(&mut self) -> Result<Value> {
        self.start().await?;
        self.send_request("mcpServerStatus/list", Some(json!({})))
            .await
    }

    /// Reload the MCP server configuration
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn mcp_reload(&mut self) -> Result<Value> {
        self.start().await?;
        self.send_request("config/mcpServer/reload", Some(json!({})))
            .await
    }

    /// Shut down: fail pending requests, stop the read loop, close the
    /// transport
    ///
    /// # Errors
    /// Returns error if transport shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared
            .fail_pending(|| {
                CodexError::connection("App-server client closed with pending requests.")
            })
            .await;
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        let result = self.transport.lock().await.close().await;
        self.started = false;
        result
    }

    fn serialize_dynamic_tools(&self) -> Result<Option<Value>> {
        if self.options.dynamic_tools.is_empty() {
            return Ok(None);
        }
        let mut serialized = Vec::with_capacity(self.options.dynamic_tools.len());
        for tool in &self.options.dynamic_tools {
            serialized.push(json!({
                "name": tool.name.as_str(),
                "description": tool.description,
                "inputSchema": normalize_tool_input_schema(&tool.input_schema)?,
            }));
        }
        Ok(Some(Value::Array(serialized)))
    }
}

/// Output schema for `turn/start`: inline schemas pass through, schema file
/// paths are read and parsed, unreadable paths fall back to the path string
fn load_output_schema(options: &CodexAgentOptions) -> Option<Value> {
    match options.output_schema {
        None => None,
        Some(OutputSchema::Inline(ref schema)) => Some(schema.clone()),
        Some(OutputSchema::Path(ref path)) => {
            if let Ok(contents) = std::fs::read_to_string(path) {
                if let Ok(parsed) = serde_json::from_str::<Value>(&contents) {
                    return Some(parsed);
                }
            }
            Some(json!(path.to_string_lossy()))
        }
    }
}

/// Reply ids are matched as strings; numeric ids stringify
fn id_string(id: &Value) -> String {
    match id.as_str() {
        Some(s) => s.to_string(),
        None => id.to_string(),
    }
}

/// Id of an inbound reply, for lookup in the pending-request table
fn reply_id(id: &Value) -> RequestId {
    RequestId::new(id_string(id))
}

fn spawn_read_loop<T: Transport + 'static>(
    mut raw_rx: mpsc::UnboundedReceiver<Result<Value>>,
    shared: Arc<EngineShared>,
    events_tx: mpsc::Sender<QueueItem>,
    transport: Arc<Mutex<T>>,
    options: Arc<CodexAgentOptions>,
    tools: Arc<HashMap<String, CodexTool>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = raw_rx.recv().await {
            if shared.closed.load(Ordering::SeqCst) {
                break;
            }
            match result {
                Ok(message) => {
                    dispatch_frame(
                        message,
                        &shared,
                        &events_tx,
                        &transport,
                        &options,
                        &tools,
                    )
                    .await;
                }
                Err(e) => {
                    error!("Fatal error in app-server reader: {e}");
                    let text = e.to_string();
                    shared
                        .fail_pending(|| CodexError::protocol_stream(text.clone()))
                        .await;
                    let _ = events_tx.send(QueueItem::Error(text)).await;
                    break;
                }
            }
        }

        shared
            .fail_pending(|| {
                CodexError::connection("App-server connection closed before response.")
            })
            .await;
        let _ = events_tx.send(QueueItem::End).await;
    })
}

/// Route one inbound frame: reply, server request, notification, or raw
async fn dispatch_frame<T: Transport + 'static>(
    message: Value,
    shared: &Arc<EngineShared>,
    events_tx: &mpsc::Sender<QueueItem>,
    transport: &Arc<Mutex<T>>,
    options: &Arc<CodexAgentOptions>,
    tools: &Arc<HashMap<String, CodexTool>>,
) {
    let has_id = message.get("id").is_some();
    let has_outcome = message.get("result").is_some() || message.get("error").is_some();

    // Reply to one of our requests
    if has_id && has_outcome {
        let request_id = message
            .get("id")
            .map(reply_id)
            .unwrap_or_else(|| RequestId::new(""));
        let sender = shared.pending.lock().await.remove(&request_id);
        let Some(sender) = sender else {
            debug!("Ignoring unexpected response id: {request_id}");
            return;
        };
        let outcome = if message.get("error").is_some() {
            Err(CodexError::ProtocolStream {
                message: "App-server returned an error response.".to_string(),
                method: message
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                payload: message.get("error").filter(|e| e.is_object()).cloned(),
            })
        } else {
            Ok(message.get("result").cloned().unwrap_or_else(|| json!({})))
        };
        let _ = sender.send(outcome);
        return;
    }

    let has_method = message.get("method").is_some();

    // Server request: handled concurrently so a slow callback cannot stall
    // the stream
    if has_method && has_id {
        let transport = transport.clone();
        let options = options.clone();
        let tools = tools.clone();
        tokio::spawn(async move {
            handle_server_request(message, &transport, &options, &tools).await;
        });
        return;
    }

    // Server notification: merged into a flat event with a dotted type
    if has_method {
        let _ = events_tx
            .send(QueueItem::Frame(normalize_notification(message)))
            .await;
        return;
    }

    let _ = events_tx.send(QueueItem::Frame(message)).await;
}

/// Flatten a notification into `{"type": "a.b", ...params}`
fn normalize_notification(message: Value) -> Value {
    let method = message.get("method").and_then(Value::as_str);
    let params = message.get("params").and_then(Value::as_object);
    match (method, params) {
        (Some(method), Some(params)) => {
            let mut normalized = Map::new();
            normalized.insert("type".into(), json!(method.replace('/', ".")));
            for (key, value) in params {
                normalized.insert(key.clone(), value.clone());
            }
            Value::Object(normalized)
        }
        _ => message,
    }
}

/// Answer one server request and write the reply
async fn handle_server_request<T: Transport + 'static>(
    message: Value,
    transport: &Arc<Mutex<T>>,
    options: &Arc<CodexAgentOptions>,
    tools: &Arc<HashMap<String, CodexTool>>,
) {
    let request_id = message.get("id").map(id_string).unwrap_or_default();
    let method = message
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = match message.get("params") {
        Some(params) if params.is_object() => params.clone(),
        _ => json!({}),
    };

    let reply = match method.as_str() {
        "item/tool/call" => result_reply(
            &request_id,
            handlers::handle_dynamic_tool_call(tools, &params).await,
        ),
        "item/tool/requestUserInput" => result_reply(
            &request_id,
            handlers::handle_tool_user_input(options, params).await,
        ),
        "item/commandExecution/requestApproval" => result_reply(
            &request_id,
            handlers::handle_approval(options, "command", params, "command approval callback")
                .await,
        ),
        "item/fileChange/requestApproval" => result_reply(
            &request_id,
            handlers::handle_approval(
                options,
                "file_change",
                params,
                "file change approval callback",
            )
            .await,
        ),
        "execCommandApproval" | "applyPatchApproval" => result_reply(
            &request_id,
            handlers::handle_legacy_approval(options, &method, params).await,
        ),
        _ => json!({
            "id": request_id,
            "error": {
                "code": -32601,
                "message": format!("Method {method} not supported"),
            },
        }),
    };

    let mut line = reply.to_string();
    line.push('\n');
    if let Err(e) = transport.lock().await.write(&line).await {
        warn!("Failed to reply to server request {method}: {e}");
    }
}

/// Wrap a handler outcome into a result or error reply
fn result_reply(request_id: &str, outcome: Result<Value>) -> Value {
    match outcome {
        Ok(result) => json!({"id": request_id, "result": result}),
        Err(e) => json!({
            "id": request_id,
            "error": {"code": -32603, "message": e.to_string()},
        }),
    }
}
