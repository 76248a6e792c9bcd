//! One-shot query execution
//!
//! [`Query`] demultiplexes the transport's output into a bounded message
//! queue with end/error sentinels, so the consuming stream observes a clean
//! end-of-stream even when the reader fails mid-run. The public [`query`]
//! function drives a whole one-shot interaction: spawn, stream, classify,
//! dispatch hooks, close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};
use log::{debug, error};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::app_server::AppServerClient;
use crate::error::{CodexError, Result};
use crate::hooks::is_hook_abort;
use crate::message::parse_message;
use crate::transport::{PromptSpec, SubprocessTransport, Transport, TransportMode};
use crate::types::messages::Message;
use crate::types::options::CodexAgentOptions;
use crate::types::prompt::{PromptInput, PromptStream};

/// Message queue capacity between the reader task and the consumer
const MESSAGE_QUEUE_CAPACITY: usize = 100;

/// Item flowing through the internal message queue
#[derive(Debug)]
pub(crate) enum QueueItem {
    /// One framed JSON message
    Frame(serde_json::Value),
    /// The stream ended; no more frames will arrive
    End,
    /// The reader failed; surfaced to the consumer, then the stream ends
    Error(String),
}

/// Streams framed messages out of a connected transport
pub struct Query<T: Transport + 'static> {
    transport: Arc<Mutex<T>>,
    messages: mpsc::Receiver<QueueItem>,
    message_tx: mpsc::Sender<QueueItem>,
    closed: Arc<AtomicBool>,
    read_task: Option<JoinHandle<()>>,
    input_task: Option<JoinHandle<()>>,
}

impl<T: Transport + 'static> Query<T> {
    /// Wrap a connected transport
    pub fn new(transport: Arc<Mutex<T>>) -> Self {
        let (message_tx, messages) = mpsc::channel(MESSAGE_QUEUE_CAPACITY);
        Self {
            transport,
            messages,
            message_tx,
            closed: Arc::new(AtomicBool::new(false)),
            read_task: None,
            input_task: None,
        }
    }

    /// Start the background reader
    ///
    /// Idempotent: a second call is a no-op.
    pub async fn start(&mut self) {
        if self.read_task.is_some() {
            return;
        }

        let mut raw_rx = self.transport.lock().await.read_messages();
        let tx = self.message_tx.clone();
        let closed = self.closed.clone();

        self.read_task = Some(tokio::spawn(async move {
            while let Some(result) = raw_rx.recv().await {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                match result {
                    Ok(frame) => {
                        if tx.send(QueueItem::Frame(frame)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!("Fatal error in message reader: {e}");
                        let _ = tx.send(QueueItem::Error(e.to_string())).await;
                        break;
                    }
                }
            }
            let _ = tx.send(QueueItem::End).await;
        }));
    }

    /// Forward a prompt stream to the transport's stdin, then end input
    pub fn spawn_input(&mut self, mut stream: PromptStream) {
        let transport = self.transport.clone();
        let closed = self.closed.clone();

        self.input_task = Some(tokio::spawn(async move {
            while let Some(chunk) = stream.next().await {
                if closed.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(e) = transport.lock().await.write(&chunk).await {
                    debug!("Error streaming input: {e}");
                    return;
                }
            }
            if let Err(e) = transport.lock().await.end_input().await {
                debug!("Error closing input: {e}");
            }
        }));
    }

    /// Next framed message, or `None` at end of stream
    ///
    /// # Errors
    /// Returns `ProtocolStream` if the background reader failed.
    pub async fn next_message(&mut self) -> Option<Result<serde_json::Value>> {
        match self.messages.recv().await? {
            QueueItem::Frame(frame) => Some(Ok(frame)),
            QueueItem::End => None,
            QueueItem::Error(text) => Some(Err(CodexError::protocol_stream(format!(
                "Query stream failed: {text}"
            )))),
        }
    }

    /// Stop the background tasks and close the transport
    ///
    /// # Errors
    /// Returns error if transport shutdown fails.
    pub async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
        if let Some(task) = self.input_task.take() {
            task.abort();
        }
        self.transport.lock().await.close().await
    }
}

/// Query Codex for a one-shot interaction
///
/// Spawns the Codex CLI (or an app-server session when the options call for
/// one), streams classified messages, and dispatches event hooks. A hook
/// abort ends the stream early without surfacing an error.
pub fn query(
    prompt: impl Into<PromptInput>,
    options: CodexAgentOptions,
) -> impl Stream<Item = Result<Message>> + Send {
    let prompt = prompt.into();

    stream! {
        if options.wants_app_server() {
            let PromptInput::Text(prompt) = prompt else {
                yield Err(CodexError::invalid_config(
                    "App-server mode currently requires a string prompt",
                ));
                return;
            };
            if options.resume_last || options.resume_all {
                yield Err(CodexError::invalid_config(
                    "App-server resume_last/resume_all is not supported; \
                     provide resume_session instead",
                ));
                return;
            }

            let mut client = match AppServerClient::spawn(options.clone()) {
                Ok(client) => client,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if let Err(e) = client.run_query(&prompt).await {
                let _ = client.close().await;
                yield Err(e);
                return;
            }

            loop {
                let Some(result) = client.next_event().await else {
                    break;
                };
                match classify_and_dispatch(result, &options).await {
                    Dispatched::Message(message) => yield Ok(message),
                    Dispatched::Aborted => break,
                    Dispatched::Failed(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }

            let _ = client.close().await;
            return;
        }

        let (spec, input_stream) = match prompt {
            PromptInput::Text(text) => (PromptSpec::Text(text), None),
            PromptInput::Stream(stream) => (PromptSpec::Stdin, Some(stream)),
        };

        let transport = match SubprocessTransport::new(TransportMode::Exec(spec), options.clone()) {
            Ok(transport) => transport,
            Err(e) => {
                yield Err(e);
                return;
            }
        };
        let transport = Arc::new(Mutex::new(transport));

        if let Err(e) = transport.lock().await.connect().await {
            yield Err(e);
            return;
        }

        let mut query = Query::new(transport);
        query.start().await;
        if let Some(input) = input_stream {
            query.spawn_input(input);
        }

        while let Some(result) = query.next_message().await {
            match classify_and_dispatch(result, &options).await {
                Dispatched::Message(message) => yield Ok(message),
                Dispatched::Aborted => break,
                Dispatched::Failed(e) => {
                    yield Err(e);
                    break;
                }
            }
        }

        if let Err(e) = query.close().await {
            yield Err(e);
        }
    }
}

/// Outcome of classifying one frame and running its hooks
enum Dispatched {
    Message(Message),
    Aborted,
    Failed(CodexError),
}

async fn classify_and_dispatch(
    result: Result<serde_json::Value>,
    options: &CodexAgentOptions,
) -> Dispatched {
    let frame = match result {
        Ok(frame) => frame,
        Err(e) => return Dispatched::Failed(e),
    };

    let parsed = match options.event_parser {
        Some(ref parser) => parser(&frame),
        None => parse_message(frame),
    };
    let message = match parsed {
        Ok(message) => message,
        Err(e) => return Dispatched::Failed(e),
    };

    if let Err(e) = options.event_hooks.dispatch(&message).await {
        if is_hook_abort(&e) {
            debug!("Event hook aborted streaming");
            return Dispatched::Aborted;
        }
        return Dispatched::Failed(e);
    }

    Dispatched::Message(message)
}
