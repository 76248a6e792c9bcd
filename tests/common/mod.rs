//! Shared test support: a scripted in-memory transport.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use codex_agent_sdk::{CodexError, Transport};

/// Write an executable stand-in CLI that runs the given shell body.
///
/// Keep the returned directory alive for the duration of the test.
pub fn fake_cli(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake-codex");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    (dir, path)
}

/// Closure deciding which frames to feed back for each written frame.
pub type Responder = Box<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// Handle for inspecting and driving a [`ScriptedTransport`] from a test.
#[derive(Clone)]
pub struct ScriptHandle {
    written: Arc<Mutex<Vec<Value>>>,
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Result<Value, CodexError>>>>>,
}

impl ScriptHandle {
    /// Everything the client has written, parsed as JSON frames.
    pub fn written(&self) -> Vec<Value> {
        self.written.lock().unwrap().clone()
    }

    /// Inject an unsolicited frame, as if the server had sent it.
    pub fn push_frame(&self, frame: Value) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(frame));
        }
    }

    /// Inject a read failure.
    pub fn push_error(&self, error: CodexError) {
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            let _ = tx.send(Err(error));
        }
    }

    /// End the inbound stream.
    pub fn end_stream(&self) {
        *self.tx.lock().unwrap() = None;
    }

    /// Wait until the client writes a frame matching the predicate.
    pub async fn wait_for_written(&self, predicate: impl Fn(&Value) -> bool) -> Value {
        for _ in 0..200 {
            if let Some(frame) = self.written().iter().find(|f| predicate(f)) {
                return frame.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no matching frame written; saw {:?}", self.written());
    }
}

/// In-memory transport driven by a responder closure.
pub struct ScriptedTransport {
    responder: Responder,
    written: Arc<Mutex<Vec<Value>>>,
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<Result<Value, CodexError>>>>>,
    connected: bool,
}

impl ScriptedTransport {
    pub fn new(responder: Responder) -> (Self, ScriptHandle) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let tx = Arc::new(Mutex::new(None));
        let handle = ScriptHandle {
            written: written.clone(),
            tx: tx.clone(),
        };
        (
            Self {
                responder,
                written,
                tx,
                connected: false,
            },
            handle,
        )
    }

    /// Transport that never responds to anything.
    pub fn silent() -> (Self, ScriptHandle) {
        Self::new(Box::new(|_| Vec::new()))
    }

    /// Transport that acknowledges every request with a canned result.
    ///
    /// `initialize` gets an empty result, `thread/start` and `thread/resume`
    /// yield a thread id, everything else an empty object.
    pub fn auto_responder() -> (Self, ScriptHandle) {
        Self::new(Box::new(|frame| {
            let id = match frame.get("id") {
                Some(id) => id.clone(),
                None => return Vec::new(),
            };
            if frame.get("method").is_none() {
                // A reply we wrote, not a request.
                return Vec::new();
            }
            let method = frame.get("method").and_then(Value::as_str).unwrap_or("");
            let result = match method {
                "thread/start" | "thread/resume" => {
                    serde_json::json!({"thread": {"id": "thread_1"}})
                }
                _ => serde_json::json!({}),
            };
            vec![serde_json::json!({"id": id, "result": result})]
        }))
    }
}

impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<(), CodexError> {
        self.connected = true;
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<(), CodexError> {
        let frame: Value = serde_json::from_str(data.trim())?;
        self.written.lock().unwrap().push(frame.clone());
        let replies = (self.responder)(&frame);
        if let Some(tx) = self.tx.lock().unwrap().as_ref() {
            for reply in replies {
                let _ = tx.send(Ok(reply));
            }
        }
        Ok(())
    }

    async fn end_input(&mut self) -> Result<(), CodexError> {
        Ok(())
    }

    fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<Value, CodexError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.tx.lock().unwrap() = Some(tx);
        rx
    }

    fn is_ready(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) -> Result<(), CodexError> {
        self.connected = false;
        *self.tx.lock().unwrap() = None;
        Ok(())
    }
}
