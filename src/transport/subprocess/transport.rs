//! Subprocess transport backed by the Codex CLI

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::{CodexError, Result};
use crate::types::options::{CodexAgentOptions, OutputSchema};
use crate::Transport;

use super::config::{TransportMode, DEFAULT_MAX_BUFFER_SIZE};

/// Subprocess transport for the Codex CLI
#[derive(Debug)]
pub struct SubprocessTransport {
    pub(super) mode: TransportMode,
    pub(super) options: CodexAgentOptions,
    pub(super) cli_path: PathBuf,
    pub(super) cwd: Option<PathBuf>,
    pub(super) process: Arc<Mutex<Option<Child>>>,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) stdout: Option<BufReader<ChildStdout>>,
    pub(super) ready: Arc<AtomicBool>,
    pub(super) max_buffer_size: usize,
    pub(super) reader_task: Option<JoinHandle<()>>,
    pub(super) stderr_task: Option<JoinHandle<()>>,
    pub(super) write_error: Option<String>,
}

impl SubprocessTransport {
    /// Create a new subprocess transport
    ///
    /// # Arguments
    /// * `mode` - Exec (one-shot) or app-server (bidirectional)
    /// * `options` - Configuration options
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found or the options are invalid
    /// for the requested mode
    pub fn new(mode: TransportMode, options: CodexAgentOptions) -> Result<Self> {
        let cli_path = match options.cli_path {
            Some(ref path) => path.clone(),
            None => Self::find_cli()?,
        };

        if matches!(mode, TransportMode::Exec(_)) {
            if let Some(OutputSchema::Inline(_)) = options.output_schema {
                return Err(CodexError::invalid_config(
                    "Inline output schemas require app-server mode; \
                     pass OutputSchema::Path for one-shot runs",
                ));
            }
        }

        let cwd = options.cwd.clone();
        let max_buffer_size = options.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE);

        Ok(Self {
            mode,
            options,
            cli_path,
            cwd,
            process: Arc::new(Mutex::new(None)),
            stdin: None,
            stdout: None,
            ready: Arc::new(AtomicBool::new(false)),
            max_buffer_size,
            reader_task: None,
            stderr_task: None,
            write_error: None,
        })
    }

    /// Find the Codex CLI binary
    ///
    /// # Errors
    /// Returns error if the CLI is not on PATH or in common locations
    pub fn find_cli() -> Result<PathBuf> {
        if let Ok(path) = which::which("codex") {
            return Ok(path);
        }

        let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = vec![
            PathBuf::from(home.clone()).join(".local/bin/codex"),
            PathBuf::from("/usr/local/bin/codex"),
            PathBuf::from(home).join("node_modules/.bin/codex"),
        ];

        for path in locations {
            if path.exists() && path.is_file() {
                return Ok(path);
            }
        }

        Err(CodexError::cli_not_found())
    }
}

impl Transport for SubprocessTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_impl().await
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if let Some(ref earlier) = self.write_error {
            return Err(CodexError::connection(format!(
                "Cannot write after earlier failure: {earlier}"
            )));
        }
        if !self.is_ready() {
            return Err(CodexError::connection("Transport is not ready for writing"));
        }

        // A child that already exited will never read the write
        {
            let mut guard = self.process.lock().await;
            if let Some(child) = guard.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    let code = status.code().unwrap_or(-1);
                    let message =
                        format!("Cannot write to terminated process (exit code {code})");
                    self.ready.store(false, Ordering::SeqCst);
                    self.write_error = Some(message.clone());
                    return Err(CodexError::connection(message));
                }
            }
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CodexError::connection("stdin not available"))?;

        let outcome = match stdin.write_all(data.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            let message = format!("Failed to write to process stdin: {e}");
            self.ready.store(false, Ordering::SeqCst);
            self.write_error = Some(message.clone());
            return Err(CodexError::connection(message));
        }

        Ok(())
    }

    async fn end_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| CodexError::connection(format!("Failed to close stdin: {e}")))?;
        }
        Ok(())
    }

    fn read_messages(&mut self) -> mpsc::UnboundedReceiver<Result<serde_json::Value>> {
        self.read_messages_impl()
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.close_impl().await
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        self.drop_impl();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::config::PromptSpec;
    use super::*;

    #[test]
    fn inline_output_schema_is_rejected_in_exec_mode() {
        let mut options = CodexAgentOptions::default();
        options.cli_path = Some("/usr/bin/true".into());
        options.output_schema = Some(OutputSchema::Inline(json!({"type": "object"})));

        let err = SubprocessTransport::new(
            TransportMode::Exec(PromptSpec::Stdin),
            options.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, CodexError::InvalidConfig(_)));

        // The same schema is fine for app-server runs
        assert!(SubprocessTransport::new(TransportMode::AppServer, options).is_ok());
    }

    #[test]
    fn explicit_cli_path_skips_discovery() {
        let mut options = CodexAgentOptions::default();
        options.cli_path = Some("/nonexistent/codex".into());
        let transport =
            SubprocessTransport::new(TransportMode::AppServer, options).expect("transport");
        assert_eq!(transport.cli_path, PathBuf::from("/nonexistent/codex"));
        assert!(!transport.is_ready());
    }
}
