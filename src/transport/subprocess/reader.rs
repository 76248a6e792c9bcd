//! Message framing for the subprocess transport

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use crate::error::{CodexError, Result};

use super::transport::SubprocessTransport;

impl SubprocessTransport {
    /// Spawn the background task that frames JSON messages out of stdout
    ///
    /// Codex can interleave plain log lines with JSON in `--json` mode, and a
    /// single JSON object can span multiple lines. The framer accumulates
    /// candidate lines until they parse, skips log lines, and discards a
    /// partial buffer when a log line interrupts it.
    pub(super) fn read_messages_impl(
        &mut self,
    ) -> mpsc::UnboundedReceiver<Result<serde_json::Value>> {
        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = self.stdout.take();
        let process = self.process.clone();
        let max_buffer_size = self.max_buffer_size;

        let task = tokio::spawn(async move {
            let Some(mut stdout) = stdout else {
                let _ = tx.send(Err(CodexError::connection(
                    "Not connected - stdout not available",
                )));
                return;
            };
            let mut json_buffer = String::new();

            loop {
                let mut line = String::new();
                match stdout.read_line(&mut line).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        if !line.starts_with('{') {
                            // A log line interrupting a partial object means
                            // the object will never complete.
                            json_buffer.clear();
                            continue;
                        }

                        json_buffer.push_str(line);

                        if json_buffer.len() > max_buffer_size {
                            let size = json_buffer.len();
                            let _ = tx.send(Err(CodexError::BufferOverflow {
                                size,
                                limit: max_buffer_size,
                            }));
                            return;
                        }

                        if let Ok(data) = serde_json::from_str::<serde_json::Value>(&json_buffer) {
                            json_buffer.clear();
                            if tx.send(Ok(data)).is_err() {
                                // Receiver dropped, stop reading
                                return;
                            }
                        }
                        // Otherwise not complete yet, keep accumulating
                    }
                    Err(e) => {
                        let _ = tx.send(Err(CodexError::Io(e)));
                        return;
                    }
                }
            }

            // Surface a non-zero exit as an error after the output drains
            let child = process.lock().await.take();
            if let Some(mut child) = child {
                match child.wait().await {
                    Ok(status) => {
                        if !status.success() {
                            let code = status.code().unwrap_or(-1);
                            let _ = tx.send(Err(CodexError::process(
                                format!("Command failed with exit code {code}"),
                                code,
                                Some("Check stderr output for details".to_string()),
                            )));
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(CodexError::Io(e)));
                    }
                }
            }
        });

        self.reader_task = Some(task);

        rx
    }
}
