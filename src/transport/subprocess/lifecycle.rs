//! Lifecycle management for the subprocess transport (connect, close)

use std::collections::HashMap;
use std::env;
use std::process::Stdio;
use std::sync::atomic::Ordering;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{CodexError, Result};
use crate::VERSION;

use super::command::CommandBuilder;
use super::config::{PromptSpec, TransportMode, ENTRYPOINT_ENV_VAR, VERSION_ENV_VAR};
use super::transport::SubprocessTransport;

impl SubprocessTransport {
    /// Spawn the Codex CLI process and wire up stdio
    ///
    /// Idempotent: a second call on a live process is a no-op.
    ///
    /// # Errors
    /// Returns error if spawning fails or stdio handles cannot be obtained
    pub(super) async fn connect_impl(&mut self) -> Result<()> {
        if self.process.lock().await.is_some() {
            return Ok(());
        }
        self.write_error = None;

        let builder = CommandBuilder::new(&self.cli_path, &self.mode, &self.options);
        let mut cmd = builder.build();

        let process_env = self.build_process_env();
        cmd.env_clear();
        cmd.envs(process_env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        // Stderr is only piped when a callback wants the lines; otherwise the
        // child inherits ours.
        let pipe_stderr = self.options.stderr.is_some();
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(
            if pipe_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            },
        );

        let mut child = cmd.spawn().map_err(|e| {
            if let Some(ref cwd) = self.cwd {
                if !cwd.exists() {
                    return CodexError::connection(format!(
                        "Working directory does not exist: {}",
                        cwd.display()
                    ));
                }
            }
            if e.kind() == std::io::ErrorKind::NotFound {
                CodexError::CliNotFound(format!(
                    "Codex CLI not found at: {}",
                    self.cli_path.display()
                ))
            } else {
                CodexError::connection(format!("Failed to start Codex CLI: {e}"))
            }
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CodexError::connection("Failed to get stdin handle"))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CodexError::connection("Failed to get stdout handle"))?;

        if pipe_stderr {
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| CodexError::connection("Failed to get stderr handle"))?;
            let callback = self
                .options
                .stderr
                .clone()
                .ok_or_else(|| CodexError::connection("stderr callback disappeared"))?;

            let stderr_task = tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let trimmed = line.trim_end();
                    if trimmed.is_empty() {
                        continue;
                    }
                    callback(trimmed);
                }
            });
            self.stderr_task = Some(stderr_task);
        }

        self.stdin = Some(stdin);
        self.stdout = Some(BufReader::new(stdout));
        *self.process.lock().await = Some(child);
        self.ready.store(true, Ordering::SeqCst);

        // One-shot text prompts close stdin right away; streamed prompts and
        // the app-server keep it open.
        if matches!(self.mode, TransportMode::Exec(PromptSpec::Text(_))) {
            if let Some(mut stdin) = self.stdin.take() {
                let _ = stdin.shutdown().await;
            }
        }

        Ok(())
    }

    /// Build the child environment: inherit (filtered), overlay explicit
    /// variables, then tag the SDK entrypoint
    pub(super) fn build_process_env(&self) -> HashMap<String, String> {
        let mut process_env: HashMap<String, String> = if self.options.inherit_env {
            env::vars().collect()
        } else {
            HashMap::new()
        };

        if !self.options.env_allowlist.is_empty() {
            let allowlist: std::collections::HashSet<&str> = self
                .options
                .env_allowlist
                .iter()
                .map(String::as_str)
                .collect();
            if self.options.inherit_env {
                process_env.retain(|key, _| allowlist.contains(key.as_str()));
            } else {
                process_env = env::vars()
                    .filter(|(key, _)| allowlist.contains(key.as_str()))
                    .collect();
            }
        }

        for key in &self.options.env_denylist {
            process_env.remove(key);
        }

        for (key, value) in &self.options.env {
            process_env.insert(key.clone(), value.clone());
        }

        process_env.insert(ENTRYPOINT_ENV_VAR.to_string(), "sdk-rust".to_string());
        process_env.insert(VERSION_ENV_VAR.to_string(), VERSION.to_string());

        process_env
    }

    /// Close the transport and clean up resources
    ///
    /// # Errors
    /// Returns error if waiting on the child fails
    pub(super) async fn close_impl(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);

        // Close stdin to signal the process to exit gracefully
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        self.stdout = None;

        let child = self.process.lock().await.take();
        if let Some(mut child) = child {
            let timeout_duration = std::time::Duration::from_secs(5);

            match tokio::time::timeout(timeout_duration, child.wait()).await {
                Ok(Ok(_status)) => {}
                Ok(Err(e)) => {
                    return Err(CodexError::Io(e));
                }
                Err(_) => {
                    // Graceful window elapsed
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                }
            }
        }

        Ok(())
    }

    /// Drop cleanup: best-effort, no awaiting
    pub(super) fn drop_impl(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            drop(stdin);
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        if let Ok(mut guard) = self.process.try_lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.start_kill();
            }
        }
    }
}
