//! Tests for the subprocess transport against a stand-in CLI: stdout
//! framing, buffer limits, exit surfacing, and write-path liveness.

mod common;

use std::time::Duration;

use serde_json::{json, Value};

use codex_agent_sdk::transport::{PromptSpec, TransportMode};
use codex_agent_sdk::{CodexAgentOptions, CodexError, SubprocessTransport, Transport};
use common::fake_cli;

fn exec_transport(
    script: &str,
    mut options: CodexAgentOptions,
    prompt: PromptSpec,
) -> (tempfile::TempDir, SubprocessTransport) {
    let (dir, path) = fake_cli(script);
    options.cli_path = Some(path);
    let transport =
        SubprocessTransport::new(TransportMode::Exec(prompt), options).expect("transport");
    (dir, transport)
}

async fn drain(transport: &mut SubprocessTransport) -> Vec<Result<Value, CodexError>> {
    transport.connect().await.unwrap();
    let mut rx = transport.read_messages();
    let mut frames = Vec::new();
    while let Some(item) = rx.recv().await {
        frames.push(item);
    }
    frames
}

#[tokio::test]
async fn log_line_discards_the_partial_buffer() {
    let _ = env_logger::builder().is_test(true).try_init();

    let script = r#"echo '{"partial":'
echo 'starting agent loop'
echo '{"type": "turn.completed"}'"#;
    let (_dir, mut transport) = exec_transport(
        script,
        CodexAgentOptions::default(),
        PromptSpec::Text("hello".to_string()),
    );

    let frames = drain(&mut transport).await;
    assert_eq!(frames.len(), 1, "got {frames:?}");
    assert_eq!(
        frames[0].as_ref().unwrap(),
        &json!({"type": "turn.completed"})
    );
}

#[tokio::test]
async fn json_objects_may_span_multiple_lines() {
    let script = r#"echo '{"outer":'
echo '{"inner": 1}}'"#;
    let (_dir, mut transport) = exec_transport(
        script,
        CodexAgentOptions::default(),
        PromptSpec::Text("hello".to_string()),
    );

    let frames = drain(&mut transport).await;
    assert_eq!(frames.len(), 1, "got {frames:?}");
    assert_eq!(frames[0].as_ref().unwrap(), &json!({"outer": {"inner": 1}}));
}

#[tokio::test]
async fn oversized_message_fails_the_stream_with_buffer_overflow() {
    let long = "a".repeat(90);
    let script = format!(
        "echo '{{\"data\": \"{long}\"}}'\necho '{{\"type\": \"turn.completed\"}}'"
    );
    let options = CodexAgentOptions::builder().max_buffer_size(64).build();
    let (_dir, mut transport) =
        exec_transport(&script, options, PromptSpec::Text("hello".to_string()));

    let frames = drain(&mut transport).await;
    assert_eq!(frames.len(), 1, "got {frames:?}");
    match frames[0].as_ref().unwrap_err() {
        CodexError::BufferOverflow { size, limit } => {
            assert_eq!(*limit, 64);
            assert!(*size > 64);
        }
        other => panic!("expected buffer overflow, got {other:?}"),
    }
}

#[tokio::test]
async fn nonzero_exit_surfaces_a_process_error() {
    let (_dir, mut transport) = exec_transport(
        "exit 7",
        CodexAgentOptions::default(),
        PromptSpec::Text("hello".to_string()),
    );

    let frames = drain(&mut transport).await;
    assert_eq!(frames.len(), 1, "got {frames:?}");
    match frames[0].as_ref().unwrap_err() {
        CodexError::Process {
            message, exit_code, ..
        } => {
            assert_eq!(*exit_code, 7);
            assert!(message.contains("exit code 7"), "got {message}");
        }
        other => panic!("expected process error, got {other:?}"),
    }
}

#[tokio::test]
async fn write_to_an_exited_child_fails_and_drops_readiness() {
    let (_dir, mut transport) = exec_transport(
        "exit 0",
        CodexAgentOptions::default(),
        PromptSpec::Stdin,
    );
    transport.connect().await.unwrap();
    assert!(transport.is_ready());

    // Give the child time to exit before probing the write path
    tokio::time::sleep(Duration::from_millis(500)).await;

    let err = transport.write("{\"first\": 1}\n").await.unwrap_err();
    assert!(matches!(err, CodexError::Connection(_)), "got {err:?}");
    assert!(!transport.is_ready());

    // The recorded failure keeps rejecting writes
    let err = transport.write("{\"second\": 2}\n").await.unwrap_err();
    match err {
        CodexError::Connection(message) => {
            assert!(
                message.contains("earlier failure"),
                "got {message}"
            );
        }
        other => panic!("expected connection error, got {other:?}"),
    }
}
