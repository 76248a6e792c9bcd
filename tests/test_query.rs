//! Tests for the query message queue and event hook dispatch.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::json;
use tokio::sync::Mutex;

use codex_agent_sdk::{
    event_hook, CodexAgentOptions, CodexError, EventHooks, Message, Query, Transport,
};
use common::{fake_cli, ScriptedTransport};

#[tokio::test]
async fn frames_flow_through_until_end_of_stream() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (mut transport, handle) = ScriptedTransport::silent();
    transport.connect().await.unwrap();
    let mut query = Query::new(Arc::new(Mutex::new(transport)));
    query.start().await;

    handle.push_frame(json!({"type": "turn.started"}));
    handle.push_frame(json!({"type": "turn.completed"}));
    handle.end_stream();

    let first = query.next_message().await.unwrap().unwrap();
    assert_eq!(first["type"], "turn.started");
    let second = query.next_message().await.unwrap().unwrap();
    assert_eq!(second["type"], "turn.completed");
    assert!(query.next_message().await.is_none());
}

#[tokio::test]
async fn reader_failure_surfaces_then_stream_ends() {
    let (mut transport, handle) = ScriptedTransport::silent();
    transport.connect().await.unwrap();
    let mut query = Query::new(Arc::new(Mutex::new(transport)));
    query.start().await;

    handle.push_frame(json!({"type": "turn.started"}));
    handle.push_error(CodexError::connection("pipe broke"));

    assert!(query.next_message().await.unwrap().is_ok());
    let err = query.next_message().await.unwrap().unwrap_err();
    match err {
        CodexError::ProtocolStream { message, .. } => {
            assert!(message.contains("Query stream failed"), "got {message}");
            assert!(message.contains("pipe broke"), "got {message}");
        }
        other => panic!("expected protocol stream error, got {other:?}"),
    }
    assert!(query.next_message().await.is_none());
}

#[tokio::test]
async fn close_shuts_down_the_transport() {
    let (mut transport, _handle) = ScriptedTransport::silent();
    transport.connect().await.unwrap();
    let transport = Arc::new(Mutex::new(transport));
    let mut query = Query::new(transport.clone());
    query.start().await;

    query.close().await.unwrap();
    assert!(!transport.lock().await.is_ready());
}

#[tokio::test]
async fn spawned_input_is_forwarded_to_the_transport() {
    use futures::StreamExt;

    let (mut transport, handle) = ScriptedTransport::silent();
    transport.connect().await.unwrap();
    let mut query = Query::new(Arc::new(Mutex::new(transport)));
    query.start().await;

    let chunks = futures::stream::iter(vec![
        "{\"text\":\"part one\"}\n".to_string(),
        "{\"text\":\"part two\"}\n".to_string(),
    ]);
    query.spawn_input(chunks.boxed());

    handle
        .wait_for_written(|frame| frame["text"] == "part two")
        .await;
    let written = handle.written();
    assert_eq!(written[0]["text"], "part one");
}

#[tokio::test]
async fn wildcard_hooks_run_before_kind_hooks() {
    let order = Arc::new(StdMutex::new(Vec::new()));

    let wildcard_order = order.clone();
    let turn_order = order.clone();
    let hooks = EventHooks::new()
        .with(
            "*",
            event_hook(move |_message| {
                let order = wildcard_order.clone();
                async move {
                    order.lock().unwrap().push("wildcard");
                    Ok(())
                }
            }),
        )
        .with(
            "turn",
            event_hook(move |_message| {
                let order = turn_order.clone();
                async move {
                    order.lock().unwrap().push("turn");
                    Ok(())
                }
            }),
        );

    let message = codex_agent_sdk::parse_message(json!({"type": "turn.completed"})).unwrap();
    hooks.dispatch(&message).await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["wildcard", "turn"]);
}

#[tokio::test]
async fn hooks_only_fire_for_matching_kinds() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let hooks = EventHooks::new().with(
        "tool",
        event_hook(move |_message| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );

    let turn = codex_agent_sdk::parse_message(json!({"type": "turn.completed"})).unwrap();
    hooks.dispatch(&turn).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let tool = codex_agent_sdk::parse_message(json!({
        "type": "item.completed",
        "item": {"type": "tool_call", "name": "search"},
    }))
    .unwrap();
    hooks.dispatch(&tool).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hook_abort_ends_the_query_stream_without_an_error() {
    use futures::StreamExt;

    let script = r#"echo '{"type": "item.completed", "item": {"type": "agent_message", "text": "hi"}}'
echo '{"type": "turn.completed"}'
echo '{"type": "item.completed", "item": {"type": "agent_message", "text": "late"}}'"#;
    let (_dir, cli_path) = fake_cli(script);

    let hooks = EventHooks::new().with(
        "*",
        event_hook(|message: Message| async move {
            if message.kind() == "turn" {
                Err(CodexError::hook_abort("turn finished"))
            } else {
                Ok(())
            }
        }),
    );
    let mut options = CodexAgentOptions::builder().event_hooks(hooks).build();
    options.cli_path = Some(cli_path);

    let stream = codex_agent_sdk::query("hello", options);
    let messages: Vec<_> = std::pin::pin!(stream).collect().await;

    // The aborting event and everything after it are dropped, and the
    // abort itself never surfaces as an error item.
    let kinds: Vec<&str> = messages
        .iter()
        .map(|result| result.as_ref().unwrap().kind())
        .collect();
    assert_eq!(kinds, vec!["item"]);
}

#[tokio::test]
async fn hook_abort_propagates_out_of_dispatch() {
    let hooks = EventHooks::new().with(
        "*",
        event_hook(|message: Message| async move {
            if message.kind() == "turn" {
                Err(CodexError::hook_abort("done watching"))
            } else {
                Ok(())
            }
        }),
    );

    let item = codex_agent_sdk::parse_message(json!({
        "type": "item.completed",
        "item": {"type": "agent_message", "text": "hi"},
    }))
    .unwrap();
    assert!(hooks.dispatch(&item).await.is_ok());

    let turn = codex_agent_sdk::parse_message(json!({"type": "turn.completed"})).unwrap();
    let err = hooks.dispatch(&turn).await.unwrap_err();
    assert!(codex_agent_sdk::hooks::is_hook_abort(&err));
}
