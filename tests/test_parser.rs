//! Tests for the message classifier and the default stopping rule.

use serde_json::json;

use codex_agent_sdk::message::{default_final_event_predicate, extract_session_id, extract_text};
use codex_agent_sdk::{parse_message, CodexError, Message};

#[test]
fn error_string_is_extracted() {
    let message = parse_message(json!({"type": "error", "error": "boom"})).unwrap();
    match message {
        Message::Error { error, .. } => assert_eq!(error.as_deref(), Some("boom")),
        other => panic!("expected error message, got {other:?}"),
    }
}

#[test]
fn error_object_uses_message_field() {
    let message =
        parse_message(json!({"error": {"message": "bad request", "code": 400}})).unwrap();
    match message {
        Message::Error { error, .. } => assert_eq!(error.as_deref(), Some("bad request")),
        other => panic!("expected error message, got {other:?}"),
    }
}

#[test]
fn failed_status_with_error_message_key() {
    let message =
        parse_message(json!({"status": "failed", "errorMessage": "out of fuel"})).unwrap();
    match message {
        Message::Error { error, status, .. } => {
            assert_eq!(error.as_deref(), Some("out of fuel"));
            assert_eq!(status.as_deref(), Some("failed"));
        }
        other => panic!("expected error message, got {other:?}"),
    }
}

#[test]
fn null_error_key_still_classifies_as_error() {
    let message = parse_message(json!({"type": "turn.completed", "error": null})).unwrap();
    assert!(matches!(message, Message::Error { error: None, .. }));
}

#[test]
fn thread_lifecycle_event() {
    let message =
        parse_message(json!({"type": "thread.started", "thread_id": "t_42"})).unwrap();
    match message {
        Message::Thread {
            event_type,
            session_id,
            ..
        } => {
            assert_eq!(event_type, "thread.started");
            assert_eq!(session_id.as_deref(), Some("t_42"));
        }
        other => panic!("expected thread message, got {other:?}"),
    }
}

#[test]
fn turn_lifecycle_event() {
    let message = parse_message(json!({"type": "turn.completed"})).unwrap();
    assert!(matches!(message, Message::Turn { .. }));
}

#[test]
fn stdout_event_is_log_with_text() {
    let message = parse_message(json!({"type": "stdout", "text": "hello world"})).unwrap();
    match message {
        Message::Log { text, .. } => assert_eq!(text.as_deref(), Some("hello world")),
        other => panic!("expected log message, got {other:?}"),
    }
}

#[test]
fn agent_message_item_infers_assistant_role() {
    let message = parse_message(json!({
        "type": "item.completed",
        "item": {"type": "agent_message", "text": "The answer is 4."},
    }))
    .unwrap();
    match message {
        Message::Item {
            item_type,
            role,
            text,
            ..
        } => {
            assert_eq!(item_type.as_deref(), Some("agent_message"));
            assert_eq!(role.as_deref(), Some("assistant"));
            assert_eq!(text.as_deref(), Some("The answer is 4."));
        }
        other => panic!("expected item message, got {other:?}"),
    }
}

#[test]
fn user_message_item_infers_user_role() {
    let message = parse_message(json!({
        "type": "item.completed",
        "item": {"type": "user_message", "text": "hi"},
    }))
    .unwrap();
    match message {
        Message::Item { role, .. } => assert_eq!(role.as_deref(), Some("user")),
        other => panic!("expected item message, got {other:?}"),
    }
}

#[test]
fn command_execution_item_synthesizes_tool_input() {
    let message = parse_message(json!({
        "type": "item.started",
        "item": {
            "type": "command_execution",
            "command": "ls -la",
            "status": "in_progress",
        },
    }))
    .unwrap();
    match message {
        Message::Tool {
            tool_name,
            tool_input,
            status,
            ..
        } => {
            assert_eq!(tool_name.as_deref(), Some("command_execution"));
            assert_eq!(tool_input, Some(json!({"command": "ls -la"})));
            assert_eq!(status.as_deref(), Some("in_progress"));
        }
        other => panic!("expected tool message, got {other:?}"),
    }
}

#[test]
fn tool_item_prefers_explicit_name_and_output() {
    let message = parse_message(json!({
        "type": "item.completed",
        "item": {
            "type": "mcpToolCall",
            "name": "search",
            "input": {"query": "rust"},
            "output": "3 results",
        },
    }))
    .unwrap();
    match message {
        Message::Tool {
            tool_name,
            tool_input,
            tool_output,
            ..
        } => {
            assert_eq!(tool_name.as_deref(), Some("search"));
            assert_eq!(tool_input, Some(json!({"query": "rust"})));
            assert_eq!(tool_output, Some(json!("3 results")));
        }
        other => panic!("expected tool message, got {other:?}"),
    }
}

#[test]
fn best_effort_tool_detection_without_item_wrapper() {
    let message = parse_message(json!({
        "type": "tool_use",
        "name": "grep",
        "input": {"pattern": "fn main"},
    }))
    .unwrap();
    match message {
        Message::Tool {
            tool_name,
            tool_input,
            ..
        } => {
            assert_eq!(tool_name.as_deref(), Some("grep"));
            assert_eq!(tool_input, Some(json!({"pattern": "fn main"})));
        }
        other => panic!("expected tool message, got {other:?}"),
    }
}

#[test]
fn nested_message_block_yields_role_and_text() {
    let message = parse_message(json!({
        "message": {
            "role": "assistant",
            "content": [{"type": "text", "text": "partial "}, {"text": "answer"}],
        },
    }))
    .unwrap();
    match message {
        Message::Item { role, text, .. } => {
            assert_eq!(role.as_deref(), Some("assistant"));
            assert_eq!(text.as_deref(), Some("partial answer"));
        }
        other => panic!("expected item message, got {other:?}"),
    }
}

#[test]
fn delta_events_become_delta_items() {
    let message = parse_message(json!({"type": "response.delta", "delta": "chunk"})).unwrap();
    match message {
        Message::Item {
            item_type, text, ..
        } => {
            assert_eq!(item_type.as_deref(), Some("delta"));
            assert_eq!(text.as_deref(), Some("chunk"));
        }
        other => panic!("expected item message, got {other:?}"),
    }
}

#[test]
fn completion_shapes_classify_as_turn() {
    assert!(matches!(
        parse_message(json!({"type": "result"})).unwrap(),
        Message::Turn { .. }
    ));
    assert!(matches!(
        parse_message(json!({"final": true})).unwrap(),
        Message::Turn { .. }
    ));
    assert!(matches!(
        parse_message(json!({"status": "done"})).unwrap(),
        Message::Turn { .. }
    ));
}

#[test]
fn unrecognized_objects_fall_through_to_raw() {
    let message = parse_message(json!({"something": "else"})).unwrap();
    assert!(matches!(message, Message::Raw { .. }));
}

#[test]
fn non_object_input_is_a_parse_error() {
    let err = parse_message(json!(["not", "an", "object"])).unwrap_err();
    assert!(matches!(err, CodexError::MessageParse { .. }));
}

#[test]
fn extract_text_recurses_through_content() {
    let content = json!([
        {"content": [{"type": "text", "text": "a"}]},
        {"text": "b"},
        "c",
    ]);
    assert_eq!(extract_text(&content).as_deref(), Some("abc"));
}

#[test]
fn session_id_recognizes_camel_case_thread_key() {
    assert_eq!(
        extract_session_id(&json!({"threadId": "t_1"})).as_deref(),
        Some("t_1")
    );
    assert_eq!(extract_session_id(&json!({"id": "t_1"})), None);
}

#[test]
fn final_predicate_matrix() {
    let is_final = |raw: serde_json::Value| {
        default_final_event_predicate(&parse_message(raw).unwrap())
    };

    assert!(is_final(json!({"type": "error", "error": "boom"})));
    assert!(is_final(json!({"type": "turn.completed"})));
    assert!(is_final(json!({"type": "turn.ended", "status": "succeeded"})));
    assert!(is_final(json!({"type": "result"})));
    assert!(is_final(json!({"final": true})));
    assert!(is_final(json!({"status": "done"})));

    assert!(!is_final(json!({"type": "turn.started"})));
    assert!(!is_final(json!({"type": "thread.started"})));
    assert!(!is_final(json!({
        "type": "item.completed",
        "item": {"type": "agent_message", "text": "hi", "status": "completed"},
    })));
    assert!(!is_final(json!({"something": "else"})));
}
