mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn health_and_unknown_method() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(health.get("workspacePath"), Some(&serde_json::Value::Null));
    assert_eq!(health.get("authenticated").and_then(|v| v.as_bool()), Some(false));

    let error = request_err(&mut stdin, &mut reader, "2", "no.such.method", json!({}));
    assert_eq!(
        error.get("code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );
}

#[test]
fn backend_calls_require_workspace_and_session() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let error = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "backend.connect",
        json!({ "baseUrl": "http://127.0.0.1:1" }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("no_workspace"));

    let workspace = temp_dir("learnhub-smoke");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backend.connect",
        json!({ "baseUrl": "http://127.0.0.1:1" }),
    );

    // Session-gated calls are rejected locally; nothing hits the network.
    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "progress.markLesson",
        json!({ "courseId": "c1", "lessonId": "l1" }),
    );
    assert_eq!(
        error.get("code").and_then(|v| v.as_str()),
        Some("not_authenticated")
    );
}
