mod test_support;

use serde_json::json;
use test_support::{
    connect_and_login, login_route, request_err, request_ok, spawn_sidecar, temp_dir, Route,
    StubServer,
};

#[test]
fn client_side_validation_blocks_network() {
    let server = StubServer::start(vec![login_route()]);
    let workspace = temp_dir("learnhub-auth-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backend.connect",
        json!({ "baseUrl": server.base_url }),
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "auth.login",
        json!({ "email": "student@example.com" }),
    );
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("validation_failed"));
    assert_eq!(
        error.pointer("/details/field").and_then(|v| v.as_str()),
        Some("password")
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "auth.register",
        json!({
            "name": "New User",
            "email": "new@example.com",
            "password": "secret123",
            "confirmPassword": "secret124"
        }),
    );
    assert_eq!(
        error.pointer("/details/field").and_then(|v| v.as_str()),
        Some("confirmPassword")
    );

    let error = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "auth.register",
        json!({
            "name": "New User",
            "email": "not-an-email",
            "password": "secret123",
            "confirmPassword": "secret123"
        }),
    );
    assert_eq!(
        error.pointer("/details/field").and_then(|v| v.as_str()),
        Some("email")
    );

    // None of the rejected submissions reached the backend.
    assert!(server.records().is_empty());
}

#[test]
fn login_attaches_token_and_logout_clears_it() {
    let server = StubServer::start(vec![
        login_route(),
        Route {
            method: "GET",
            path: "/auth/profile",
            status: 200,
            body: json!({
                "success": true,
                "user": {
                    "id": "user-1",
                    "name": "Test Student",
                    "email": "student@example.com",
                    "role": "student",
                    "points": 120,
                    "level": 2
                }
            }),
        },
    ]);
    let workspace = temp_dir("learnhub-auth-lifecycle");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    connect_and_login(&mut stdin, &mut reader, &workspace, &server.base_url);

    let result = request_ok(&mut stdin, &mut reader, "1", "auth.profile.get", json!({}));
    assert_eq!(result.pointer("/user/points").and_then(|v| v.as_i64()), Some(120));

    let records = server.records();
    let profile = records
        .iter()
        .find(|r| r.method == "GET" && r.target == "/auth/profile")
        .expect("profile request");
    assert_eq!(profile.authorization.as_deref(), Some("Bearer tok-123"));

    let _ = request_ok(&mut stdin, &mut reader, "2", "auth.logout", json!({}));
    let error = request_err(&mut stdin, &mut reader, "3", "auth.profile.get", json!({}));
    assert_eq!(
        error.get("code").and_then(|v| v.as_str()),
        Some("not_authenticated")
    );
}

#[test]
fn session_survives_a_restart() {
    let server = StubServer::start(vec![
        login_route(),
        Route {
            method: "GET",
            path: "/auth/profile",
            status: 200,
            body: json!({
                "success": true,
                "user": {
                    "id": "user-1",
                    "name": "Test Student",
                    "email": "student@example.com",
                    "role": "student",
                    "points": 0,
                    "level": 1
                }
            }),
        },
    ]);
    let workspace = temp_dir("learnhub-auth-restart");
    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        connect_and_login(&mut stdin, &mut reader, &workspace, &server.base_url);
    }

    // A fresh process over the same workspace picks the session back up
    // from the stored key, without logging in again.
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected.get("restoredSession").and_then(|v| v.as_bool()),
        Some(true)
    );
    assert_eq!(
        selected.get("baseUrl").and_then(|v| v.as_str()),
        Some(server.base_url.as_str())
    );
    let result = request_ok(&mut stdin, &mut reader, "2", "auth.profile.get", json!({}));
    assert_eq!(
        result.pointer("/user/id").and_then(|v| v.as_str()),
        Some("user-1")
    );
}

#[test]
fn a_401_clears_the_stored_session() {
    let server = StubServer::start(vec![
        login_route(),
        Route {
            method: "GET",
            path: "/auth/profile",
            status: 401,
            body: json!({ "success": false, "message": "invalid token" }),
        },
    ]);
    let workspace = temp_dir("learnhub-auth-401");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    connect_and_login(&mut stdin, &mut reader, &workspace, &server.base_url);

    let error = request_err(&mut stdin, &mut reader, "1", "auth.profile.get", json!({}));
    assert_eq!(error.get("code").and_then(|v| v.as_str()), Some("unauthorized"));

    // The dead token is gone from this process and from the workspace.
    let error = request_err(&mut stdin, &mut reader, "2", "courses.mine", json!({}));
    assert_eq!(
        error.get("code").and_then(|v| v.as_str()),
        Some("not_authenticated")
    );

    let (_child2, mut stdin2, mut reader2) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin2,
        &mut reader2,
        "3",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        selected.get("restoredSession").and_then(|v| v.as_bool()),
        Some(false)
    );
}
