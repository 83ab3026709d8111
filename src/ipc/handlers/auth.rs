use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{api_client, api_failure, db_conn, session_ref};
use crate::ipc::types::{AppState, Request};
use crate::session;

/// Field-level validation failure: no network call is made and the
/// offending field rides in the error details for the form to annotate.
fn field_err(req: &Request, field: &str, message: &str) -> serde_json::Value {
    err(
        &req.id,
        "validation_failed",
        message,
        Some(json!({ "field": field })),
    )
}

fn non_empty(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(field_err(req, key, &format!("{} is required", key))),
    }
}

fn valid_email(req: &Request) -> Result<String, serde_json::Value> {
    let email = non_empty(req, "email")?;
    if !email.contains('@') {
        return Err(field_err(req, "email", "email is not valid"));
    }
    Ok(email)
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = match valid_email(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match non_empty(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(api) = state.api.as_mut() else {
        return err(&req.id, "not_connected", "connect to a backend first", None);
    };
    match session::login(api, conn, &email, &password) {
        Ok(s) => {
            let user = serde_json::to_value(&s.user).unwrap_or(serde_json::Value::Null);
            state.session = Some(s);
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let name = match non_empty(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let email = match valid_email(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let password = match non_empty(req, "password") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if password.len() < 6 {
        return field_err(req, "password", "password must be at least 6 characters");
    }
    let confirm = req
        .params
        .get("confirmPassword")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if confirm != password {
        return field_err(req, "confirmPassword", "passwords do not match");
    }
    let role = req
        .params
        .get("role")
        .and_then(|v| v.as_str())
        .unwrap_or("student");
    if role != "student" && role != "teacher" {
        return field_err(req, "role", "role must be student or teacher");
    }
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(api) = state.api.as_mut() else {
        return err(&req.id, "not_connected", "connect to a backend first", None);
    };
    match session::register(api, conn, &name, &email, &password, role) {
        Ok(s) => {
            let user = serde_json::to_value(&s.user).unwrap_or(serde_json::Value::Null);
            state.session = Some(s);
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let (Some(api), Some(conn)) = (state.api.as_mut(), state.db.as_ref()) {
        session::logout(api, conn);
    }
    state.session = None;
    ok(&req.id, json!({ "loggedOut": true }))
}

fn handle_profile_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let current = match session_ref(state, req) {
        Ok(s) => s.clone(),
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match session::refresh(api, conn, &current) {
        Ok(s) => {
            let user = serde_json::to_value(&s.user).unwrap_or(serde_json::Value::Null);
            state.session = Some(s);
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let Some(patch) = req.params.get("patch").cloned() else {
        return err(&req.id, "bad_params", "missing patch", None);
    };
    if !patch.is_object() {
        return err(&req.id, "bad_params", "patch must be an object", None);
    }
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.update_profile(patch) {
        Ok(user) => {
            let user_json = serde_json::to_value(&user).unwrap_or(serde_json::Value::Null);
            if let Some(s) = state.session.as_mut() {
                s.user = user;
            }
            ok(&req.id, json!({ "user": user_json }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.profile.get" => Some(handle_profile_get(state, req)),
        "auth.profile.update" => Some(handle_profile_update(state, req)),
        _ => None,
    }
}
