use crate::api::ApiClient;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::session;
use serde_json::json;
use std::path::PathBuf;

const BASE_URL_KEY: &str = "backend.baseUrl";

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "baseUrl": state.api.as_ref().map(|a| a.base_url().to_string()),
            "authenticated": state.session.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match db::open_db(&path) {
        Ok(conn) => {
            state.workspace = Some(path.clone());
            // Best-effort: if this workspace already knows its backend,
            // rebuild the client and pick up any persisted session.
            let mut base_url = None;
            let mut restored = false;
            if let Ok(Some(v)) = db::settings_get_json(&conn, BASE_URL_KEY) {
                if let Some(url) = v.as_str() {
                    let mut api = ApiClient::new(url);
                    state.session = session::restore(&mut api, &conn);
                    restored = state.session.is_some();
                    base_url = Some(api.base_url().to_string());
                    state.api = Some(api);
                }
            }
            state.db = Some(conn);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "baseUrl": base_url,
                    "restoredSession": restored,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_backend_connect(state: &mut AppState, req: &Request) -> serde_json::Value {
    let base_url = match required_str(req, "baseUrl") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let mut api = ApiClient::new(&base_url);
    let restored = session::restore(&mut api, conn);
    let _ = db::settings_set_json(conn, BASE_URL_KEY, &json!(api.base_url()));
    let result = json!({
        "baseUrl": api.base_url(),
        "restoredSession": restored.is_some(),
        "user": restored
            .as_ref()
            .map(|s| serde_json::to_value(&s.user).unwrap_or(serde_json::Value::Null)),
    });
    state.session = restored;
    state.api = Some(api);
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "backend.connect" => Some(handle_backend_connect(state, req)),
        _ => None,
    }
}
