use rusqlite::Connection;
use serde_json::Value as JsonValue;

use crate::api::{ApiClient, ApiError};
use crate::ipc::error::{api_err, err};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, Session};

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn api_client<'a>(state: &'a AppState, req: &Request) -> Result<&'a ApiClient, serde_json::Value> {
    state
        .api
        .as_ref()
        .ok_or_else(|| err(&req.id, "not_connected", "connect to a backend first", None))
}

pub fn session_ref<'a>(state: &'a AppState, req: &Request) -> Result<&'a Session, serde_json::Value> {
    state
        .session
        .as_ref()
        .ok_or_else(|| err(&req.id, "not_authenticated", "log in first", None))
}

/// Uniform exit for a failed backend call. A 401 means the stored token is
/// dead: it is cleared here, from any operation, before the error goes back
/// to the view.
pub fn api_failure(state: &mut AppState, req: &Request, e: ApiError) -> serde_json::Value {
    if matches!(e, ApiError::Unauthorized) {
        if let (Some(api), Some(conn)) = (state.api.as_mut(), state.db.as_ref()) {
            session::invalidate(api, conn);
        }
        state.session = None;
    }
    api_err(&req.id, &e)
}

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_usize(req: &Request, key: &str) -> Result<usize, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be a non-negative integer", key),
                None,
            )
        })
}

pub fn parse_bool(v: Option<&JsonValue>, default: bool) -> Result<bool, &'static str> {
    match v {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v.as_bool().ok_or("must be boolean"),
    }
}

pub fn parse_opt_string(v: Option<&JsonValue>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn parse_opt_i64(v: Option<&JsonValue>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or("must be integer or null"),
    }
}
