use serde_json::json;

use crate::api::ApiError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn api_code(e: &ApiError) -> &'static str {
    match e {
        ApiError::Transport(_) => "network_error",
        ApiError::Unauthorized => "unauthorized",
        ApiError::Rejected(_) => "rejected",
        ApiError::BadResponse(_) => "bad_response",
    }
}

/// Envelope for a failed backend call. Transport failures are flagged
/// retryable so the view can offer a retry without special-casing codes.
pub fn api_err(id: &str, e: &ApiError) -> serde_json::Value {
    let details = if e.is_transport() {
        Some(json!({ "retryable": true }))
    } else {
        None
    };
    err(id, api_code(e), e.to_string(), details)
}
