use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::{api_client, api_failure, session_ref};
use crate::ipc::types::{AppState, Request};

fn handle_rewards_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.list_rewards() {
        Ok(rewards) => ok(&req.id, json!({ "rewards": rewards })),
        Err(e) => api_failure(state, req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "rewards.list" => Some(handle_rewards_list(state, req)),
        _ => None,
    }
}
