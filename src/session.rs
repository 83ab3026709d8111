use rusqlite::Connection;
use serde_json::json;

use crate::api::{ApiClient, ApiError};
use crate::curriculum::UserProfile;
use crate::db;

/// The single well-known client-storage key the auth session lives under.
pub const SESSION_KEY: &str = "auth.session";

/// Explicit auth session: the bearer token plus the user it belongs to.
/// Owned by `AppState` and passed around; there is no ambient global.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

pub fn login(
    api: &mut ApiClient,
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let (token, user) = api.login(email, password)?;
    Ok(install(api, conn, token, user))
}

pub fn register(
    api: &mut ApiClient,
    conn: &Connection,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<Session, ApiError> {
    let (token, user) = api.register(name, email, password, role)?;
    Ok(install(api, conn, token, user))
}

/// Re-validate the stored token against the profile endpoint and refresh
/// the cached user. A 401 here means the session is dead; the caller
/// clears it.
pub fn refresh(api: &ApiClient, conn: &Connection, session: &Session) -> Result<Session, ApiError> {
    let user = api.profile()?;
    let refreshed = Session { token: session.token.clone(), user };
    store(conn, &refreshed);
    Ok(refreshed)
}

pub fn logout(api: &mut ApiClient, conn: &Connection) {
    api.set_token(None);
    clear(conn);
    let _ = db::clear_enrollment_cache(conn);
}

/// Restore a persisted session into a freshly built client, if one exists.
pub fn restore(api: &mut ApiClient, conn: &Connection) -> Option<Session> {
    let value = db::settings_get_json(conn, SESSION_KEY).ok().flatten()?;
    let token = value.get("token").and_then(|v| v.as_str())?.to_string();
    let user: UserProfile = serde_json::from_value(value.get("user")?.clone()).ok()?;
    api.set_token(Some(token.clone()));
    Some(Session { token, user })
}

/// Drop the session after the backend reported the token invalid.
pub fn invalidate(api: &mut ApiClient, conn: &Connection) {
    api.set_token(None);
    clear(conn);
    let _ = db::clear_enrollment_cache(conn);
}

fn install(api: &mut ApiClient, conn: &Connection, token: String, user: UserProfile) -> Session {
    api.set_token(Some(token.clone()));
    let session = Session { token, user };
    store(conn, &session);
    session
}

fn store(conn: &Connection, session: &Session) {
    // Best-effort: a failed write means the session does not survive a
    // restart, not a failed login.
    let _ = db::settings_set_json(
        conn,
        SESSION_KEY,
        &json!({
            "token": session.token,
            "user": serde_json::to_value(&session.user).unwrap_or(serde_json::Value::Null),
        }),
    );
}

fn clear(conn: &Connection) {
    let _ = db::settings_delete(conn, SESSION_KEY);
}
