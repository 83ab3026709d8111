use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;

/// Per-workspace client store. Nothing here is authoritative — the backend
/// owns all course and enrollment state; this file keeps the auth session,
/// best-effort caches of the last fetched documents, and authoring drafts.
pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("learnhub.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_cache(
            id TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollment_cache(
            course_id TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS drafts(
            id TEXT PRIMARY KEY,
            course_id TEXT,
            doc TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_drafts_course ON drafts(course_id)",
        [],
    )?;

    Ok(conn)
}

pub fn now_ts() -> String {
    Utc::now().to_rfc3339()
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| r.get(0))
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

pub fn settings_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM settings WHERE key = ?", [key])?;
    Ok(())
}

pub fn cache_course(conn: &Connection, course_id: &str, doc: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO course_cache(id, doc, fetched_at) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET doc = excluded.doc, fetched_at = excluded.fetched_at",
        params![course_id, serde_json::to_string(doc)?, now_ts()],
    )?;
    Ok(())
}

pub fn cached_course(conn: &Connection, course_id: &str) -> anyhow::Result<Option<(Value, String)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT doc, fetched_at FROM course_cache WHERE id = ?",
            [course_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((doc, fetched_at)) => Ok(Some((serde_json::from_str(&doc)?, fetched_at))),
        None => Ok(None),
    }
}

pub fn cache_enrollment(conn: &Connection, course_id: &str, doc: &Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO enrollment_cache(course_id, doc, fetched_at) VALUES(?, ?, ?)
         ON CONFLICT(course_id) DO UPDATE SET doc = excluded.doc, fetched_at = excluded.fetched_at",
        params![course_id, serde_json::to_string(doc)?, now_ts()],
    )?;
    Ok(())
}

pub fn cached_enrollment(
    conn: &Connection,
    course_id: &str,
) -> anyhow::Result<Option<(Value, String)>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT doc, fetched_at FROM enrollment_cache WHERE course_id = ?",
            [course_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    match row {
        Some((doc, fetched_at)) => Ok(Some((serde_json::from_str(&doc)?, fetched_at))),
        None => Ok(None),
    }
}

/// Enrollment documents are scoped to whoever was logged in; they go when
/// the session goes. Course documents are not user-scoped and stay.
pub fn clear_enrollment_cache(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("DELETE FROM enrollment_cache", [])?;
    Ok(())
}

pub fn draft_put(
    conn: &Connection,
    draft_id: &str,
    course_id: Option<&str>,
    doc: &Value,
) -> anyhow::Result<()> {
    let ts = now_ts();
    conn.execute(
        "INSERT INTO drafts(id, course_id, doc, created_at, updated_at) VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            course_id = excluded.course_id,
            doc = excluded.doc,
            updated_at = excluded.updated_at",
        params![draft_id, course_id, serde_json::to_string(doc)?, ts, ts],
    )?;
    Ok(())
}

pub fn draft_get(conn: &Connection, draft_id: &str) -> anyhow::Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT doc FROM drafts WHERE id = ?", [draft_id], |r| r.get(0))
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn draft_list(conn: &Connection) -> anyhow::Result<Vec<(String, Option<String>, String)>> {
    let mut stmt =
        conn.prepare("SELECT id, course_id, updated_at FROM drafts ORDER BY updated_at DESC, id")?;
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn draft_delete(conn: &Connection, draft_id: &str) -> anyhow::Result<bool> {
    let n = conn.execute("DELETE FROM drafts WHERE id = ?", [draft_id])?;
    Ok(n > 0)
}
