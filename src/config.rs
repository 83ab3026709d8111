use rusqlite::Connection;
use serde_json::{Map, Value};

use crate::calc::CompletionSource;
use crate::db;
use crate::editor::EditorDefaults;

#[derive(Debug, Clone)]
pub struct ProgressSetup {
    pub completion_source: CompletionSource,
    pub default_lesson_duration_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AuthoringSetup {
    pub default_unit_title: String,
    pub default_lesson_title: String,
}

fn load_setup_section(conn: &Connection, key: &str) -> Map<String, Value> {
    db::settings_get_json(conn, key)
        .ok()
        .flatten()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default()
}

pub fn load_progress_setup(conn: &Connection) -> ProgressSetup {
    let obj = load_setup_section(conn, "setup.progress");
    let completion_source = obj
        .get("completionSource")
        .and_then(|v| v.as_str())
        .and_then(CompletionSource::parse)
        .unwrap_or(CompletionSource::Enrollment);
    let default_lesson_duration_minutes = obj
        .get("defaultLessonDurationMinutes")
        .and_then(|v| v.as_i64())
        .filter(|v| *v > 0)
        .unwrap_or(30);
    ProgressSetup {
        completion_source,
        default_lesson_duration_minutes,
    }
}

pub fn load_authoring_setup(conn: &Connection) -> AuthoringSetup {
    let obj = load_setup_section(conn, "setup.authoring");
    let default_unit_title = obj
        .get("defaultUnitTitle")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "New Unit".to_string());
    let default_lesson_title = obj
        .get("defaultLessonTitle")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "New Lesson".to_string());
    AuthoringSetup {
        default_unit_title,
        default_lesson_title,
    }
}

/// The editor's defaults come from the same settings sections every other
/// call site reads, so the lesson-duration default has exactly one home.
pub fn editor_defaults(conn: &Connection) -> EditorDefaults {
    let progress = load_progress_setup(conn);
    let authoring = load_authoring_setup(conn);
    EditorDefaults {
        unit_title: authoring.default_unit_title,
        lesson_title: authoring.default_lesson_title,
        lesson_duration_minutes: progress.default_lesson_duration_minutes,
    }
}
