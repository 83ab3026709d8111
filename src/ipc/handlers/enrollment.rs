use rusqlite::Connection;
use serde_json::json;

use crate::calc;
use crate::config;
use crate::curriculum::{Course, Enrollment, ProgressUpdate};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{api_client, api_failure, db_conn, parse_bool, required_str, session_ref};
use crate::ipc::types::{AppState, Request};

pub(super) fn cached_enrollment(conn: &Connection, course_id: &str) -> Option<Enrollment> {
    let (doc, _) = db::cached_enrollment(conn, course_id).ok().flatten()?;
    serde_json::from_value(doc).ok()
}

fn cached_course(conn: &Connection, course_id: &str) -> Option<Course> {
    let (doc, _) = db::cached_course(conn, course_id).ok().flatten()?;
    serde_json::from_value(doc).ok()
}

/// Fold a confirmed progress update into the cached enrollment. Called only
/// after the backend accepted the change; a failed call leaves the cache as
/// it was.
pub(super) fn fold_progress(conn: &Connection, course_id: &str, update: &ProgressUpdate) {
    let mut enrollment = cached_enrollment(conn, course_id).unwrap_or(Enrollment {
        id: None,
        course_id: Some(course_id.to_string()),
        course: None,
        progress: 0,
        completed_lessons: Vec::new(),
        is_completed: false,
        enrolled_at: None,
        completed_at: None,
    });
    enrollment.progress = update.progress;
    enrollment.completed_lessons = update.completed_lessons.clone();
    enrollment.is_completed = update.is_completed;
    if let Ok(doc) = serde_json::to_value(&enrollment) {
        let _ = db::cache_enrollment(conn, course_id, &doc);
    }
}

fn handle_enroll(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.enroll(&course_id) {
        Ok(enrollment) => {
            let doc = serde_json::to_value(&enrollment).unwrap_or(serde_json::Value::Null);
            let _ = db::cache_enrollment(conn, &course_id, &doc);
            ok(&req.id, json!({ "enrollment": doc, "alreadyEnrolled": false }))
        }
        // The backend saying "already enrolled" means the state the view
        // wanted already holds; reconcile instead of surfacing an error.
        Err(crate::api::ApiError::Rejected(msg))
            if msg.to_ascii_lowercase().contains("already enrolled") =>
        {
            let enrollment = cached_enrollment(conn, &course_id)
                .and_then(|e| serde_json::to_value(&e).ok());
            ok(&req.id, json!({ "enrollment": enrollment, "alreadyEnrolled": true }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

/// Progress snapshot for one course. Not being enrolled is its own signal,
/// distinct from an enrollment at 0%.
fn handle_progress_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user_id = match session_ref(state, req) {
        Ok(s) => s.user.id.clone(),
        Err(e) => return e,
    };
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let (enrollment, from_cache) = match api.enrolled() {
        Ok(list) => {
            let found = list.into_iter().find(|e| e.course_id() == Some(course_id.as_str()));
            if let Some(e) = &found {
                if let Ok(doc) = serde_json::to_value(e) {
                    let _ = db::cache_enrollment(conn, &course_id, &doc);
                }
            }
            (found, false)
        }
        Err(e) if e.is_transport() => match cached_enrollment(conn, &course_id) {
            Some(cached) => (Some(cached), true),
            None => return api_failure(state, req, e),
        },
        Err(e) => return api_failure(state, req, e),
    };

    let Some(enrollment) = enrollment else {
        return ok(&req.id, json!({ "enrolled": false }));
    };

    let course = enrollment
        .course
        .clone()
        .or_else(|| cached_course(conn, &course_id));
    let setup = config::load_progress_setup(conn);
    match course {
        Some(course) => {
            let completed = calc::completed_lesson_ids(
                &course,
                Some(&enrollment),
                &user_id,
                setup.completion_source,
            );
            let mut ids: Vec<String> = completed.iter().cloned().collect();
            ids.sort();
            ok(
                &req.id,
                json!({
                    "enrolled": true,
                    "completedLessonIds": ids,
                    "progressPercentage": calc::progress_percentage(&course, &completed),
                    "totalLessons": calc::total_lesson_count(&course),
                    "remainingLessons": calc::remaining_lesson_count(&course, &completed),
                    "reportedProgress": enrollment.progress,
                    "completionSource": setup.completion_source.as_str(),
                    "fromCache": from_cache,
                }),
            )
        }
        // Without a course tree to count against, fall back to the
        // backend-reported numbers.
        None => ok(
            &req.id,
            json!({
                "enrolled": true,
                "completedLessonIds": enrollment.completed_lessons,
                "progressPercentage": enrollment.progress,
                "reportedProgress": enrollment.progress,
                "fromCache": from_cache,
            }),
        ),
    }
}

fn handle_mark_lesson(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let lesson_id = match required_str(req, "lessonId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let completed = match parse_bool(req.params.get("completed"), true) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("completed {}", m), None),
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };

    // Completing a lesson twice is a no-op that still reports success.
    if completed {
        if let Some(cached) = cached_enrollment(conn, &course_id) {
            if cached.completed_lessons.iter().any(|l| l == &lesson_id) {
                return ok(
                    &req.id,
                    json!({
                        "progress": cached.progress,
                        "completedLessons": cached.completed_lessons,
                        "isCompleted": cached.is_completed,
                        "alreadyCompleted": true,
                    }),
                );
            }
        }
    }

    match api.mark_lesson(&course_id, &lesson_id, completed) {
        Ok(update) => {
            fold_progress(conn, &course_id, &update);
            // The backend returns the user's gamification counters with the
            // progress; keep the session's copy current.
            if let Some(session) = state.session.as_mut() {
                if update.points > 0 {
                    session.user.points = update.points;
                }
                if update.level > 0 {
                    session.user.level = update.level;
                }
            }
            ok(
                &req.id,
                json!({
                    "progress": update.progress,
                    "completedLessons": update.completed_lessons,
                    "isCompleted": update.is_completed,
                    "points": update.points,
                    "level": update.level,
                    "alreadyCompleted": false,
                }),
            )
        }
        Err(e) => api_failure(state, req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.enroll" => Some(handle_enroll(state, req)),
        "progress.load" => Some(handle_progress_load(state, req)),
        "progress.markLesson" => Some(handle_mark_lesson(state, req)),
        _ => None,
    }
}
