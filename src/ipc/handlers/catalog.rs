use serde_json::json;

use crate::api::CourseFilters;
use crate::calc;
use crate::curriculum::{Course, Level};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{api_client, api_failure, db_conn, parse_opt_i64, parse_opt_string, required_str, session_ref};
use crate::ipc::types::{AppState, Request};

/// Course JSON plus the calculator's derived display fields. Every view
/// reads duration through this; nothing re-aggregates it.
pub fn course_view(course: &Course) -> serde_json::Value {
    let total_minutes = calc::total_duration_minutes(course);
    let mut v = serde_json::to_value(course).unwrap_or(serde_json::Value::Null);
    if let Some(obj) = v.as_object_mut() {
        obj.insert(
            "computed".to_string(),
            json!({
                "totalLessons": calc::total_lesson_count(course),
                "totalDurationMinutes": total_minutes,
                "durationDisplay": calc::format_duration(total_minutes),
            }),
        );
    }
    v
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match parse_opt_string(req.params.get("subject")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("subject {}", m), None),
    };
    let grade = match parse_opt_i64(req.params.get("grade")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("grade {}", m), None),
    };
    let level = match parse_opt_string(req.params.get("level")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("level {}", m), None),
    };
    if let Some(l) = &level {
        if Level::parse(l).is_none() {
            return err(
                &req.id,
                "validation_failed",
                "level must be beginner, intermediate or advanced",
                Some(json!({ "field": "level" })),
            );
        }
    }
    let search = match parse_opt_string(req.params.get("search")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("search {}", m), None),
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    let filters = CourseFilters { subject, grade, level, search };
    match api.list_courses(&filters) {
        Ok(courses) => {
            let rows: Vec<serde_json::Value> = courses.iter().map(course_view).collect();
            ok(&req.id, json!({ "courses": rows }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_courses_open(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    match api.get_course(&course_id) {
        Ok(course) => {
            let view = course_view(&course);
            let _ = db::cache_course(conn, &course_id, &view);
            ok(&req.id, json!({ "course": view, "fromCache": false }))
        }
        Err(e) if e.is_transport() => {
            // Degrade to the last fetched copy when the backend is
            // unreachable; the view shows it as stale.
            match db::cached_course(conn, &course_id) {
                Ok(Some((doc, fetched_at))) => ok(
                    &req.id,
                    json!({ "course": doc, "fromCache": true, "fetchedAt": fetched_at }),
                ),
                _ => api_failure(state, req, e),
            }
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_courses_enrolled(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.enrolled() {
        Ok(enrollments) => {
            let mut rows = Vec::with_capacity(enrollments.len());
            for e in &enrollments {
                let doc = serde_json::to_value(e).unwrap_or(serde_json::Value::Null);
                if let Some(cid) = e.course_id() {
                    let _ = db::cache_enrollment(conn, cid, &doc);
                }
                rows.push(doc);
            }
            ok(&req.id, json!({ "enrollments": rows }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_courses_mine(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.my_courses() {
        Ok(courses) => {
            let rows: Vec<serde_json::Value> = courses.iter().map(course_view).collect();
            ok(&req.id, json!({ "courses": rows }))
        }
        Err(e) => api_failure(state, req, e),
    }
}

/// Teacher console: every enrollment for one course, with a roll-up the
/// analytics header renders directly.
fn handle_courses_enrollments(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.course_enrollments(&course_id) {
        Ok(enrollments) => {
            let count = enrollments.len();
            let completed = enrollments.iter().filter(|e| e.is_completed).count();
            let average = if count > 0 {
                let total: i64 = enrollments.iter().map(|e| e.progress).sum();
                (total as f64 / count as f64).round() as i64
            } else {
                0
            };
            ok(
                &req.id,
                json!({
                    "enrollments": enrollments,
                    "summary": {
                        "enrolledCount": count,
                        "completedCount": completed,
                        "averageProgress": average,
                    }
                }),
            )
        }
        Err(e) => api_failure(state, req, e),
    }
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let course_id = match required_str(req, "courseId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.delete_course(&course_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => api_failure(state, req, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.open" => Some(handle_courses_open(state, req)),
        "courses.enrolled" => Some(handle_courses_enrolled(state, req)),
        "courses.mine" => Some(handle_courses_mine(state, req)),
        "courses.enrollments" => Some(handle_courses_enrollments(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
