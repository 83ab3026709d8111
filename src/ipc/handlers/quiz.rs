use serde_json::json;

use crate::api::ApiError;
use crate::ipc::error::{api_code, err, ok};
use crate::ipc::helpers::{api_client, api_failure, db_conn, parse_opt_string, required_str, session_ref};
use crate::ipc::types::{AppState, Request};
use crate::session;

use super::enrollment::{cached_enrollment, fold_progress};

fn handle_quiz_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let quiz_id = match required_str(req, "quizId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };
    match api.start_attempt(&quiz_id) {
        Ok(attempt) => ok(
            &req.id,
            json!({
                "attemptId": attempt.attempt_id,
                "quizId": attempt.quiz_id,
                "questions": attempt.questions,
            }),
        ),
        Err(e) => api_failure(state, req, e),
    }
}

/// One-shot submission. When the caller passes the lesson context, the
/// lesson is marked complete here, strictly after the backend confirms the
/// score — completion never precedes a confirmed result.
fn handle_quiz_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    let attempt_id = match required_str(req, "attemptId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(answers) = req.params.get("answers").cloned() else {
        return err(&req.id, "bad_params", "missing answers", None);
    };
    if !answers.is_array() {
        return err(&req.id, "bad_params", "answers must be an array", None);
    }
    let course_id = match parse_opt_string(req.params.get("courseId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("courseId {}", m), None),
    };
    let lesson_id = match parse_opt_string(req.params.get("lessonId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("lessonId {}", m), None),
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let api = match api_client(state, req) {
        Ok(a) => a,
        Err(e) => return e,
    };

    let result = match api.submit_attempt(&attempt_id, answers) {
        Ok(r) => r,
        Err(e) => return api_failure(state, req, e),
    };
    let result_json = json!({
        "percentageScore": result.percentage_score,
        "pointsEarned": result.points_earned,
        "badgesAwarded": result.badges_awarded,
    });

    let (Some(course_id), Some(lesson_id)) = (course_id, lesson_id) else {
        return ok(&req.id, json!({ "result": result_json, "lessonCompleted": false }));
    };

    if let Some(cached) = cached_enrollment(conn, &course_id) {
        if cached.completed_lessons.iter().any(|l| l == &lesson_id) {
            return ok(
                &req.id,
                json!({
                    "result": result_json,
                    "lessonCompleted": true,
                    "alreadyCompleted": true,
                    "progress": cached.progress,
                }),
            );
        }
    }

    match api.mark_lesson(&course_id, &lesson_id, true) {
        Ok(update) => {
            fold_progress(conn, &course_id, &update);
            ok(
                &req.id,
                json!({
                    "result": result_json,
                    "lessonCompleted": true,
                    "alreadyCompleted": false,
                    "progress": update.progress,
                }),
            )
        }
        Err(e) => {
            // The score is confirmed even though the completion write
            // failed; report the score and leave the mark retryable.
            if matches!(e, ApiError::Unauthorized) {
                if let (Some(api), Some(conn)) = (state.api.as_mut(), state.db.as_ref()) {
                    session::invalidate(api, conn);
                }
                state.session = None;
            }
            ok(
                &req.id,
                json!({
                    "result": result_json,
                    "lessonCompleted": false,
                    "markError": { "code": api_code(&e), "message": e.to_string() },
                }),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "quiz.start" => Some(handle_quiz_start(state, req)),
        "quiz.submit" => Some(handle_quiz_submit(state, req)),
        _ => None,
    }
}
