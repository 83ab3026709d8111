use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use crate::calc;
use crate::config;
use crate::curriculum::{Course, Level, QuestionType, ResourceType};
use crate::db;
use crate::editor::{self, EditError, EditOp};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    api_client, api_failure, db_conn, parse_bool, parse_opt_i64, parse_opt_string, required_str,
    required_usize, session_ref,
};
use crate::ipc::types::{AppState, Request};

/// One authoring session's working copy. Lives in the workspace DB so an
/// unfinished edit survives a restart; the backend sees nothing until
/// `authoring.draft.save` pushes the whole document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Draft {
    draft_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    course_id: Option<String>,
    course: Course,
    #[serde(default)]
    expanded_units: Vec<usize>,
}

fn load_draft(
    conn: &rusqlite::Connection,
    req: &Request,
    draft_id: &str,
) -> Result<Draft, serde_json::Value> {
    match db::draft_get(conn, draft_id) {
        Ok(Some(doc)) => serde_json::from_value(doc)
            .map_err(|e| err(&req.id, "bad_draft", format!("corrupt draft: {}", e), None)),
        Ok(None) => Err(err(&req.id, "not_found", "draft not found", None)),
        Err(e) => Err(err(&req.id, "db_query_failed", e.to_string(), None)),
    }
}

fn store_draft(
    conn: &rusqlite::Connection,
    req: &Request,
    draft: &Draft,
) -> Result<(), serde_json::Value> {
    let doc = serde_json::to_value(draft)
        .map_err(|e| err(&req.id, "db_update_failed", e.to_string(), None))?;
    db::draft_put(conn, &draft.draft_id, draft.course_id.as_deref(), &doc)
        .map_err(|e| err(&req.id, "db_update_failed", e.to_string(), None))
}

fn draft_view(req: &Request, draft: &Draft, changed: bool) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "draftId": draft.draft_id,
            "courseId": draft.course_id,
            "course": super::catalog::course_view(&draft.course),
            "expandedUnits": draft.expanded_units,
            "changed": changed,
        }),
    )
}

fn edit_err(req: &Request, e: EditError) -> serde_json::Value {
    let code = match e {
        EditError::OutOfRange(_) => "out_of_range",
        EditError::MinOptions => "min_options",
    };
    err(&req.id, code, e.to_string(), None)
}

/// Load, apply one structural op, store. A rejected op stores nothing, so
/// the persisted draft never holds a half-applied change.
fn run_op(state: &mut AppState, req: &Request, op: EditOp) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let defaults = config::editor_defaults(conn);
    let removed_unit = match &op {
        EditOp::RemoveUnit { unit } => Some(*unit),
        _ => None,
    };
    match editor::apply(&mut draft.course, op, &defaults) {
        Ok(changed) => {
            if let Some(unit) = removed_unit {
                editor::reindex_expanded_after_unit_remove(&mut draft.expanded_units, unit);
            }
            if changed {
                if let Err(e) = store_draft(conn, req, &draft) {
                    return e;
                }
            }
            draft_view(req, &draft, changed)
        }
        Err(e) => edit_err(req, e),
    }
}

fn handle_draft_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = session_ref(state, req) {
        return e;
    }
    if state.db.is_none() {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    }
    let course_id = match parse_opt_string(req.params.get("courseId")) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("courseId {}", m), None),
    };
    let course = if let Some(cid) = &course_id {
        let api = match api_client(state, req) {
            Ok(a) => a,
            Err(e) => return e,
        };
        match api.get_course(cid) {
            Ok(c) => c,
            Err(e) => return api_failure(state, req, e),
        }
    } else {
        let title = match parse_opt_string(req.params.get("title")) {
            Ok(v) => v.unwrap_or_else(|| "Untitled Course".to_string()),
            Err(m) => return err(&req.id, "bad_params", format!("title {}", m), None),
        };
        let level = match parse_opt_string(req.params.get("level")) {
            Ok(Some(s)) => match Level::parse(&s) {
                Some(l) => l,
                None => {
                    return err(
                        &req.id,
                        "validation_failed",
                        "level must be beginner, intermediate or advanced",
                        Some(json!({ "field": "level" })),
                    )
                }
            },
            Ok(None) => Level::Beginner,
            Err(m) => return err(&req.id, "bad_params", format!("level {}", m), None),
        };
        Course {
            id: None,
            title,
            description: String::new(),
            subject: match parse_opt_string(req.params.get("subject")) {
                Ok(v) => v.unwrap_or_default(),
                Err(m) => return err(&req.id, "bad_params", format!("subject {}", m), None),
            },
            grade: match parse_opt_i64(req.params.get("grade")) {
                Ok(v) => v.unwrap_or(1),
                Err(m) => return err(&req.id, "bad_params", format!("grade {}", m), None),
            },
            level,
            image_url: None,
            duration: 0,
            gamification: None,
            units: Vec::new(),
        }
    };
    let draft = Draft {
        draft_id: Uuid::new_v4().to_string(),
        course_id: course.id.clone(),
        course,
        expanded_units: Vec::new(),
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_draft_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match load_draft(conn, req, &draft_id) {
        Ok(draft) => draft_view(req, &draft, false),
        Err(e) => e,
    }
}

fn handle_draft_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match db::draft_list(conn) {
        Ok(rows) => {
            let drafts: Vec<serde_json::Value> = rows
                .into_iter()
                .map(|(id, course_id, updated_at)| {
                    json!({ "draftId": id, "courseId": course_id, "updatedAt": updated_at })
                })
                .collect();
            ok(&req.id, json!({ "drafts": drafts }))
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_draft_discard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::draft_delete(conn, &draft_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

/// Validate, stamp the aggregated duration, and push the whole document.
/// Create vs replace follows whether the course has ever been persisted.
fn handle_draft_save(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    if draft.course.title.trim().is_empty() {
        return err(
            &req.id,
            "validation_failed",
            "title is required",
            Some(json!({ "field": "title" })),
        );
    }
    if !(1..=12).contains(&draft.course.grade) {
        return err(
            &req.id,
            "validation_failed",
            "grade must be between 1 and 12",
            Some(json!({ "field": "grade" })),
        );
    }
    draft.course.duration = calc::total_duration_minutes(&draft.course);

    let outcome = match draft.course.id.clone() {
        Some(id) => api.update_course(&id, &draft.course).map(|c| (c, false)),
        None => api.create_course(&draft.course).map(|c| (c, true)),
    };
    match outcome {
        Ok((saved, created)) => {
            draft.course = saved;
            draft.course_id = draft.course.id.clone();
            if let Err(e) = store_draft(conn, req, &draft) {
                return e;
            }
            if let Some(cid) = &draft.course_id {
                let _ = db::cache_course(conn, cid, &super::catalog::course_view(&draft.course));
            }
            ok(
                &req.id,
                json!({
                    "draftId": draft.draft_id,
                    "created": created,
                    "course": super::catalog::course_view(&draft.course),
                }),
            )
        }
        Err(e) => api_failure(state, req, e),
    }
}

// --- field patches ---

fn patch_object<'a>(req: &'a Request) -> Result<&'a Map<String, JsonValue>, serde_json::Value> {
    req.params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| err(&req.id, "bad_params", "missing patch", None))
}

fn handle_course_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let patch = match patch_object(req) {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    if let Some(v) = patch.get("title") {
        match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => draft.course.title = s.to_string(),
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "title must not be empty",
                    Some(json!({ "field": "title" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("description") {
        match v.as_str() {
            Some(s) => draft.course.description = s.to_string(),
            None => return err(&req.id, "bad_params", "description must be string", None),
        }
    }
    if let Some(v) = patch.get("subject") {
        match v.as_str() {
            Some(s) => draft.course.subject = s.trim().to_string(),
            None => return err(&req.id, "bad_params", "subject must be string", None),
        }
    }
    if let Some(v) = patch.get("grade") {
        match v.as_i64() {
            Some(g) if (1..=12).contains(&g) => draft.course.grade = g,
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "grade must be between 1 and 12",
                    Some(json!({ "field": "grade" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("level") {
        match v.as_str().and_then(Level::parse) {
            Some(l) => draft.course.level = l,
            None => {
                return err(
                    &req.id,
                    "validation_failed",
                    "level must be beginner, intermediate or advanced",
                    Some(json!({ "field": "level" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("imageUrl") {
        match parse_opt_string(Some(v)) {
            Ok(u) => draft.course.image_url = u,
            Err(m) => return err(&req.id, "bad_params", format!("imageUrl {}", m), None),
        }
    }
    if let Some(v) = patch.get("gamification") {
        if v.is_null() {
            draft.course.gamification = None;
        } else {
            match serde_json::from_value(v.clone()) {
                Ok(g) => draft.course.gamification = Some(g),
                Err(e) => return err(&req.id, "bad_params", format!("gamification {}", e), None),
            }
        }
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_unit_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let unit = match required_usize(req, "unit") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let patch = match patch_object(req) {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let Some(u) = draft.course.units.get_mut(unit) else {
        return err(&req.id, "out_of_range", "unit index out of range", None);
    };
    if let Some(v) = patch.get("title") {
        match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => u.title = s.to_string(),
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "title must not be empty",
                    Some(json!({ "field": "title" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("description") {
        match parse_opt_string(Some(v)) {
            Ok(d) => u.description = d,
            Err(m) => return err(&req.id, "bad_params", format!("description {}", m), None),
        }
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_lesson_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let unit = match required_usize(req, "unit") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let lesson = match required_usize(req, "lesson") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let patch = match patch_object(req) {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let Some(l) = draft
        .course
        .units
        .get_mut(unit)
        .and_then(|u| u.lessons.get_mut(lesson))
    else {
        return err(&req.id, "out_of_range", "lesson index out of range", None);
    };
    if let Some(v) = patch.get("title") {
        match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => l.title = s.to_string(),
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "title must not be empty",
                    Some(json!({ "field": "title" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("content") {
        match v.as_str() {
            Some(s) => l.content = s.to_string(),
            None => return err(&req.id, "bad_params", "content must be string", None),
        }
    }
    if let Some(v) = patch.get("duration") {
        match v.as_i64() {
            Some(d) if d >= 0 => l.duration = d,
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "duration must be a non-negative number of minutes",
                    Some(json!({ "field": "duration" })),
                )
            }
        }
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_question_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (unit, lesson, quiz, question) = match quiz_path(req) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let patch = match patch_object(req) {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let Some(q) = draft
        .course
        .units
        .get_mut(unit)
        .and_then(|u| u.lessons.get_mut(lesson))
        .and_then(|l| l.quizzes.get_mut(quiz))
        .and_then(|z| z.questions.get_mut(question))
    else {
        return err(&req.id, "out_of_range", "question index out of range", None);
    };
    if let Some(v) = patch.get("questionText") {
        match v.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => q.question_text = s.to_string(),
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "questionText must not be empty",
                    Some(json!({ "field": "questionText" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("questionType") {
        let parsed = v
            .as_str()
            .and_then(|s| serde_json::from_value::<QuestionType>(json!(s)).ok());
        match parsed {
            Some(t) => q.question_type = t,
            None => {
                return err(
                    &req.id,
                    "validation_failed",
                    "questionType must be multiple-choice or true-false",
                    Some(json!({ "field": "questionType" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("points") {
        match v.as_i64() {
            Some(p) if p >= 1 => q.points = p,
            _ => {
                return err(
                    &req.id,
                    "validation_failed",
                    "points must be at least 1",
                    Some(json!({ "field": "points" })),
                )
            }
        }
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_option_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (unit, lesson, quiz, question) = match quiz_path(req) {
        Ok(p) => p,
        Err(e) => return e,
    };
    let option = match required_usize(req, "option") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let text = match required_str(req, "text") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let Some(o) = draft
        .course
        .units
        .get_mut(unit)
        .and_then(|u| u.lessons.get_mut(lesson))
        .and_then(|l| l.quizzes.get_mut(quiz))
        .and_then(|z| z.questions.get_mut(question))
        .and_then(|q| q.options.get_mut(option))
    else {
        return err(&req.id, "out_of_range", "option index out of range", None);
    };
    o.text = text;
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

fn handle_unit_set_expanded(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let unit = match required_usize(req, "unit") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let expanded = match parse_bool(req.params.get("expanded"), true) {
        Ok(v) => v,
        Err(m) => return err(&req.id, "bad_params", format!("expanded {}", m), None),
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    if unit >= draft.course.units.len() {
        return err(&req.id, "out_of_range", "unit index out of range", None);
    }
    if expanded {
        if !draft.expanded_units.contains(&unit) {
            draft.expanded_units.push(unit);
            draft.expanded_units.sort_unstable();
        }
    } else {
        draft.expanded_units.retain(|&i| i != unit);
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

// --- structural op parsing ---

fn quiz_path(req: &Request) -> Result<(usize, usize, usize, usize), serde_json::Value> {
    Ok((
        required_usize(req, "unit")?,
        required_usize(req, "lesson")?,
        required_usize(req, "quiz")?,
        required_usize(req, "question")?,
    ))
}

fn handle_resource_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let unit = match required_usize(req, "unit") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let lesson = match required_usize(req, "lesson") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rtype = match required_str(req, "type") {
        Ok(s) => match ResourceType::parse(&s) {
            Some(t) => t,
            None => {
                return err(
                    &req.id,
                    "validation_failed",
                    "type must be video, pdf, image, link or text",
                    Some(json!({ "field": "type" })),
                )
            }
        },
        Err(e) => return e,
    };
    run_op(state, req, EditOp::AddResource { unit, lesson, resource_type: rtype })
}

fn handle_resource_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let unit = match required_usize(req, "unit") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let lesson = match required_usize(req, "lesson") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let resource = match required_usize(req, "resource") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let patch = match patch_object(req) {
        Ok(p) => p.clone(),
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let draft_id = match required_str(req, "draftId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut draft = match load_draft(conn, req, &draft_id) {
        Ok(d) => d,
        Err(e) => return e,
    };
    let Some(r) = draft
        .course
        .units
        .get_mut(unit)
        .and_then(|u| u.lessons.get_mut(lesson))
        .and_then(|l| l.resources.get_mut(resource))
    else {
        return err(&req.id, "out_of_range", "resource index out of range", None);
    };
    if let Some(v) = patch.get("type") {
        match v.as_str().and_then(ResourceType::parse) {
            // A type change keeps whatever url/content is already there.
            Some(t) => r.resource_type = t,
            None => {
                return err(
                    &req.id,
                    "validation_failed",
                    "type must be video, pdf, image, link or text",
                    Some(json!({ "field": "type" })),
                )
            }
        }
    }
    if let Some(v) = patch.get("url") {
        match parse_opt_string(Some(v)) {
            Ok(u) => r.url = u,
            Err(m) => return err(&req.id, "bad_params", format!("url {}", m), None),
        }
    }
    if let Some(v) = patch.get("content") {
        match parse_opt_string(Some(v)) {
            Ok(c) => r.content = c,
            Err(m) => return err(&req.id, "bad_params", format!("content {}", m), None),
        }
    }
    if let Err(e) = store_draft(conn, req, &draft) {
        return e;
    }
    draft_view(req, &draft, true)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "authoring.draft.create" => Some(handle_draft_create(state, req)),
        "authoring.draft.open" => Some(handle_draft_open(state, req)),
        "authoring.draft.list" => Some(handle_draft_list(state, req)),
        "authoring.draft.discard" => Some(handle_draft_discard(state, req)),
        "authoring.draft.save" => Some(handle_draft_save(state, req)),
        "authoring.course.update" => Some(handle_course_update(state, req)),
        "authoring.unit.add" => Some(run_op(state, req, EditOp::AddUnit)),
        "authoring.unit.remove" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveUnit { unit }))
        }
        "authoring.unit.move" => {
            let from = match required_usize(req, "from") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let to = match required_usize(req, "to") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::MoveUnit { from, to }))
        }
        "authoring.unit.update" => Some(handle_unit_update(state, req)),
        "authoring.unit.setExpanded" => Some(handle_unit_set_expanded(state, req)),
        "authoring.lesson.add" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::AddLesson { unit }))
        }
        "authoring.lesson.remove" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let lesson = match required_usize(req, "lesson") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveLesson { unit, lesson }))
        }
        "authoring.lesson.move" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let from = match required_usize(req, "from") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let to = match required_usize(req, "to") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::MoveLesson { unit, from, to }))
        }
        "authoring.lesson.update" => Some(handle_lesson_update(state, req)),
        "authoring.quiz.add" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let lesson = match required_usize(req, "lesson") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::AddQuiz { unit, lesson }))
        }
        "authoring.quiz.remove" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let lesson = match required_usize(req, "lesson") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let quiz = match required_usize(req, "quiz") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveQuiz { unit, lesson, quiz }))
        }
        "authoring.question.add" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let lesson = match required_usize(req, "lesson") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let quiz = match required_usize(req, "quiz") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::AddQuestion { unit, lesson, quiz }))
        }
        "authoring.question.remove" => {
            let (unit, lesson, quiz, question) = match quiz_path(req) {
                Ok(p) => p,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveQuestion { unit, lesson, quiz, question }))
        }
        "authoring.question.update" => Some(handle_question_update(state, req)),
        "authoring.option.add" => {
            let (unit, lesson, quiz, question) = match quiz_path(req) {
                Ok(p) => p,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::AddOption { unit, lesson, quiz, question }))
        }
        "authoring.option.remove" => {
            let (unit, lesson, quiz, question) = match quiz_path(req) {
                Ok(p) => p,
                Err(e) => return Some(e),
            };
            let option = match required_usize(req, "option") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveOption { unit, lesson, quiz, question, option }))
        }
        "authoring.option.setCorrect" => {
            let (unit, lesson, quiz, question) = match quiz_path(req) {
                Ok(p) => p,
                Err(e) => return Some(e),
            };
            let option = match required_usize(req, "option") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(
                state,
                req,
                EditOp::SetOptionCorrect { unit, lesson, quiz, question, option },
            ))
        }
        "authoring.option.update" => Some(handle_option_update(state, req)),
        "authoring.resource.add" => Some(handle_resource_add(state, req)),
        "authoring.resource.remove" => {
            let unit = match required_usize(req, "unit") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let lesson = match required_usize(req, "lesson") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            let resource = match required_usize(req, "resource") {
                Ok(v) => v,
                Err(e) => return Some(e),
            };
            Some(run_op(state, req, EditOp::RemoveResource { unit, lesson, resource }))
        }
        "authoring.resource.update" => Some(handle_resource_update(state, req)),
        _ => None,
    }
}
