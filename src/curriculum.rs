use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn parse(s: &str) -> Option<Level> {
        match s {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "advanced" => Some(Level::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "multiple-choice")]
    MultipleChoice,
    #[serde(rename = "true-false")]
    TrueFalse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Video,
    Pdf,
    Image,
    Link,
    Text,
}

impl ResourceType {
    pub fn parse(s: &str) -> Option<ResourceType> {
        match s {
            "video" => Some(ResourceType::Video),
            "pdf" => Some(ResourceType::Pdf),
            "image" => Some(ResourceType::Image),
            "link" => Some(ResourceType::Link),
            "text" => Some(ResourceType::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gamification {
    #[serde(default)]
    pub has_personalization: bool,
    #[serde(default)]
    pub points_to_earn: i64,
}

/// Aggregate root. `duration` is stamped from the calculator at save time;
/// readers should treat it as display-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: i64,
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamification: Option<Gamification>,
    #[serde(default)]
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub is_completed: bool,
    /// Denormalized per-audience completion record. Display-only on this
    /// side; progress derivation goes through the calculator's configured
    /// completion source.
    #[serde(default)]
    pub completed_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// True/false questions carry no stored options; the two-choice set is
/// implicit in the type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default = "default_points")]
    pub points: i64,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

fn default_points() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    // Transient upload-in-progress marker; never persisted.
    #[serde(skip)]
    pub uploading: bool,
}

/// Backend-owned record of a user's participation in a course. Read-only
/// here; the enroll and progress endpoints are the only writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<Course>,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub completed_lessons: Vec<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn course_id(&self) -> Option<&str> {
        self.course_id
            .as_deref()
            .or_else(|| self.course.as_ref().and_then(|c| c.id.as_deref()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub level: i64,
}

/// Returned by the progress-marking endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub completed_lessons: Vec<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub level: i64,
}

/// One scored quiz attempt as opened by the backend. The question set is
/// rendered exactly as received; this side never invents question content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStart {
    pub attempt_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    #[serde(default)]
    pub percentage_score: i64,
    #[serde(default)]
    pub points_earned: i64,
    #[serde(default)]
    pub badges_awarded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points_required: i64,
}

/// Identity rule for lessons: stable id when persisted, else the positional
/// fallback `"{unitIndex}-{lessonIndex}"`. Every derived computation and
/// every list key uses this same rule, so identity survives a reorder of
/// unsaved rows without flicker.
pub fn lesson_key(lesson: &Lesson, unit_index: usize, lesson_index: usize) -> String {
    match &lesson.id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => format!("{}-{}", unit_index, lesson_index),
    }
}
