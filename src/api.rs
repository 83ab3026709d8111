use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::curriculum::{
    AttemptResult, AttemptStart, Course, Enrollment, ProgressUpdate, Reward, UserProfile,
};

/// Failure taxonomy for backend calls. `Unauthorized` is its own variant so
/// callers can clear the stored token; `Rejected` carries the backend's
/// message verbatim for the view to surface.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authentication required")]
    Unauthorized,
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response shape: {0}")]
    BadResponse(String),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilters {
    pub subject: Option<String>,
    pub grade: Option<i64>,
    pub level: Option<String>,
    pub search: Option<String>,
}

/// Blocking client for the LearnHub REST backend. One instance per
/// connected base URL; the bearer token rides on every request while set.
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ApiClient {
        ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut rb = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            rb = rb.bearer_auth(token);
        }
        rb
    }

    fn execute(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        tracing::debug!(%method, path, "backend request");
        let mut rb = self.request(method, path);
        if let Some(body) = body {
            rb = rb.json(&body);
        }
        let resp = rb.send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        let text = resp.text()?;
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let success = value.get("success").and_then(|v| v.as_bool());
        if !status.is_success() || success == Some(false) {
            let message = value
                .get("message")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            return Err(ApiError::Rejected(message));
        }
        if value.is_null() {
            return Err(ApiError::BadResponse(format!("non-JSON body from {}", path)));
        }
        Ok(value)
    }

    fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.execute(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.execute(Method::PUT, path, Some(body))
    }

    // --- auth ---

    pub fn login(&self, email: &str, password: &str) -> Result<(String, UserProfile), ApiError> {
        let v = self.post("/auth/login", json!({ "email": email, "password": password }))?;
        auth_payload(v)
    }

    pub fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<(String, UserProfile), ApiError> {
        let v = self.post(
            "/auth/register",
            json!({ "name": name, "email": email, "password": password, "role": role }),
        )?;
        auth_payload(v)
    }

    pub fn profile(&self) -> Result<UserProfile, ApiError> {
        field(self.get("/auth/profile")?, "user")
    }

    pub fn update_profile(&self, patch: Value) -> Result<UserProfile, ApiError> {
        field(self.execute(Method::PUT, "/auth/profile", Some(patch))?, "user")
    }

    // --- courses ---

    pub fn list_courses(&self, filters: &CourseFilters) -> Result<Vec<Course>, ApiError> {
        let mut query: Vec<String> = Vec::new();
        if let Some(subject) = &filters.subject {
            query.push(format!("subject={}", subject));
        }
        if let Some(grade) = filters.grade {
            query.push(format!("grade={}", grade));
        }
        if let Some(level) = &filters.level {
            query.push(format!("level={}", level));
        }
        if let Some(search) = &filters.search {
            query.push(format!("search={}", search));
        }
        let path = if query.is_empty() {
            "/courses".to_string()
        } else {
            format!("/courses?{}", query.join("&"))
        };
        field(self.get(&path)?, "courses")
    }

    pub fn get_course(&self, course_id: &str) -> Result<Course, ApiError> {
        field(self.get(&format!("/courses/{}", course_id))?, "course")
    }

    pub fn create_course(&self, course: &Course) -> Result<Course, ApiError> {
        let body = serde_json::to_value(course)
            .map_err(|e| ApiError::BadResponse(e.to_string()))?;
        field(self.post("/courses", body)?, "course")
    }

    /// Full-document replace; there is no partial persistence.
    pub fn update_course(&self, course_id: &str, course: &Course) -> Result<Course, ApiError> {
        let body = serde_json::to_value(course)
            .map_err(|e| ApiError::BadResponse(e.to_string()))?;
        field(self.put(&format!("/courses/{}", course_id), body)?, "course")
    }

    pub fn delete_course(&self, course_id: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, &format!("/courses/{}", course_id), None)?;
        Ok(())
    }

    pub fn my_courses(&self) -> Result<Vec<Course>, ApiError> {
        field(self.get("/courses/mycourses")?, "courses")
    }

    // --- enrollment / progress ---

    pub fn enroll(&self, course_id: &str) -> Result<Enrollment, ApiError> {
        field(
            self.post(&format!("/courses/{}/enroll", course_id), json!({}))?,
            "enrollment",
        )
    }

    pub fn enrolled(&self) -> Result<Vec<Enrollment>, ApiError> {
        field(self.get("/courses/enrolled")?, "enrollments")
    }

    pub fn course_enrollments(&self, course_id: &str) -> Result<Vec<Enrollment>, ApiError> {
        field(
            self.get(&format!("/courses/{}/enrollments", course_id))?,
            "enrollments",
        )
    }

    pub fn mark_lesson(
        &self,
        course_id: &str,
        lesson_id: &str,
        completed: bool,
    ) -> Result<ProgressUpdate, ApiError> {
        let v = self.post(
            &format!("/courses/{}/progress", course_id),
            json!({ "lessonId": lesson_id, "completed": completed }),
        )?;
        whole(v)
    }

    // --- quiz attempts ---

    pub fn start_attempt(&self, quiz_id: &str) -> Result<AttemptStart, ApiError> {
        whole(self.post("/attempts/start", json!({ "quizId": quiz_id }))?)
    }

    pub fn submit_attempt(&self, attempt_id: &str, answers: Value) -> Result<AttemptResult, ApiError> {
        whole(self.post(
            &format!("/attempts/submit/{}", attempt_id),
            json!({ "answers": answers }),
        )?)
    }

    // --- rewards ---

    pub fn list_rewards(&self) -> Result<Vec<Reward>, ApiError> {
        field(self.get("/rewards")?, "rewards")
    }
}

fn auth_payload(v: Value) -> Result<(String, UserProfile), ApiError> {
    let token = v
        .get("token")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ApiError::BadResponse("missing token".to_string()))?
        .to_string();
    let user = field(v, "user")?;
    Ok((token, user))
}

fn field<T: DeserializeOwned>(v: Value, key: &str) -> Result<T, ApiError> {
    let inner = v
        .get(key)
        .cloned()
        .ok_or_else(|| ApiError::BadResponse(format!("missing {}", key)))?;
    serde_json::from_value(inner).map_err(|e| ApiError::BadResponse(format!("{}: {}", key, e)))
}

/// For endpoints whose payload rides flat beside the envelope fields.
fn whole<T: DeserializeOwned>(v: Value) -> Result<T, ApiError> {
    serde_json::from_value(v).map_err(|e| ApiError::BadResponse(e.to_string()))
}
