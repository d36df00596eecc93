use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Teacher,
    Learner,
}

/// Per-teacher caps on how often a single learner may book with them.
/// A missing or zero value means the cap is not enforced.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeacherConstraints {
    pub max_sessions_per_learner_daily: Option<u32>,
    pub max_sessions_per_learner_weekly: Option<u32>,
}

impl TeacherConstraints {
    /// Overlay the fields set in `updates` onto `self`, keeping the rest.
    pub fn merged_with(self, updates: TeacherConstraints) -> Self {
        Self {
            max_sessions_per_learner_daily: updates.max_sessions_per_learner_daily.or(self.max_sessions_per_learner_daily),
            max_sessions_per_learner_weekly: updates.max_sessions_per_learner_weekly.or(self.max_sessions_per_learner_weekly),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    pub teacher_constraints: Option<TeacherConstraints>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct UserUpdateRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
    pub teacher_constraints: Option<TeacherConstraints>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: Role,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct UserStatusRequest {
    pub is_active: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_constraints: Option<TeacherConstraints>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            registered_at: user.registered_at,
            teacher_constraints: user.teacher_constraints,
        }
    }
}
