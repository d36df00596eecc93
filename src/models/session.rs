use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Available,
    Booked,
    Full,
    InProgress,
    Finished,
    CancelledByLearner,
    CancelledByTeacher,
    CancelledUnbooked,
}

impl SessionStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Finished
                | SessionStatus::CancelledByLearner
                | SessionStatus::CancelledByTeacher
                | SessionStatus::CancelledUnbooked
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    Practice,
    Theory,
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionType::Practice => write!(f, "Practice"),
            SessionType::Theory => write!(f, "Theory"),
        }
    }
}

/// A scheduled teaching slot. Practice sessions are one-on-one and may need a
/// vehicle; Theory sessions hold up to `capacity` learners.
///
/// `teacher_name` and `learner_names` are denormalized copies of user names,
/// kept index-aligned with `learner_ids` and rewritten when a user is renamed.
#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub learner_ids: Vec<Uuid>,
    pub learner_names: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub cancellation_reason: Option<String>,
    pub requires_vehicle: bool,
    pub vehicle_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl Session {
    pub fn holds_learner(&self, learner_id: Uuid) -> bool {
        self.learner_ids.contains(&learner_id)
    }

    /// Effective seat count: Theory capacity, or 1 for Practice.
    pub fn seat_count(&self) -> u32 {
        match self.session_type {
            SessionType::Practice => 1,
            SessionType::Theory => self.capacity.unwrap_or(0),
        }
    }
}

#[derive(Deserialize, Debug, Validate)]
pub struct CreateSessionRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub requires_vehicle: bool,
    pub vehicle_id: Option<Uuid>,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<u32>,
}

/// Partial update. `vehicle_id` distinguishes "leave alone" (absent) from
/// "clear" (null) from "reassign" (value).
#[derive(Deserialize, Debug, Validate)]
pub struct UpdateSessionRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default, with = "double_option")]
    pub vehicle_id: Option<Option<Uuid>>,
    pub requires_vehicle: Option<bool>,
    #[validate(range(min = 1, max = 50))]
    pub capacity: Option<u32>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Deserialize, Debug)]
pub struct CancelSessionRequest {
    #[serde(default)]
    pub reason: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct SessionResponse {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub learner_ids: Vec<Uuid>,
    pub learner_names: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub requires_vehicle: bool,
    pub vehicle_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            teacher_id: session.teacher_id,
            teacher_name: session.teacher_name.clone(),
            learner_ids: session.learner_ids.clone(),
            learner_names: session.learner_names.clone(),
            start: session.start,
            end: session.end,
            status: session.status,
            created_at: session.created_at,
            cancellation_reason: session.cancellation_reason.clone(),
            requires_vehicle: session.requires_vehicle,
            vehicle_id: session.vehicle_id,
            session_type: session.session_type,
            capacity: session.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Finished.is_terminal());
        assert!(SessionStatus::CancelledByLearner.is_terminal());
        assert!(SessionStatus::CancelledByTeacher.is_terminal());
        assert!(SessionStatus::CancelledUnbooked.is_terminal());
        assert!(!SessionStatus::Available.is_terminal());
        assert!(!SessionStatus::Booked.is_terminal());
        assert!(!SessionStatus::Full.is_terminal());
        assert!(!SessionStatus::InProgress.is_terminal());
    }

    #[test]
    fn update_request_distinguishes_missing_from_null_vehicle() {
        let absent: UpdateSessionRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.vehicle_id, None);

        let cleared: UpdateSessionRequest = serde_json::from_str(r#"{"vehicle_id": null}"#).unwrap();
        assert_eq!(cleared.vehicle_id, Some(None));
    }
}
