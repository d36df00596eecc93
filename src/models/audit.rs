use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use uuid::Uuid;

/// Pseudo-actor name recorded for automated transitions (status sweep,
/// cascaded deactivation and vehicle-lifecycle effects).
pub const SYSTEM_ACTOR: &str = "System";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionAction {
    Create,
    Book,
    Cancel,
    Reschedule,
    VehicleChange,
    StatusChange,
    Finish,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct LogMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_vehicle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LogMetadata {
    pub fn reason(reason: &str) -> Option<Self> {
        if reason.is_empty() {
            return None;
        }
        Some(Self {
            reason: Some(reason.to_string()),
            ..Self::default()
        })
    }
}

/// One append-only audit entry. `session_id` is a weak reference; entries are
/// cascade-deleted when their session is hard-deleted so the log never holds
/// orphans.
#[derive(Serialize, Debug, Clone)]
pub struct SessionLog {
    pub id: Uuid,
    pub session_id: Uuid,
    pub action: SessionAction,
    pub timestamp: DateTime<Utc>,
    pub actor_name: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<LogMetadata>,
}
