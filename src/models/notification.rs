use chrono::{DateTime, Utc};
use rocket::serde::Serialize;
use uuid::Uuid;

#[derive(Serialize, Debug, Clone)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}
