use chrono::Utc;
use uuid::Uuid;

use crate::models::audit::{LogMetadata, SessionAction, SessionLog};
use crate::models::notification::Notification;
use crate::models::session::Session;
use crate::models::user::{Role, User};
use crate::models::vehicle::Vehicle;

/// Memory-resident collections backing the scheduler. The whole store sits
/// behind a single writer lock owned by the `Scheduler` handle, so every
/// mutating operation observes and commits a consistent snapshot.
#[derive(Debug, Default)]
pub struct Store {
    pub users: Vec<User>,
    pub vehicles: Vec<Vehicle>,
    pub sessions: Vec<Session>,
    pub notifications: Vec<Notification>,
    pub logs: Vec<SessionLog>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn admin_email(&self) -> Option<&str> {
        self.users.iter().find(|u| u.role == Role::Admin).map(|u| u.email.as_str())
    }

    pub fn vehicle(&self, id: Uuid) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }

    pub fn vehicle_mut(&mut self, id: Uuid) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id == id)
    }

    pub fn vehicle_name(&self, id: Option<Uuid>) -> String {
        id.and_then(|id| self.vehicle(id)).map(|v| v.name.clone()).unwrap_or_else(|| "None".to_string())
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn session_mut(&mut self, id: Uuid) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    /// Append one audit entry; O(1), never mutated afterwards.
    pub fn append_log(&mut self, session_id: Uuid, action: SessionAction, actor_name: &str, details: impl Into<String>, metadata: Option<LogMetadata>) {
        let details = details.into();
        tracing::info!(
            category = "audit",
            session_id = %session_id,
            action = ?action,
            actor = %actor_name,
            details = %details,
            "session audit event"
        );

        self.logs.push(SessionLog {
            id: Uuid::new_v4(),
            session_id,
            action,
            timestamp: Utc::now(),
            actor_name: actor_name.to_string(),
            details,
            metadata,
        });
    }

    /// Audit entries for one session, most recent first.
    pub fn session_logs(&self, session_id: Uuid) -> Vec<SessionLog> {
        self.logs.iter().rev().filter(|l| l.session_id == session_id).cloned().collect()
    }

    /// Drop every audit entry belonging to a hard-deleted session.
    pub fn purge_session_logs(&mut self, session_id: Uuid) {
        self.logs.retain(|l| l.session_id != session_id);
    }

    pub fn notify(&mut self, user_id: Uuid, message: impl Into<String>) {
        self.notifications.push(Notification {
            id: Uuid::new_v4(),
            user_id,
            message: message.into(),
            read: false,
            timestamp: Utc::now(),
        });
    }

    /// Notifications for one user, most recent first.
    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.notifications.iter().rev().filter(|n| n.user_id == user_id).cloned().collect()
    }
}
