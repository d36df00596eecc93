pub mod availability;
pub mod constraint;
pub mod matcher;
pub mod notification;
pub mod session;
pub mod user;
pub mod vehicle;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::app_error::AppError;
use crate::models::audit::SessionLog;
use crate::models::session::Session;
use crate::models::user::{Role, User};
use crate::models::vehicle::Vehicle;
use crate::store::Store;

/// The scheduling core. Owns the session/user/vehicle collections behind a
/// single writer lock; constructed once at process start and shared by
/// reference with the route layer and the status sweeper.
pub struct Scheduler {
    state: RwLock<Store>,
    rng: Mutex<StdRng>,
    tz: Tz,
    default_theory_capacity: u32,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self::with_store(Store::new(), config)
    }

    pub fn with_store(store: Store, config: &SchedulerConfig) -> Self {
        let rng = match config.score_jitter_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            state: RwLock::new(store),
            rng: Mutex::new(rng),
            tz: config.timezone,
            default_theory_capacity: config.default_theory_capacity,
        }
    }

    pub(crate) async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, Store> {
        self.state.read().await
    }

    pub(crate) async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, Store> {
        self.state.write().await
    }

    pub(crate) fn rng(&self) -> &Mutex<StdRng> {
        &self.rng
    }

    pub(crate) fn tz(&self) -> Tz {
        self.tz
    }

    pub(crate) fn default_theory_capacity(&self) -> u32 {
        self.default_theory_capacity
    }

    /// Render an instant in the configured local timezone for user-facing
    /// notification and audit text.
    pub(crate) fn fmt_local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format("%Y-%m-%d %H:%M").to_string()
    }

    // ── Query surface ─────────────────────────────────────────────────────

    pub async fn sessions(&self) -> Vec<Session> {
        self.state.read().await.sessions.clone()
    }

    pub async fn vehicles(&self) -> Vec<Vehicle> {
        self.state.read().await.vehicles.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.read().await.users.clone()
    }

    /// Active-user lookup used by the authentication guard.
    pub async fn active_user(&self, id: Uuid) -> Option<User> {
        self.state.read().await.user(id).filter(|u| u.is_active).cloned()
    }

    pub async fn session_logs(&self, session_id: Uuid) -> Result<Vec<SessionLog>, AppError> {
        let state = self.state.read().await;
        if state.session(session_id).is_none() {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        Ok(state.session_logs(session_id))
    }
}

/// Look up a user or fail with the not-found taxonomy entry.
pub(crate) fn require_user(store: &Store, id: Uuid) -> Result<User, AppError> {
    store.user(id).cloned().ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub(crate) fn require_role(user: &User, role: Role) -> Result<(), AppError> {
    if user.role == role {
        Ok(())
    } else {
        Err(AppError::unauthorized())
    }
}
