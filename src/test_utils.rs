use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::models::session::{Session, SessionStatus, SessionType};
use crate::models::user::{Role, User};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::service::Scheduler;
use crate::store::Store;

/// Monday, so `at(1, _)` and `at(4, _)` share an ISO week while `at(8, _)`
/// falls in the next one.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
}

pub fn at(day: i64, hour: u32) -> DateTime<Utc> {
    base_time() + Duration::days(day) + Duration::hours(hour as i64)
}

pub fn scheduler_with(store: Store) -> Scheduler {
    let config = SchedulerConfig {
        score_jitter_seed: Some(42),
        ..SchedulerConfig::default()
    };
    Scheduler::with_store(store, &config)
}

fn sample_user(name: &str, email: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: String::new(),
        role,
        is_active: true,
        registered_at: base_time() - Duration::days(30),
        teacher_constraints: None,
    }
}

pub fn sample_admin(name: &str, email: &str) -> User {
    sample_user(name, email, Role::Admin)
}

pub fn sample_teacher(name: &str, email: &str) -> User {
    sample_user(name, email, Role::Teacher)
}

pub fn sample_learner(name: &str, email: &str) -> User {
    sample_user(name, email, Role::Learner)
}

pub fn sample_vehicle(name: &str, plate: &str) -> Vehicle {
    Vehicle {
        id: Uuid::new_v4(),
        name: name.to_string(),
        plate: plate.to_string(),
        status: VehicleStatus::Active,
    }
}

fn sample_session(teacher: &User, start: DateTime<Utc>, end: DateTime<Utc>, session_type: SessionType, capacity: Option<u32>) -> Session {
    Session {
        id: Uuid::new_v4(),
        teacher_id: teacher.id,
        teacher_name: teacher.name.clone(),
        learner_ids: Vec::new(),
        learner_names: Vec::new(),
        start,
        end,
        status: SessionStatus::Available,
        created_at: start - Duration::days(1),
        cancellation_reason: None,
        requires_vehicle: false,
        vehicle_id: None,
        session_type,
        capacity,
    }
}

pub fn practice_session(teacher: &User, start: DateTime<Utc>, end: DateTime<Utc>) -> Session {
    sample_session(teacher, start, end, SessionType::Practice, None)
}

pub fn theory_session(teacher: &User, start: DateTime<Utc>, end: DateTime<Utc>, capacity: u32) -> Session {
    sample_session(teacher, start, end, SessionType::Theory, Some(capacity))
}
