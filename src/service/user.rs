use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::user::{AdminCreateUserRequest, LoginRequest, RegisterRequest, Role, User, UserUpdateRequest};
use crate::service::session::rewrite_denormalized_names;
use crate::service::{Scheduler, require_role, require_user};
use crate::store::Store;

const DEFAULT_ADMIN_CREATED_PASSWORD: &str = "password123";

/// Hash verified against when the email does not resolve to an account, so
/// lookup misses take as long as password mismatches.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| hash_password("decoy-password-never-accepted").expect("static hash"));

pub(crate) fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

impl Scheduler {
    /// Self-service registration always creates a Learner account; staff
    /// accounts come from `admin_create_user`.
    pub async fn register(&self, data: &RegisterRequest, now: DateTime<Utc>) -> Result<User, AppError> {
        let mut store = self.write().await;
        ensure_email_free(&store, &data.email, None)?;

        let user = User {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            email: data.email.clone(),
            password_hash: hash_password(&data.password)?,
            role: Role::Learner,
            is_active: true,
            registered_at: now,
            teacher_constraints: None,
        };
        store.notify(user.id, format!("Welcome to DriveTime, {}!", user.name));
        store.users.push(user.clone());
        Ok(user)
    }

    pub async fn authenticate(&self, data: &LoginRequest) -> Result<User, AppError> {
        let store = self.read().await;
        let user = store.user_by_email(&data.email).cloned();

        let hash = user.as_ref().map(|u| u.password_hash.as_str()).unwrap_or(DUMMY_HASH.as_str());
        let verified = verify_password(&data.password, hash);

        let Some(user) = user else {
            return Err(AppError::InvalidCredentials);
        };
        if !verified {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            let contact = store.admin_email().unwrap_or("your administrator").to_string();
            return Err(AppError::Authorization(format!(
                "Your account has been deactivated. Please contact {contact} to reactivate it."
            )));
        }

        Ok(user)
    }

    /// Profile update by the account owner or an admin. A rename also
    /// rewrites the name copies held on non-terminal sessions.
    pub async fn update_user(&self, target_id: Uuid, actor_id: Uuid, updates: &UserUpdateRequest) -> Result<User, AppError> {
        let mut store = self.write().await;
        let actor = require_user(&store, actor_id)?;
        if actor.id != target_id && actor.role != Role::Admin {
            return Err(AppError::unauthorized());
        }
        let target = require_user(&store, target_id)?;

        if let Some(email) = &updates.email {
            ensure_email_free(&store, email, Some(target_id))?;
        }
        if updates.teacher_constraints.is_some() && target.role != Role::Teacher {
            return Err(AppError::Validation("Booking constraints only apply to teacher accounts.".to_string()));
        }

        let new_password_hash = match &updates.password {
            Some(password) => Some(hash_password(password)?),
            None => None,
        };

        let renamed = updates.name.as_ref().filter(|name| **name != target.name).cloned();

        let user = store.user_mut(target_id).ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if let Some(name) = &updates.name {
            user.name = name.clone();
        }
        if let Some(email) = &updates.email {
            user.email = email.clone();
        }
        if let Some(hash) = new_password_hash {
            user.password_hash = hash;
        }
        if let Some(constraints) = updates.teacher_constraints {
            user.teacher_constraints = Some(user.teacher_constraints.unwrap_or_default().merged_with(constraints));
        }
        let updated = user.clone();

        if let Some(name) = renamed {
            rewrite_denormalized_names(&mut store, target_id, &name);
        }

        Ok(updated)
    }

    /// Admin-provisioned account. Falls back to a fixed starter password the
    /// user is expected to change on first login.
    pub async fn admin_create_user(&self, admin_id: Uuid, data: &AdminCreateUserRequest, now: DateTime<Utc>) -> Result<User, AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;
        ensure_email_free(&store, &data.email, None)?;

        let password = data.password.as_deref().unwrap_or(DEFAULT_ADMIN_CREATED_PASSWORD);
        let user = User {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            email: data.email.clone(),
            password_hash: hash_password(password)?,
            role: data.role,
            is_active: true,
            registered_at: now,
            teacher_constraints: None,
        };
        store.users.push(user.clone());
        Ok(user)
    }

    /// Activate or deactivate an account. Deactivation cascades: a teacher's
    /// future sessions are removed and booked learners told, a learner is
    /// pulled off their future bookings.
    pub async fn set_user_active(&self, admin_id: Uuid, target_id: Uuid, active: bool, now: DateTime<Utc>) -> Result<User, AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;

        let target = require_user(&store, target_id)?;
        if target.role == Role::Admin {
            return Err(AppError::Authorization("Administrator accounts cannot be deactivated".to_string()));
        }

        let was_active = target.is_active;
        let user = store.user_mut(target_id).ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.is_active = active;
        let updated = user.clone();

        if was_active && !active {
            self.cascade_user_removal(&mut store, &updated, now);
        }

        Ok(updated)
    }

    /// Hard-delete an account after running the deactivation cascade. The
    /// account's notifications go with it.
    pub async fn delete_user(&self, admin_id: Uuid, target_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;

        let target = require_user(&store, target_id)?;
        if target.role == Role::Admin {
            return Err(AppError::Authorization("Administrator accounts cannot be deleted".to_string()));
        }

        self.cascade_user_removal(&mut store, &target, now);
        store.users.retain(|u| u.id != target_id);
        store.notifications.retain(|n| n.user_id != target_id);

        Ok(())
    }
}

fn ensure_email_free(store: &Store, email: &str, exclude: Option<Uuid>) -> Result<(), AppError> {
    let taken = store.user_by_email(email).map(|u| u.id).filter(|id| Some(*id) != exclude).is_some();
    if taken {
        return Err(AppError::Conflict("An account with this email already exists.".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionStatus;
    use crate::models::user::TeacherConstraints;
    use crate::test_utils::{at, base_time, practice_session, sample_admin, sample_learner, sample_teacher, scheduler_with};

    fn register_request(name: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate_round_trip() {
        let scheduler = scheduler_with(Store::new());
        let user = scheduler.register(&register_request("Lena", "lena@drivetime.test"), base_time()).await.unwrap();
        assert_eq!(user.role, Role::Learner);
        assert_ne!(user.password_hash, "s3cret-pass");

        let login = LoginRequest {
            email: "LENA@drivetime.test".to_string(),
            password: "s3cret-pass".to_string(),
        };
        let authenticated = scheduler.authenticate(&login).await.unwrap();
        assert_eq!(authenticated.id, user.id);

        let wrong = LoginRequest {
            email: "lena@drivetime.test".to_string(),
            password: "wrong-pass".to_string(),
        };
        assert!(matches!(scheduler.authenticate(&wrong).await, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let scheduler = scheduler_with(Store::new());
        scheduler.register(&register_request("Lena", "lena@drivetime.test"), base_time()).await.unwrap();

        let duplicate = scheduler.register(&register_request("Other", "LENA@drivetime.test"), base_time()).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn deactivated_account_cannot_log_in() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let mut learner = sample_learner("Lena", "lena@drivetime.test");
        learner.password_hash = hash_password("s3cret-pass").unwrap();
        learner.is_active = false;
        store.users.extend([admin, learner]);
        let scheduler = scheduler_with(store);

        let login = LoginRequest {
            email: "lena@drivetime.test".to_string(),
            password: "s3cret-pass".to_string(),
        };
        let result = scheduler.authenticate(&login).await;
        match result {
            Err(AppError::Authorization(message)) => assert!(message.contains("admin@drivetime.test")),
            other => panic!("expected authorization error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rename_propagates_to_live_sessions() {
        let mut store = Store::new();
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let mut live = practice_session(&teacher, at(1, 10), at(1, 11));
        live.status = SessionStatus::Booked;
        let mut done = practice_session(&teacher, at(0, 8), at(0, 9));
        done.status = SessionStatus::Finished;
        let teacher_id = teacher.id;
        store.users.push(teacher);
        store.sessions.extend([live, done]);
        let scheduler = scheduler_with(store);

        let updates = UserUpdateRequest {
            name: Some("Tessa".to_string()),
            email: None,
            password: None,
            teacher_constraints: None,
        };
        scheduler.update_user(teacher_id, teacher_id, &updates).await.unwrap();

        let sessions = scheduler.sessions().await;
        assert_eq!(sessions[0].teacher_name, "Tessa");
        assert_eq!(sessions[1].teacher_name, "Tess");
    }

    #[tokio::test]
    async fn constraints_merge_and_only_apply_to_teachers() {
        let mut store = Store::new();
        let mut teacher = sample_teacher("Tess", "tess@drivetime.test");
        teacher.teacher_constraints = Some(TeacherConstraints {
            max_sessions_per_learner_daily: Some(1),
            max_sessions_per_learner_weekly: Some(3),
        });
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let teacher_id = teacher.id;
        let learner_id = learner.id;
        store.users.extend([teacher, learner]);
        let scheduler = scheduler_with(store);

        let updates = UserUpdateRequest {
            name: None,
            email: None,
            password: None,
            teacher_constraints: Some(TeacherConstraints {
                max_sessions_per_learner_daily: Some(2),
                max_sessions_per_learner_weekly: None,
            }),
        };
        let updated = scheduler.update_user(teacher_id, teacher_id, &updates).await.unwrap();
        let constraints = updated.teacher_constraints.unwrap();
        assert_eq!(constraints.max_sessions_per_learner_daily, Some(2));
        assert_eq!(constraints.max_sessions_per_learner_weekly, Some(3));

        let on_learner = scheduler.update_user(learner_id, learner_id, &updates).await;
        assert!(matches!(on_learner, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn update_requires_self_or_admin() {
        let mut store = Store::new();
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let other = sample_learner("Marc", "marc@drivetime.test");
        let admin = sample_admin("Root", "admin@drivetime.test");
        let (learner_id, other_id, admin_id) = (learner.id, other.id, admin.id);
        store.users.extend([learner, other, admin]);
        let scheduler = scheduler_with(store);

        let updates = UserUpdateRequest {
            name: Some("Helena".to_string()),
            email: None,
            password: None,
            teacher_constraints: None,
        };
        assert!(matches!(scheduler.update_user(learner_id, other_id, &updates).await, Err(AppError::Authorization(_))));
        assert!(scheduler.update_user(learner_id, admin_id, &updates).await.is_ok());
    }

    #[tokio::test]
    async fn teacher_deactivation_removes_future_sessions() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let learner = sample_learner("Lena", "lena@drivetime.test");

        let mut future = practice_session(&teacher, at(1, 10), at(1, 11));
        future.status = SessionStatus::Booked;
        future.learner_ids = vec![learner.id];
        future.learner_names = vec![learner.name.clone()];
        let mut past = practice_session(&teacher, at(0, 8) - chrono::Duration::days(1), at(0, 9) - chrono::Duration::days(1));
        past.status = SessionStatus::Finished;

        let (admin_id, teacher_id, learner_id) = (admin.id, teacher.id, learner.id);
        let past_id = past.id;
        store.users.extend([admin, teacher, learner]);
        store.sessions.extend([future, past]);
        let scheduler = scheduler_with(store);

        let updated = scheduler.set_user_active(admin_id, teacher_id, false, base_time()).await.unwrap();
        assert!(!updated.is_active);

        let sessions = scheduler.sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, past_id);
        assert_eq!(scheduler.notifications_for(learner_id).await.len(), 1);
    }

    #[tokio::test]
    async fn admin_accounts_cannot_be_deactivated_or_deleted() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let other_admin = sample_admin("Boot", "boot@drivetime.test");
        let (admin_id, other_id) = (admin.id, other_admin.id);
        store.users.extend([admin, other_admin]);
        let scheduler = scheduler_with(store);

        assert!(matches!(
            scheduler.set_user_active(admin_id, other_id, false, base_time()).await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(scheduler.delete_user(admin_id, other_id, base_time()).await, Err(AppError::Authorization(_))));
    }

    #[tokio::test]
    async fn delete_user_drops_account_and_notifications() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let (admin_id, learner_id) = (admin.id, learner.id);
        store.notify(learner_id, "stale message");
        store.users.extend([admin, learner]);
        let scheduler = scheduler_with(store);

        scheduler.delete_user(admin_id, learner_id, base_time()).await.unwrap();
        assert_eq!(scheduler.users().await.len(), 1);
        assert!(scheduler.notifications_for(learner_id).await.is_empty());
    }
}
