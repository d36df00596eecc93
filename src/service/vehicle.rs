use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::user::Role;
use crate::models::vehicle::{Vehicle, VehicleRequest, VehicleStatus};
use crate::service::session::VehicleUnassignCause;
use crate::service::{Scheduler, require_role, require_user};

/// Uppercase letters and digits in dash-separated groups, e.g. `AB-123-CD`.
static PLATE_FORMAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z0-9]+(?:-[A-Z0-9]+)*$").expect("static pattern"));

impl Scheduler {
    pub async fn create_vehicle(&self, admin_id: Uuid, data: &VehicleRequest) -> Result<Vehicle, AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;

        let plate = data.plate.trim().to_uppercase();
        if !PLATE_FORMAT.is_match(&plate) {
            return Err(AppError::Validation("Plate must be uppercase letters and digits in dash-separated groups.".to_string()));
        }
        if store.vehicles.iter().any(|v| v.plate == plate) {
            return Err(AppError::Conflict("A vehicle with this plate already exists.".to_string()));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            plate,
            status: VehicleStatus::Active,
        };
        store.vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    /// Change a vehicle's status. Moving it out of Active pulls it off every
    /// future session that references it and tells the affected teachers.
    pub async fn set_vehicle_status(&self, admin_id: Uuid, vehicle_id: Uuid, status: VehicleStatus, now: DateTime<Utc>) -> Result<Vehicle, AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;

        let vehicle = store.vehicle_mut(vehicle_id).ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;
        vehicle.status = status;
        let updated = vehicle.clone();

        if status != VehicleStatus::Active {
            self.cascade_vehicle_unassign(&mut store, vehicle_id, &updated.name, VehicleUnassignCause::StatusChange(status), now);
        }

        Ok(updated)
    }

    /// Hard-remove a vehicle, unassigning it from every future session first.
    pub async fn delete_vehicle(&self, admin_id: Uuid, vehicle_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut store = self.write().await;
        let admin = require_user(&store, admin_id)?;
        require_role(&admin, Role::Admin)?;

        let vehicle = store.vehicle(vehicle_id).cloned().ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        self.cascade_vehicle_unassign(&mut store, vehicle_id, &vehicle.name, VehicleUnassignCause::Deleted, now);
        store.vehicles.retain(|v| v.id != vehicle_id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audit::SessionAction;
    use crate::models::session::SessionStatus;
    use crate::store::Store;
    use crate::test_utils::{at, base_time, practice_session, sample_admin, sample_teacher, sample_vehicle, scheduler_with};

    fn vehicle_request(name: &str, plate: &str) -> VehicleRequest {
        VehicleRequest {
            name: name.to_string(),
            plate: plate.to_string(),
        }
    }

    #[tokio::test]
    async fn create_normalizes_and_validates_the_plate() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let admin_id = admin.id;
        store.users.push(admin);
        let scheduler = scheduler_with(store);

        let created = scheduler.create_vehicle(admin_id, &vehicle_request("Golf", " ab-123-cd ")).await.unwrap();
        assert_eq!(created.plate, "AB-123-CD");
        assert_eq!(created.status, VehicleStatus::Active);

        let bad = scheduler.create_vehicle(admin_id, &vehicle_request("Polo", "ab 123!")).await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn duplicate_plates_are_rejected_after_normalization() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let admin_id = admin.id;
        store.users.push(admin);
        let scheduler = scheduler_with(store);

        scheduler.create_vehicle(admin_id, &vehicle_request("Golf", "AB-123-CD")).await.unwrap();
        let duplicate = scheduler.create_vehicle(admin_id, &vehicle_request("Polo", "ab-123-cd")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn maintenance_unassigns_future_sessions_only() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let vehicle = sample_vehicle("Golf", "AB-123-CD");

        let mut future = practice_session(&teacher, at(1, 10), at(1, 11));
        future.status = SessionStatus::Booked;
        future.vehicle_id = Some(vehicle.id);
        let mut past = practice_session(&teacher, at(-1, 10), at(-1, 11));
        past.status = SessionStatus::Finished;
        past.vehicle_id = Some(vehicle.id);

        let (admin_id, teacher_id, vehicle_id) = (admin.id, teacher.id, vehicle.id);
        let (future_id, past_id) = (future.id, past.id);
        store.users.extend([admin, teacher]);
        store.vehicles.push(vehicle);
        store.sessions.extend([future, past]);
        let scheduler = scheduler_with(store);

        let updated = scheduler
            .set_vehicle_status(admin_id, vehicle_id, VehicleStatus::Maintenance, base_time())
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Maintenance);

        let sessions = scheduler.sessions().await;
        assert_eq!(sessions.iter().find(|s| s.id == future_id).unwrap().vehicle_id, None);
        assert_eq!(sessions.iter().find(|s| s.id == past_id).unwrap().vehicle_id, Some(vehicle_id));

        let logs = scheduler.session_logs(future_id).await.unwrap();
        assert_eq!(logs[0].action, SessionAction::VehicleChange);
        assert!(logs[0].details.contains("Status: Maintenance"));
        assert_eq!(scheduler.notifications_for(teacher_id).await.len(), 1);
    }

    #[tokio::test]
    async fn delete_unassigns_then_removes_the_vehicle() {
        let mut store = Store::new();
        let admin = sample_admin("Root", "admin@drivetime.test");
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let vehicle = sample_vehicle("Golf", "AB-123-CD");

        let mut future = practice_session(&teacher, at(1, 10), at(1, 11));
        future.status = SessionStatus::Booked;
        future.vehicle_id = Some(vehicle.id);

        let (admin_id, vehicle_id, future_id) = (admin.id, vehicle.id, future.id);
        store.users.extend([admin, teacher]);
        store.vehicles.push(vehicle);
        store.sessions.push(future);
        let scheduler = scheduler_with(store);

        scheduler.delete_vehicle(admin_id, vehicle_id, base_time()).await.unwrap();
        assert!(scheduler.vehicles().await.is_empty());

        let sessions = scheduler.sessions().await;
        assert_eq!(sessions[0].vehicle_id, None);
        let logs = scheduler.session_logs(future_id).await.unwrap();
        assert!(logs[0].details.contains("(Deleted)"));
    }

    #[tokio::test]
    async fn non_admins_cannot_manage_vehicles() {
        let mut store = Store::new();
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let teacher_id = teacher.id;
        store.users.push(teacher);
        let scheduler = scheduler_with(store);

        let result = scheduler.create_vehicle(teacher_id, &vehicle_request("Golf", "AB-123-CD")).await;
        assert!(matches!(result, Err(AppError::Authorization(_))));
    }
}
