use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::session::SessionStatus;
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::service::Scheduler;
use crate::store::Store;

/// Strict half-open interval overlap: `[a_start, a_end)` against
/// `[b_start, b_end)`. Touching endpoints do not overlap.
pub(crate) fn overlaps(a_start: DateTime<Utc>, a_end: DateTime<Utc>, b_start: DateTime<Utc>, b_end: DateTime<Utc>) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

/// A vehicle is free for a window unless it is missing, not Active, or held
/// by another Booked/InProgress session whose interval overlaps the window.
pub(crate) fn vehicle_available_in(store: &Store, vehicle_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>, exclude_session_id: Option<Uuid>) -> bool {
    let Some(vehicle) = store.vehicle(vehicle_id) else {
        return false;
    };
    if vehicle.status != VehicleStatus::Active {
        return false;
    }

    !store.sessions.iter().any(|session| {
        Some(session.id) != exclude_session_id
            && session.vehicle_id == Some(vehicle_id)
            && matches!(session.status, SessionStatus::Booked | SessionStatus::InProgress)
            && overlaps(session.start, session.end, start, end)
    })
}

impl Scheduler {
    pub async fn is_vehicle_available(&self, vehicle_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>, exclude_session_id: Option<Uuid>) -> bool {
        let state = self.read().await;
        vehicle_available_in(&state, vehicle_id, start, end, exclude_session_id)
    }

    /// Vehicles free for the given window, for the booking form.
    pub async fn available_vehicles(&self, start: DateTime<Utc>, end: DateTime<Utc>, exclude_session_id: Option<Uuid>) -> Vec<Vehicle> {
        let state = self.read().await;
        state
            .vehicles
            .iter()
            .filter(|v| vehicle_available_in(&state, v.id, start, end, exclude_session_id))
            .cloned()
            .collect()
    }
}
