use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::audit::{LogMetadata, SYSTEM_ACTOR, SessionAction};
use crate::models::session::{CreateSessionRequest, Session, SessionStatus, SessionType, UpdateSessionRequest};
use crate::models::user::{Role, User};
use crate::models::vehicle::VehicleStatus;
use crate::service::availability::{overlaps, vehicle_available_in};
use crate::service::constraint::check_booking_limits;
use crate::service::{Scheduler, require_role, require_user};
use crate::store::Store;

const MIN_SESSION_MINUTES: i64 = 30;

/// Why a vehicle is being pulled off its future sessions.
pub(crate) enum VehicleUnassignCause {
    StatusChange(VehicleStatus),
    Deleted,
}

impl Scheduler {
    /// Create a new Available session owned by the calling teacher.
    pub async fn create_session(&self, data: &CreateSessionRequest, creator_id: Uuid, now: DateTime<Utc>) -> Result<Session, AppError> {
        let mut store = self.write().await;
        let creator = require_user(&store, creator_id)?;
        require_role(&creator, Role::Teacher)?;

        validate_interval(data.start, data.end)?;
        if data.start < now {
            return Err(AppError::Temporal("Cannot create sessions in the past.".to_string()));
        }

        let teacher_busy = store
            .sessions
            .iter()
            .any(|s| s.teacher_id == creator.id && !s.status.is_terminal() && overlaps(s.start, s.end, data.start, data.end));
        if teacher_busy {
            return Err(AppError::Conflict("You already have a session scheduled during this time slot.".to_string()));
        }

        if data.requires_vehicle
            && let Some(vehicle_id) = data.vehicle_id
            && !vehicle_available_in(&store, vehicle_id, data.start, data.end, None)
        {
            return Err(AppError::Conflict("The selected vehicle is not available during this time.".to_string()));
        }

        let capacity = match data.session_type {
            SessionType::Theory => Some(data.capacity.unwrap_or(self.default_theory_capacity())),
            SessionType::Practice => None,
        };

        let session = Session {
            id: Uuid::new_v4(),
            teacher_id: creator.id,
            teacher_name: creator.name.clone(),
            learner_ids: Vec::new(),
            learner_names: Vec::new(),
            start: data.start,
            end: data.end,
            status: SessionStatus::Available,
            created_at: now,
            cancellation_reason: None,
            requires_vehicle: data.requires_vehicle,
            vehicle_id: data.vehicle_id,
            session_type: data.session_type,
            capacity,
        };

        store.append_log(session.id, SessionAction::Create, &creator.name, format!("Session created by {}", creator.name), None);
        store.notify(
            creator.id,
            format!("You successfully created a {} session for {}.", session.session_type, self.fmt_local(session.start)),
        );
        store.sessions.push(session.clone());

        Ok(session)
    }

    /// Reschedule and/or reassign the vehicle of an existing session.
    pub async fn update_session(&self, session_id: Uuid, updates: &UpdateSessionRequest, updater_id: Uuid) -> Result<Session, AppError> {
        let mut store = self.write().await;
        let updater = require_user(&store, updater_id)?;
        require_role(&updater, Role::Teacher)?;

        let current = store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if current.teacher_id != updater.id {
            return Err(AppError::Authorization("Only the owning teacher can modify this session".to_string()));
        }
        if current.status.is_terminal() {
            return Err(AppError::Conflict("Cannot edit a session that is already finished or cancelled.".to_string()));
        }

        let new_start = updates.start.unwrap_or(current.start);
        let new_end = updates.end.unwrap_or(current.end);
        validate_interval(new_start, new_end)?;

        let new_vehicle_id = match updates.vehicle_id {
            Some(explicit) => explicit,
            None => current.vehicle_id,
        };
        let requires_vehicle = updates.requires_vehicle.unwrap_or(current.requires_vehicle);

        if requires_vehicle
            && let Some(vehicle_id) = new_vehicle_id
            && !vehicle_available_in(&store, vehicle_id, new_start, new_end, Some(session_id))
        {
            return Err(AppError::Conflict("The assigned vehicle is not available for the selected time slot.".to_string()));
        }

        let mut new_capacity = current.capacity;
        if let Some(capacity) = updates.capacity {
            if current.session_type != SessionType::Theory {
                return Err(AppError::Validation("Practice sessions have a fixed capacity of one learner.".to_string()));
            }
            if (current.learner_ids.len() as u32) > capacity {
                return Err(AppError::Conflict("Capacity cannot be lower than the number of booked learners.".to_string()));
            }
            new_capacity = Some(capacity);
        }

        let time_changed = new_start != current.start || new_end != current.end;
        if new_start != current.start {
            store.append_log(
                session_id,
                SessionAction::Reschedule,
                &updater.name,
                format!("Rescheduled from {} to {}", self.fmt_local(current.start), self.fmt_local(new_start)),
                Some(LogMetadata {
                    old_start: Some(current.start),
                    new_start: Some(new_start),
                    ..LogMetadata::default()
                }),
            );
        }
        if new_vehicle_id != current.vehicle_id {
            let old_name = store.vehicle_name(current.vehicle_id);
            let new_name = store.vehicle_name(new_vehicle_id);
            store.append_log(
                session_id,
                SessionAction::VehicleChange,
                &updater.name,
                format!("Vehicle changed from {old_name} to {new_name}"),
                Some(LogMetadata {
                    old_vehicle: Some(old_name),
                    new_vehicle: Some(new_name),
                    ..LogMetadata::default()
                }),
            );
        }

        let session = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        session.start = new_start;
        session.end = new_end;
        session.vehicle_id = new_vehicle_id;
        session.requires_vehicle = requires_vehicle;
        session.capacity = new_capacity;
        if session.session_type == SessionType::Theory && !session.status.is_terminal() {
            let seats = session.seat_count() as usize;
            if session.status == SessionStatus::Full && session.learner_ids.len() < seats {
                session.status = SessionStatus::Booked;
            } else if session.status == SessionStatus::Booked && !session.learner_ids.is_empty() && session.learner_ids.len() == seats {
                session.status = SessionStatus::Full;
            }
        }
        let updated = session.clone();

        if time_changed {
            let message = format!("Your session with {} has been rescheduled to {}.", updated.teacher_name, self.fmt_local(updated.start));
            for learner_id in updated.learner_ids.clone() {
                store.notify(learner_id, message.clone());
            }
        }

        Ok(updated)
    }

    /// Book the calling learner onto a session, enforcing the owning
    /// teacher's booking limits first.
    pub async fn book_session(&self, session_id: Uuid, learner_id: Uuid) -> Result<Session, AppError> {
        let mut store = self.write().await;
        let learner = require_user(&store, learner_id)?;
        require_role(&learner, Role::Learner)?;

        let session = store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.status.is_terminal() || session.status == SessionStatus::InProgress {
            return Err(AppError::Conflict("Session is not open for booking.".to_string()));
        }

        if let Some(teacher) = store.user(session.teacher_id).cloned() {
            check_booking_limits(&store, &teacher, learner.id, session.start, self.tz())?;
        }

        match session.session_type {
            SessionType::Practice => {
                if session.status != SessionStatus::Available {
                    return Err(AppError::Conflict("Session is not available.".to_string()));
                }

                let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                slot.learner_ids = vec![learner.id];
                slot.learner_names = vec![learner.name.clone()];
                slot.status = SessionStatus::Booked;
                let updated = slot.clone();

                store.append_log(session_id, SessionAction::Book, &learner.name, format!("{} booked the session", learner.name), None);
                store.notify(
                    updated.teacher_id,
                    format!("New Booking: {} booked your practice session on {}.", learner.name, self.fmt_local(updated.start)),
                );
                store.notify(
                    learner.id,
                    format!("Booking Confirmed: Practice session with {} on {}.", updated.teacher_name, self.fmt_local(updated.start)),
                );
                Ok(updated)
            }
            SessionType::Theory => {
                if session.holds_learner(learner.id) {
                    return Err(AppError::Conflict("Already booked.".to_string()));
                }
                if session.learner_ids.len() as u32 >= session.seat_count() {
                    return Err(AppError::Conflict("Session full.".to_string()));
                }

                let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                slot.learner_ids.push(learner.id);
                slot.learner_names.push(learner.name.clone());
                slot.status = if slot.learner_ids.len() as u32 == slot.seat_count() {
                    SessionStatus::Full
                } else {
                    SessionStatus::Booked
                };
                let updated = slot.clone();

                store.append_log(session_id, SessionAction::Book, &learner.name, format!("{} joined the theory session", learner.name), None);
                store.notify(
                    updated.teacher_id,
                    format!("New Booking: {} joined your theory session on {}.", learner.name, self.fmt_local(updated.start)),
                );
                store.notify(
                    learner.id,
                    format!("Booking Confirmed: Theory session with {} on {}.", updated.teacher_name, self.fmt_local(updated.start)),
                );
                Ok(updated)
            }
        }
    }

    /// Cancel a booking or a whole session. Behavior branches on the acting
    /// role and the session type; see the state machine in the module tests.
    pub async fn cancel_session(&self, session_id: Uuid, user_id: Uuid, reason: &str, now: DateTime<Utc>) -> Result<Session, AppError> {
        let mut store = self.write().await;
        let user = require_user(&store, user_id)?;

        let session = store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.status.is_terminal() {
            return Err(AppError::Conflict("Session is already finished or cancelled.".to_string()));
        }

        match user.role {
            Role::Learner => {
                match session.session_type {
                    SessionType::Practice => {
                        if !session.holds_learner(user.id) {
                            return Err(AppError::Conflict("You are not booked on this session.".to_string()));
                        }

                        if session.start > now {
                            // Future practice booking reverts the slot to Available.
                            let old_learner_name = session.learner_names.first().cloned().unwrap_or_default();
                            let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                            slot.status = SessionStatus::Available;
                            slot.cancellation_reason = None;
                            slot.learner_ids.clear();
                            slot.learner_names.clear();

                            store.append_log(
                                session_id,
                                SessionAction::Cancel,
                                &user.name,
                                "Booking cancelled by learner (Reverted to Available)",
                                LogMetadata::reason(reason),
                            );
                            store.notify(
                                session.teacher_id,
                                format!(
                                    "Update: {} cancelled their booking for {}. The session is now available for others.",
                                    old_learner_name,
                                    self.fmt_local(session.start)
                                ),
                            );
                        } else {
                            // Reachable only when the sweep has not run yet.
                            if reason.trim().is_empty() {
                                return Err(AppError::Validation(
                                    "A cancellation reason is required for sessions that have already started.".to_string(),
                                ));
                            }
                            let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                            slot.status = SessionStatus::CancelledByLearner;
                            slot.cancellation_reason = Some(reason.to_string());

                            store.append_log(session_id, SessionAction::Cancel, &user.name, "Session cancelled by learner", LogMetadata::reason(reason));
                            store.notify(
                                session.teacher_id,
                                format!("Cancellation: {} cancelled the session on {}. Reason: {}", user.name, self.fmt_local(session.start), reason),
                            );
                        }
                    }
                    SessionType::Theory => {
                        let Some(position) = session.learner_ids.iter().position(|id| *id == user.id) else {
                            return Err(AppError::Conflict("You are not booked on this session.".to_string()));
                        };

                        let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                        slot.learner_ids.remove(position);
                        slot.learner_names.remove(position);
                        if slot.status == SessionStatus::Full {
                            slot.status = SessionStatus::Booked;
                        }
                        if slot.learner_ids.is_empty() {
                            slot.status = SessionStatus::Available;
                        }

                        store.append_log(session_id, SessionAction::Cancel, &user.name, "Learner left theory session", LogMetadata::reason(reason));
                        store.notify(
                            session.teacher_id,
                            format!("Cancellation: {} left your theory session on {}.", user.name, self.fmt_local(session.start)),
                        );
                    }
                }
                store.notify(user.id, format!("You cancelled/left the session on {}.", self.fmt_local(session.start)));
            }
            Role::Teacher => {
                if session.teacher_id != user.id {
                    return Err(AppError::Authorization("Only the owning teacher can cancel this session".to_string()));
                }

                let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
                slot.status = SessionStatus::CancelledByTeacher;
                slot.cancellation_reason = Some(reason.to_string());

                store.append_log(session_id, SessionAction::Cancel, &user.name, "Session cancelled by Teacher", LogMetadata::reason(reason));
                for learner_id in session.learner_ids.clone() {
                    store.notify(
                        learner_id,
                        format!(
                            "Alert: Your session with {} at {} was cancelled by the instructor. Reason: {}",
                            session.teacher_name,
                            self.fmt_local(session.start),
                            reason
                        ),
                    );
                }
                store.notify(user.id, format!("You cancelled the session on {}.", self.fmt_local(session.start)));
            }
            Role::Admin => {
                return Err(AppError::Authorization(
                    "Only the booked learner or the owning teacher can cancel a session".to_string(),
                ));
            }
        }

        store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    /// Hard-remove a future, unbooked session together with its audit trail.
    pub async fn delete_session(&self, session_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut store = self.write().await;
        let user = require_user(&store, user_id)?;
        require_role(&user, Role::Teacher)?;

        let session = store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.teacher_id != user.id {
            return Err(AppError::Authorization("Only the owning teacher can delete this session".to_string()));
        }
        if session.status != SessionStatus::Available || session.start <= now {
            return Err(AppError::Conflict("Only future, unbooked sessions can be deleted.".to_string()));
        }

        store.sessions.retain(|s| s.id != session_id);
        store.purge_session_logs(session_id);
        store.notify(user.id, "Session deleted successfully.");

        Ok(())
    }

    /// Explicit teacher override for the InProgress → Finished transition.
    pub async fn mark_finished(&self, session_id: Uuid, user_id: Uuid) -> Result<Session, AppError> {
        let mut store = self.write().await;
        let user = require_user(&store, user_id)?;
        require_role(&user, Role::Teacher)?;

        let session = store
            .session(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        if session.teacher_id != user.id {
            return Err(AppError::Authorization("Only the owning teacher can finish this session".to_string()));
        }
        if session.status.is_terminal() {
            return Err(AppError::Conflict("Session is already finished or cancelled.".to_string()));
        }

        let slot = store.session_mut(session_id).ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;
        slot.status = SessionStatus::Finished;
        let updated = slot.clone();

        store.append_log(session_id, SessionAction::Finish, &user.name, "Session marked as finished", None);
        for learner_id in updated.learner_ids.clone() {
            store.notify(
                learner_id,
                format!("Session Finished: Your session at {} has been marked as complete.", self.fmt_local(updated.start)),
            );
        }
        store.notify(user.id, format!("Session Finished: The session at {} is complete.", self.fmt_local(updated.start)));

        Ok(updated)
    }

    /// Advance every non-terminal session according to wall-clock time.
    ///
    /// The transition function is re-applied until a full pass changes
    /// nothing, so a session that skipped several boundaries between sweeps
    /// (Booked straight past its end time, say) still lands in its correct
    /// final state within a single call. Calling again with the same `now`
    /// is a no-op. Returns whether anything changed.
    pub async fn sweep(&self, now: DateTime<Utc>) -> bool {
        let mut store = self.write().await;
        let mut changed_any = false;

        loop {
            let transitions: Vec<(Uuid, SessionStatus)> = store
                .sessions
                .iter()
                .filter(|s| !s.status.is_terminal())
                .filter_map(|s| advance_status(s.status, s.start, s.end, now).map(|next| (s.id, next)))
                .collect();

            if transitions.is_empty() {
                break;
            }
            changed_any = true;

            for (session_id, next) in transitions {
                let Some(session) = store.session_mut(session_id) else { continue };
                session.status = next;
                let start = session.start;
                let teacher_id = session.teacher_id;
                let learner_ids = session.learner_ids.clone();

                match next {
                    SessionStatus::InProgress => {
                        store.append_log(session_id, SessionAction::StatusChange, SYSTEM_ACTOR, "Started (In Progress)", None);
                        for learner_id in learner_ids {
                            store.notify(learner_id, format!("Your session at {} has started.", self.fmt_local(start)));
                        }
                        store.notify(teacher_id, format!("Your session at {} has started.", self.fmt_local(start)));
                    }
                    SessionStatus::Finished => {
                        store.append_log(session_id, SessionAction::Finish, SYSTEM_ACTOR, "Auto-finished by system time", None);
                        for learner_id in learner_ids {
                            store.notify(learner_id, format!("Your session at {} has finished.", self.fmt_local(start)));
                        }
                        store.notify(teacher_id, format!("Your session at {} has finished.", self.fmt_local(start)));
                    }
                    SessionStatus::CancelledUnbooked => {
                        store.append_log(session_id, SessionAction::StatusChange, SYSTEM_ACTOR, "Expired (Cancelled Unbooked)", None);
                        store.notify(
                            teacher_id,
                            format!("System: Your unbooked session at {} has expired and was cancelled.", self.fmt_local(start)),
                        );
                    }
                    _ => {}
                }
            }
        }

        if changed_any {
            info!(at = %now, "status sweep advanced sessions");
        }
        changed_any
    }

    // ── Cascades (owned here because they mutate sessions) ────────────────

    /// Applied when an admin deactivates or deletes a user account.
    pub(crate) fn cascade_user_removal(&self, store: &mut Store, user: &User, now: DateTime<Utc>) {
        match user.role {
            Role::Teacher => {
                let doomed: Vec<Session> = store.sessions.iter().filter(|s| s.teacher_id == user.id && s.start > now).cloned().collect();

                for session in &doomed {
                    for learner_id in &session.learner_ids {
                        store.notify(
                            *learner_id,
                            format!(
                                "Session Cancelled: Your session with {} on {} has been cancelled because the instructor account is no longer active.",
                                session.teacher_name,
                                self.fmt_local(session.start)
                            ),
                        );
                    }
                }
                for session in &doomed {
                    store.purge_session_logs(session.id);
                }
                store.sessions.retain(|s| !(s.teacher_id == user.id && s.start > now));
            }
            Role::Learner => {
                let affected: Vec<Uuid> = store
                    .sessions
                    .iter()
                    .filter(|s| s.start > now && s.holds_learner(user.id))
                    .map(|s| s.id)
                    .collect();

                for session_id in affected {
                    let Some(session) = store.session_mut(session_id) else { continue };
                    let Some(position) = session.learner_ids.iter().position(|id| *id == user.id) else {
                        continue;
                    };
                    session.learner_ids.remove(position);
                    session.learner_names.remove(position);
                    match session.session_type {
                        SessionType::Practice => {
                            session.status = SessionStatus::Available;
                            session.cancellation_reason = None;
                        }
                        SessionType::Theory => {
                            if session.status == SessionStatus::Full {
                                session.status = SessionStatus::Booked;
                            }
                            if session.learner_ids.is_empty() {
                                session.status = SessionStatus::Available;
                            }
                        }
                    }
                    let start = session.start;
                    let teacher_id = session.teacher_id;

                    store.append_log(
                        session_id,
                        SessionAction::Cancel,
                        SYSTEM_ACTOR,
                        format!("Learner {} removed (Account Deactivated/Deleted)", user.name),
                        None,
                    );
                    store.notify(
                        teacher_id,
                        format!("Update: {} was removed from your session on {} due to account deactivation.", user.name, self.fmt_local(start)),
                    );
                }
            }
            Role::Admin => {}
        }
    }

    /// Pull a vehicle off every future session that references it.
    pub(crate) fn cascade_vehicle_unassign(&self, store: &mut Store, vehicle_id: Uuid, vehicle_name: &str, cause: VehicleUnassignCause, now: DateTime<Utc>) {
        let affected: Vec<Uuid> = store
            .sessions
            .iter()
            .filter(|s| s.start > now && s.vehicle_id == Some(vehicle_id))
            .map(|s| s.id)
            .collect();

        for session_id in affected {
            let Some(session) = store.session_mut(session_id) else { continue };
            session.vehicle_id = None;
            let start = session.start;
            let teacher_id = session.teacher_id;

            let (detail, notice) = match &cause {
                VehicleUnassignCause::StatusChange(status) => (
                    format!("Vehicle {vehicle_name} unassigned (Status: {status})"),
                    format!(
                        "Alert: Vehicle {} for your session on {} has been unassigned because the vehicle is now {}. Please assign a new vehicle.",
                        vehicle_name,
                        self.fmt_local(start),
                        status
                    ),
                ),
                VehicleUnassignCause::Deleted => (
                    format!("Vehicle {vehicle_name} unassigned (Deleted)"),
                    format!(
                        "Alert: Vehicle {} for your session on {} has been deleted. Please assign a new vehicle.",
                        vehicle_name,
                        self.fmt_local(start)
                    ),
                ),
            };

            store.append_log(session_id, SessionAction::VehicleChange, SYSTEM_ACTOR, detail, None);
            store.notify(teacher_id, notice);
        }
    }
}

/// Rewrite the denormalized name copies after a user rename.
pub(crate) fn rewrite_denormalized_names(store: &mut Store, user_id: Uuid, new_name: &str) {
    for session in store.sessions.iter_mut().filter(|s| !s.status.is_terminal()) {
        if session.teacher_id == user_id {
            session.teacher_name = new_name.to_string();
        }
        for (position, learner_id) in session.learner_ids.iter().enumerate() {
            if *learner_id == user_id {
                session.learner_names[position] = new_name.to_string();
            }
        }
    }
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::Temporal("Session end must be after its start.".to_string()));
    }
    if end - start < Duration::minutes(MIN_SESSION_MINUTES) {
        return Err(AppError::Temporal(format!("Sessions must be at least {MIN_SESSION_MINUTES} minutes long.")));
    }
    Ok(())
}

/// One step of the status sweep. Applied repeatedly until stable, so each
/// arm only needs to advance a single boundary.
fn advance_status(status: SessionStatus, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Option<SessionStatus> {
    match status {
        SessionStatus::InProgress if now >= end => Some(SessionStatus::Finished),
        SessionStatus::Booked | SessionStatus::Full if now >= start => Some(SessionStatus::InProgress),
        SessionStatus::Available if now >= start => Some(SessionStatus::CancelledUnbooked),
        _ => None,
    }
}
