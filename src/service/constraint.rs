use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::user::User;
use crate::store::Store;

/// Enforce the teacher's per-learner booking caps against a candidate start.
///
/// Only limits configured to a non-zero value are evaluated. The daily cap
/// counts the learner's non-terminal sessions with this teacher on the same
/// local calendar day as the candidate; the weekly cap counts them in the
/// same ISO 8601 week (Monday-start). A cap of N allows at most N sessions,
/// so the check fails once the existing count reaches N.
pub(crate) fn check_booking_limits(store: &Store, teacher: &User, learner_id: Uuid, candidate_start: DateTime<Utc>, tz: Tz) -> Result<(), AppError> {
    let Some(constraints) = teacher.teacher_constraints else {
        return Ok(());
    };

    let daily = constraints.max_sessions_per_learner_daily.filter(|n| *n > 0);
    let weekly = constraints.max_sessions_per_learner_weekly.filter(|n| *n > 0);
    if daily.is_none() && weekly.is_none() {
        return Ok(());
    }

    let learner_starts: Vec<DateTime<Utc>> = store
        .sessions
        .iter()
        .filter(|s| s.teacher_id == teacher.id && s.holds_learner(learner_id) && !s.status.is_terminal())
        .map(|s| s.start)
        .collect();

    if let Some(limit) = daily {
        let target_day = candidate_start.with_timezone(&tz).date_naive();
        let same_day = learner_starts.iter().filter(|start| start.with_timezone(&tz).date_naive() == target_day).count();
        if same_day as u32 >= limit {
            return Err(AppError::LimitExceeded(format!(
                "You have reached the daily limit ({limit}) for booking sessions with {}.",
                teacher.name
            )));
        }
    }

    if let Some(limit) = weekly {
        let target_week = candidate_start.with_timezone(&tz).iso_week();
        let same_week = learner_starts.iter().filter(|start| start.with_timezone(&tz).iso_week() == target_week).count();
        if same_week as u32 >= limit {
            return Err(AppError::LimitExceeded(format!(
                "You have reached the weekly limit ({limit}) for booking sessions with {}.",
                teacher.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::session::SessionStatus;
    use crate::models::user::TeacherConstraints;
    use crate::test_utils::{at, practice_session, sample_learner, sample_teacher};

    fn teacher_with(daily: Option<u32>, weekly: Option<u32>) -> User {
        let mut teacher = sample_teacher("Tess", "tess@drivetime.test");
        teacher.teacher_constraints = Some(TeacherConstraints {
            max_sessions_per_learner_daily: daily,
            max_sessions_per_learner_weekly: weekly,
        });
        teacher
    }

    fn store_with_booking(teacher: &User, learner_id: Uuid, day: i64, hour: u32) -> Store {
        let mut store = Store::new();
        let mut session = practice_session(teacher, at(day, hour), at(day, hour + 1));
        session.status = SessionStatus::Booked;
        session.learner_ids = vec![learner_id];
        session.learner_names = vec!["Lena".to_string()];
        store.sessions.push(session);
        store
    }

    #[test]
    fn unconfigured_limits_always_pass() {
        let teacher = sample_teacher("Tess", "tess@drivetime.test");
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let store = store_with_booking(&teacher, learner.id, 1, 9);
        assert!(check_booking_limits(&store, &teacher, learner.id, at(1, 14), chrono_tz::UTC).is_ok());
    }

    #[test]
    fn zero_limit_counts_as_unconfigured() {
        let teacher = teacher_with(Some(0), Some(0));
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let store = store_with_booking(&teacher, learner.id, 1, 9);
        assert!(check_booking_limits(&store, &teacher, learner.id, at(1, 14), chrono_tz::UTC).is_ok());
    }

    #[test]
    fn daily_limit_blocks_same_day_but_not_next_day() {
        let teacher = teacher_with(Some(1), None);
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let store = store_with_booking(&teacher, learner.id, 1, 9);

        let same_day = check_booking_limits(&store, &teacher, learner.id, at(1, 14), chrono_tz::UTC);
        assert!(matches!(same_day, Err(AppError::LimitExceeded(_))));

        assert!(check_booking_limits(&store, &teacher, learner.id, at(2, 14), chrono_tz::UTC).is_ok());
    }

    #[test]
    fn weekly_limit_blocks_same_iso_week_but_not_next_week() {
        let teacher = teacher_with(None, Some(1));
        let learner = sample_learner("Lena", "lena@drivetime.test");
        // Base day in test_utils is a Monday, so day 1 (Tuesday) and day 4
        // (Friday) share an ISO week while day 8 falls in the next one.
        let store = store_with_booking(&teacher, learner.id, 1, 9);

        let same_week = check_booking_limits(&store, &teacher, learner.id, at(4, 9), chrono_tz::UTC);
        assert!(matches!(same_week, Err(AppError::LimitExceeded(_))));

        assert!(check_booking_limits(&store, &teacher, learner.id, at(8, 9), chrono_tz::UTC).is_ok());
    }

    #[test]
    fn terminal_sessions_do_not_count_against_limits() {
        let teacher = teacher_with(Some(1), None);
        let learner = sample_learner("Lena", "lena@drivetime.test");
        let mut store = store_with_booking(&teacher, learner.id, 1, 9);
        store.sessions[0].status = SessionStatus::CancelledByTeacher;

        assert!(check_booking_limits(&store, &teacher, learner.id, at(1, 14), chrono_tz::UTC).is_ok());
    }
}
