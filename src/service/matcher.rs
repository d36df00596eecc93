use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::session::{Session, SessionStatus, SessionType};
use crate::models::smart_booking::{ScoredSession, SmartBookingPreferences, TimeOfDay};
use crate::models::user::Role;
use crate::service::availability::overlaps;
use crate::service::constraint::check_booking_limits;
use crate::service::{Scheduler, require_role, require_user};

const TEACHER_MATCH_SCORE: f64 = 30.0;
const DAY_MATCH_SCORE: f64 = 20.0;
const TIME_MATCH_SCORE: f64 = 50.0;
const MAX_JITTER: f64 = 10.0;

const LOOKAHEAD_DAYS: i64 = 7;

impl Scheduler {
    /// Propose up to `session_count` bookable sessions for a learner.
    ///
    /// Candidates are Available sessions starting within the next seven days
    /// whose teacher's booking limits would not reject the learner. Each is
    /// scored against the stated preferences plus a small random jitter that
    /// breaks ties between equivalent slots, then the highest scorers are
    /// picked greedily while skipping any slot overlapping an earlier pick.
    pub async fn suggest_sessions(&self, learner_id: Uuid, prefs: &SmartBookingPreferences, now: DateTime<Utc>) -> Result<Vec<ScoredSession>, AppError> {
        let store = self.read().await;
        let learner = require_user(&store, learner_id)?;
        require_role(&learner, Role::Learner)?;

        let horizon = now + Duration::days(LOOKAHEAD_DAYS);
        let existing: Vec<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> = store
            .sessions
            .iter()
            .filter(|s| !s.status.is_terminal() && s.holds_learner(learner.id))
            .map(|s| (s.start, s.end))
            .collect();

        let candidates: Vec<Session> = store
            .sessions
            .iter()
            .filter(|s| s.session_type == SessionType::Practice && s.status == SessionStatus::Available && s.start > now && s.start <= horizon)
            .filter(|s| !existing.iter().any(|(start, end)| overlaps(*start, *end, s.start, s.end)))
            .filter(|s| match store.user(s.teacher_id) {
                Some(teacher) => teacher.is_active && check_booking_limits(&store, teacher, learner.id, s.start, self.tz()).is_ok(),
                None => false,
            })
            .cloned()
            .collect();

        let mut rng = self.rng().lock().await;
        let mut scored: Vec<ScoredSession> = candidates.into_iter().map(|session| self.score_session(session, prefs, rng.random_range(0.0..MAX_JITTER))).collect();
        drop(rng);

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut picks: Vec<ScoredSession> = Vec::new();
        for candidate in scored {
            if picks.len() as u32 >= prefs.session_count {
                break;
            }
            let clashes = picks
                .iter()
                .any(|p| overlaps(p.session.start, p.session.end, candidate.session.start, candidate.session.end));
            if !clashes {
                picks.push(candidate);
            }
        }

        Ok(picks)
    }

    fn score_session(&self, session: Session, prefs: &SmartBookingPreferences, jitter: f64) -> ScoredSession {
        let mut score = jitter;
        let mut match_reasons = Vec::new();

        if prefs.preferred_teacher_id == Some(session.teacher_id) {
            score += TEACHER_MATCH_SCORE;
            match_reasons.push("Preferred instructor".to_string());
        }

        let local_start = session.start.with_timezone(&self.tz());
        let weekday = local_start.weekday().num_days_from_sunday() as u8;
        if prefs.preferred_days.contains(&weekday) {
            score += DAY_MATCH_SCORE;
            match_reasons.push("Preferred day".to_string());
        }

        if prefs.preferred_time != TimeOfDay::Any && prefs.preferred_time.contains_hour(local_start.hour()) {
            score += TIME_MATCH_SCORE;
            match_reasons.push(format!("Preferred time ({})", prefs.preferred_time));
        }

        ScoredSession { session, score, match_reasons }
    }
}
