use rocket::serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::session::{Session, SessionResponse};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Any,
}

impl TimeOfDay {
    /// Whether a local hour falls inside this band. `Any` matches nothing
    /// here; callers skip the time score entirely for it.
    pub fn contains_hour(self, hour: u32) -> bool {
        match self {
            TimeOfDay::Morning => (6..12).contains(&hour),
            TimeOfDay::Afternoon => (12..17).contains(&hour),
            TimeOfDay::Evening => (17..24).contains(&hour),
            TimeOfDay::Any => false,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
            TimeOfDay::Any => "Any",
        };
        f.write_str(label)
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct SmartBookingPreferences {
    #[validate(range(min = 1, max = 5))]
    pub session_count: u32,
    pub preferred_time: TimeOfDay,
    /// `None` means any teacher.
    pub preferred_teacher_id: Option<Uuid>,
    /// Weekday numbers, 0 = Sunday through 6 = Saturday.
    #[serde(default)]
    pub preferred_days: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ScoredSession {
    pub session: Session,
    pub score: f64,
    pub match_reasons: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ScoredSessionResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub score: f64,
    pub match_reasons: Vec<String>,
}

impl From<&ScoredSession> for ScoredSessionResponse {
    fn from(scored: &ScoredSession) -> Self {
        Self {
            session: SessionResponse::from(&scored.session),
            score: scored.score,
            match_reasons: scored.match_reasons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_bands_cover_expected_hours() {
        assert!(TimeOfDay::Morning.contains_hour(6));
        assert!(TimeOfDay::Morning.contains_hour(11));
        assert!(!TimeOfDay::Morning.contains_hour(12));
        assert!(TimeOfDay::Afternoon.contains_hour(12));
        assert!(!TimeOfDay::Afternoon.contains_hour(17));
        assert!(TimeOfDay::Evening.contains_hour(17));
        assert!(TimeOfDay::Evening.contains_hour(23));
        assert!(!TimeOfDay::Any.contains_hour(9));
    }
}
