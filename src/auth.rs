use std::sync::Arc;

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use serde::Serialize;
use uuid::Uuid;

use crate::error::app_error::AppError;
use crate::models::user::Role;
use crate::service::Scheduler;

pub const SESSION_COOKIE: &str = "user";

/// Authenticated caller, resolved from the private session cookie. Only
/// active accounts pass the guard; deactivation revokes access immediately.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

pub(crate) fn parse_session_cookie_value(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value).ok()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let cookies = req.cookies();
        if let Some(cookie) = cookies.get_private(SESSION_COOKIE)
            && let Some(user_id) = parse_session_cookie_value(cookie.value())
        {
            let scheduler = match req.rocket().state::<Arc<Scheduler>>() {
                Some(scheduler) => scheduler,
                None => return Outcome::Error((Status::InternalServerError, AppError::unauthorized())),
            };

            if let Some(user) = scheduler.active_user(user_id).await {
                let current_user = CurrentUser {
                    id: user.id,
                    name: user.name,
                    role: user.role,
                };
                req.local_cache(|| Some(current_user.clone()));
                return Outcome::Success(current_user);
            }
            return Outcome::Error((Status::Unauthorized, AppError::InvalidCredentials));
        }

        Outcome::Error((Status::Unauthorized, AppError::InvalidCredentials))
    }
}

#[cfg(test)]
mod tests {
    use super::parse_session_cookie_value;
    use uuid::Uuid;

    #[test]
    fn parse_session_cookie_value_valid() {
        let user_id = Uuid::new_v4();
        assert_eq!(parse_session_cookie_value(&user_id.to_string()), Some(user_id));
    }

    #[test]
    fn parse_session_cookie_value_invalid_uuid() {
        assert!(parse_session_cookie_value("user@example.com").is_none());
    }
}
