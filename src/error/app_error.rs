use rocket::http::Status;
use rocket::response::Responder;
use rocket::{Request, Response};
use std::io::Cursor;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

/// Business-rule failures raised synchronously by the scheduling core.
/// Every variant is detected before any mutation, so a returned error means
/// no state changed.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Validation error: {0}")]
    ValidationFailed(#[from] ValidationErrors),
    #[error("{0}")]
    Authorization(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error("{0}")]
    Temporal(String),
    #[error("Internal server error")]
    PasswordHash { message: String },
    #[error("Internal server error")]
    ConfigurationError {
        message: String,
        #[source]
        source: figment::Error,
    },
    #[error("Internal server error")]
    UuidError {
        message: String,
        #[source]
        source: uuid::Error,
    },
}

impl AppError {
    pub fn unauthorized() -> Self {
        Self::Authorization("You are not allowed to perform this action".to_string())
    }

    pub fn password_hash(message: impl Into<String>, source: password_hash::Error) -> Self {
        Self::PasswordHash {
            message: format!("{}: {}", message.into(), source),
        }
    }

    pub fn uuid(message: impl Into<String>, source: uuid::Error) -> Self {
        Self::UuidError {
            message: message.into(),
            source,
        }
    }
}

impl From<password_hash::Error> for AppError {
    fn from(e: password_hash::Error) -> Self {
        AppError::password_hash("Password hashing failed", e)
    }
}

impl From<uuid::Error> for AppError {
    fn from(e: uuid::Error) -> Self {
        AppError::uuid("Invalid UUID", e)
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::ConfigurationError {
            message: "Failed to read configuration".to_string(),
            source: e,
        }
    }
}

impl From<&AppError> for Status {
    fn from(e: &AppError) -> Self {
        match e {
            AppError::Validation(_) => Status::UnprocessableEntity,
            AppError::ValidationFailed(_) => Status::UnprocessableEntity,
            AppError::Authorization(_) => Status::Forbidden,
            AppError::InvalidCredentials => Status::Unauthorized,
            AppError::NotFound(_) => Status::NotFound,
            AppError::Conflict(_) => Status::Conflict,
            AppError::LimitExceeded(_) => Status::Conflict,
            AppError::Temporal(_) => Status::BadRequest,
            AppError::PasswordHash { .. } => Status::InternalServerError,
            AppError::ConfigurationError { .. } => Status::InternalServerError,
            AppError::UuidError { .. } => Status::BadRequest,
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &Request<'_>) -> rocket::response::Result<'static> {
        let method = req.method();
        let uri = req.uri();

        let request_id = req
            .local_cache(|| None::<crate::middleware::RequestId>)
            .as_ref()
            .map(|r| r.0.as_str())
            .unwrap_or("unknown");

        let user_id = req
            .local_cache(|| None::<crate::auth::CurrentUser>)
            .as_ref()
            .map(|u| u.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        error!(
            error = ?self,
            request_id = %request_id,
            user_id = %user_id,
            method = %method,
            uri = %uri,
            "request failed"
        );

        let status = Status::from(&self);
        let body = self.to_string();

        Response::build().status(status).sized_body(body.len(), Cursor::new(body)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(Status::from(&AppError::Validation("x".into())), Status::UnprocessableEntity);
        assert_eq!(Status::from(&AppError::Authorization("x".into())), Status::Forbidden);
        assert_eq!(Status::from(&AppError::NotFound("x".into())), Status::NotFound);
        assert_eq!(Status::from(&AppError::Conflict("x".into())), Status::Conflict);
        assert_eq!(Status::from(&AppError::LimitExceeded("x".into())), Status::Conflict);
        assert_eq!(Status::from(&AppError::Temporal("x".into())), Status::BadRequest);
        assert_eq!(Status::from(&AppError::InvalidCredentials), Status::Unauthorized);
    }
}
