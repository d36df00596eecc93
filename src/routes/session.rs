use std::sync::Arc;

use chrono::Utc;
use rocket::http::Status;
use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{State, routes};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::app_error::AppError;
use crate::models::audit::SessionLog;
use crate::models::session::{CancelSessionRequest, CreateSessionRequest, SessionResponse, UpdateSessionRequest};
use crate::models::smart_booking::{ScoredSessionResponse, SmartBookingPreferences};
use crate::models::user::Role;
use crate::service::Scheduler;

#[rocket::get("/")]
pub async fn list_sessions(scheduler: &State<Arc<Scheduler>>, _current_user: CurrentUser) -> Json<Vec<SessionResponse>> {
    let sessions = scheduler.sessions().await;
    Json(sessions.iter().map(SessionResponse::from).collect())
}

#[rocket::post("/", data = "<payload>")]
pub async fn create_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, payload: Json<CreateSessionRequest>) -> Result<(Status, Json<SessionResponse>), AppError> {
    payload.validate()?;
    let session = scheduler.create_session(&payload, current_user.id, Utc::now()).await?;
    Ok((Status::Created, Json(SessionResponse::from(&session))))
}

#[rocket::put("/<id>", data = "<payload>")]
pub async fn update_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str, payload: Json<UpdateSessionRequest>) -> Result<Json<SessionResponse>, AppError> {
    payload.validate()?;
    let session_id = Uuid::parse_str(id)?;
    let session = scheduler.update_session(session_id, &payload, current_user.id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[rocket::delete("/<id>")]
pub async fn delete_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str) -> Result<Status, AppError> {
    let session_id = Uuid::parse_str(id)?;
    scheduler.delete_session(session_id, current_user.id, Utc::now()).await?;
    Ok(Status::Ok)
}

#[rocket::post("/<id>/book")]
pub async fn book_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str) -> Result<Json<SessionResponse>, AppError> {
    let session_id = Uuid::parse_str(id)?;
    let session = scheduler.book_session(session_id, current_user.id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[rocket::post("/<id>/cancel", data = "<payload>")]
pub async fn cancel_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str, payload: Json<CancelSessionRequest>) -> Result<Json<SessionResponse>, AppError> {
    let session_id = Uuid::parse_str(id)?;
    let session = scheduler.cancel_session(session_id, current_user.id, &payload.reason, Utc::now()).await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[rocket::post("/<id>/finish")]
pub async fn finish_session(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str) -> Result<Json<SessionResponse>, AppError> {
    let session_id = Uuid::parse_str(id)?;
    let session = scheduler.mark_finished(session_id, current_user.id).await?;
    Ok(Json(SessionResponse::from(&session)))
}

#[rocket::get("/<id>/logs")]
pub async fn session_logs(scheduler: &State<Arc<Scheduler>>, _current_user: CurrentUser, id: &str) -> Result<Json<Vec<SessionLog>>, AppError> {
    let session_id = Uuid::parse_str(id)?;
    let logs = scheduler.session_logs(session_id).await?;
    Ok(Json(logs))
}

#[rocket::post("/suggest", data = "<payload>")]
pub async fn suggest_sessions(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, payload: Json<SmartBookingPreferences>) -> Result<Json<Vec<ScoredSessionResponse>>, AppError> {
    payload.validate()?;
    let picks = scheduler.suggest_sessions(current_user.id, &payload, Utc::now()).await?;
    Ok(Json(picks.iter().map(ScoredSessionResponse::from).collect()))
}

#[derive(Serialize)]
pub struct SweepResponse {
    pub changed: bool,
}

/// Manual trigger for the same pass the background sweeper runs.
#[rocket::post("/sweep")]
pub async fn run_sweep(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser) -> Result<Json<SweepResponse>, AppError> {
    if current_user.role != Role::Admin {
        return Err(AppError::unauthorized());
    }
    let changed = scheduler.sweep(Utc::now()).await;
    Ok(Json(SweepResponse { changed }))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        list_sessions,
        create_session,
        update_session,
        delete_session,
        book_session,
        cancel_session,
        finish_session,
        session_logs,
        suggest_sessions,
        run_sweep
    ]
}
