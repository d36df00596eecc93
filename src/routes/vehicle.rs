use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, routes};
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::app_error::AppError;
use crate::models::vehicle::{VehicleRequest, VehicleResponse, VehicleStatusRequest};
use crate::service::Scheduler;

fn parse_instant(value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::Temporal("Timestamps must be RFC 3339.".to_string()))
}

#[rocket::get("/")]
pub async fn list_vehicles(scheduler: &State<Arc<Scheduler>>, _current_user: CurrentUser) -> Json<Vec<VehicleResponse>> {
    let vehicles = scheduler.vehicles().await;
    Json(vehicles.iter().map(VehicleResponse::from).collect())
}

/// Vehicles free for a window, for the session form. `exclude` lets an edit
/// ignore the session currently holding the vehicle.
#[rocket::get("/available?<start>&<end>&<exclude>")]
pub async fn available_vehicles(
    scheduler: &State<Arc<Scheduler>>,
    _current_user: CurrentUser,
    start: &str,
    end: &str,
    exclude: Option<&str>,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let start = parse_instant(start)?;
    let end = parse_instant(end)?;
    let exclude = match exclude {
        Some(id) => Some(Uuid::parse_str(id)?),
        None => None,
    };
    let vehicles = scheduler.available_vehicles(start, end, exclude).await;
    Ok(Json(vehicles.iter().map(VehicleResponse::from).collect()))
}

#[rocket::post("/", data = "<payload>")]
pub async fn create_vehicle(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, payload: Json<VehicleRequest>) -> Result<(Status, Json<VehicleResponse>), AppError> {
    payload.validate()?;
    let vehicle = scheduler.create_vehicle(current_user.id, &payload).await?;
    Ok((Status::Created, Json(VehicleResponse::from(&vehicle))))
}

#[rocket::patch("/<id>/status", data = "<payload>")]
pub async fn set_vehicle_status(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str, payload: Json<VehicleStatusRequest>) -> Result<Json<VehicleResponse>, AppError> {
    let vehicle_id = Uuid::parse_str(id)?;
    let vehicle = scheduler.set_vehicle_status(current_user.id, vehicle_id, payload.status, Utc::now()).await?;
    Ok(Json(VehicleResponse::from(&vehicle)))
}

#[rocket::delete("/<id>")]
pub async fn delete_vehicle(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str) -> Result<Status, AppError> {
    let vehicle_id = Uuid::parse_str(id)?;
    scheduler.delete_vehicle(current_user.id, vehicle_id, Utc::now()).await?;
    Ok(Status::Ok)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![list_vehicles, available_vehicles, create_vehicle, set_vehicle_status, delete_vehicle]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_instant_accepts_rfc3339_and_rejects_garbage() {
        assert!(parse_instant("2026-03-02T09:00:00Z").is_ok());
        assert!(parse_instant("2026-03-02T09:00:00+01:00").is_ok());
        assert!(matches!(parse_instant("next tuesday"), Err(AppError::Temporal(_))));
    }
}
