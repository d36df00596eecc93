use std::sync::Arc;

use chrono::Utc;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::serde::json::Json;
use rocket::{State, routes};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{CurrentUser, SESSION_COOKIE};
use crate::error::app_error::AppError;
use crate::models::user::{AdminCreateUserRequest, LoginRequest, RegisterRequest, UserResponse, UserStatusRequest, UserUpdateRequest};
use crate::service::Scheduler;

#[rocket::post("/register", data = "<payload>")]
pub async fn register(scheduler: &State<Arc<Scheduler>>, cookies: &CookieJar<'_>, payload: Json<RegisterRequest>) -> Result<(Status, Json<UserResponse>), AppError> {
    payload.validate()?;
    let user = scheduler.register(&payload, Utc::now()).await?;
    cookies.add_private(Cookie::new(SESSION_COOKIE, user.id.to_string()));
    Ok((Status::Created, Json(UserResponse::from(&user))))
}

#[rocket::post("/login", data = "<payload>")]
pub async fn login(scheduler: &State<Arc<Scheduler>>, cookies: &CookieJar<'_>, payload: Json<LoginRequest>) -> Result<Json<UserResponse>, AppError> {
    let user = scheduler.authenticate(&payload).await?;
    cookies.add_private(Cookie::new(SESSION_COOKIE, user.id.to_string()));
    Ok(Json(UserResponse::from(&user)))
}

#[rocket::post("/logout")]
pub async fn logout(cookies: &CookieJar<'_>, _current_user: CurrentUser) -> Status {
    cookies.remove_private(SESSION_COOKIE);
    Status::Ok
}

#[rocket::get("/")]
pub async fn list_users(scheduler: &State<Arc<Scheduler>>, _current_user: CurrentUser) -> Json<Vec<UserResponse>> {
    let users = scheduler.users().await;
    Json(users.iter().map(UserResponse::from).collect())
}

#[rocket::put("/<id>", data = "<payload>")]
pub async fn update_user(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str, payload: Json<UserUpdateRequest>) -> Result<Json<UserResponse>, AppError> {
    payload.validate()?;
    let target_id = Uuid::parse_str(id)?;
    let user = scheduler.update_user(target_id, current_user.id, &payload).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[rocket::post("/", data = "<payload>")]
pub async fn create_user(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, payload: Json<AdminCreateUserRequest>) -> Result<(Status, Json<UserResponse>), AppError> {
    payload.validate()?;
    let user = scheduler.admin_create_user(current_user.id, &payload, Utc::now()).await?;
    Ok((Status::Created, Json(UserResponse::from(&user))))
}

#[rocket::patch("/<id>/status", data = "<payload>")]
pub async fn set_user_status(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str, payload: Json<UserStatusRequest>) -> Result<Json<UserResponse>, AppError> {
    let target_id = Uuid::parse_str(id)?;
    let user = scheduler.set_user_active(current_user.id, target_id, payload.is_active, Utc::now()).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[rocket::delete("/<id>")]
pub async fn delete_user(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser, id: &str) -> Result<Status, AppError> {
    let target_id = Uuid::parse_str(id)?;
    scheduler.delete_user(current_user.id, target_id, Utc::now()).await?;
    Ok(Status::Ok)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![register, login, logout, list_users, update_user, create_user, set_user_status, delete_user]
}
