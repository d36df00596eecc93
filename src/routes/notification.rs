use std::sync::Arc;

use rocket::serde::Serialize;
use rocket::serde::json::Json;
use rocket::{State, routes};

use crate::auth::CurrentUser;
use crate::models::notification::Notification;
use crate::service::Scheduler;

#[rocket::get("/")]
pub async fn list_notifications(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser) -> Json<Vec<Notification>> {
    Json(scheduler.notifications_for(current_user.id).await)
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub marked: usize,
}

#[rocket::post("/read")]
pub async fn mark_all_read(scheduler: &State<Arc<Scheduler>>, current_user: CurrentUser) -> Json<MarkReadResponse> {
    let marked = scheduler.mark_notifications_read(current_user.id).await;
    Json(MarkReadResponse { marked })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![list_notifications, mark_all_read]
}
