use rocket::routes;
use rocket::serde::Serialize;
use rocket::serde::json::Json;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[rocket::get("/")]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub fn routes() -> Vec<rocket::Route> {
    routes![health]
}
