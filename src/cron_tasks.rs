use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rocket::fairing::AdHoc;
use tracing::info;

use crate::service::Scheduler;

/// Background loop that advances session statuses on a fixed interval.
/// Attached as a liftoff fairing so it starts with the server and shares
/// the managed `Scheduler` handle.
pub fn stage_status_sweeper(interval_secs: u64) -> AdHoc {
    AdHoc::on_liftoff("Status Sweeper", move |rocket| {
        Box::pin(async move {
            let Some(scheduler) = rocket.state::<Arc<Scheduler>>().cloned() else {
                return;
            };

            rocket::tokio::spawn(async move {
                let mut ticker = rocket::tokio::time::interval(Duration::from_secs(interval_secs));
                loop {
                    ticker.tick().await;
                    if scheduler.sweep(Utc::now()).await {
                        info!(interval_secs, "status sweep applied transitions");
                    }
                }
            });
        })
    })
}
