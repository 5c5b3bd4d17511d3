use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::rate_limit::RateLimiter;
use crate::store::Store;

/// Rate limiter entries older than this are dropped on each sweep.
const RATE_LIMIT_MAX_AGE: Duration = Duration::from_secs(60 * 60);

pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let store = match rocket.state::<Arc<dyn Store>>() {
            Some(s) => s.clone(),
            None => {
                log::error!("[task] Store not found in managed state, background tasks disabled");
                return;
            }
        };

        // Expired admin sessions
        let s = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                let interval = get_interval(&*s, "task_session_cleanup_interval", 30);
                tokio::time::sleep(Duration::from_secs(interval * 60)).await;
                match s.task_cleanup_sessions() {
                    Ok(count) => {
                        if count > 0 {
                            log::info!("[task] Cleaned up {} expired sessions", count);
                        }
                    }
                    Err(e) => log::error!("[task] Session cleanup failed: {}", e),
                }
            }
        });

        // Abandoned guest carts
        let s = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                let interval = get_interval(&*s, "task_cart_cleanup_interval", 360);
                tokio::time::sleep(Duration::from_secs(interval * 60)).await;
                let max_age = s.setting_get_i64_or("cart_max_age_days", 30);
                match s.task_cleanup_carts(max_age) {
                    Ok(count) => {
                        if count > 0 {
                            log::info!("[task] Cleaned up {} stale carts", count);
                        }
                    }
                    Err(e) => log::error!("[task] Cart cleanup failed: {}", e),
                }
            }
        });

        // Rate limiter buckets
        if let Some(limiter) = rocket.state::<Arc<RateLimiter>>() {
            let limiter = Arc::clone(limiter);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(10 * 60)).await;
                    limiter.cleanup(RATE_LIMIT_MAX_AGE);
                }
            });
        }

        log::info!("[task] Background tasks started");
    }
}

fn get_interval(store: &dyn Store, key: &str, default: u64) -> u64 {
    store
        .setting_get_or(key, &default.to_string())
        .parse::<u64>()
        .unwrap_or(default)
        .max(1)
}
