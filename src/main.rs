#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::fs::FileServer;
use rocket::http::Header;
use rocket::serde::json::Json;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

mod ai;
mod boot;
mod branding;
mod db;
mod error;
mod models;
mod money;
mod rate_limit;
mod reports;
mod routes;
mod security;
mod store;
mod svg_sanitizer;
mod tasks;
mod validation;


use rate_limit::RateLimiter;
use store::sqlite::SqliteStore;
use store::Store;

/// Holds the admin URL slug, read from DB at startup.
/// Shared via Rocket managed state so routes and fairings can access it.
pub struct AdminSlug(pub String);

pub struct NoCacheAdmin;

#[rocket::async_trait]
impl Fairing for NoCacheAdmin {
    fn info(&self) -> Info {
        Info { name: "No-Cache Admin Pages", kind: Kind::Response }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        let slug = req.rocket().state::<AdminSlug>()
            .map(|s| s.0.as_str())
            .unwrap_or("admin");
        let prefix = format!("/{}", slug);
        if req.uri().path().starts_with(&*prefix) {
            res.set_header(Header::new("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"));
            res.set_header(Header::new("Pragma", "no-cache"));
        }
    }
}

fn error_body(message: &str) -> Json<Value> {
    Json(json!({ "success": false, "error": message }))
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    error_body("Malformed request")
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    error_body("Authentication required")
}

#[catch(403)]
fn forbidden() -> Json<Value> {
    error_body("Forbidden")
}

#[catch(404)]
fn not_found() -> Json<Value> {
    error_body("Not found")
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    error_body("Request body could not be parsed")
}

#[catch(429)]
fn too_many_requests() -> Json<Value> {
    error_body("Too many requests, slow down")
}

#[catch(500)]
fn server_error() -> Json<Value> {
    error_body("Internal server error")
}

/// Assemble the application around an already-migrated store.
pub fn build_rocket(figment: Figment, store: Arc<dyn Store>) -> Rocket<Build> {
    let admin_slug = store.setting_get_or("admin_slug", "admin");
    let admin_mount = format!("/{}", admin_slug);

    log::info!("Admin console mounted at: {}", admin_mount);

    rocket::custom(figment)
        .manage(store)
        .manage(Arc::new(RateLimiter::new()))
        .manage(AdminSlug(admin_slug))
        .attach(Template::fairing())
        .attach(NoCacheAdmin)
        .mount("/uploads", FileServer::from("website/uploads"))
        .mount("/api", routes::public::routes())
        .mount("/api", routes::cart::routes())
        .mount("/api", routes::checkout::routes())
        .mount("/api", routes::concierge::routes())
        .mount(&admin_mount, routes::admin::routes())
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                too_many_requests,
                server_error
            ],
        )
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    // Boot check: verify/create directories, validate critical files
    boot::run();

    let store = match SqliteStore::new_at(db::DB_PATH) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to open database at {}: {}", db::DB_PATH, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.run_migrations() {
        log::error!("Failed to run database migrations: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = store.seed_defaults() {
        log::error!("Failed to seed defaults: {}", e);
        std::process::exit(1);
    }

    let store: Arc<dyn Store> = Arc::new(store);
    build_rocket(rocket::Config::figment(), store).attach(tasks::BackgroundTasks)
}
