use std::sync::Arc;
use std::time::Duration;

use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::rate_limit::RateLimiter;
use crate::security::auth::{self, AdminUser, ClientIp, UserAgent};
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
}

#[post("/api/login", format = "json", data = "<form>")]
pub fn login(
    form: Json<LoginForm>,
    store: &State<Arc<dyn Store>>,
    limiter: &State<Arc<RateLimiter>>,
    cookies: &CookieJar<'_>,
    client_ip: ClientIp,
    user_agent: UserAgent,
) -> ApiResult {
    let s: &dyn Store = &**store.inner();
    let rate_key = format!("login:{}", auth::hash_ip(&client_ip.0));
    let max_attempts = s.setting_get_i64_or("login_rate_limit", 5).max(1) as u64;
    let window = Duration::from_secs(15 * 60);

    if !limiter.check_and_record(&rate_key, max_attempts, window) {
        log::warn!("Admin login rate limit hit");
        return Err(ApiError::TooManyRequests(
            "Too many login attempts. Please try again in 15 minutes.".into(),
        ));
    }

    if !auth::verify_gate_password(s, &form.password) {
        return Err(ApiError::Unauthorized("Incorrect password".into()));
    }

    let session_id = auth::create_session(s, Some(&client_ip.0), user_agent.0.as_deref())
        .map_err(ApiError::Internal)?;
    auth::set_session_cookie_secure(cookies, &session_id, s);
    limiter.reset(&rate_key);
    log::info!("Admin session opened");

    Ok(Json(json!({"success": true})))
}

#[post("/api/logout")]
pub fn logout(admin: AdminUser, store: &State<Arc<dyn Store>>, cookies: &CookieJar<'_>) -> Json<Value> {
    if let Err(e) = auth::destroy_session(&**store.inner(), &admin.session_id) {
        log::warn!("Session delete failed: {}", e);
    }
    auth::clear_session_cookie(cookies);
    Json(json!({"success": true}))
}

#[get("/api/session")]
pub fn session(_admin: AdminUser) -> Json<Value> {
    Json(json!({"success": true, "authenticated": true}))
}

#[post("/api/password", format = "json", data = "<form>")]
pub fn change_password(
    _admin: AdminUser,
    form: Json<PasswordForm>,
    store: &State<Arc<dyn Store>>,
    cookies: &CookieJar<'_>,
) -> ApiResult {
    if form.new_password.trim().is_empty() {
        return Err(ApiError::field("new_password", "New password is required"));
    }
    auth::change_gate_password(&**store.inner(), &form.current_password, &form.new_password).map_err(|e| {
        if e.starts_with("Current password") {
            ApiError::field("current_password", &e)
        } else if e.starts_with("New password") {
            ApiError::field("new_password", &e)
        } else {
            ApiError::Internal(e)
        }
    })?;
    auth::clear_session_cookie(cookies);
    Ok(Json(json!({"success": true, "message": "Password changed. Please sign in again."})))
}
