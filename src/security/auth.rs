use chrono::{Duration, Utc};
use rocket::http::{Cookie, CookieJar, Status};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::store::Store;

const SESSION_COOKIE: &str = "maison_session";
const PASSWORD_HASH_KEY: &str = "admin_password_hash";

// ── Client IP request guard ──

/// Extracts the real client IP from the request.
/// Checks headers in priority order:
///   1. CF-Connecting-IP (Cloudflare)
///   2. True-Client-IP (Cloudflare Enterprise / Akamai)
///   3. X-Real-IP (nginx proxy_set_header)
///   4. X-Forwarded-For (first IP in the chain is the original client)
///   5. Rocket's client_ip() (socket peer address)
pub struct ClientIp(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ClientIp {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = request.headers();

        for name in ["CF-Connecting-IP", "True-Client-IP", "X-Real-IP"] {
            if let Some(ip) = headers.get_one(name) {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        if let Some(forwarded) = headers.get_one("X-Forwarded-For") {
            if let Some(ip) = forwarded.split(',').next() {
                let ip = ip.trim();
                if !ip.is_empty() {
                    return Outcome::Success(ClientIp(ip.to_string()));
                }
            }
        }

        let ip = request
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Outcome::Success(ClientIp(ip))
    }
}

/// Raw `User-Agent` header, recorded on admin sessions.
pub struct UserAgent(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserAgent {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let ua = request
            .headers()
            .get_one("User-Agent")
            .map(|s| s.chars().take(512).collect());
        Outcome::Success(UserAgent(ua))
    }
}

// ── Admin gate guard ──

/// Holder of a valid admin session. The dashboard has a single gate
/// password and no user accounts, so the session id is all there is.
pub struct AdminUser {
    pub session_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_session(request).await {
            Some(session_id) => Outcome::Success(AdminUser { session_id }),
            None => Outcome::Forward(Status::Unauthorized),
        }
    }
}

async fn resolve_session(request: &Request<'_>) -> Option<String> {
    let store = request
        .guard::<&State<Arc<dyn Store>>>()
        .await
        .succeeded()?;
    let cookies = request.cookies();
    let session_id = cookies.get_private(SESSION_COOKIE)?.value().to_string();

    if store.session_validate(&session_id) {
        Some(session_id)
    } else {
        cookies.remove_private(Cookie::from(SESSION_COOKIE));
        None
    }
}

// ── Password utilities ──

pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| e.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Check a submitted code against the stored gate hash.
pub fn verify_gate_password(store: &dyn Store, password: &str) -> bool {
    match store.setting_get(PASSWORD_HASH_KEY) {
        Some(hash) if !hash.is_empty() => verify_password(password, &hash),
        _ => false,
    }
}

/// Replace the gate password and sign every session out.
pub fn change_gate_password(store: &dyn Store, current: &str, new_password: &str) -> Result<(), String> {
    if !verify_gate_password(store, current) {
        return Err("Current password is incorrect".to_string());
    }
    if new_password.trim().len() < 4 {
        return Err("New password must be at least 4 characters".to_string());
    }
    let hash = hash_password(new_password.trim())?;
    store.setting_set(PASSWORD_HASH_KEY, &hash)?;
    let dropped = store.session_delete_all()?;
    log::info!("Admin password changed, {} session(s) revoked", dropped);
    Ok(())
}

// ── Session management ──

pub fn create_session(store: &dyn Store, ip: Option<&str>, ua: Option<&str>) -> Result<String, String> {
    let expiry_hours = store.setting_get_i64_or("session_expiry_hours", 24).max(1);
    let session_id = uuid::Uuid::new_v4().to_string();
    let expires = Utc::now().naive_utc() + Duration::hours(expiry_hours);
    let expires_str = expires.format("%Y-%m-%d %H:%M:%S").to_string();

    let ip_hash = ip.map(hash_ip);
    store.session_create(&session_id, &expires_str, ip_hash.as_deref(), ua)?;

    Ok(session_id)
}

pub fn destroy_session(store: &dyn Store, session_id: &str) -> Result<(), String> {
    store.session_delete(session_id)
}

/// Set the session cookie. `Secure` follows the configured site URL scheme.
pub fn set_session_cookie_secure(cookies: &CookieJar<'_>, session_id: &str, store: &dyn Store) {
    let site_url = store.setting_get_or("site_url", "");

    let mut cookie = Cookie::new(SESSION_COOKIE, session_id.to_string());
    cookie.set_http_only(true);
    cookie.set_same_site(rocket::http::SameSite::Strict);
    cookie.set_path("/");
    if site_url.starts_with("https://") {
        cookie.set_secure(true);
    }
    cookies.add_private(cookie);
}

pub fn clear_session_cookie(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
}

pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ip_is_stable_hex() {
        let a = hash_ip("203.0.113.7");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_ip("203.0.113.7"));
        assert_ne!(a, hash_ip("203.0.113.8"));
    }

    #[test]
    fn verify_password_rejects_garbage_hash() {
        assert!(!verify_password("2030", "not-a-bcrypt-hash"));
        let hash = bcrypt::hash("2030", 4).unwrap();
        assert!(verify_password("2030", &hash));
        assert!(!verify_password("2031", &hash));
    }
}
