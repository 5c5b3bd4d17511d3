use std::collections::HashMap;
use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::security::auth::AdminUser;
use crate::store::Store;

// ── Settings ───────────────────────────────────────────

/// Keys the console may edit. Numeric keys must parse as positive integers.
const EDITABLE: &[(&str, bool)] = &[
    ("site_url", false),
    ("commerce_currency", false),
    ("commerce_currency_symbol", false),
    ("commerce_default_gateway", false),
    ("shipping_company", false),
    ("inventory_low_stock_threshold", true),
    ("cart_max_age_days", true),
    ("session_expiry_hours", true),
    ("login_rate_limit", true),
    ("concierge_rate_limit", true),
    ("branding_max_upload_kb", true),
    ("branding_allowed_types", false),
    ("ai_gemini_api_key", false),
    ("ai_gemini_text_model", false),
    ("ai_gemini_image_model", false),
    ("ai_timeout_secs", true),
    ("task_session_cleanup_interval", true),
    ("task_cart_cleanup_interval", true),
];

const SECRET_KEYS: &[&str] = &["ai_gemini_api_key"];

fn masked(key: &str, value: &str) -> Value {
    if SECRET_KEYS.contains(&key) {
        json!(!value.is_empty())
    } else {
        json!(value)
    }
}

#[get("/api/settings")]
pub fn settings_list(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    let all = store.setting_all();
    let settings: serde_json::Map<String, Value> = EDITABLE
        .iter()
        .map(|(key, _)| {
            let value = all.get(*key).map(String::as_str).unwrap_or("");
            (key.to_string(), masked(key, value))
        })
        .collect();
    Json(json!({"success": true, "settings": settings}))
}

/// Partial update. Secret keys sent blank keep their stored value.
#[put("/api/settings", format = "json", data = "<form>")]
pub fn settings_save(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    form: Json<HashMap<String, String>>,
) -> ApiResult {
    let mut errors = HashMap::new();
    let mut changes = HashMap::new();

    for (key, value) in form.into_inner() {
        let value = value.trim().to_string();
        match EDITABLE.iter().find(|(k, _)| *k == key) {
            None => {
                errors.insert(key, "Unknown setting".to_string());
            }
            Some((_, true)) if value.parse::<i64>().map(|n| n < 1).unwrap_or(true) => {
                errors.insert(key, "Must be a positive whole number".to_string());
            }
            Some(_) if value.is_empty() && SECRET_KEYS.contains(&key.as_str()) => {}
            Some(_) => {
                changes.insert(key, value);
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    store.setting_set_many(&changes).map_err(ApiError::Internal)?;
    log::info!("Settings updated: {} key(s)", changes.len());
    Ok(Json(json!({"success": true, "updated": changes.len()})))
}
