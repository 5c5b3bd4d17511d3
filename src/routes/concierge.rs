use std::sync::Arc;
use std::time::Duration;

use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use super::blocking;
use crate::ai::{self, ChatTurn, GeminiConfig};
use crate::error::{ApiError, ApiResult};
use crate::rate_limit::RateLimiter;
use crate::security::auth::{self, ClientIp};
use crate::store::Store;

const MAX_MESSAGE_CHARS: usize = 2000;
const MAX_HISTORY_TURNS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ConciergeRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[get("/concierge")]
pub fn concierge_greeting() -> Json<Value> {
    Json(json!({"success": true, "reply": ai::CONCIERGE_GREETING}))
}

#[post("/concierge", format = "json", data = "<body>")]
pub async fn concierge_chat(
    store: &State<Arc<dyn Store>>,
    limiter: &State<Arc<RateLimiter>>,
    client_ip: ClientIp,
    body: Json<ConciergeRequest>,
) -> ApiResult {
    let mut req = body.into_inner();
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::field("message", "Please type a message"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::field("message", "That message is too long"));
    }

    let rate_key = format!("concierge:{}", auth::hash_ip(&client_ip.0));
    let max_per_hour = store.setting_get_i64_or("concierge_rate_limit", 20).max(1) as u64;
    if !limiter.check_and_record(&rate_key, max_per_hour, Duration::from_secs(3600)) {
        return Err(ApiError::TooManyRequests(
            "The concierge needs a short pause. Please try again later.".into(),
        ));
    }

    if req.history.len() > MAX_HISTORY_TURNS {
        req.history.drain(..req.history.len() - MAX_HISTORY_TURNS);
    }

    let cfg = GeminiConfig::from_store(&**store.inner());
    let brand = store.setting_get_or("brand_name", "Maison 2030");
    let history = req.history;
    let reply = blocking(move || ai::concierge_reply(&cfg, &brand, &history, &message)).await?;

    Ok(Json(json!({
        "success": reply.ok,
        "reply": reply.text,
        "links": reply.links,
    })))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![concierge_greeting, concierge_chat]
}
