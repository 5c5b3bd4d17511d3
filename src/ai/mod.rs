pub mod gemini;
pub mod prompts;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::branding::BrandAsset;
use crate::money;
use crate::store::Store;

// ── Types ─────────────────────────────────────────────

#[derive(Debug)]
pub struct AiError(pub String);

impl std::fmt::Display for AiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection settings, snapshotted from the store so the blocking call
/// can run off the request's async worker.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    /// `GEMINI_API_KEY` in the environment wins over the stored key.
    pub fn from_store(store: &dyn Store) -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| store.setting_get_or("ai_gemini_api_key", ""));
        GeminiConfig {
            api_key,
            text_model: store.setting_get_or("ai_gemini_text_model", "gemini-3-flash-preview"),
            image_model: store.setting_get_or("ai_gemini_image_model", "gemini-2.5-flash-image"),
            timeout_secs: store.setting_get_i64_or("ai_timeout_secs", 120).max(5) as u64,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Product draft proposed by the model.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedProduct {
    pub name: String,
    pub price: f64,
    pub description: String,
    pub origin_story: Option<String>,
    pub category: String,
    pub stock_quantity: i64,
}

const FALLBACK_PRICE: f64 = 99.99;
const FALLBACK_CATEGORY: &str = "treasury";
const FALLBACK_STOCK: i64 = 10;

/// `treasury` while it exists, otherwise the first known category.
pub fn fallback_category(categories: &[String]) -> String {
    categories
        .iter()
        .find(|c| c.as_str() == FALLBACK_CATEGORY)
        .or_else(|| categories.first())
        .cloned()
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string())
}

impl GeneratedProduct {
    /// Stand-in used when generation fails.
    pub fn fallback(idea: &str, categories: &[String]) -> Self {
        GeneratedProduct {
            name: idea.trim().to_string(),
            price: FALLBACK_PRICE,
            description: "A distinguished piece from our exclusive collection.".to_string(),
            origin_story: None,
            category: fallback_category(categories),
            stock_quantity: FALLBACK_STOCK,
        }
    }

    /// Build from the model's JSON, coercing price text and unknown categories.
    pub fn from_json(v: &Value, idea: &str, categories: &[String]) -> Option<Self> {
        let text = |key: &str| {
            v.get(key)
                .and_then(|x| x.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let name = text("name").unwrap_or_else(|| idea.trim().to_string());
        let price = match v.get("price") {
            Some(Value::Number(n)) => n.as_f64().map(money::round_cents),
            Some(Value::String(s)) => money::parse_price(s),
            _ => None,
        }?;
        let category = text("category")
            .map(|c| c.to_lowercase())
            .filter(|c| categories.iter().any(|known| known == c))
            .unwrap_or_else(|| fallback_category(categories));
        let stock_quantity = v
            .get("stockQuantity")
            .or_else(|| v.get("stock_quantity"))
            .and_then(|x| x.as_f64())
            .map(|n| n.round() as i64)
            .unwrap_or(FALLBACK_STOCK)
            .max(0);

        Some(GeneratedProduct {
            name,
            price,
            description: text("description").unwrap_or_default(),
            origin_story: text("originStory").or_else(|| text("origin_story")),
            category,
            stock_quantity,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// "user" or "model"
    pub role: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConciergeReply {
    pub ok: bool,
    pub text: String,
    pub links: Vec<GroundingLink>,
}

pub const CONCIERGE_GREETING: &str = "Welcome to Maison 2030. I am your personal guide to pieces worthy of you. How may I help you today?";
const CONCIERGE_EMPTY_REPLY: &str = "Our assistant is refreshing its knowledge right now. Please ask again in a moment.";
const CONCIERGE_BUSY_REPLY: &str = "Our servers are under heavy demand at the moment. Please try again shortly.";

// ── Public API ────────────────────────────────────────

pub fn generate_product(cfg: &GeminiConfig, idea: &str, categories: &[String]) -> Result<GeneratedProduct, AiError> {
    let body = json!({
        "contents": [{"role": "user", "parts": [{"text": prompts::product_from_idea(idea, categories)}]}],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": prompts::product_schema()
        }
    });
    let resp = gemini::generate_content(cfg, &cfg.text_model, &body)?;
    let text = gemini::first_text(&resp).ok_or_else(|| AiError("Empty response from AI".into()))?;
    let parsed = parse_json_from_text(&text).ok_or_else(|| AiError("AI response was not JSON".into()))?;
    GeneratedProduct::from_json(&parsed, idea, categories)
        .ok_or_else(|| AiError("AI response had no usable price".into()))
}

/// Never fails: a broken generation yields the stock fallback product.
pub fn generate_product_or_fallback(cfg: &GeminiConfig, idea: &str, categories: &[String]) -> GeneratedProduct {
    generate_product(cfg, idea, categories).unwrap_or_else(|e| {
        log::warn!("Product generation failed, using fallback: {}", e);
        GeneratedProduct::fallback(idea, categories)
    })
}

pub fn placeholder_image(name: &str) -> String {
    let seed = slug::slugify(name);
    let seed = if seed.is_empty() { "maison".to_string() } else { seed };
    format!("https://picsum.photos/seed/{}/800/800", seed)
}

fn generate_image(cfg: &GeminiConfig, prompt: &str) -> Result<String, AiError> {
    let body = json!({
        "contents": [{"role": "user", "parts": [{"text": prompt}]}]
    });
    let resp = gemini::generate_content(cfg, &cfg.image_model, &body)?;
    gemini::first_inline_image(&resp).ok_or_else(|| AiError("No image in AI response".into()))
}

/// Data URI of a studio shot, or a placeholder photo URL on failure.
pub fn generate_product_image(cfg: &GeminiConfig, name: &str) -> String {
    generate_image(cfg, &prompts::product_image(name)).unwrap_or_else(|e| {
        log::warn!("Product image generation failed for '{}': {}", name, e);
        placeholder_image(name)
    })
}

/// Brand imagery has no placeholder; the caller keeps the current asset on error.
pub fn generate_brand_image(cfg: &GeminiConfig, asset: BrandAsset, brand_name: &str) -> Result<String, AiError> {
    generate_image(cfg, &prompts::brand_image(asset, brand_name))
}

pub fn concierge_reply(cfg: &GeminiConfig, brand_name: &str, history: &[ChatTurn], message: &str) -> ConciergeReply {
    let mut contents: Vec<Value> = history
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .map(|t| {
            let role = if t.role == "model" { "model" } else { "user" };
            json!({"role": role, "parts": [{"text": t.text}]})
        })
        .collect();
    contents.push(json!({"role": "user", "parts": [{"text": message}]}));

    let body = json!({
        "systemInstruction": {"parts": [{"text": prompts::concierge_system(brand_name)}]},
        "contents": contents,
        "tools": [{"google_search": {}}]
    });

    match gemini::generate_content(cfg, &cfg.text_model, &body) {
        Ok(resp) => ConciergeReply {
            ok: true,
            text: gemini::first_text(&resp).unwrap_or_else(|| CONCIERGE_EMPTY_REPLY.to_string()),
            links: gemini::grounding_links(&resp),
        },
        Err(e) => {
            log::error!("Concierge request failed: {}", e);
            ConciergeReply {
                ok: false,
                text: CONCIERGE_BUSY_REPLY.to_string(),
                links: vec![],
            }
        }
    }
}

// ── JSON extraction ───────────────────────────────────

/// Pull a JSON object out of model text that may carry code fences or prose.
pub fn parse_json_from_text(text: &str) -> Option<Value> {
    log::debug!("AI raw response: {}", text.chars().take(500).collect::<String>());

    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        return Some(v);
    }

    let stripped = text.replace("```json", "").replace("```", "");
    if let Ok(v) = serde_json::from_str::<Value>(stripped.trim()) {
        return Some(v);
    }

    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut end = None;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let candidate = &text[start..=end?];
    serde_json::from_str::<Value>(candidate)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&candidate.replace(",}", "}").replace(",]", "]")).ok())
}
