use serde_json::Value;

use super::{AiError, GeminiConfig, GroundingLink};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// POST a `generateContent` body and return the raw response JSON.
/// Blocking: call from a blocking thread, never from an async worker.
pub fn generate_content(cfg: &GeminiConfig, model: &str, body: &Value) -> Result<Value, AiError> {
    if !cfg.is_configured() {
        return Err(AiError("Gemini API key not configured".into()));
    }

    let url = format!("{}/{}:generateContent?key={}", API_BASE, model, cfg.api_key);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
        .build()
        .map_err(|e| AiError(format!("HTTP client error: {}", e)))?;

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .map_err(|e| AiError(format!("Gemini request failed: {}", e)))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().unwrap_or_default();
        return Err(AiError(format!("Gemini returned {}: {}", status, text)));
    }

    resp.json()
        .map_err(|e| AiError(format!("Gemini JSON parse error: {}", e)))
}

fn first_candidate_parts(resp: &Value) -> Option<&Vec<Value>> {
    resp.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
}

/// Concatenated text parts of the first candidate.
pub fn first_text(resp: &Value) -> Option<String> {
    let text: String = first_candidate_parts(resp)?
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First inline image part as a `data:` URI.
pub fn first_inline_image(resp: &Value) -> Option<String> {
    first_candidate_parts(resp)?.iter().find_map(|p| {
        let inline = p.get("inlineData").or_else(|| p.get("inline_data"))?;
        let data = inline.get("data")?.as_str()?;
        let mime = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(|m| m.as_str())
            .unwrap_or("image/png");
        Some(format!("data:{};base64,{}", mime, data))
    })
}

/// Web sources the answer was grounded on.
pub fn grounding_links(resp: &Value) -> Vec<GroundingLink> {
    resp.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|g| g.get("groundingChunks"))
        .and_then(|g| g.as_array())
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.get("web")?;
                    let uri = web.get("uri")?.as_str()?.to_string();
                    let title = web
                        .get("title")
                        .and_then(|t| t.as_str())
                        .unwrap_or(&uri)
                        .to_string();
                    Some(GroundingLink { title, uri })
                })
                .collect()
        })
        .unwrap_or_default()
}
