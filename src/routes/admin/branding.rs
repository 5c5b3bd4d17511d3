use std::path::Path;
use std::sync::Arc;

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::json;

use crate::ai::{self, GeminiConfig};
use crate::branding::{self, BrandAsset, BRANDING_DIR};
use crate::error::{ApiError, ApiResult};
use crate::routes::blocking;
use crate::security::auth::AdminUser;
use crate::store::Store;

#[derive(FromForm)]
pub struct BrandingUpload<'f> {
    #[field(name = "type")]
    pub asset: String,
    pub file: TempFile<'f>,
}

#[derive(Debug, Deserialize)]
pub struct DataUriForm {
    #[serde(rename = "type")]
    pub asset: String,
    pub data_uri: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(rename = "type")]
    pub asset: String,
}

#[derive(Debug, Deserialize)]
pub struct BrandNameForm {
    pub name: String,
}

fn parse_asset(raw: &str) -> Result<BrandAsset, ApiError> {
    raw.parse().map_err(|e: String| ApiError::field("type", &e))
}

#[post("/api/branding/upload", data = "<form>")]
pub async fn branding_upload(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    mut form: Form<BrandingUpload<'_>>,
) -> ApiResult {
    let asset = parse_asset(&form.asset)?;
    let url = branding::store_upload(&**store.inner(), Path::new(BRANDING_DIR), asset, &mut form.file)
        .await
        .map_err(|e| ApiError::field("file", &e))?;
    Ok(Json(json!({
        "success": true,
        "url": url,
        "message": "Brand identity updated.",
    })))
}

#[post("/api/branding/data-uri", format = "json", data = "<form>")]
pub fn branding_data_uri(_admin: AdminUser, store: &State<Arc<dyn Store>>, form: Json<DataUriForm>) -> ApiResult {
    let asset = parse_asset(&form.asset)?;
    let url = branding::store_data_uri(&**store.inner(), Path::new(BRANDING_DIR), asset, &form.data_uri)
        .map_err(|e| ApiError::field("data_uri", &e))?;
    Ok(Json(json!({"success": true, "url": url})))
}

/// Generated brand art replaces the current asset only when an image comes back.
#[post("/api/branding/generate", format = "json", data = "<form>")]
pub async fn branding_generate(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    form: Json<GenerateForm>,
) -> ApiResult {
    let asset = parse_asset(&form.asset)?;
    let cfg = GeminiConfig::from_store(&**store.inner());
    let brand_name = store.setting_get_or("brand_name", "Maison 2030");

    let data_uri = blocking(move || ai::generate_brand_image(&cfg, asset, &brand_name))
        .await?
        .map_err(|e| {
            log::error!("Brand {} generation failed: {}", asset.as_str(), e);
            ApiError::Internal(format!("Could not generate the {}. The current one was kept.", asset.as_str()))
        })?;

    let url = branding::store_data_uri(&**store.inner(), Path::new(BRANDING_DIR), asset, &data_uri)
        .map_err(ApiError::Internal)?;
    Ok(Json(json!({"success": true, "url": url})))
}

#[delete("/api/branding/<asset>")]
pub fn branding_delete(_admin: AdminUser, store: &State<Arc<dyn Store>>, asset: &str) -> ApiResult {
    let asset = parse_asset(asset)?;
    let removed = branding::clear(&**store.inner(), Path::new(BRANDING_DIR), asset).map_err(ApiError::Internal)?;
    Ok(Json(json!({"success": true, "removed": removed})))
}

#[post("/api/branding/name", format = "json", data = "<form>")]
pub fn branding_name(_admin: AdminUser, store: &State<Arc<dyn Store>>, form: Json<BrandNameForm>) -> ApiResult {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "Brand name is required"));
    }
    store.setting_set("brand_name", name).map_err(ApiError::Internal)?;
    Ok(Json(json!({"success": true, "name": name})))
}
