use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::{self, GeminiConfig};
use crate::error::{ApiError, ApiResult};
use crate::models::product::{Product, ProductForm, ProductInput, StockLevel, MAX_STOCK};
use crate::routes::blocking;
use crate::security::auth::AdminUser;
use crate::store::Store;

const NEW_PRODUCT_RATING: f64 = 5.0;

#[derive(Debug, Deserialize)]
pub struct StockDelta {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    pub idea: String,
}

fn admin_product_json(p: &Product, low_threshold: i64) -> Value {
    let mut v = json!(p);
    v["stock_level"] = json!(StockLevel::classify(p.stock_quantity, low_threshold));
    v
}

fn low_threshold(store: &dyn Store) -> i64 {
    store.setting_get_i64_or("inventory_low_stock_threshold", 5)
}

fn found(store: &dyn Store, id: i64) -> Result<Product, ApiError> {
    store
        .product_find_by_id(id)
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

#[get("/api/products")]
pub fn products_list(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    let threshold = low_threshold(&**store.inner());
    let products: Vec<Value> = store
        .product_list()
        .iter()
        .map(|p| admin_product_json(p, threshold))
        .collect();
    Json(json!({"success": true, "products": products}))
}

#[post("/api/products", format = "json", data = "<input>")]
pub fn product_create(_admin: AdminUser, store: &State<Arc<dyn Store>>, input: Json<ProductInput>) -> ApiResult {
    let form = input
        .validate(&store.category_names())
        .map_err(ApiError::Validation)?;
    let id = store
        .product_create(&form, NEW_PRODUCT_RATING)
        .map_err(ApiError::Internal)?;
    let product = found(&**store.inner(), id)?;
    log::info!("Product '{}' created", product.name);
    Ok(Json(json!({"success": true, "product": admin_product_json(&product, low_threshold(&**store.inner()))})))
}

#[put("/api/products/<id>", format = "json", data = "<input>")]
pub fn product_update(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    id: i64,
    input: Json<ProductInput>,
) -> ApiResult {
    found(&**store.inner(), id)?;
    let form = input
        .validate(&store.category_names())
        .map_err(ApiError::Validation)?;
    store.product_update(id, &form).map_err(ApiError::Internal)?;
    let product = found(&**store.inner(), id)?;
    Ok(Json(json!({"success": true, "product": admin_product_json(&product, low_threshold(&**store.inner()))})))
}

#[delete("/api/products/<id>")]
pub fn product_delete(_admin: AdminUser, store: &State<Arc<dyn Store>>, id: i64) -> ApiResult {
    let product = found(&**store.inner(), id)?;
    store.product_delete(id).map_err(ApiError::Internal)?;
    log::info!("Product '{}' deleted", product.name);
    Ok(Json(json!({"success": true})))
}

#[post("/api/products/<id>/toggle")]
pub fn product_toggle(_admin: AdminUser, store: &State<Arc<dyn Store>>, id: i64) -> ApiResult {
    let product = found(&**store.inner(), id)?;
    let active = !product.is_active;
    store.product_set_active(id, active).map_err(ApiError::Internal)?;
    Ok(Json(json!({"success": true, "is_active": active})))
}

#[post("/api/products/<id>/stock", format = "json", data = "<body>")]
pub fn product_stock(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    id: i64,
    body: Json<StockDelta>,
) -> ApiResult {
    if !(-MAX_STOCK..=MAX_STOCK).contains(&body.delta) {
        return Err(ApiError::field("delta", "Stock change is out of range"));
    }
    let stock = store.product_adjust_stock(id, body.delta).map_err(ApiError::NotFound)?;
    let level = StockLevel::classify(stock, low_threshold(&**store.inner()));
    Ok(Json(json!({"success": true, "stock_quantity": stock, "stock_level": level})))
}

/// Draft a product from a one-line idea, illustrate it, and publish it.
#[post("/api/products/generate", format = "json", data = "<body>")]
pub async fn product_generate(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    body: Json<GenerateForm>,
) -> ApiResult {
    let idea = body.idea.trim().to_string();
    if idea.is_empty() {
        return Err(ApiError::field("idea", "Describe the product idea"));
    }

    let cfg = GeminiConfig::from_store(&**store.inner());
    let categories = store.category_names();
    if categories.is_empty() {
        return Err(ApiError::field("category", "Create a category first"));
    }
    let (draft, image) = blocking(move || {
        let draft = ai::generate_product_or_fallback(&cfg, &idea, &categories);
        let image = ai::generate_product_image(&cfg, &draft.name);
        (draft, image)
    })
    .await?;

    let form = ProductForm {
        name: draft.name,
        price: draft.price,
        image,
        category: draft.category,
        description: draft.description,
        origin_story: draft.origin_story,
        stock_quantity: draft.stock_quantity,
        is_active: true,
    };
    let id = store
        .product_create(&form, NEW_PRODUCT_RATING)
        .map_err(ApiError::Internal)?;
    let product = found(&**store.inner(), id)?;
    log::info!("AI product '{}' published", product.name);
    Ok(Json(json!({"success": true, "product": admin_product_json(&product, low_threshold(&**store.inner()))})))
}
