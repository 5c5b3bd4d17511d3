use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::branding;
use crate::error::{ApiError, ApiResult};
use crate::models::product::{Product, ProductFilter, ReviewForm};
use crate::money;
use crate::store::Store;

/// Storefront view of a product: display price and a stock flag, no admin-only fields.
pub(crate) fn product_json(p: &Product, symbol: &str) -> Value {
    json!({
        "id": p.id,
        "slug": p.slug,
        "name": p.name,
        "price": p.price,
        "price_display": money::format_price(p.price, symbol),
        "image": p.image,
        "category": p.category,
        "description": p.description,
        "origin_story": p.origin_story,
        "rating": p.rating,
        "reviews_count": p.reviews_count,
        "in_stock": p.stock_quantity > 0,
        "stock_quantity": p.stock_quantity,
    })
}

#[get("/catalog?<search>&<category>")]
pub fn catalog(store: &State<Arc<dyn Store>>, search: Option<&str>, category: Option<&str>) -> Json<Value> {
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    let filter = ProductFilter::from_query(search, category);
    let products: Vec<Value> = filter
        .apply(store.product_list())
        .iter()
        .map(|p| product_json(p, &symbol))
        .collect();

    Json(json!({
        "success": true,
        "count": products.len(),
        "products": products,
        "categories": store.category_list(true),
    }))
}

#[get("/products/<slug>")]
pub fn product_detail(store: &State<Arc<dyn Store>>, slug: &str) -> ApiResult {
    let product = store
        .product_find_by_slug(slug)
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    Ok(Json(json!({
        "success": true,
        "product": product_json(&product, &symbol),
        "reviews": store.review_list(product.id),
    })))
}

#[post("/products/<id>/reviews", format = "json", data = "<form>")]
pub fn review_create(store: &State<Arc<dyn Store>>, id: i64, form: Json<ReviewForm>) -> ApiResult {
    form.validate().map_err(ApiError::Validation)?;
    match store.product_find_by_id(id) {
        Some(p) if p.is_active => {}
        _ => return Err(ApiError::NotFound("Product not found".into())),
    }
    let review_id = store.review_create(id, &form).map_err(ApiError::Internal)?;
    let product = store.product_find_by_id(id);
    Ok(Json(json!({
        "success": true,
        "id": review_id,
        "rating": product.as_ref().map(|p| p.rating),
        "reviews_count": product.as_ref().map(|p| p.reviews_count),
    })))
}

#[get("/categories")]
pub fn categories(store: &State<Arc<dyn Store>>) -> Json<Value> {
    Json(json!({"success": true, "categories": store.category_list(true)}))
}

#[get("/branding")]
pub fn branding_identity(store: &State<Arc<dyn Store>>) -> Json<Value> {
    Json(json!({"success": true, "branding": branding::identity(&**store.inner())}))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![catalog, product_detail, review_create, categories, branding_identity]
}
