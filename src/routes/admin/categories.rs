use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::category::CategoryForm;
use crate::security::auth::AdminUser;
use crate::store::Store;

#[get("/api/categories")]
pub fn categories_list(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    Json(json!({"success": true, "categories": store.category_list(false)}))
}

#[post("/api/categories", format = "json", data = "<form>")]
pub fn category_create(_admin: AdminUser, store: &State<Arc<dyn Store>>, form: Json<CategoryForm>) -> ApiResult {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ApiError::field("name", "Category name is required"));
    }
    if store.category_find_by_name(name).is_some() {
        return Err(ApiError::Conflict(format!("Category '{}' already exists", name)));
    }
    let id = store.category_create(&form).map_err(ApiError::Conflict)?;
    Ok(Json(json!({"success": true, "category": store.category_find_by_id(id)})))
}

#[delete("/api/categories/<id>")]
pub fn category_delete(_admin: AdminUser, store: &State<Arc<dyn Store>>, id: i64) -> ApiResult {
    let category = store
        .category_find_by_id(id)
        .ok_or_else(|| ApiError::NotFound("Category not found".into()))?;
    store.category_delete(id).map_err(ApiError::Internal)?;
    log::info!(
        "Category '{}' deleted, {} product(s) keep the label",
        category.name,
        category.product_count
    );
    Ok(Json(json!({"success": true})))
}

#[post("/api/categories/<id>/toggle")]
pub fn category_toggle(_admin: AdminUser, store: &State<Arc<dyn Store>>, id: i64) -> ApiResult {
    let active = store.category_toggle(id).map_err(ApiError::NotFound)?;
    Ok(Json(json!({"success": true, "is_active": active})))
}
