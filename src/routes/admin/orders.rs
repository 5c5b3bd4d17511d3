use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Deserialize;
use serde_json::{json, Value};

use super::admin_base;
use crate::error::{ApiError, ApiResult};
use crate::models::order::OrderStatus;
use crate::money;
use crate::routes::checkout::order_json;
use crate::security::auth::AdminUser;
use crate::store::Store;
use crate::AdminSlug;

const PER_PAGE: i64 = 25;

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus, ApiError> {
    raw.parse::<OrderStatus>()
        .map_err(|e| ApiError::field("status", &e))
}

#[get("/api/orders?<status>&<page>")]
pub fn orders_list(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    status: Option<&str>,
    page: Option<i64>,
) -> ApiResult {
    let status = match status.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };
    let total = match status {
        Some(s) => store.order_count_by_status(s),
        None => store.order_count(),
    };
    let total_pages = ((total as f64) / (PER_PAGE as f64)).ceil() as i64;

    let current_page = page.unwrap_or(1).clamp(1, total_pages.max(1));
    let offset = (current_page - 1) * PER_PAGE;

    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    let orders: Vec<Value> = store
        .order_list(status, PER_PAGE, offset)
        .iter()
        .map(|o| order_json(o, &symbol))
        .collect();

    let statuses: Vec<Value> = OrderStatus::ALL
        .iter()
        .map(|s| json!({"value": s, "label": s.label()}))
        .collect();

    Ok(Json(json!({
        "success": true,
        "orders": orders,
        "total": total,
        "current_page": current_page,
        "total_pages": total_pages,
        "statuses": statuses,
    })))
}

#[get("/api/orders/<id>")]
pub fn order_detail(_admin: AdminUser, store: &State<Arc<dyn Store>>, id: &str) -> ApiResult {
    let order = store
        .order_find_by_id(id)
        .ok_or_else(|| ApiError::NotFound("Order not found".into()))?;
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    Ok(Json(json!({"success": true, "order": order_json(&order, &symbol)})))
}

/// Any label may follow any other.
#[post("/api/orders/<id>/status", format = "json", data = "<form>")]
pub fn order_status(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    id: &str,
    form: Json<StatusForm>,
) -> ApiResult {
    let status = parse_status(&form.status)?;
    store
        .order_update_status(id, status)
        .map_err(ApiError::NotFound)?;
    log::info!("Order {} marked {}", id, status);
    Ok(Json(json!({"success": true, "status": status, "status_label": status.label()})))
}

#[get("/orders/<id>/invoice")]
pub fn order_invoice(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: &str,
) -> Result<Template, ApiError> {
    let order = store
        .order_find_by_id(id)
        .ok_or_else(|| ApiError::NotFound("Order not found".into()))?;
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");

    let items: Vec<Value> = order
        .items
        .iter()
        .map(|i| {
            json!({
                "name": i.product_name,
                "category": i.category,
                "quantity": i.quantity,
                "price": money::format_price(i.price, &symbol),
                "line_total": money::format_price(i.line_total(), &symbol),
            })
        })
        .collect();

    let context = json!({
        "brand_name": store.setting_get_or("brand_name", "Maison 2030"),
        "brand_logo": store.setting_get_or("brand_logo", ""),
        "admin_base": admin_base(slug),
        "order": {
            "id": order.id,
            "date": order.created_at.format("%Y-%m-%d").to_string(),
            "status_label": order.status.label(),
            "customer_name": order.customer_name,
            "customer_whatsapp": order.customer_whatsapp,
            "customer_email": order.customer_email,
            "gateway": order.gateway,
            "tracking_number": order.tracking_number,
            "shipping_company": order.shipping_company,
            "total": money::format_price(order.total, &symbol),
        },
        "items": items,
    });

    Ok(Template::render("admin/invoice", &context))
}
