use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::reports::{self, DashboardStats};
use crate::security::auth::AdminUser;
use crate::store::Store;

#[get("/api/stats")]
pub fn stats(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    let stats = DashboardStats {
        total_products: store.product_count(),
        active_categories: store.category_count_active(),
        total_orders: store.order_count(),
    };
    Json(json!({"success": true, "stats": stats}))
}

#[get("/api/reports/financial")]
pub fn financial(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    let report = reports::financial_report(&store.order_list_all());
    Json(json!({
        "success": true,
        "currency": store.setting_get_or("commerce_currency", "USD"),
        "report": report,
    }))
}

#[get("/api/reports/orders")]
pub fn order_stats(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    Json(json!({"success": true, "stats": reports::order_stats(&store.order_list_all())}))
}

#[get("/api/reports/inventory")]
pub fn inventory(_admin: AdminUser, store: &State<Arc<dyn Store>>) -> Json<Value> {
    let threshold = store.setting_get_i64_or("inventory_low_stock_threshold", 5);
    let report = reports::inventory_report(&store.product_list(), threshold);
    Json(json!({"success": true, "report": report}))
}
