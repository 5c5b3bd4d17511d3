use std::collections::HashMap;
use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use super::cart::CartToken;
use crate::error::{ApiError, ApiResult};
use crate::models::order::{NewOrder, Order, PlaceOrderError};
use crate::money;
use crate::store::Store;
use crate::validation::{self, CustomerDetails};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub customer: CustomerDetails,
    /// "Buy now" on a single product when the bag is empty.
    pub product_id: Option<i64>,
    pub gateway: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLookup {
    pub email: String,
    pub whatsapp: String,
}

/// Customer-facing order summary. Leaves out internal ids.
pub(crate) fn order_json(order: &Order, symbol: &str) -> Value {
    let items: Vec<Value> = order
        .items
        .iter()
        .map(|i| {
            json!({
                "product_id": i.product_id,
                "name": i.product_name,
                "category": i.category,
                "price": i.price,
                "quantity": i.quantity,
                "line_total": i.line_total(),
            })
        })
        .collect();
    json!({
        "id": order.id,
        "status": order.status,
        "status_label": order.status.label(),
        "customer_name": order.customer_name,
        "customer_whatsapp": order.customer_whatsapp,
        "customer_email": order.customer_email,
        "total": order.total,
        "total_display": money::format_price(order.total, symbol),
        "gateway": order.gateway,
        "tracking_number": order.tracking_number,
        "shipping_company": order.shipping_company,
        "created_at": order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        "items": items,
    })
}

fn place_error(e: PlaceOrderError) -> ApiError {
    match e {
        PlaceOrderError::Empty => ApiError::field("items", "Your bag is empty"),
        PlaceOrderError::ProductUnavailable(_) | PlaceOrderError::InsufficientStock { .. } => {
            ApiError::Conflict(e.to_string())
        }
        PlaceOrderError::Db(msg) => ApiError::Internal(msg),
    }
}

#[post("/checkout", format = "json", data = "<body>")]
pub fn checkout(store: &State<Arc<dyn Store>>, token: CartToken, body: Json<CheckoutRequest>) -> ApiResult {
    let body = body.into_inner();
    let mut errors: HashMap<String, String> = HashMap::new();

    let customer = match body.customer.validate() {
        Ok(c) => Some(c),
        Err(e) => {
            errors.extend(e);
            None
        }
    };

    let cart = store.cart_view(&token.0);
    let from_cart = !cart.is_empty();
    let lines: Vec<(i64, i64)> = if from_cart {
        cart.lines.iter().map(|l| (l.product_id, l.quantity)).collect()
    } else if let Some(pid) = body.product_id {
        vec![(pid, 1)]
    } else {
        errors.insert("items".to_string(), "Your bag is empty".to_string());
        vec![]
    };

    let customer = match customer {
        Some(c) if errors.is_empty() => c,
        _ => return Err(ApiError::Validation(errors)),
    };

    let gateway = body
        .gateway
        .map(|g| g.trim().to_lowercase())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| store.setting_get_or("commerce_default_gateway", "stripe"));

    let new = NewOrder {
        customer_name: customer.name,
        customer_whatsapp: customer.whatsapp,
        customer_email: customer.email,
        gateway,
        payment_id: body.payment_id.filter(|p| !p.trim().is_empty()),
        shipping_company: store.setting_get_or("shipping_company", "Royal Aramex"),
        lines,
    };

    let order = store.order_place(&new).map_err(place_error)?;

    if from_cart {
        if let Err(e) = store.cart_clear(&token.0) {
            log::warn!("Order {} placed but cart clear failed: {}", order.id, e);
        }
    }

    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    Ok(Json(json!({
        "success": true,
        "message": "Your order is confirmed. We will contact you on WhatsApp about delivery.",
        "order_id": order.id,
        "tracking_number": order.tracking_number,
        "total": order.total,
        "total_display": money::format_price(order.total, &symbol),
        "order": order_json(&order, &symbol),
    })))
}

/// Guests see their orders by proving both contact details.
#[post("/orders/lookup", format = "json", data = "<body>")]
pub fn orders_lookup(store: &State<Arc<dyn Store>>, body: Json<OrderLookup>) -> ApiResult {
    let mut errors = HashMap::new();
    if !validation::is_valid_email(&body.email) {
        errors.insert("email".to_string(), "Please enter a valid email address".to_string());
    }
    if !validation::is_valid_whatsapp(&body.whatsapp) {
        errors.insert("whatsapp".to_string(), "Please enter a valid international phone number".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let whatsapp = validation::normalize_whatsapp(body.whatsapp.trim());
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    let orders: Vec<Value> = store
        .order_list_by_contact(body.email.trim(), &whatsapp)
        .iter()
        .map(|o| order_json(o, &symbol))
        .collect();

    Ok(Json(json!({"success": true, "count": orders.len(), "orders": orders})))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![checkout, orders_lookup]
}
