use std::convert::Infallible;
use std::sync::Arc;

use rocket::http::{Cookie, SameSite};
use rocket::request::{FromRequest, Outcome, Request};
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::models::cart::{CartView, MAX_LINE_QUANTITY};
use crate::money;
use crate::store::Store;

const CART_COOKIE: &str = "maison_cart";

/// Opaque guest cart token from the private cart cookie, issued on first use.
pub struct CartToken(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CartToken {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let cookies = request.cookies();
        if let Some(c) = cookies.get_private(CART_COOKIE) {
            let token = c.value().trim().to_string();
            if !token.is_empty() {
                return Outcome::Success(CartToken(token));
            }
        }

        let token = uuid::Uuid::new_v4().to_string();
        let mut cookie = Cookie::new(CART_COOKIE, token.clone());
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_path("/");
        cookie.set_max_age(rocket::time::Duration::days(30));
        cookies.add_private(cookie);
        Outcome::Success(CartToken(token))
    }
}

pub(crate) fn cart_json(cart: &CartView, symbol: &str) -> Value {
    json!({
        "lines": cart.lines,
        "item_count": cart.item_count,
        "total": cart.total,
        "total_display": money::format_price(cart.total, symbol),
    })
}

fn respond(store: &dyn Store, token: &CartToken) -> Json<Value> {
    let symbol = store.setting_get_or("commerce_currency_symbol", "$");
    let cart = store.cart_view(&token.0);
    Json(json!({"success": true, "cart": cart_json(&cart, &symbol)}))
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct QuantityDelta {
    pub delta: i64,
}

#[get("/cart")]
pub fn cart_view(store: &State<Arc<dyn Store>>, token: CartToken) -> Json<Value> {
    respond(&**store.inner(), &token)
}

#[post("/cart/items", format = "json", data = "<body>")]
pub fn cart_add(store: &State<Arc<dyn Store>>, token: CartToken, body: Json<AddItem>) -> ApiResult {
    store.cart_add(&token.0, body.product_id).map_err(|e| match e.as_str() {
        "Product not found" => ApiError::NotFound(e),
        _ => ApiError::Conflict(e),
    })?;
    Ok(respond(&**store.inner(), &token))
}

#[patch("/cart/items/<product_id>", format = "json", data = "<body>")]
pub fn cart_update(
    store: &State<Arc<dyn Store>>,
    token: CartToken,
    product_id: i64,
    body: Json<QuantityDelta>,
) -> ApiResult {
    if !(-MAX_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(&body.delta) {
        return Err(ApiError::field("delta", "Quantity change is out of range"));
    }
    store
        .cart_update_quantity(&token.0, product_id, body.delta)
        .map_err(ApiError::NotFound)?;
    Ok(respond(&**store.inner(), &token))
}

#[delete("/cart/items/<product_id>")]
pub fn cart_remove(store: &State<Arc<dyn Store>>, token: CartToken, product_id: i64) -> ApiResult {
    store.cart_remove(&token.0, product_id).map_err(ApiError::Internal)?;
    Ok(respond(&**store.inner(), &token))
}

#[delete("/cart")]
pub fn cart_clear(store: &State<Arc<dyn Store>>, token: CartToken) -> ApiResult {
    store.cart_clear(&token.0).map_err(ApiError::Internal)?;
    Ok(respond(&**store.inner(), &token))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![cart_view, cart_add, cart_update, cart_remove, cart_clear]
}
