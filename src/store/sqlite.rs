use std::collections::HashMap;

use crate::db::DbPool;
use crate::models::cart::{Cart, CartView};
use crate::models::category::{Category, CategoryForm};
use crate::models::order::{NewOrder, Order, OrderStatus, PlaceOrderError};
use crate::models::product::{Product, ProductForm, Review, ReviewForm};
use crate::models::session::Session;
use crate::models::settings::Setting;

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool_at(path).map_err(|e| e.to_string())?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        crate::db::seed_defaults(&self.pool).map_err(|e| e.to_string())
    }

    // ── Settings ────────────────────────────────────────────────────

    fn setting_get(&self, key: &str) -> Option<String> {
        Setting::get(&self.pool, key)
    }

    fn setting_set(&self, key: &str, value: &str) -> Result<(), String> {
        Setting::set(&self.pool, key, value)
    }

    fn setting_set_many(&self, settings: &HashMap<String, String>) -> Result<(), String> {
        Setting::set_many(&self.pool, settings)
    }

    fn setting_all(&self) -> HashMap<String, String> {
        Setting::all(&self.pool)
    }

    // ── Products ────────────────────────────────────────────────────

    fn product_find_by_id(&self, id: i64) -> Option<Product> {
        Product::find_by_id(&self.pool, id)
    }

    fn product_find_by_slug(&self, slug: &str) -> Option<Product> {
        Product::find_by_slug(&self.pool, slug)
    }

    fn product_list(&self) -> Vec<Product> {
        Product::list(&self.pool)
    }

    fn product_count(&self) -> i64 {
        Product::count(&self.pool)
    }

    fn product_create(&self, form: &ProductForm, rating: f64) -> Result<i64, String> {
        Product::create(&self.pool, form, rating)
    }

    fn product_update(&self, id: i64, form: &ProductForm) -> Result<(), String> {
        Product::update(&self.pool, id, form)
    }

    fn product_delete(&self, id: i64) -> Result<(), String> {
        Product::delete(&self.pool, id)
    }

    fn product_set_active(&self, id: i64, active: bool) -> Result<(), String> {
        Product::set_active(&self.pool, id, active)
    }

    fn product_adjust_stock(&self, id: i64, delta: i64) -> Result<i64, String> {
        Product::adjust_stock(&self.pool, id, delta)
    }

    // ── Reviews ─────────────────────────────────────────────────────

    fn review_list(&self, product_id: i64) -> Vec<Review> {
        Review::for_product(&self.pool, product_id)
    }

    fn review_create(&self, product_id: i64, form: &ReviewForm) -> Result<i64, String> {
        Review::create(&self.pool, product_id, form)
    }

    // ── Categories ──────────────────────────────────────────────────

    fn category_find_by_id(&self, id: i64) -> Option<Category> {
        Category::find_by_id(&self.pool, id)
    }

    fn category_find_by_name(&self, name: &str) -> Option<Category> {
        Category::find_by_name(&self.pool, name)
    }

    fn category_list(&self, active_only: bool) -> Vec<Category> {
        Category::list(&self.pool, active_only)
    }

    fn category_names(&self) -> Vec<String> {
        Category::names(&self.pool)
    }

    fn category_count_active(&self) -> i64 {
        Category::count_active(&self.pool)
    }

    fn category_create(&self, form: &CategoryForm) -> Result<i64, String> {
        Category::create(&self.pool, form)
    }

    fn category_delete(&self, id: i64) -> Result<(), String> {
        Category::delete(&self.pool, id)
    }

    fn category_toggle(&self, id: i64) -> Result<bool, String> {
        Category::toggle_active(&self.pool, id)
    }

    // ── Cart ────────────────────────────────────────────────────────

    fn cart_view(&self, token: &str) -> CartView {
        Cart::view(&self.pool, token)
    }

    fn cart_add(&self, token: &str, product_id: i64) -> Result<(), String> {
        Cart::add(&self.pool, token, product_id)
    }

    fn cart_update_quantity(&self, token: &str, product_id: i64, delta: i64) -> Result<i64, String> {
        Cart::update_quantity(&self.pool, token, product_id, delta)
    }

    fn cart_remove(&self, token: &str, product_id: i64) -> Result<(), String> {
        Cart::remove(&self.pool, token, product_id)
    }

    fn cart_clear(&self, token: &str) -> Result<(), String> {
        Cart::clear(&self.pool, token)
    }

    // ── Orders ──────────────────────────────────────────────────────

    fn order_place(&self, new: &NewOrder) -> Result<Order, PlaceOrderError> {
        Order::place(&self.pool, new)
    }

    fn order_find_by_id(&self, id: &str) -> Option<Order> {
        Order::find_by_id(&self.pool, id)
    }

    fn order_list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Vec<Order> {
        Order::list(&self.pool, status, limit, offset)
    }

    fn order_list_all(&self) -> Vec<Order> {
        Order::list_all(&self.pool)
    }

    fn order_list_by_contact(&self, email: &str, whatsapp: &str) -> Vec<Order> {
        Order::list_by_contact(&self.pool, email, whatsapp)
    }

    fn order_count(&self) -> i64 {
        Order::count(&self.pool)
    }

    fn order_count_by_status(&self, status: OrderStatus) -> i64 {
        Order::count_by_status(&self.pool, status)
    }

    fn order_update_status(&self, id: &str, status: OrderStatus) -> Result<(), String> {
        Order::update_status(&self.pool, id, status)
    }

    // ── Sessions ────────────────────────────────────────────────────

    fn session_create(
        &self,
        token: &str,
        expires_at: &str,
        ip_hash: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), String> {
        Session::create(&self.pool, token, expires_at, ip_hash, user_agent)
    }

    fn session_validate(&self, token: &str) -> bool {
        Session::is_valid(&self.pool, token)
    }

    fn session_delete(&self, token: &str) -> Result<(), String> {
        Session::delete(&self.pool, token)
    }

    fn session_delete_all(&self) -> Result<usize, String> {
        Session::delete_all(&self.pool)
    }

    // ── Background tasks ────────────────────────────────────────────

    fn task_cleanup_sessions(&self) -> Result<usize, String> {
        Session::cleanup_expired(&self.pool)
    }

    fn task_cleanup_carts(&self, max_age_days: i64) -> Result<usize, String> {
        Cart::cleanup_stale(&self.pool, max_age_days)
    }
}
