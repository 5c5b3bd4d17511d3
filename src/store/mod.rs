use std::collections::HashMap;

use crate::models::cart::CartView;
use crate::models::category::{Category, CategoryForm};
use crate::models::order::{NewOrder, Order, OrderStatus, PlaceOrderError};
use crate::models::product::{Product, ProductForm, Review, ReviewForm};

pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
/// Implementation: `SqliteStore` (wraps rusqlite/r2d2).
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;
    fn seed_defaults(&self) -> Result<(), String>;

    // ── Settings ────────────────────────────────────────────────────
    fn setting_get(&self, key: &str) -> Option<String>;
    fn setting_get_or(&self, key: &str, default: &str) -> String {
        self.setting_get(key)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }
    fn setting_get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.setting_get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
    fn setting_set(&self, key: &str, value: &str) -> Result<(), String>;
    fn setting_set_many(&self, settings: &HashMap<String, String>) -> Result<(), String>;
    fn setting_all(&self) -> HashMap<String, String>;

    // ── Products ────────────────────────────────────────────────────
    fn product_find_by_id(&self, id: i64) -> Option<Product>;
    fn product_find_by_slug(&self, slug: &str) -> Option<Product>;
    fn product_list(&self) -> Vec<Product>;
    fn product_count(&self) -> i64;
    fn product_create(&self, form: &ProductForm, rating: f64) -> Result<i64, String>;
    fn product_update(&self, id: i64, form: &ProductForm) -> Result<(), String>;
    fn product_delete(&self, id: i64) -> Result<(), String>;
    fn product_set_active(&self, id: i64, active: bool) -> Result<(), String>;
    fn product_adjust_stock(&self, id: i64, delta: i64) -> Result<i64, String>;

    // ── Reviews ─────────────────────────────────────────────────────
    fn review_list(&self, product_id: i64) -> Vec<Review>;
    fn review_create(&self, product_id: i64, form: &ReviewForm) -> Result<i64, String>;

    // ── Categories ──────────────────────────────────────────────────
    fn category_find_by_id(&self, id: i64) -> Option<Category>;
    fn category_find_by_name(&self, name: &str) -> Option<Category>;
    fn category_list(&self, active_only: bool) -> Vec<Category>;
    fn category_names(&self) -> Vec<String>;
    fn category_count_active(&self) -> i64;
    fn category_create(&self, form: &CategoryForm) -> Result<i64, String>;
    fn category_delete(&self, id: i64) -> Result<(), String>;
    fn category_toggle(&self, id: i64) -> Result<bool, String>;

    // ── Cart ────────────────────────────────────────────────────────
    fn cart_view(&self, token: &str) -> CartView;
    fn cart_add(&self, token: &str, product_id: i64) -> Result<(), String>;
    fn cart_update_quantity(&self, token: &str, product_id: i64, delta: i64) -> Result<i64, String>;
    fn cart_remove(&self, token: &str, product_id: i64) -> Result<(), String>;
    fn cart_clear(&self, token: &str) -> Result<(), String>;

    // ── Orders ──────────────────────────────────────────────────────
    fn order_place(&self, new: &NewOrder) -> Result<Order, PlaceOrderError>;
    fn order_find_by_id(&self, id: &str) -> Option<Order>;
    fn order_list(&self, status: Option<OrderStatus>, limit: i64, offset: i64) -> Vec<Order>;
    fn order_list_all(&self) -> Vec<Order>;
    fn order_list_by_contact(&self, email: &str, whatsapp: &str) -> Vec<Order>;
    fn order_count(&self) -> i64;
    fn order_count_by_status(&self, status: OrderStatus) -> i64;
    fn order_update_status(&self, id: &str, status: OrderStatus) -> Result<(), String>;

    // ── Sessions ────────────────────────────────────────────────────
    fn session_create(
        &self,
        token: &str,
        expires_at: &str,
        ip_hash: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), String>;
    fn session_validate(&self, token: &str) -> bool;
    fn session_delete(&self, token: &str) -> Result<(), String>;
    fn session_delete_all(&self) -> Result<usize, String>;

    // ── Background tasks ────────────────────────────────────────────
    fn task_cleanup_sessions(&self) -> Result<usize, String>;
    fn task_cleanup_carts(&self, max_age_days: i64) -> Result<usize, String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    /// Fresh in-memory SqliteStore with migrations and seed applied.
    fn test_store() -> SqliteStore {
        let manager = r2d2_sqlite::SqliteConnectionManager::memory()
            .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
        let pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create in-memory pool");
        let store = SqliteStore::new(pool);
        store.run_migrations().expect("migrations failed");
        // Cheap hash so seeding skips the default-cost bcrypt round
        store
            .setting_set("admin_password_hash", &bcrypt::hash("2030", 4).unwrap())
            .unwrap();
        store.seed_defaults().expect("seed failed");
        store
    }

    fn form(name: &str, price: f64, category: &str, stock: i64) -> ProductForm {
        ProductForm {
            name: name.to_string(),
            price,
            image: "https://example.com/p.jpg".to_string(),
            category: category.to_string(),
            description: format!("{} description", name),
            origin_story: None,
            stock_quantity: stock,
            is_active: true,
        }
    }

    fn new_order(lines: Vec<(i64, i64)>) -> NewOrder {
        NewOrder {
            customer_name: "Layla Haddad".to_string(),
            customer_whatsapp: "+971500000000".to_string(),
            customer_email: "layla@example.com".to_string(),
            gateway: "stripe".to_string(),
            payment_id: None,
            shipping_company: "Royal Aramex".to_string(),
            lines,
        }
    }

    // ── Settings ────────────────────────────────────────────────────

    #[test]
    fn test_setting_get_set() {
        let s = test_store();
        assert!(s.setting_get("nonexistent_key_xyz").is_none());
        s.setting_set("test_key", "hello").unwrap();
        assert_eq!(s.setting_get("test_key"), Some("hello".to_string()));
    }

    #[test]
    fn test_setting_get_or_skips_empty() {
        let s = test_store();
        assert_eq!(s.setting_get_or("brand_logo", "fallback"), "fallback");
        assert_eq!(s.setting_get_or("brand_name", "fallback"), "Maison 2030");
    }

    #[test]
    fn test_setting_get_i64_or() {
        let s = test_store();
        assert_eq!(s.setting_get_i64_or("missing_num", 7), 7);
        assert_eq!(s.setting_get_i64_or("inventory_low_stock_threshold", 0), 5);
        s.setting_set("bad_num", "abc").unwrap();
        assert_eq!(s.setting_get_i64_or("bad_num", 3), 3);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let s = test_store();
        let before = s.product_count();
        s.seed_defaults().unwrap();
        assert_eq!(s.product_count(), before);
        assert_eq!(s.category_names().len(), 4);
    }

    #[test]
    fn test_seeded_catalog_stays_deleted() {
        let s = test_store();
        assert_eq!(s.product_count(), 4);
        for p in s.product_list() {
            s.product_delete(p.id).unwrap();
        }
        s.seed_defaults().unwrap();
        assert_eq!(s.product_count(), 0);
    }

    // ── Products ────────────────────────────────────────────────────

    #[test]
    fn test_product_slug_collision() {
        let s = test_store();
        let a = s.product_create(&form("Silk Scarf", 10.0, "clothes", 1), 5.0).unwrap();
        let b = s.product_create(&form("Silk Scarf", 12.0, "clothes", 1), 5.0).unwrap();
        assert_eq!(s.product_find_by_id(a).unwrap().slug, "silk-scarf");
        assert_eq!(s.product_find_by_id(b).unwrap().slug, "silk-scarf-2");
    }

    #[test]
    fn test_product_list_newest_first() {
        let s = test_store();
        let id = s.product_create(&form("Fresh Piece", 10.0, "art", 1), 5.0).unwrap();
        assert_eq!(s.product_list()[0].id, id);
    }

    #[test]
    fn test_product_update_missing() {
        let s = test_store();
        assert!(s.product_update(9999, &form("Ghost", 1.0, "art", 1)).is_err());
    }

    #[test]
    fn test_product_adjust_stock_floors_at_zero() {
        let s = test_store();
        let id = s.product_create(&form("Lamp", 80.0, "art", 3), 5.0).unwrap();
        assert_eq!(s.product_adjust_stock(id, 2).unwrap(), 5);
        assert_eq!(s.product_adjust_stock(id, -20).unwrap(), 0);
        assert!(s.product_adjust_stock(9999, 1).is_err());
    }

    #[test]
    fn test_review_updates_rating() {
        let s = test_store();
        let id = s.product_create(&form("Vase", 50.0, "art", 2), 5.0).unwrap();
        for rating in [5, 4, 4] {
            let review = ReviewForm {
                user_name: "Omar".to_string(),
                rating,
                comment: "Lovely".to_string(),
            };
            s.review_create(id, &review).unwrap();
        }
        let p = s.product_find_by_id(id).unwrap();
        assert_eq!(p.reviews_count, 3);
        assert!((p.rating - 4.3).abs() < 1e-9);
        assert_eq!(s.review_list(id).len(), 3);
    }

    // ── Categories ──────────────────────────────────────────────────

    #[test]
    fn test_category_lifecycle() {
        let s = test_store();
        let id = s.category_create(&CategoryForm { name: "perfume".to_string() }).unwrap();
        assert!(s.category_create(&CategoryForm { name: "perfume".to_string() }).is_err());
        assert!(!s.category_toggle(id).unwrap());
        assert_eq!(s.category_list(true).len(), 4);
        assert!(s.category_toggle(id).unwrap());
        s.category_delete(id).unwrap();
        assert!(s.category_find_by_id(id).is_none());
    }

    #[test]
    fn test_category_delete_keeps_product_label() {
        let s = test_store();
        let id = s.category_create(&CategoryForm { name: "perfume".to_string() }).unwrap();
        let pid = s.product_create(&form("Oud", 300.0, "perfume", 2), 5.0).unwrap();
        assert_eq!(s.category_find_by_id(id).unwrap().product_count, 1);
        s.category_delete(id).unwrap();
        assert_eq!(s.product_find_by_id(pid).unwrap().category, "perfume");
    }

    // ── Cart ────────────────────────────────────────────────────────

    #[test]
    fn test_cart_add_increments() {
        let s = test_store();
        let id = s.product_create(&form("Ring", 100.0, "treasury", 5), 5.0).unwrap();
        s.cart_add("tok", id).unwrap();
        s.cart_add("tok", id).unwrap();
        let cart = s.cart_view("tok");
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.item_count, 2);
        assert!((cart.total - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_cart_quantity_floor() {
        let s = test_store();
        let id = s.product_create(&form("Ring", 100.0, "treasury", 5), 5.0).unwrap();
        s.cart_add("tok", id).unwrap();
        assert_eq!(s.cart_update_quantity("tok", id, -5).unwrap(), 1);
        assert_eq!(s.cart_update_quantity("tok", id, 2).unwrap(), 3);
        assert!(s.cart_update_quantity("tok", 9999, 1).is_err());
    }

    #[test]
    fn test_cart_rejects_inactive_product() {
        let s = test_store();
        let id = s.product_create(&form("Ring", 100.0, "treasury", 5), 5.0).unwrap();
        s.product_set_active(id, false).unwrap();
        assert!(s.cart_add("tok", id).is_err());
        assert!(s.cart_view("tok").is_empty());
    }

    #[test]
    fn test_cart_remove_and_clear() {
        let s = test_store();
        let a = s.product_create(&form("A", 1.0, "art", 5), 5.0).unwrap();
        let b = s.product_create(&form("B", 2.0, "art", 5), 5.0).unwrap();
        s.cart_add("tok", a).unwrap();
        s.cart_add("tok", b).unwrap();
        s.cart_remove("tok", a).unwrap();
        assert_eq!(s.cart_view("tok").lines.len(), 1);
        s.cart_clear("tok").unwrap();
        assert!(s.cart_view("tok").is_empty());
    }

    // ── Orders ──────────────────────────────────────────────────────

    #[test]
    fn test_order_place_prices_from_catalog() {
        let s = test_store();
        let a = s.product_create(&form("Watch", 1200.0, "treasury", 8), 5.0).unwrap();
        let b = s.product_create(&form("Robe", 2500.0, "clothes", 3), 5.0).unwrap();
        let order = s.order_place(&new_order(vec![(a, 2), (b, 1)])).unwrap();
        assert!(order.id.starts_with("AK-"));
        assert_eq!(order.id.len(), 8);
        assert!(order.tracking_number.as_deref().unwrap().starts_with("TRK-"));
        assert_eq!(order.status, OrderStatus::Paid);
        assert!((order.total - 4900.0).abs() < 1e-9);
        assert_eq!(order.items.len(), 2);
        assert_eq!(s.product_find_by_id(a).unwrap().stock_quantity, 6);
        assert_eq!(s.product_find_by_id(b).unwrap().stock_quantity, 2);
    }

    #[test]
    fn test_order_rejects_oversell() {
        let s = test_store();
        let a = s.product_create(&form("Sculpture", 5800.0, "art", 1), 5.0).unwrap();
        let err = s.order_place(&new_order(vec![(a, 2)])).unwrap_err();
        assert!(matches!(err, PlaceOrderError::InsufficientStock { available: 1, .. }));
        assert_eq!(s.product_find_by_id(a).unwrap().stock_quantity, 1);
        assert_eq!(s.order_count(), 0);
    }

    #[test]
    fn test_order_rejects_unknown_product() {
        let s = test_store();
        let err = s.order_place(&new_order(vec![(9999, 1)])).unwrap_err();
        assert_eq!(err, PlaceOrderError::ProductUnavailable(9999));
        assert_eq!(s.order_place(&new_order(vec![])).unwrap_err(), PlaceOrderError::Empty);
    }

    #[test]
    fn test_order_item_survives_product_delete() {
        let s = test_store();
        let a = s.product_create(&form("Lamp", 80.0, "art", 3), 5.0).unwrap();
        let order = s.order_place(&new_order(vec![(a, 1)])).unwrap();
        s.product_delete(a).unwrap();
        let reloaded = s.order_find_by_id(&order.id).unwrap();
        assert_eq!(reloaded.items[0].product_id, None);
        assert_eq!(reloaded.items[0].product_name, "Lamp");
    }

    #[test]
    fn test_order_status_and_lookup() {
        let s = test_store();
        let a = s.product_create(&form("Lamp", 80.0, "art", 3), 5.0).unwrap();
        let order = s.order_place(&new_order(vec![(a, 1)])).unwrap();
        s.order_update_status(&order.id, OrderStatus::Shipped).unwrap();
        assert_eq!(s.order_count_by_status(OrderStatus::Shipped), 1);
        assert_eq!(s.order_list(Some(OrderStatus::Paid), 10, 0).len(), 0);
        assert!(s.order_update_status("AK-NOPE0", OrderStatus::Paid).is_err());

        assert_eq!(s.order_list_by_contact("LAYLA@example.com", "+971500000000").len(), 1);
        assert!(s.order_list_by_contact("layla@example.com", "+10000000").is_empty());
    }

    // ── Sessions ────────────────────────────────────────────────────

    #[test]
    fn test_session_lifecycle() {
        let s = test_store();
        s.session_create("tok123", "2099-12-31 23:59:59", None, None).unwrap();
        assert!(s.session_validate("tok123"));
        s.session_delete("tok123").unwrap();
        assert!(!s.session_validate("tok123"));
    }

    #[test]
    fn test_session_cleanup_expired() {
        let s = test_store();
        s.session_create("old", "2000-01-01 00:00:00", None, None).unwrap();
        s.session_create("new", "2099-01-01 00:00:00", None, None).unwrap();
        assert!(!s.session_validate("old"));
        assert_eq!(s.task_cleanup_sessions().unwrap(), 1);
        assert!(s.session_validate("new"));
    }
}
