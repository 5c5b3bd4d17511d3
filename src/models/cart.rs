use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::DbPool;
use crate::money;

#[derive(Debug, Serialize, Clone)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub slug: String,
    pub image: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
    pub stock_quantity: i64,
    pub line_total: f64,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    /// Sum of quantities (the badge on the bag icon).
    pub item_count: i64,
    pub total: f64,
}

impl CartView {
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let item_count = lines.iter().map(|l| l.quantity).sum();
        let total = money::round_cents(lines.iter().map(|l| l.line_total).sum());
        CartView {
            lines,
            item_count,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Ceiling for a single cart line.
pub const MAX_LINE_QUANTITY: i64 = 999;

pub struct Cart;

impl Cart {
    fn line_from_row(row: &Row) -> rusqlite::Result<CartLine> {
        let price: f64 = row.get("price")?;
        let quantity: i64 = row.get("quantity")?;
        Ok(CartLine {
            product_id: row.get("product_id")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            image: row.get("image")?,
            category: row.get("category")?,
            price,
            quantity,
            stock_quantity: row.get("stock_quantity")?,
            line_total: money::round_cents(price * quantity as f64),
        })
    }

    fn ensure(conn: &rusqlite::Connection, token: &str) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO carts (token) VALUES (?1)
             ON CONFLICT(token) DO UPDATE SET updated_at = CURRENT_TIMESTAMP",
            params![token],
        )?;
        Ok(())
    }

    pub fn view(pool: &DbPool, token: &str) -> CartView {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return CartView::default(),
        };
        let mut stmt = match conn.prepare(
            "SELECT ci.product_id, ci.quantity, p.name, p.slug, p.image, p.category, p.price, p.stock_quantity
             FROM cart_items ci
             JOIN products p ON p.id = ci.product_id
             WHERE ci.cart_token = ?1
             ORDER BY ci.added_at, ci.rowid",
        ) {
            Ok(s) => s,
            Err(_) => return CartView::default(),
        };
        let lines = stmt
            .query_map(params![token], Self::line_from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default();
        CartView::from_lines(lines)
    }

    /// Add one unit. Existing lines are incremented rather than duplicated.
    pub fn add(pool: &DbPool, token: &str, product_id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let active: Option<i64> = conn
            .query_row(
                "SELECT is_active FROM products WHERE id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        match active {
            None => return Err("Product not found".to_string()),
            Some(0) => return Err("Product is not available".to_string()),
            Some(_) => {}
        }
        Self::ensure(&conn, token).map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO cart_items (cart_token, product_id, quantity) VALUES (?1, ?2, 1)
             ON CONFLICT(cart_token, product_id) DO UPDATE SET quantity = MIN(quantity + 1, ?3)",
            params![token, product_id, MAX_LINE_QUANTITY],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Shift a line's quantity by `delta`, clamped to `1..=MAX_LINE_QUANTITY`.
    pub fn update_quantity(pool: &DbPool, token: &str, product_id: i64, delta: i64) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let current: Option<i64> = conn
            .query_row(
                "SELECT quantity FROM cart_items WHERE cart_token = ?1 AND product_id = ?2",
                params![token, product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        let current = current.ok_or_else(|| "Item is not in the cart".to_string())?;

        let quantity = current.saturating_add(delta).clamp(1, MAX_LINE_QUANTITY);
        conn.execute(
            "UPDATE cart_items SET quantity = ?1 WHERE cart_token = ?2 AND product_id = ?3",
            params![quantity, token, product_id],
        )
        .map_err(|e| e.to_string())?;
        Self::ensure(&conn, token).map_err(|e| e.to_string())?;
        Ok(quantity)
    }

    pub fn remove(pool: &DbPool, token: &str, product_id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "DELETE FROM cart_items WHERE cart_token = ?1 AND product_id = ?2",
            params![token, product_id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn clear(pool: &DbPool, token: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM cart_items WHERE cart_token = ?1", params![token])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Drop carts untouched for `max_age_days`. Returns the number removed.
    pub fn cleanup_stale(pool: &DbPool, max_age_days: i64) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "DELETE FROM carts WHERE updated_at < datetime('now', ?1)",
            params![format!("-{} days", max_age_days.max(1))],
        )
        .map_err(|e| e.to_string())
    }
}
