use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rand::Rng;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::money;

/// Flat lifecycle label. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Returned,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human label used on the invoice and in the admin table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid / New",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Returned => "Returned",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Cancelled and returned orders carry no revenue.
    pub fn counts_as_revenue(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Returned)
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "returned" => Ok(Self::Returned),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown order status '{}'", other)),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: String,
    /// None once the product has been removed from the catalog.
    pub product_id: Option<i64>,
    pub product_name: String,
    pub category: String,
    pub price: f64,
    pub quantity: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> f64 {
        money::round_cents(self.price * self.quantity as f64)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub customer_whatsapp: String,
    pub customer_email: String,
    pub total: f64,
    pub status: OrderStatus,
    pub gateway: String,
    pub payment_id: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_company: Option<String>,
    pub created_at: NaiveDateTime,
    pub items: Vec<OrderItem>,
}

/// Everything needed to place an order; prices come from the catalog.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_whatsapp: String,
    pub customer_email: String,
    pub gateway: String,
    pub payment_id: Option<String>,
    pub shipping_company: String,
    /// (product_id, quantity)
    pub lines: Vec<(i64, i64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceOrderError {
    Empty,
    ProductUnavailable(i64),
    InsufficientStock {
        product_id: i64,
        name: String,
        available: i64,
    },
    Db(String),
}

impl fmt::Display for PlaceOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "The order has no items"),
            Self::ProductUnavailable(id) => write!(f, "Product {} is not available", id),
            Self::InsufficientStock { name, available, .. } => {
                write!(f, "Only {} left of '{}'", available, name)
            }
            Self::Db(e) => write!(f, "{}", e),
        }
    }
}

impl From<rusqlite::Error> for PlaceOrderError {
    fn from(e: rusqlite::Error) -> Self {
        PlaceOrderError::Db(e.to_string())
    }
}

const ORDER_ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `AK-` followed by five uppercase base-36 characters.
pub fn generate_order_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| ORDER_ID_ALPHABET[rng.gen_range(0..ORDER_ID_ALPHABET.len())] as char)
        .collect();
    format!("AK-{}", suffix)
}

/// `TRK-` followed by six digits.
pub fn generate_tracking_number() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("TRK-{}", n)
}

impl Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status_str: String = row.get("status")?;
        let status = status_str.parse().unwrap_or_else(|_| {
            log::warn!("Order row has unknown status '{}', reading it as pending", status_str);
            OrderStatus::Pending
        });
        Ok(Order {
            id: row.get("id")?,
            customer_name: row.get("customer_name")?,
            customer_whatsapp: row.get("customer_whatsapp")?,
            customer_email: row.get("customer_email")?,
            total: row.get("total")?,
            status,
            gateway: row.get("gateway")?,
            payment_id: row.get("payment_id")?,
            tracking_number: row.get("tracking_number")?,
            shipping_company: row.get("shipping_company")?,
            created_at: row.get("created_at")?,
            items: Vec::new(),
        })
    }

    fn item_from_row(row: &Row) -> rusqlite::Result<OrderItem> {
        Ok(OrderItem {
            id: row.get("id")?,
            order_id: row.get("order_id")?,
            product_id: row.get("product_id")?,
            product_name: row.get("product_name")?,
            category: row.get("category")?,
            price: row.get("price")?,
            quantity: row.get("quantity")?,
        })
    }

    fn load_items(conn: &rusqlite::Connection, order_id: &str) -> Vec<OrderItem> {
        let mut stmt = match conn.prepare("SELECT * FROM order_items WHERE order_id = ?1 ORDER BY id") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![order_id], Self::item_from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    fn query_with_items(pool: &DbPool, sql: &str, args: &[&dyn rusqlite::types::ToSql]) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let orders: Vec<Self> = stmt
            .query_map(args, Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default();
        orders
            .into_iter()
            .map(|mut o| {
                o.items = Self::load_items(&conn, &o.id);
                o
            })
            .collect()
    }

    pub fn find_by_id(pool: &DbPool, id: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        let mut order = conn
            .query_row("SELECT * FROM orders WHERE id = ?1", params![id], Self::from_row)
            .ok()?;
        order.items = Self::load_items(&conn, &order.id);
        Some(order)
    }

    pub fn list(pool: &DbPool, status: Option<OrderStatus>, limit: i64, offset: i64) -> Vec<Self> {
        match status {
            Some(s) => Self::query_with_items(
                pool,
                "SELECT * FROM orders WHERE status = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
                &[&s.as_str(), &limit, &offset],
            ),
            None => Self::query_with_items(
                pool,
                "SELECT * FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
                &[&limit, &offset],
            ),
        }
    }

    pub fn list_all(pool: &DbPool) -> Vec<Self> {
        Self::query_with_items(pool, "SELECT * FROM orders ORDER BY created_at DESC, rowid DESC", &[])
    }

    /// A customer's orders; both contact fields must match.
    pub fn list_by_contact(pool: &DbPool, email: &str, whatsapp: &str) -> Vec<Self> {
        Self::query_with_items(
            pool,
            "SELECT * FROM orders WHERE LOWER(customer_email) = LOWER(?1) AND customer_whatsapp = ?2
             ORDER BY created_at DESC, rowid DESC",
            &[&email.trim(), &whatsapp],
        )
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .unwrap_or(0)
    }

    pub fn count_by_status(pool: &DbPool, status: OrderStatus) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    pub fn update_status(pool: &DbPool, id: &str, status: OrderStatus) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "UPDATE orders SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err("Order not found".to_string());
        }
        Ok(())
    }

    /// Place an order in one transaction: order row, item rows, stock decrement.
    /// The order starts out `paid`; payment capture happens upstream.
    pub fn place(pool: &DbPool, new: &NewOrder) -> Result<Order, PlaceOrderError> {
        if new.lines.is_empty() {
            return Err(PlaceOrderError::Empty);
        }

        let mut conn = pool.get().map_err(|e| PlaceOrderError::Db(e.to_string()))?;
        // Take the write lock up front so concurrent checkouts queue on busy_timeout
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        struct Priced {
            product_id: i64,
            name: String,
            category: String,
            price: f64,
            quantity: i64,
        }

        let mut priced = Vec::with_capacity(new.lines.len());
        for &(product_id, quantity) in &new.lines {
            let row: Option<(String, String, f64, i64, i64)> = tx
                .query_row(
                    "SELECT name, category, price, stock_quantity, is_active FROM products WHERE id = ?1",
                    params![product_id],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
                )
                .optional()?;
            let (name, category, price, stock) = match row {
                Some((name, category, price, stock, active)) if active != 0 => (name, category, price, stock),
                _ => return Err(PlaceOrderError::ProductUnavailable(product_id)),
            };
            let quantity = quantity.max(1);
            if quantity > stock {
                return Err(PlaceOrderError::InsufficientStock {
                    product_id,
                    name,
                    available: stock,
                });
            }
            priced.push(Priced {
                product_id,
                name,
                category,
                price,
                quantity,
            });
        }

        let total = money::round_cents(priced.iter().map(|p| p.price * p.quantity as f64).sum());

        let mut order_id = generate_order_id();
        while tx
            .query_row("SELECT 1 FROM orders WHERE id = ?1", params![order_id], |r| r.get::<_, i64>(0))
            .optional()?
            .is_some()
        {
            order_id = generate_order_id();
        }
        let tracking = generate_tracking_number();

        tx.execute(
            "INSERT INTO orders (id, customer_name, customer_whatsapp, customer_email, total, status, gateway,
                                 payment_id, tracking_number, shipping_company, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                     strftime('%Y-%m-%d %H:%M:%f', 'now'), strftime('%Y-%m-%d %H:%M:%f', 'now'))",
            params![
                order_id,
                new.customer_name,
                new.customer_whatsapp,
                new.customer_email,
                total,
                OrderStatus::Paid.as_str(),
                new.gateway,
                new.payment_id,
                tracking,
                new.shipping_company
            ],
        )?;

        for p in &priced {
            tx.execute(
                "INSERT INTO order_items (order_id, product_id, product_name, category, price, quantity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![order_id, p.product_id, p.name, p.category, p.price, p.quantity],
            )?;
            tx.execute(
                "UPDATE products SET stock_quantity = MAX(0, stock_quantity - ?1),
                        updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?2",
                params![p.quantity, p.product_id],
            )?;
        }

        tx.commit()?;
        log::info!("Order {} placed: {} line(s), total {:.2}", order_id, priced.len(), total);

        drop(conn);
        Self::find_by_id(pool, &order_id)
            .ok_or_else(|| PlaceOrderError::Db("Order vanished after commit".to_string()))
    }
}
