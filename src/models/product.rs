use std::collections::HashMap;

use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::money;

/// Upper bound for a product's stock count.
pub const MAX_STOCK: i64 = 1_000_000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
    pub description: String,
    pub origin_story: Option<String>,
    pub rating: f64,
    pub reviews_count: i64,
    pub is_active: bool,
    pub stock_quantity: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Validated product fields, ready to persist.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub price: f64,
    pub image: String,
    pub category: String,
    pub description: String,
    pub origin_story: Option<String>,
    pub stock_quantity: i64,
    pub is_active: bool,
}

/// Raw admin input. Price is free text (`"1,200 $"`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub origin_story: Option<String>,
    #[serde(default)]
    pub stock_quantity: i64,
    pub is_active: Option<bool>,
}

impl ProductInput {
    pub fn validate(&self, known_categories: &[String]) -> Result<ProductForm, HashMap<String, String>> {
        let mut errors = HashMap::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.insert("name".to_string(), "Product name is required".to_string());
        }
        let price = money::parse_price(&self.price);
        if price.is_none() {
            errors.insert("price".to_string(), "A valid price is required".to_string());
        }
        if self.image.trim().is_empty() {
            errors.insert("image".to_string(), "A product image is required".to_string());
        }
        if !known_categories.iter().any(|c| c == &self.category) {
            errors.insert("category".to_string(), "Unknown category".to_string());
        }
        if self.stock_quantity < 0 {
            errors.insert("stock_quantity".to_string(), "Stock cannot be negative".to_string());
        } else if self.stock_quantity > MAX_STOCK {
            errors.insert("stock_quantity".to_string(), format!("Stock cannot exceed {}", MAX_STOCK));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ProductForm {
            name: name.to_string(),
            price: price.unwrap_or_default(),
            image: self.image.trim().to_string(),
            category: self.category.clone(),
            description: self.description.trim().to_string(),
            origin_story: self
                .origin_story
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            stock_quantity: self.stock_quantity,
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub user_name: String,
    pub rating: i64,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewForm {
    pub user_name: String,
    pub rating: i64,
    pub comment: String,
}

impl ReviewForm {
    pub fn validate(&self) -> Result<(), HashMap<String, String>> {
        let mut errors = HashMap::new();
        if self.user_name.trim().is_empty() {
            errors.insert("user_name".to_string(), "Your name is required".to_string());
        }
        if !(1..=5).contains(&self.rating) {
            errors.insert("rating".to_string(), "Rating must be between 1 and 5".to_string());
        }
        if self.comment.trim().is_empty() {
            errors.insert("comment".to_string(), "Please write a comment".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ── Storefront filtering ──────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryFilter {
    All,
    Named(String),
}

#[derive(Debug, Clone)]
pub struct ProductFilter {
    pub search: String,
    pub category: CategoryFilter,
}

impl ProductFilter {
    pub fn from_query(search: Option<&str>, category: Option<&str>) -> Self {
        let category = match category.map(str::trim) {
            None | Some("") | Some("all") => CategoryFilter::All,
            Some(name) => CategoryFilter::Named(name.to_string()),
        };
        ProductFilter {
            search: search.unwrap_or("").trim().to_lowercase(),
            category,
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if !product.is_active {
            return false;
        }
        if let CategoryFilter::Named(ref name) = self.category {
            if &product.category != name {
                return false;
            }
        }
        self.search.is_empty()
            || product.name.to_lowercase().contains(&self.search)
            || product.description.to_lowercase().contains(&self.search)
    }

    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

// ── Inventory ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Out,
    Low,
    InStock,
}

impl StockLevel {
    pub fn classify(stock: i64, low_threshold: i64) -> Self {
        if stock <= 0 {
            StockLevel::Out
        } else if stock < low_threshold {
            StockLevel::Low
        } else {
            StockLevel::InStock
        }
    }
}

// ── Persistence ───────────────────────────────────────

impl Product {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get("id")?,
            slug: row.get("slug")?,
            name: row.get("name")?,
            price: row.get("price")?,
            image: row.get("image")?,
            category: row.get("category")?,
            description: row.get("description")?,
            origin_story: row.get("origin_story")?,
            rating: row.get("rating")?,
            reviews_count: row.get("reviews_count")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            stock_quantity: row.get("stock_quantity")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM products WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn find_by_slug(pool: &DbPool, slug: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM products WHERE slug = ?1",
            params![slug],
            Self::from_row,
        )
        .ok()
    }

    /// Newest first: freshly added pieces lead the catalog.
    pub fn list(pool: &DbPool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare("SELECT * FROM products ORDER BY created_at DESC, id DESC") {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap_or(0)
    }

    fn unique_slug(conn: &rusqlite::Connection, name: &str, exclude_id: Option<i64>) -> Result<String, String> {
        let mut base = slug::slugify(name);
        if base.is_empty() {
            base = format!("piece-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
        }
        let mut candidate = base.clone();
        let mut n = 2;
        loop {
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT id FROM products WHERE slug = ?1",
                    params![candidate],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| e.to_string())?;
            match taken {
                Some(id) if Some(id) != exclude_id => {
                    candidate = format!("{}-{}", base, n);
                    n += 1;
                }
                _ => return Ok(candidate),
            }
        }
    }

    pub fn create(pool: &DbPool, form: &ProductForm, rating: f64) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let slug = Self::unique_slug(&conn, &form.name, None)?;
        conn.execute(
            "INSERT INTO products (slug, name, price, image, category, description, origin_story, rating, is_active, stock_quantity,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, strftime('%Y-%m-%d %H:%M:%f', 'now'), strftime('%Y-%m-%d %H:%M:%f', 'now'))",
            params![
                slug,
                form.name,
                money::round_cents(form.price),
                form.image,
                form.category,
                form.description,
                form.origin_story,
                rating,
                form.is_active as i32,
                form.stock_quantity.max(0)
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Rating and review count are owned by the review flow and stay untouched.
    pub fn update(pool: &DbPool, id: i64, form: &ProductForm) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let slug = Self::unique_slug(&conn, &form.name, Some(id))?;
        let changed = conn
            .execute(
                "UPDATE products SET slug = ?1, name = ?2, price = ?3, image = ?4, category = ?5, description = ?6,
                        origin_story = ?7, is_active = ?8, stock_quantity = ?9,
                        updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?10",
                params![
                    slug,
                    form.name,
                    money::round_cents(form.price),
                    form.image,
                    form.category,
                    form.description,
                    form.origin_story,
                    form.is_active as i32,
                    form.stock_quantity.max(0),
                    id
                ],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err("Product not found".to_string());
        }
        Ok(())
    }

    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM products WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn set_active(pool: &DbPool, id: i64, active: bool) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE products SET is_active = ?1, updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?2",
            params![active as i32, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Apply a stock delta, clamped to `0..=MAX_STOCK`. Returns the new stock.
    pub fn adjust_stock(pool: &DbPool, id: i64, delta: i64) -> Result<i64, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| e.to_string())?;
        let current: Option<i64> = tx
            .query_row(
                "SELECT stock_quantity FROM products WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        let current = current.ok_or_else(|| "Product not found".to_string())?;

        let stock = current.saturating_add(delta).clamp(0, MAX_STOCK);
        tx.execute(
            "UPDATE products SET stock_quantity = ?1,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
             WHERE id = ?2",
            params![stock, id],
        )
        .map_err(|e| e.to_string())?;
        tx.commit().map_err(|e| e.to_string())?;
        Ok(stock)
    }
}

impl Review {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Review {
            id: row.get("id")?,
            product_id: row.get("product_id")?,
            user_name: row.get("user_name")?,
            rating: row.get("rating")?,
            comment: row.get("comment")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn for_product(pool: &DbPool, product_id: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn
            .prepare("SELECT * FROM reviews WHERE product_id = ?1 ORDER BY created_at DESC, id DESC")
        {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![product_id], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    /// Insert a review and refresh the product's rating and review count.
    pub fn create(pool: &DbPool, product_id: i64, form: &ReviewForm) -> Result<i64, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| e.to_string())?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM products WHERE id = ?1",
                params![product_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| e.to_string())?;
        if exists.is_none() {
            return Err("Product not found".to_string());
        }

        tx.execute(
            "INSERT INTO reviews (product_id, user_name, rating, comment) VALUES (?1, ?2, ?3, ?4)",
            params![product_id, form.user_name.trim(), form.rating, form.comment.trim()],
        )
        .map_err(|e| e.to_string())?;
        let review_id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE products SET
                rating = (SELECT ROUND(AVG(rating), 1) FROM reviews WHERE product_id = ?1),
                reviews_count = (SELECT COUNT(*) FROM reviews WHERE product_id = ?1)
             WHERE id = ?1",
            params![product_id],
        )
        .map_err(|e| e.to_string())?;

        tx.commit().map_err(|e| e.to_string())?;
        Ok(review_id)
    }
}
