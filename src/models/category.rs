use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    /// Products carrying this category label, active or not.
    pub product_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

const SELECT_WITH_COUNT: &str = "SELECT c.id, c.name, c.is_active,
        (SELECT COUNT(*) FROM products p WHERE p.category = c.name) AS product_count
     FROM categories c";

impl Category {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Category {
            id: row.get("id")?,
            name: row.get("name")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            product_count: row.get("product_count")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("{} WHERE c.id = ?1", SELECT_WITH_COUNT),
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn find_by_name(pool: &DbPool, name: &str) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("{} WHERE c.name = ?1", SELECT_WITH_COUNT),
            params![name],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool, active_only: bool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let sql = if active_only {
            format!("{} WHERE c.is_active = 1 ORDER BY c.id", SELECT_WITH_COUNT)
        } else {
            format!("{} ORDER BY c.id", SELECT_WITH_COUNT)
        };
        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn names(pool: &DbPool) -> Vec<String> {
        Self::list(pool, false).into_iter().map(|c| c.name).collect()
    }

    pub fn count_active(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE is_active = 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    pub fn create(pool: &DbPool, form: &CategoryForm) -> Result<i64, String> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err("Category name is required".to_string());
        }
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO categories (name, is_active) VALUES (?1, 1)",
            params![name],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                format!("Category '{}' already exists", name)
            }
            other => other.to_string(),
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Products keep their category label after the category goes away.
    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM categories WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Flip the active flag. Returns the new state.
    pub fn toggle_active(pool: &DbPool, id: i64) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "UPDATE categories SET is_active = CASE is_active WHEN 0 THEN 1 ELSE 0 END WHERE id = ?1",
                params![id],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err("Category not found".to_string());
        }
        conn.query_row(
            "SELECT is_active FROM categories WHERE id = ?1",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .map(|v| v != 0)
        .map_err(|e| e.to_string())
    }
}
