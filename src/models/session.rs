use rusqlite::params;

use crate::db::DbPool;

/// Admin gate sessions. There is a single admin, so a session carries no user id.
pub struct Session;

impl Session {
    pub fn create(
        pool: &DbPool,
        id: &str,
        expires_at: &str,
        ip_hash: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO sessions (id, created_at, expires_at, ip_hash, user_agent)
             VALUES (?1, datetime('now'), ?2, ?3, ?4)",
            params![id, expires_at, ip_hash, user_agent],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn is_valid(pool: &DbPool, id: &str) -> bool {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return false,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE id = ?1 AND expires_at > datetime('now')",
            params![id],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
        .unwrap_or(false)
    }

    pub fn delete(pool: &DbPool, id: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Drop every session, e.g. after the gate password changes.
    pub fn delete_all(pool: &DbPool) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM sessions", [])
            .map_err(|e| e.to_string())
    }

    pub fn cleanup_expired(pool: &DbPool) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])
            .map_err(|e| e.to_string())
    }
}
