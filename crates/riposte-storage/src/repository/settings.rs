//! Settings repository.
//!
//! Stores sparse key-value overrides; defaults live in
//! [`riposte_core::SystemSettings`].

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::Setting;

/// Repository for settings operations.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Get a setting value by key.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM comment_settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .ok();
        Ok(value)
    }

    /// Get all stored settings.
    pub fn get_all(conn: &Connection) -> Result<Vec<Setting>> {
        let mut stmt = conn.prepare("SELECT key, value FROM comment_settings ORDER BY key")?;

        let settings = stmt
            .query_map([], |row| {
                Ok(Setting {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(settings)
    }

    /// Insert or update a setting.
    pub fn upsert(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO comment_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}
