//! Database schema and migrations.

use rusqlite::{params, Connection};
use tracing::info;

use crate::error::Result;
use crate::ids::new_public_id;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(
            "Running migrations from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        if current_version < 1 {
            migrate_v1(conn)?;
        }

        if current_version < 2 {
            migrate_v2(conn)?;
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!("Migrations complete");
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    // Create schema_version table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration to version 1: Initial schema.
fn migrate_v1(conn: &Connection) -> Result<()> {
    info!("Applying migration v1: Initial schema");

    // Comments table - one row per submission, whatever its status
    conn.execute(
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_id TEXT NOT NULL,
            parent_id INTEGER,
            author_name TEXT NOT NULL,
            author_email TEXT NOT NULL DEFAULT '',
            author_url TEXT,
            content TEXT NOT NULL,
            ip TEXT,
            user_agent TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (parent_id) REFERENCES comments(id) ON DELETE CASCADE
        )",
        [],
    )?;

    // Index for serving an article's thread
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_comments_article ON comments (article_id, status, created_at)",
        [],
    )?;

    // Article likes - idempotent per (article, ip, fingerprint)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS article_likes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            article_id TEXT NOT NULL,
            ip TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (article_id, ip, fingerprint)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_likes_article ON article_likes (article_id)",
        [],
    )?;

    // Settings table - key-value overrides on top of compiled defaults
    conn.execute(
        "CREATE TABLE IF NOT EXISTS comment_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Migration to version 2: Public ids, @mention replies, admin authorship.
fn migrate_v2(conn: &Connection) -> Result<()> {
    info!("Applying migration v2: Public ids and admin replies");

    conn.execute("ALTER TABLE comments ADD COLUMN public_id TEXT", [])?;
    conn.execute("ALTER TABLE comments ADD COLUMN reply_to_id INTEGER", [])?;
    conn.execute(
        "ALTER TABLE comments ADD COLUMN is_admin INTEGER NOT NULL DEFAULT 0",
        [],
    )?;
    conn.execute("ALTER TABLE comments ADD COLUMN admin_id TEXT", [])?;

    // Backfill public ids for pre-existing rows in one transaction; a crash
    // here re-runs the whole migration next start.
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare("SELECT id FROM comments WHERE public_id IS NULL")?;
        let ids: Vec<i64> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for id in ids {
            tx.execute(
                "UPDATE comments SET public_id = ?1 WHERE id = ?2",
                params![new_public_id(), id],
            )?;
        }
    }
    tx.commit()?;

    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_comments_public_id ON comments (public_id)",
        [],
    )?;

    // Indices backing the recent-activity spam heuristics
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_comments_ip_created ON comments (ip, created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_comments_email_created ON comments (author_email, created_at)",
        [],
    )?;

    Ok(())
}
