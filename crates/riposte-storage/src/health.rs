//! Database health reporting.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Serialize;

use riposte_core::CommentStatus;

use crate::error::Result;
use crate::repository::CommentsRepo;

/// Pending comments above this count flag a moderation backlog.
pub const PENDING_WARN: i64 = 100;

/// Spam rows above this count suggest the table needs purging.
pub const SPAM_WARN: i64 = 500;

/// Snapshot of database health for the admin endpoint and the periodic
/// checker.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// False when the integrity check failed.
    pub ok: bool,
    /// Raw result of `PRAGMA integrity_check`.
    pub integrity: String,
    pub db_size_bytes: u64,
    pub wal_size_bytes: u64,
    pub total_comments: i64,
    pub pending_comments: i64,
    pub spam_comments: i64,
    pub queue_depth: usize,
    pub warnings: Vec<String>,
}

/// Run the health checks against a live connection.
pub fn check(
    conn: &Connection,
    db_path: Option<&Path>,
    queue_depth: usize,
) -> Result<HealthReport> {
    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let ok = integrity == "ok";

    let (db_size_bytes, wal_size_bytes) = match db_path {
        Some(path) => (file_size(path), file_size(&wal_path(path))),
        None => (0, 0),
    };

    let total_comments = CommentsRepo::count(conn)?;
    let pending_comments = CommentsRepo::count_by_status(conn, CommentStatus::Pending)?;
    let spam_comments = CommentsRepo::count_by_status(conn, CommentStatus::Spam)?;

    let mut warnings = Vec::new();
    if !ok {
        warnings.push(format!("integrity check failed: {}", integrity));
    }
    if pending_comments > PENDING_WARN {
        warnings.push(format!(
            "moderation backlog: {} comments awaiting review",
            pending_comments
        ));
    }
    if spam_comments > SPAM_WARN {
        warnings.push(format!("{} spam rows on disk, consider purging", spam_comments));
    }

    Ok(HealthReport {
        ok,
        integrity,
        db_size_bytes,
        wal_size_bytes,
        total_comments,
        pending_comments,
        spam_comments,
        queue_depth,
        warnings,
    })
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// SQLite keeps the write-ahead log next to the database file.
fn wal_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.as_os_str().to_os_string();
    name.push("-wal");
    PathBuf::from(name)
}
