//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::info;

use riposte_core::{CommentStatus, RecentActivity, SystemSettings};

use crate::backup::BackupManager;
use crate::error::{Result, StorageError};
use crate::health::{self, HealthReport};
use crate::models::{ArticleLikeCount, Comment, NewComment, StatusCounts};
use crate::pool::ConnectionPool;
use crate::repository::{CommentsRepo, LikesRepo, SettingsRepo};
use crate::write_queue::WriteQueue;

/// Sliding window for the per-IP submission rate, in minutes.
const RATE_WINDOW_MIN: i64 = 5;

/// Sliding window for duplicate-content and same-email checks, in minutes.
const BURST_WINDOW_MIN: i64 = 3;

/// High-level database interface.
///
/// Reads run directly on the caller; every mutation goes through the
/// [`WriteQueue`] so writes apply in submission order.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
    queue: WriteQueue,
    db_path: Option<PathBuf>,
    backups: Option<BackupManager>,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path. Snapshots go to a
    /// `backups/` directory next to the database file.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;
        let queue = WriteQueue::new(pool.clone())?;

        let backup_dir = path
            .parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"));

        Ok(Self {
            pool,
            queue,
            db_path: Some(path),
            backups: Some(BackupManager::new(backup_dir)),
        })
    }

    /// Create an in-memory database (for testing). No snapshot support.
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        let queue = WriteQueue::new(pool.clone())?;

        Ok(Self {
            pool,
            queue,
            db_path: None,
            backups: None,
        })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "riposte", "riposte")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("riposte.db"))
    }

    // === Comments: reads ===

    /// Approved comments for an article, oldest first.
    pub fn approved_comments(&self, article_id: &str) -> Result<Vec<Comment>> {
        let conn = self.pool.get()?;
        CommentsRepo::approved_by_article(&conn, article_id)
    }

    /// Get a comment by internal ID.
    pub fn comment(&self, id: i64) -> Result<Option<Comment>> {
        let conn = self.pool.get()?;
        CommentsRepo::get_by_id(&conn, id)
    }

    /// Look a comment up by internal or public ID.
    pub fn resolve_comment(&self, ident: &str) -> Result<Option<Comment>> {
        let conn = self.pool.get()?;
        CommentsRepo::resolve(&conn, ident)
    }

    /// Page through comments for moderation, newest first.
    pub fn list_comments(
        &self,
        status: Option<CommentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let conn = self.pool.get()?;
        CommentsRepo::list_paged(&conn, status, limit, offset)
    }

    /// Comment totals by status.
    pub fn status_counts(&self) -> Result<StatusCounts> {
        let conn = self.pool.get()?;

        Ok(StatusCounts {
            total: CommentsRepo::count(&conn)?,
            pending: CommentsRepo::count_by_status(&conn, CommentStatus::Pending)?,
            approved: CommentsRepo::count_by_status(&conn, CommentStatus::Approved)?,
            spam: CommentsRepo::count_by_status(&conn, CommentStatus::Spam)?,
        })
    }

    /// Recent submission counts feeding the spam heuristics.
    ///
    /// IP-keyed counts are zero when the transport had no client address;
    /// the email count is zero for anonymous submissions.
    pub fn recent_activity(
        &self,
        ip: Option<&str>,
        email: &str,
        content: &str,
    ) -> Result<RecentActivity> {
        let conn = self.pool.get()?;

        let (from_ip, duplicates) = match ip {
            Some(ip) => (
                CommentsRepo::count_recent_by_ip(&conn, ip, RATE_WINDOW_MIN)?,
                CommentsRepo::count_recent_duplicates(&conn, ip, content, BURST_WINDOW_MIN)?,
            ),
            None => (0, 0),
        };

        let from_email = if email.is_empty() {
            0
        } else {
            CommentsRepo::count_recent_by_email(&conn, email, BURST_WINDOW_MIN)?
        };

        Ok(RecentActivity {
            from_ip,
            duplicates,
            from_email,
        })
    }

    // === Comments: writes ===

    /// Insert a comment and return the stored row.
    pub async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        self.queue
            .run(move |conn| {
                let id = CommentsRepo::insert(conn, comment)?;
                CommentsRepo::get_by_id(conn, id)?
                    .ok_or_else(|| StorageError::NotFound(format!("comment {}", id)))
            })
            .await
    }

    /// Change a comment's status. Returns whether a row changed.
    pub async fn set_status(&self, id: i64, status: CommentStatus) -> Result<bool> {
        self.queue
            .run(move |conn| CommentsRepo::update_status(conn, id, status))
            .await
    }

    /// Replace a comment's content. Returns whether a row changed.
    pub async fn update_content(&self, id: i64, content: String) -> Result<bool> {
        self.queue
            .run(move |conn| CommentsRepo::update_content(conn, id, &content))
            .await
    }

    /// Delete a comment and, via cascade, its replies.
    pub async fn delete_comment(&self, id: i64) -> Result<bool> {
        self.queue
            .run(move |conn| CommentsRepo::delete(conn, id))
            .await
    }

    // === Likes ===

    /// Record a like. Returns false for repeat likes.
    pub async fn insert_like(
        &self,
        article_id: String,
        ip: String,
        fingerprint: String,
    ) -> Result<bool> {
        self.queue
            .run(move |conn| LikesRepo::insert(conn, &article_id, &ip, &fingerprint))
            .await
    }

    /// Like count for an article.
    pub fn like_count(&self, article_id: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        LikesRepo::count_by_article(&conn, article_id)
    }

    /// Most-liked articles.
    pub fn top_liked(&self, limit: i64) -> Result<Vec<ArticleLikeCount>> {
        let conn = self.pool.get()?;
        LikesRepo::top_articles(&conn, limit)
    }

    // === Settings ===

    /// Resolve the current settings from stored overrides.
    pub fn settings(&self) -> Result<SystemSettings> {
        let conn = self.pool.get()?;
        let rows = SettingsRepo::get_all(&conn)?;
        Ok(SystemSettings::from_rows(
            rows.into_iter().map(|s| (s.key, s.value)),
        ))
    }

    /// Store settings overrides atomically, then return the resolved result.
    pub async fn put_settings(&self, entries: Vec<(String, String)>) -> Result<SystemSettings> {
        self.queue
            .transaction(move |tx| {
                for (key, value) in &entries {
                    SettingsRepo::upsert(tx, key, value)?;
                }
                Ok(())
            })
            .await?;

        self.settings()
    }

    // === Maintenance ===

    /// Database health, including the write queue depth.
    pub fn health(&self) -> Result<HealthReport> {
        let conn = self.pool.get()?;
        health::check(&conn, self.db_path.as_deref(), self.queue.len())
    }

    /// Write a compressed snapshot. Runs on the writer thread so it never
    /// interleaves with a mutation.
    pub async fn snapshot(&self) -> Result<PathBuf> {
        let manager = self.backup_manager()?;
        self.queue.run(move |conn| manager.snapshot(conn)).await
    }

    /// Restore the newest snapshot over the live database.
    pub async fn restore_latest(&self) -> Result<Option<PathBuf>> {
        let manager = self.backup_manager()?;
        self.queue
            .run(move |conn| manager.restore_latest(conn))
            .await
    }

    /// Fold the write-ahead log back into the main file. Called on shutdown.
    pub async fn checkpoint(&self) -> Result<()> {
        self.queue
            .run(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_row| Ok(()))?;
                Ok(())
            })
            .await
    }

    fn backup_manager(&self) -> Result<BackupManager> {
        self.backups
            .clone()
            .ok_or_else(|| StorageError::Config("Snapshots need a file-backed database".into()))
    }
}
