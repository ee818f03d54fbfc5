//! Comments repository.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use riposte_core::CommentStatus;

use crate::error::Result;
use crate::ids::new_public_id;
use crate::models::{Comment, NewComment};

const COMMENT_COLUMNS: &str = "id, public_id, article_id, parent_id, reply_to_id, author_name, \
     author_email, author_url, content, ip, user_agent, status, is_admin, admin_id, \
     created_at, updated_at";

/// Repository for comment operations.
pub struct CommentsRepo;

impl CommentsRepo {
    /// Insert a new comment. Generates the public id.
    pub fn insert(conn: &Connection, comment: NewComment) -> Result<i64> {
        conn.execute(
            "INSERT INTO comments (public_id, article_id, parent_id, reply_to_id, author_name,
                 author_email, author_url, content, ip, user_agent, status, is_admin, admin_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                new_public_id(),
                comment.article_id,
                comment.parent_id,
                comment.reply_to_id,
                comment.author_name,
                comment.author_email,
                comment.author_url,
                comment.content,
                comment.ip,
                comment.user_agent,
                comment.status.as_str(),
                comment.is_admin,
                comment.admin_id,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Get a comment by internal ID.
    pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<Comment>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"
        ))?;

        let comment = stmt.query_row([id], row_to_comment).ok();
        Ok(comment)
    }

    /// Get a comment by its public ID.
    pub fn get_by_public_id(conn: &Connection, public_id: &str) -> Result<Option<Comment>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE public_id = ?1"
        ))?;

        let comment = stmt.query_row([public_id], row_to_comment).ok();
        Ok(comment)
    }

    /// Resolve an identifier that may be an internal ID or a public ID.
    ///
    /// All-digit identifiers are treated as internal IDs; anything else is
    /// looked up by public ID. Public ids are base64url so the two cannot
    /// collide in practice.
    pub fn resolve(conn: &Connection, ident: &str) -> Result<Option<Comment>> {
        if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = ident.parse::<i64>() {
                return Self::get_by_id(conn, id);
            }
        }
        Self::get_by_public_id(conn, ident)
    }

    /// Get all approved comments for an article, oldest first.
    pub fn approved_by_article(conn: &Connection, article_id: &str) -> Result<Vec<Comment>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE article_id = ?1 AND status = 'approved'
             ORDER BY created_at ASC, id ASC"
        ))?;

        let comments = stmt
            .query_map([article_id], row_to_comment)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(comments)
    }

    /// List comments for moderation, newest first, optionally filtered by status.
    pub fn list_paged(
        conn: &Connection,
        status: Option<CommentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let comments = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments
                     WHERE status = ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ))?;
                let comments = stmt
                    .query_map(params![status.as_str(), limit, offset], row_to_comment)?
                    .filter_map(|r| r.ok())
                    .collect();
                comments
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments
                     ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2"
                ))?;
                let comments = stmt
                    .query_map([limit, offset], row_to_comment)?
                    .filter_map(|r| r.ok())
                    .collect();
                comments
            }
        };

        Ok(comments)
    }

    /// Update a comment's status. Returns whether a row changed.
    pub fn update_status(conn: &Connection, id: i64, status: CommentStatus) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE comments SET status = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(changed > 0)
    }

    /// Update a comment's content. Returns whether a row changed.
    pub fn update_content(conn: &Connection, id: i64, content: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE comments SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![content, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a comment. Replies cascade via the parent_id foreign key.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Count total comments.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count comments by status.
    pub fn count_by_status(conn: &Connection, status: CommentStatus) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count comments from an IP within the last `minutes` minutes.
    pub fn count_recent_by_ip(conn: &Connection, ip: &str, minutes: i64) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments
             WHERE ip = ?1 AND created_at >= datetime('now', '-' || ?2 || ' minutes')",
            params![ip, minutes],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count identical-content comments from an IP within the window.
    pub fn count_recent_duplicates(
        conn: &Connection,
        ip: &str,
        content: &str,
        minutes: i64,
    ) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments
             WHERE ip = ?1 AND content = ?2
               AND created_at >= datetime('now', '-' || ?3 || ' minutes')",
            params![ip, content, minutes],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count comments from an email address within the window.
    pub fn count_recent_by_email(conn: &Connection, email: &str, minutes: i64) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments
             WHERE author_email = ?1 AND created_at >= datetime('now', '-' || ?2 || ' minutes')",
            params![email, minutes],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        public_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        article_id: row.get(2)?,
        parent_id: row.get(3)?,
        reply_to_id: row.get(4)?,
        author_name: row.get(5)?,
        author_email: row.get(6)?,
        author_url: row.get(7)?,
        content: row.get(8)?,
        ip: row.get(9)?,
        user_agent: row.get(10)?,
        status: row
            .get::<_, String>(11)
            .ok()
            .and_then(|s| CommentStatus::parse(&s))
            .unwrap_or(CommentStatus::Pending),
        is_admin: row.get(12)?,
        admin_id: row.get(13)?,
        created_at: parse_datetime(&row.get::<_, String>(14)?),
        updated_at: parse_datetime(&row.get::<_, String>(15)?),
    })
}

/// Parse a datetime from SQLite format.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| Utc::now())
}
