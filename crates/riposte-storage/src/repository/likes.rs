//! Article likes repository.

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::ArticleLikeCount;

/// Repository for article like operations.
pub struct LikesRepo;

impl LikesRepo {
    /// Record a like. Returns false when this (ip, fingerprint) pair already
    /// liked the article.
    pub fn insert(conn: &Connection, article_id: &str, ip: &str, fingerprint: &str) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO article_likes (article_id, ip, fingerprint)
             VALUES (?1, ?2, ?3)",
            params![article_id, ip, fingerprint],
        )?;
        Ok(inserted > 0)
    }

    /// Count likes for an article.
    pub fn count_by_article(conn: &Connection, article_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM article_likes WHERE article_id = ?1",
            [article_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most-liked articles, for the admin stats view.
    pub fn top_articles(conn: &Connection, limit: i64) -> Result<Vec<ArticleLikeCount>> {
        let mut stmt = conn.prepare(
            "SELECT article_id, COUNT(*) AS likes FROM article_likes
             GROUP BY article_id ORDER BY likes DESC, article_id ASC LIMIT ?1",
        )?;

        let rows = stmt
            .query_map([limit], |row| {
                Ok(ArticleLikeCount {
                    article_id: row.get(0)?,
                    likes: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows)
    }
}
