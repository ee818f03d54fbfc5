//! Data models for the storage layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use riposte_core::{CommentNode, CommentStatus};

/// A stored comment row.
///
/// Serialization keeps the private columns (email, ip, user agent) because
/// this shape backs the admin listing. Public responses go through
/// [`CommentNode`] instead, which drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub public_id: String,
    pub article_id: String,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub author_name: String,
    pub author_email: String,
    pub author_url: Option<String>,
    pub content: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub status: CommentStatus,
    pub is_admin: bool,
    pub admin_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when inserting a comment.
#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub article_id: String,
    pub parent_id: Option<i64>,
    pub reply_to_id: Option<i64>,
    pub author_name: String,
    pub author_email: String,
    pub author_url: Option<String>,
    pub content: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub status: CommentStatus,
    pub is_admin: bool,
    pub admin_id: Option<String>,
}

/// A key-value settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Like count for a single article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleLikeCount {
    pub article_id: String,
    pub likes: i64,
}

/// Comment totals broken down by status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub spam: i64,
}

impl From<Comment> for CommentNode {
    fn from(c: Comment) -> Self {
        CommentNode {
            id: c.id,
            public_id: c.public_id,
            parent_id: c.parent_id,
            reply_to_id: c.reply_to_id,
            reply_to_name: None,
            author_name: c.author_name,
            author_email: c.author_email,
            author_url: c.author_url,
            content: c.content,
            is_admin: c.is_admin,
            admin_id: c.admin_id,
            avatar_url: None,
            created_at: c.created_at,
            children: Vec::new(),
        }
    }
}
