//! API request and response models.

use serde::{Deserialize, Serialize};
use validator::Validate;

use riposte_core::{CommentNode, CommentStatus};
use riposte_storage::{ArticleLikeCount, Comment};

// ===== Public API =====

/// Request body for POST /articles/{article_id}/comments.
#[derive(Debug, Deserialize, Validate)]
pub struct NewCommentRequest {
    /// Display name shown on the comment.
    #[validate(length(min = 1, max = 80, message = "author name must be 1 to 80 characters"))]
    pub author_name: String,
    /// Contact email. Whether it is required depends on the settings.
    #[serde(default)]
    pub author_email: Option<String>,
    /// Website link shown with the author name.
    #[serde(default)]
    #[validate(url(message = "author url must be a valid URL"))]
    pub author_url: Option<String>,
    /// Comment body. Length limits come from the runtime settings.
    pub content: String,
    /// Existing comment this one nests under.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Comment this one answers, for the mention label.
    #[serde(default)]
    pub reply_to_id: Option<i64>,
    /// CAPTCHA response token from the widget.
    #[serde(default)]
    pub captcha_token: Option<String>,
}

impl NewCommentRequest {
    /// Trims text fields and drops optional ones that came in blank.
    pub fn normalize(&mut self) {
        self.author_name = self.author_name.trim().to_string();
        for field in [
            &mut self.author_email,
            &mut self.author_url,
            &mut self.captcha_token,
        ] {
            let normalized = field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            *field = normalized;
        }
    }
}

/// Response body for POST /articles/{article_id}/comments.
#[derive(Debug, Serialize)]
pub struct CommentCreatedResponse {
    /// Row id of the stored comment.
    pub id: i64,
    /// Initial moderation status.
    pub status: CommentStatus,
}

/// Response body for GET /articles/{article_id}/comments.
#[derive(Debug, Serialize)]
pub struct CommentTreeResponse {
    pub data: Vec<CommentNode>,
}

/// Request body for POST /articles/{article_id}/likes.
#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    /// Stable browser fingerprint. Pairs with the address to dedupe likes.
    #[validate(length(min = 6, max = 200, message = "fingerprint must be 6 to 200 characters"))]
    pub fingerprint: String,
}

/// Response body for POST /articles/{article_id}/likes.
#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub article_id: String,
    pub likes: i64,
}

/// Query parameters for the emailed action links.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}

// ===== Admin API =====

/// Query parameters for GET /admin/comments.
#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    /// Filter by status (optional).
    pub status: Option<String>,
    /// Maximum number of comments to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response body for GET /admin/comments.
#[derive(Debug, Serialize)]
pub struct ModerationListResponse {
    pub data: Vec<Comment>,
    /// Comments matching the filter, ignoring pagination.
    pub total: i64,
}

/// Request body for PUT /admin/comments/{id}.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    /// New status (optional).
    pub status: Option<String>,
    /// Replacement body (optional).
    #[validate(length(min = 1, max = 5000, message = "content must be 1 to 5000 characters"))]
    pub content: Option<String>,
}

/// Request body for POST /admin/comments/{id}/reply.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminReplyRequest {
    /// Reply body.
    #[validate(length(min = 1, max = 5000, message = "content must be 1 to 5000 characters"))]
    pub content: String,
    /// Directory id to attribute the reply to (default: the caller).
    #[serde(default)]
    pub admin_id: Option<String>,
}

/// Response body for mutating admin endpoints.
#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Response body for GET /admin/stats.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_comments: i64,
    pub pending_comments: i64,
    pub approved_comments: i64,
    pub spam_comments: i64,
    pub top_liked: Vec<ArticleLikeCount>,
}

/// Response body for POST /admin/backup.
#[derive(Debug, Serialize)]
pub struct BackupResponse {
    /// Path of the written snapshot.
    pub path: String,
}

/// Response body for POST /admin/restore.
#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    /// Path of the snapshot that was applied.
    pub path: String,
}
