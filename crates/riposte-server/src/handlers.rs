//! API route handlers.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tracing::{debug, info, warn};
use validator::{Validate, ValidateEmail};

use riposte_core::{
    avatar, build_tree, ActionKind, AdminDirectory, CommentNode, CommentStatus, SpamAssessment,
    SpamInput, SystemSettings,
};
use riposte_outbound::{CaptchaOutcome, CommentCheck, Notification};
use riposte_storage::{Comment, HealthReport, NewComment};

use crate::error::{ApiError, Result};
use crate::extract::{client_ip, user_agent, Operator};
use crate::models::{
    AdminReplyRequest, BackupResponse, CommentCreatedResponse, CommentTreeResponse, LikeRequest,
    LikeResponse, ModerationListResponse, ModerationQuery, NewCommentRequest, OkResponse,
    RestoreResponse, StatsResponse, TokenQuery, UpdateCommentRequest,
};
use crate::state::AppState;

/// Cache header on the public comment tree.
const TREE_CACHE_CONTROL: &str = "public, max-age=60, s-maxage=300";

// ===== Public API =====

/// GET /health - Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /articles/{article_id}/comments - Approved comments as a nested tree.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
) -> Result<impl IntoResponse> {
    let rows = state.db.approved_comments(&article_id)?;
    let nodes: Vec<CommentNode> = rows.into_iter().map(CommentNode::from).collect();

    let (mut forest, stats) = build_tree(nodes);
    if stats.dangling > 0 {
        debug!(
            article_id = %article_id,
            dangling = stats.dangling,
            "Comment tree has unresolvable parent references"
        );
    }
    avatar::annotate_forest(&mut forest, avatar::DEFAULT_AVATAR_BASE, &state.admins);

    Ok((
        [(header::CACHE_CONTROL, TREE_CACHE_CONTROL)],
        Json(CommentTreeResponse { data: forest }),
    ))
}

/// POST /articles/{article_id}/comments - Submit a comment.
pub async fn post_comment(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    headers: HeaderMap,
    Json(mut req): Json<NewCommentRequest>,
) -> Result<(StatusCode, Json<CommentCreatedResponse>)> {
    req.normalize();
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let settings = state.db.settings()?;
    let author_email = req.author_email.clone().unwrap_or_default();

    if settings.require_email && author_email.is_empty() {
        return Err(ApiError::Validation(
            "an email address is required".to_string(),
        ));
    }
    if !author_email.is_empty() && !author_email.validate_email() {
        return Err(ApiError::Validation(
            "author email must be a valid address".to_string(),
        ));
    }

    // Length limits apply to the sanitized body, not the raw submission.
    let content = state.sanitizer.clean(&req.content);
    let length = content.chars().count() as i64;
    if length < settings.min_comment_length || length > settings.max_comment_length {
        return Err(ApiError::Validation(format!(
            "comment length must be between {} and {} characters",
            settings.min_comment_length, settings.max_comment_length
        )));
    }

    let ip = client_ip(&headers);
    let agent = user_agent(&headers);

    if state.captcha.is_configured() && req.captcha_token.is_none() {
        return Err(ApiError::CaptchaRequired);
    }
    if let Some(token) = req.captcha_token.as_deref() {
        if state.captcha.verify(token, ip.as_deref()).await == CaptchaOutcome::Failed {
            return Err(ApiError::CaptchaFailed);
        }
    }

    if let Some(parent_id) = req.parent_id {
        let parent = state
            .db
            .comment(parent_id)?
            .ok_or_else(|| ApiError::BadRequest("parent comment not found".to_string()))?;
        if parent.article_id != article_id {
            return Err(ApiError::BadRequest(
                "parent comment belongs to a different article".to_string(),
            ));
        }
    }

    let activity = state
        .db
        .recent_activity(ip.as_deref(), &author_email, &content)?;
    let reputation = state
        .reputation
        .check(&CommentCheck {
            ip: ip.as_deref(),
            user_agent: agent.as_deref(),
            author_name: &req.author_name,
            author_email: &author_email,
            author_url: req.author_url.as_deref(),
            content: &content,
        })
        .await;

    let assessment = state.scorer.assess(
        &SpamInput {
            author_email: &author_email,
            content: &content,
            ip: ip.as_deref(),
        },
        activity,
        reputation,
        settings.spam_threshold,
    );
    let status = assessment.status_for(&settings);

    let stored = state
        .db
        .insert_comment(NewComment {
            article_id: article_id.clone(),
            parent_id: req.parent_id,
            reply_to_id: req.reply_to_id,
            author_name: req.author_name,
            author_email,
            author_url: req.author_url,
            content,
            ip,
            user_agent: agent,
            status,
            is_admin: false,
            admin_id: None,
        })
        .await?;

    info!(
        id = stored.id,
        article_id = %article_id,
        status = %stored.status,
        score = assessment.score,
        "Comment stored"
    );

    notify_submission(&state, &settings, &stored, &assessment);

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            id: stored.id,
            status: stored.status,
        }),
    ))
}

/// POST /articles/{article_id}/likes - Record a like.
pub async fn post_like(
    State(state): State<AppState>,
    Path(article_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let ip = client_ip(&headers)
        .ok_or_else(|| ApiError::BadRequest("could not resolve a client address".to_string()))?;

    let counted = state
        .db
        .insert_like(article_id.clone(), ip, req.fingerprint)
        .await?;
    if !counted {
        debug!(article_id = %article_id, "Repeat like ignored");
    }

    let likes = state.db.like_count(&article_id)?;
    Ok(Json(LikeResponse { article_id, likes }))
}

// ===== Emailed action links =====

/// GET /email/approve - One-click approval from a moderation email.
pub async fn email_approve(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, String) {
    email_action(&state, query.token.as_deref(), ActionKind::Approve).await
}

/// GET /email/delete - One-click deletion from a moderation email.
pub async fn email_delete(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, String) {
    email_action(&state, query.token.as_deref(), ActionKind::Delete).await
}

/// The emailed links open in a browser, so these answer in plain text.
async fn email_action(
    state: &AppState,
    token: Option<&str>,
    action: ActionKind,
) -> (StatusCode, String) {
    let Some(token) = token else {
        return (StatusCode::BAD_REQUEST, "Invalid token".to_string());
    };

    let claims = match state.signer.verify(token, action) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(action = action.as_str(), "Rejected action token: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid token".to_string());
        }
    };

    let comment = match state.db.comment(claims.comment_id) {
        Ok(Some(comment)) => comment,
        Ok(None) => return (StatusCode::NOT_FOUND, "Comment not found".to_string()),
        Err(e) => {
            warn!("Comment lookup for action token failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            );
        }
    };

    let result = match action {
        ActionKind::Approve => approve_comment(state, &comment).await.map(|_| "Approved"),
        ActionKind::Delete => state
            .db
            .delete_comment(comment.id)
            .await
            .map(|_| "Deleted")
            .map_err(ApiError::from),
    };

    match result {
        Ok(message) => {
            info!(id = comment.id, action = action.as_str(), "Email action applied");
            (StatusCode::OK, message.to_string())
        }
        Err(e) => {
            warn!("Email action failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            )
        }
    }
}

// ===== Admin API =====

/// GET /admin/comments - Page through comments for moderation.
pub async fn admin_list_comments(
    _operator: Operator,
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<ModerationListResponse>> {
    let status = parse_status_filter(query.status.as_deref())?;
    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let data = state.db.list_comments(status, limit, offset)?;
    let counts = state.db.status_counts()?;
    let total = match status {
        Some(CommentStatus::Pending) => counts.pending,
        Some(CommentStatus::Approved) => counts.approved,
        Some(CommentStatus::Spam) => counts.spam,
        None => counts.total,
    };

    Ok(Json(ModerationListResponse { data, total }))
}

/// PUT /admin/comments/{id} - Edit a comment or change its status.
pub async fn admin_update_comment(
    operator: Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<OkResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    if req.status.is_none() && req.content.is_none() {
        return Err(ApiError::BadRequest("nothing to update".to_string()));
    }

    let mut comment = state
        .db
        .resolve_comment(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("comment {}", id)))?;

    if let Some(content) = &req.content {
        let cleaned = state.sanitizer.clean(content);
        state.db.update_content(comment.id, cleaned.clone()).await?;
        comment.content = cleaned;
    }

    if let Some(status) = &req.status {
        let status = CommentStatus::parse(status)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid status: {}", status)))?;
        // Approval fans out notifications; any other transition is a
        // plain status write.
        if status == CommentStatus::Approved && comment.status != CommentStatus::Approved {
            approve_comment(&state, &comment).await?;
        } else {
            state.db.set_status(comment.id, status).await?;
        }
    }

    info!(
        id = comment.id,
        operator = %operator.email,
        status = ?req.status,
        edited = req.content.is_some(),
        "Comment updated"
    );

    Ok(Json(OkResponse { ok: true }))
}

/// DELETE /admin/comments/{id} - Remove a comment and its replies.
pub async fn admin_delete_comment(
    operator: Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>> {
    let comment = state
        .db
        .resolve_comment(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("comment {}", id)))?;

    state.db.delete_comment(comment.id).await?;
    info!(id = comment.id, operator = %operator.email, "Comment deleted");

    Ok(Json(OkResponse { ok: true }))
}

/// POST /admin/comments/{id}/reply - Post a reply as the operator.
pub async fn admin_reply(
    operator: Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AdminReplyRequest>,
) -> Result<(StatusCode, Json<CommentCreatedResponse>)> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let target = state
        .db
        .resolve_comment(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("comment {}", id)))?;

    let admin = state
        .admins
        .resolve(req.admin_id.as_deref(), &operator.email)
        .ok_or(ApiError::Unauthorized)?;

    let content = state.sanitizer.clean(&req.content);
    if content.trim().is_empty() {
        return Err(ApiError::Validation(
            "reply has no content after sanitization".to_string(),
        ));
    }

    // Threads stay one level deep: nest under the target's parent when it
    // has one, and point reply_to at the target itself.
    let stored = state
        .db
        .insert_comment(NewComment {
            article_id: target.article_id.clone(),
            parent_id: target.parent_id.or(Some(target.id)),
            reply_to_id: Some(target.id),
            author_name: admin.name.clone(),
            author_email: admin.email.clone(),
            author_url: admin.website.clone(),
            content,
            ip: None,
            user_agent: None,
            status: CommentStatus::Approved,
            is_admin: true,
            admin_id: admin.id.clone(),
        })
        .await?;

    let settings = state.db.settings()?;
    if settings.enable_email_notifications {
        notify_reply(&state, &settings, &stored);
    }

    info!(
        id = stored.id,
        target = target.id,
        operator = %operator.email,
        "Admin reply posted"
    );

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            id: stored.id,
            status: stored.status,
        }),
    ))
}

/// GET /admin/settings - Resolved settings snapshot.
pub async fn admin_get_settings(
    _operator: Operator,
    State(state): State<AppState>,
) -> Result<Json<SystemSettings>> {
    Ok(Json(state.db.settings()?))
}

/// PUT /admin/settings - Upsert settings overrides, scalar values only.
pub async fn admin_put_settings(
    operator: Operator,
    State(state): State<AppState>,
    Json(updates): Json<BTreeMap<String, serde_json::Value>>,
) -> Result<Json<SystemSettings>> {
    if updates.is_empty() {
        return Err(ApiError::BadRequest("no settings provided".to_string()));
    }

    let mut entries = Vec::with_capacity(updates.len());
    for (key, value) in updates {
        if !SystemSettings::is_known_key(&key) {
            return Err(ApiError::BadRequest(format!("unknown setting: {}", key)));
        }
        let value = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "setting {} must be a string, number, or boolean",
                    key
                )))
            }
        };
        entries.push((key, value));
    }

    let settings = state.db.put_settings(entries).await?;
    info!(operator = %operator.email, "Settings updated");

    Ok(Json(settings))
}

/// GET /admin/stats - Comment totals and most-liked articles.
pub async fn admin_stats(
    _operator: Operator,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>> {
    let counts = state.db.status_counts()?;
    let top_liked = state.db.top_liked(10)?;

    Ok(Json(StatsResponse {
        total_comments: counts.total,
        pending_comments: counts.pending,
        approved_comments: counts.approved,
        spam_comments: counts.spam,
        top_liked,
    }))
}

/// GET /admin/health - Storage health report.
pub async fn admin_health(
    _operator: Operator,
    State(state): State<AppState>,
) -> Result<Json<HealthReport>> {
    let report = state.db.health()?;
    if !report.ok {
        warn!(warnings = ?report.warnings, "Health check reporting problems");
    }
    Ok(Json(report))
}

/// POST /admin/backup - Write a snapshot now.
pub async fn admin_backup(
    operator: Operator,
    State(state): State<AppState>,
) -> Result<Json<BackupResponse>> {
    let path = state.db.snapshot().await?;
    info!(operator = %operator.email, path = %path.display(), "Snapshot written");

    Ok(Json(BackupResponse {
        path: path.display().to_string(),
    }))
}

/// POST /admin/restore - Roll back to the newest snapshot.
pub async fn admin_restore(
    operator: Operator,
    State(state): State<AppState>,
) -> Result<Json<RestoreResponse>> {
    let path = state
        .db
        .restore_latest()
        .await?
        .ok_or_else(|| ApiError::NotFound("snapshot".to_string()))?;

    warn!(
        operator = %operator.email,
        path = %path.display(),
        "Database restored from snapshot"
    );

    Ok(Json(RestoreResponse {
        path: path.display().to_string(),
    }))
}

// ===== Helpers =====

/// Parse an optional status filter.
fn parse_status_filter(s: Option<&str>) -> Result<Option<CommentStatus>> {
    match s {
        None | Some("") => Ok(None),
        Some(s) => CommentStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid status: {}", s))),
    }
}

/// Where moderation mail goes: the configured override, else every admin.
fn moderation_recipients(settings: &SystemSettings, admins: &AdminDirectory) -> Vec<String> {
    match &settings.moderation_email {
        Some(email) => vec![email.clone()],
        None => admins.emails(),
    }
}

/// Fan out notifications for a freshly stored submission.
fn notify_submission(
    state: &AppState,
    settings: &SystemSettings,
    comment: &Comment,
    assessment: &SpamAssessment,
) {
    if settings.enable_email_notifications {
        match comment.status {
            CommentStatus::Pending => {
                state.notifier.enqueue(Notification::Pending {
                    to: moderation_recipients(settings, &state.admins),
                    comment_id: comment.id,
                    article_id: comment.article_id.clone(),
                    author_name: comment.author_name.clone(),
                    content: comment.content.clone(),
                });
            }
            CommentStatus::Spam => {
                state.notifier.enqueue(Notification::SpamFlagged {
                    to: moderation_recipients(settings, &state.admins),
                    article_id: comment.article_id.clone(),
                    author_name: comment.author_name.clone(),
                    reasons: assessment
                        .reasons
                        .iter()
                        .map(|r| r.as_str().to_string())
                        .collect(),
                    content: comment.content.clone(),
                });
            }
            CommentStatus::Approved => notify_reply(state, settings, comment),
        }
    }

    if settings.enable_telegram_notifications {
        let text = match comment.status {
            CommentStatus::Pending => format!(
                "New comment pending on {} by {}",
                comment.article_id, comment.author_name
            ),
            CommentStatus::Approved => format!(
                "New approved comment on {} by {}",
                comment.article_id, comment.author_name
            ),
            CommentStatus::Spam => format!(
                "Spam comment on {} by {}",
                comment.article_id, comment.author_name
            ),
        };
        state.notifier.enqueue(Notification::Chat { text });
    }
}

/// Approve a comment and fan out the follow-up notifications.
///
/// The admin update endpoint and the emailed approve link both run this
/// same cascade.
async fn approve_comment(state: &AppState, comment: &Comment) -> Result<()> {
    state.db.set_status(comment.id, CommentStatus::Approved).await?;

    let settings = state.db.settings()?;
    if !settings.enable_email_notifications {
        return Ok(());
    }

    if settings.enable_approval_emails && !comment.author_email.is_empty() {
        state.notifier.enqueue(Notification::Approved {
            to: comment.author_email.clone(),
            author_name: comment.author_name.clone(),
            article_id: comment.article_id.clone(),
            content: comment.content.clone(),
        });
    }

    notify_reply(state, &settings, comment);
    Ok(())
}

/// Tell the author of the answered comment about a new public reply.
///
/// The answered comment is the mention target when one is set, else the
/// parent. Blank addresses and self-replies are skipped.
fn notify_reply(state: &AppState, settings: &SystemSettings, comment: &Comment) {
    if !settings.enable_nested_emails {
        return;
    }
    let Some(target_id) = comment.reply_to_id.or(comment.parent_id) else {
        return;
    };
    let target = match state.db.comment(target_id) {
        Ok(Some(target)) => target,
        Ok(None) => return,
        Err(e) => {
            warn!("Target lookup for reply notification failed: {}", e);
            return;
        }
    };
    if target.author_email.is_empty()
        || target.author_email.eq_ignore_ascii_case(&comment.author_email)
    {
        return;
    }

    state.notifier.enqueue(Notification::Replied {
        to: target.author_email,
        parent_author: target.author_name,
        reply_author: comment.author_name.clone(),
        article_id: comment.article_id.clone(),
        reply_content: comment.content.clone(),
    });
}
