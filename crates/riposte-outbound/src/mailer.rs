//! Transactional email over a Resend-style JSON API.
//!
//! Composes the four moderation emails and sends them with a bearer-key
//! HTTP call. An unconfigured mailer drops messages with a debug log so
//! the moderation flow never depends on email being set up.

use tracing::{debug, info};

use riposte_core::{ActionKind, TokenClaims, TokenSigner};

use crate::client::http_client;
use crate::error::{OutboundError, Result};

const SEND_URL: &str = "https://api.resend.com/emails";

/// Email sender for moderation notifications.
#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    api_key: Option<String>,
    sender: String,
    site_url: String,
    signer: TokenSigner,
}

impl Mailer {
    pub fn new(
        api_key: Option<String>,
        sender: String,
        site_url: String,
        signer: TokenSigner,
    ) -> Self {
        Self {
            client: http_client(),
            api_key,
            sender,
            site_url,
            signer,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one HTML email to one or more recipients.
    pub async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<()> {
        if to.is_empty() {
            return Ok(());
        }

        let Some(key) = &self.api_key else {
            debug!("Mailer not configured, dropping email {:?}", subject);
            return Ok(());
        };

        let body = serde_json::json!({
            "from": self.sender,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(SEND_URL)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(OutboundError::UnexpectedResponse(format!(
                "mail API returned {}: {}",
                status, error_body
            )));
        }

        info!("Email sent: {:?} to {} recipient(s)", subject, to.len());
        Ok(())
    }

    /// Alert moderators about a comment awaiting review, with one-click
    /// approve and delete links.
    pub async fn send_pending_alert(
        &self,
        to: &[String],
        comment_id: i64,
        article_id: &str,
        author_name: &str,
        content: &str,
    ) -> Result<()> {
        let approve_url = self.action_url(ActionKind::Approve, comment_id)?;
        let delete_url = self.action_url(ActionKind::Delete, comment_id)?;

        let subject = format!("New comment on {}", article_id);
        let html = format!(
            "<h2>New comment awaiting review</h2>\n\
             <p><strong>{author}</strong> commented on <em>{article}</em>:</p>\n\
             <div>{content}</div>\n\
             <p><a href=\"{approve}\">Approve</a> &middot; <a href=\"{delete}\">Delete</a></p>",
            author = escape(author_name),
            article = escape(article_id),
            content = content,
            approve = approve_url,
            delete = delete_url,
        );

        self.send(to, &subject, &html).await
    }

    /// Tell an author their comment went live.
    pub async fn send_approval_notice(
        &self,
        to: &str,
        author_name: &str,
        article_id: &str,
        content: &str,
    ) -> Result<()> {
        let subject = format!("Your comment is approved: {}", article_id);
        let html = format!(
            "<h2>Comment approved</h2>\n\
             <p>Hi {author}, your comment is now live.</p>\n\
             <h3>Original Comment</h3>\n\
             <div>{content}</div>\n\
             <p><a href=\"{view}\">View on site</a></p>",
            author = escape(author_name),
            content = content,
            view = self.article_url(article_id),
        );

        let to = [to.to_string()];
        self.send(&to, &subject, &html).await
    }

    /// Tell a comment's author that someone replied to them.
    pub async fn send_reply_notice(
        &self,
        to: &str,
        parent_author: &str,
        reply_author: &str,
        article_id: &str,
        reply_content: &str,
    ) -> Result<()> {
        let subject = format!("New reply on {}", article_id);
        let html = format!(
            "<h2>New reply to your comment</h2>\n\
             <p>Hi {parent}, {author} replied on <em>{article}</em>.</p>\n\
             <h3>Reply</h3>\n\
             <div>{content}</div>\n\
             <p><a href=\"{view}\">View on site</a></p>",
            parent = escape(parent_author),
            author = escape(reply_author),
            article = escape(article_id),
            content = reply_content,
            view = self.article_url(article_id),
        );

        let to = [to.to_string()];
        self.send(&to, &subject, &html).await
    }

    /// Alert moderators that a submission was auto-flagged as spam.
    pub async fn send_spam_alert(
        &self,
        to: &[String],
        article_id: &str,
        author_name: &str,
        reasons: &[String],
        content: &str,
    ) -> Result<()> {
        let subject = format!("Spam detected on {}", article_id);
        let reason_list = if reasons.is_empty() {
            "reputation service".to_string()
        } else {
            reasons.join(", ")
        };
        let html = format!(
            "<h2>Spam detected</h2>\n\
             <p><strong>{author}</strong> on <em>{article}</em>, flagged for: {reasons}</p>\n\
             <div>{content}</div>",
            author = escape(author_name),
            article = escape(article_id),
            reasons = escape(&reason_list),
            content = content,
        );

        self.send(to, &subject, &html).await
    }

    /// Signed one-click moderation link.
    fn action_url(&self, action: ActionKind, comment_id: i64) -> Result<String> {
        let token = self
            .signer
            .sign(&TokenClaims::new(action, comment_id))
            .map_err(|e| OutboundError::Token(e.to_string()))?;

        Ok(format!(
            "{}/email/{}?token={}",
            self.site_url.trim_end_matches('/'),
            action.as_str(),
            token
        ))
    }

    fn article_url(&self, article_id: &str) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), article_id)
    }
}

/// Minimal text-to-HTML escaping for interpolated names and ids. Comment
/// bodies arrive already sanitized and are interpolated as-is.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
