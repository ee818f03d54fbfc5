//! Runtime-tunable system settings.
//!
//! Settings persist as string key/value rows; this module owns the typed
//! snapshot and the coercion from rows back into it. Keys that were never
//! written read as the compiled defaults, and values that fail to parse
//! fall back per field rather than poisoning the whole snapshot.

use serde::Serialize;

/// Typed snapshot of the tunable settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSettings {
    /// Publish low-scoring comments without review.
    pub auto_approve: bool,
    /// Reject submissions without an author email.
    pub require_email: bool,
    /// Minimum accepted content length, in characters.
    pub min_comment_length: i64,
    /// Maximum accepted content length, in characters.
    pub max_comment_length: i64,
    /// Highest spam score still eligible for auto-approval.
    pub auto_approve_threshold: f32,
    /// Score at or above which a submission is spam.
    pub spam_threshold: f32,
    /// Override recipient for moderation mail; admins otherwise.
    pub moderation_email: Option<String>,
    /// Master switch for all outbound email.
    pub enable_email_notifications: bool,
    /// Mail authors when their comment is approved.
    pub enable_approval_emails: bool,
    /// Mail parent authors when someone replies to them.
    pub enable_nested_emails: bool,
    /// Push moderation events to the chat notifier.
    pub enable_telegram_notifications: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            auto_approve: false,
            require_email: true,
            min_comment_length: 1,
            max_comment_length: 5000,
            auto_approve_threshold: 0.3,
            spam_threshold: 0.7,
            moderation_email: None,
            enable_email_notifications: true,
            enable_approval_emails: true,
            enable_nested_emails: true,
            enable_telegram_notifications: true,
        }
    }
}

impl SystemSettings {
    /// Build a snapshot from persisted key/value rows.
    pub fn from_rows<I, K, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in rows {
            settings.apply(key.as_ref(), value.as_ref());
        }
        settings
    }

    /// Apply a single persisted override.
    ///
    /// Unknown keys are ignored so removing a setting from the struct never
    /// breaks reads of an older database.
    pub fn apply(&mut self, key: &str, value: &str) {
        let defaults = Self::default();
        match key {
            "auto_approve" => self.auto_approve = value == "true",
            "require_email" => self.require_email = value == "true",
            "min_comment_length" => {
                self.min_comment_length = value.parse().unwrap_or(defaults.min_comment_length)
            }
            "max_comment_length" => {
                self.max_comment_length = value.parse().unwrap_or(defaults.max_comment_length)
            }
            "auto_approve_threshold" => {
                self.auto_approve_threshold =
                    value.parse().unwrap_or(defaults.auto_approve_threshold)
            }
            "spam_threshold" => {
                self.spam_threshold = value.parse().unwrap_or(defaults.spam_threshold)
            }
            "moderation_email" => {
                self.moderation_email = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.trim().to_string())
                }
            }
            "enable_email_notifications" => self.enable_email_notifications = value == "true",
            "enable_approval_emails" => self.enable_approval_emails = value == "true",
            "enable_nested_emails" => self.enable_nested_emails = value == "true",
            "enable_telegram_notifications" => {
                self.enable_telegram_notifications = value == "true"
            }
            _ => {}
        }
    }

    /// Keys this struct recognizes, for validating writes.
    pub fn known_keys() -> &'static [&'static str] {
        &[
            "auto_approve",
            "require_email",
            "min_comment_length",
            "max_comment_length",
            "auto_approve_threshold",
            "spam_threshold",
            "moderation_email",
            "enable_email_notifications",
            "enable_approval_emails",
            "enable_nested_emails",
            "enable_telegram_notifications",
        ]
    }

    /// Whether a key is recognized.
    pub fn is_known_key(key: &str) -> bool {
        Self::known_keys().contains(&key)
    }
}
