//! Environment configuration.
//!
//! Deploy-time knobs come from the environment, optionally seeded from a
//! `.env` file at startup. Moderation behavior is not configured here; it
//! lives in the database settings and is editable at runtime.

use std::env;

/// Deploy-time configuration read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host (HOST, default 127.0.0.1).
    pub host: String,
    /// Bind port (PORT, default 8080).
    pub port: u16,
    /// SQLite path (DB_PATH, default: the platform data directory).
    pub db_path: Option<String>,
    /// CORS origin allow-list (ALLOWED_ORIGINS, comma separated, default *).
    pub allowed_origins: Vec<String>,
    /// Secret for emailed action tokens (TOKEN_SECRET).
    pub token_secret: Option<String>,
    /// Inline admin directory JSON (ADMIN_PROFILES_JSON).
    pub admin_profiles_json: Option<String>,
    /// Admin directory file (ADMIN_CONFIG_PATH, default config/admins.json).
    pub admin_config_path: String,
    /// Fallback admin emails (ADMIN_EMAILS, comma separated).
    pub admin_emails: Vec<String>,
    /// Reputation service key (AKISMET_KEY).
    pub akismet_key: Option<String>,
    /// Site URL reported to the reputation service (SITE_URL).
    pub site_url: String,
    /// CAPTCHA secret (TURNSTILE_SECRET_KEY).
    pub turnstile_secret: Option<String>,
    /// Outbound email key (RESEND_API_KEY).
    pub resend_api_key: Option<String>,
    /// From header on outbound email (EMAIL_FROM).
    pub email_from: String,
    /// Base URL for emailed action links (PUBLIC_BASE_URL).
    pub public_base_url: String,
    /// Chat bot token (TELEGRAM_BOT_TOKEN).
    pub telegram_bot_token: Option<String>,
    /// Chat channel id (TELEGRAM_CHAT_ID).
    pub telegram_chat_id: Option<String>,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        let public_base_url =
            var("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:8080".to_string());

        Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: var("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            db_path: var("DB_PATH"),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_else(|| vec!["*".to_string()]),
            token_secret: var("TOKEN_SECRET"),
            admin_profiles_json: var("ADMIN_PROFILES_JSON"),
            admin_config_path: var("ADMIN_CONFIG_PATH")
                .unwrap_or_else(|| "config/admins.json".to_string()),
            admin_emails: var("ADMIN_EMAILS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            akismet_key: var("AKISMET_KEY"),
            site_url: var("SITE_URL").unwrap_or_else(|| public_base_url.clone()),
            turnstile_secret: var("TURNSTILE_SECRET_KEY"),
            resend_api_key: var("RESEND_API_KEY"),
            email_from: var("EMAIL_FROM")
                .unwrap_or_else(|| "Comments <no-reply@example.com>".to_string()),
            public_base_url,
            telegram_bot_token: var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: var("TELEGRAM_CHAT_ID"),
        }
    }
}

/// Non-empty environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a comma separated list, dropping blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}
