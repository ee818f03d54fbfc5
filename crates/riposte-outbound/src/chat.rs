//! Chat notifications over the Telegram bot API.

use tracing::{debug, info};

use crate::client::http_client;
use crate::error::{OutboundError, Result};

/// Sends plain-text moderation pings to a Telegram chat.
#[derive(Clone)]
pub struct ChatNotifier {
    client: reqwest::Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl ChatNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Self {
        Self {
            client: http_client(),
            bot_token,
            chat_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    /// Send one message. Drops silently when unconfigured.
    pub async fn send(&self, text: &str) -> Result<()> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            debug!("Chat notifier not configured, dropping message");
            return Ok(());
        };

        let url = format!("https://api.telegram.org/bot{token}/sendMessage");
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(OutboundError::UnexpectedResponse(format!(
                "chat API returned {}",
                response.status()
            )));
        }

        info!("Chat notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_needs_both_values() {
        assert!(ChatNotifier::new(Some("t".into()), Some("c".into())).is_configured());
        assert!(!ChatNotifier::new(Some("t".into()), None).is_configured());
        assert!(!ChatNotifier::new(None, Some("c".into())).is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_send_is_silent() {
        let chat = ChatNotifier::new(None, None);
        chat.send("new comment").await.unwrap();
    }
}
