//! Reputation lookups against the Akismet comment-check API.

use tracing::{debug, warn};

use riposte_core::ReputationVerdict;

use crate::client::http_client;

/// A submission to check, borrowed from the request.
#[derive(Debug, Clone)]
pub struct CommentCheck<'a> {
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub author_name: &'a str,
    pub author_email: &'a str,
    pub author_url: Option<&'a str>,
    pub content: &'a str,
}

/// Client for the Akismet comment-check endpoint.
///
/// Unconfigured or failing lookups read as [`ReputationVerdict::Unknown`];
/// the local heuristics still run either way.
#[derive(Clone)]
pub struct ReputationClient {
    client: reqwest::Client,
    api_key: Option<String>,
    site_url: String,
}

impl ReputationClient {
    pub fn new(api_key: Option<String>, site_url: String) -> Self {
        Self {
            client: http_client(),
            api_key,
            site_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && !self.site_url.is_empty()
    }

    /// Ask the reputation service about one submission.
    pub async fn check(&self, input: &CommentCheck<'_>) -> ReputationVerdict {
        let Some(key) = &self.api_key else {
            return ReputationVerdict::Unknown;
        };
        if self.site_url.is_empty() {
            return ReputationVerdict::Unknown;
        }

        let url = format!("https://{key}.rest.akismet.com/1.1/comment-check");
        let form = [
            ("blog", self.site_url.as_str()),
            ("user_ip", input.ip.unwrap_or_default()),
            ("user_agent", input.user_agent.unwrap_or_default()),
            ("comment_type", "comment"),
            ("comment_author", input.author_name),
            ("comment_author_email", input.author_email),
            ("comment_author_url", input.author_url.unwrap_or_default()),
            ("comment_content", input.content),
        ];

        let response = match self.client.post(&url).form(&form).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Reputation check failed: {}", e);
                return ReputationVerdict::Unknown;
            }
        };

        if !response.status().is_success() {
            warn!("Reputation service returned {}", response.status());
            return ReputationVerdict::Unknown;
        }

        match response.text().await {
            Ok(body) => parse_verdict(&body),
            Err(e) => {
                warn!("Reputation response unreadable: {}", e);
                ReputationVerdict::Unknown
            }
        }
    }
}

/// The API answers with a bare "true" (spam) or "false" (ham). Anything
/// else, such as "invalid" for a bad key, reads as unknown.
fn parse_verdict(body: &str) -> ReputationVerdict {
    match body.trim() {
        "true" => ReputationVerdict::Spam,
        "false" => ReputationVerdict::Ham,
        other => {
            debug!("Unrecognized reputation verdict: {:?}", other);
            ReputationVerdict::Unknown
        }
    }
}
