//! CAPTCHA verification against Cloudflare Turnstile.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::http_client;
use crate::error::{OutboundError, Result};

const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Transport failures are retried up to this many times. A definitive
/// verdict from the service is never retried.
const MAX_ATTEMPTS: u32 = 3;

/// Result of verifying one submission token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaOutcome {
    /// The token checked out.
    Passed,
    /// The token was rejected, missing, or the verifier stayed unreachable.
    Failed,
    /// No secret configured; verification is disabled.
    Skipped,
}

/// Client for the Turnstile siteverify endpoint.
#[derive(Clone)]
pub struct CaptchaVerifier {
    client: reqwest::Client,
    secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

impl CaptchaVerifier {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            client: http_client(),
            secret,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a client token. Never errors; unreachable or exhausted
    /// attempts read as [`CaptchaOutcome::Failed`].
    pub async fn verify(&self, token: &str, ip: Option<&str>) -> CaptchaOutcome {
        let Some(secret) = &self.secret else {
            return CaptchaOutcome::Skipped;
        };

        if token.is_empty() {
            return CaptchaOutcome::Failed;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(secret, token, ip).await {
                Ok(true) => return CaptchaOutcome::Passed,
                Ok(false) => return CaptchaOutcome::Failed,
                Err(e) => {
                    warn!("CAPTCHA verification attempt {} failed: {}", attempt, e);
                }
            }
        }

        warn!(
            "CAPTCHA could not be verified after {} attempts, rejecting",
            MAX_ATTEMPTS
        );
        CaptchaOutcome::Failed
    }

    async fn attempt(&self, secret: &str, token: &str, ip: Option<&str>) -> Result<bool> {
        let mut form = vec![("secret", secret), ("response", token)];
        if let Some(ip) = ip {
            form.push(("remoteip", ip));
        }

        let response = self.client.post(SITEVERIFY_URL).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(OutboundError::UnexpectedResponse(format!(
                "siteverify returned {}",
                response.status()
            )));
        }

        let body: SiteVerifyResponse = response.json().await?;
        if !body.success && !body.error_codes.is_empty() {
            debug!("CAPTCHA rejected: {:?}", body.error_codes);
        }

        Ok(body.success)
    }
}
