//! Signed one-click moderation tokens.
//!
//! Moderation emails carry links that approve or delete a single comment
//! without logging in. Each link embeds a token of the form
//! `base64url(claims).base64url(hmac-sha256(claims))`; the claims name the
//! action, the comment, and an expiry. Verification is constant-time on the
//! signature and refuses expired or repurposed tokens before anything else
//! can act on them.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How long emailed action links stay valid.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Why a token was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not two base64url parts, or claims that do not decode.
    #[error("malformed token")]
    Malformed,

    /// Signature does not match the claims.
    #[error("invalid token signature")]
    BadSignature,

    /// Token presented for a different action than it was issued for.
    #[error("token action mismatch")]
    WrongAction,

    /// Past its expiry.
    #[error("token expired")]
    Expired,

    /// Signing-side failure (bad key or claims that refuse to serialize).
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Action a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Approve,
    Delete,
}

impl ActionKind {
    /// URL path segment for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Delete => "delete",
        }
    }
}

/// Claims carried by a moderation token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub action: ActionKind,
    pub comment_id: i64,
    /// Expiry as unix milliseconds.
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for an action on one comment, expiring after the default TTL.
    pub fn new(action: ActionKind, comment_id: i64) -> Self {
        Self {
            action,
            comment_id,
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp_millis(),
        }
    }
}

/// Signs and verifies moderation tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Produce a signed token for the given claims.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let body = serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(&body);
        let sig = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&body),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    /// Verify a token and return its claims.
    ///
    /// Checks, in order: shape, signature (constant time), action, expiry.
    /// A failure at any step leaves no room for side effects downstream
    /// because the claims are only returned on full success.
    pub fn verify(&self, token: &str, expected: ActionKind) -> Result<TokenClaims, TokenError> {
        let (body_b64, sig_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;

        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| TokenError::Malformed)?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(&body);
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: TokenClaims =
            serde_json::from_slice(&body).map_err(|_| TokenError::Malformed)?;

        if claims.action != expected {
            return Err(TokenError::WrongAction);
        }

        if claims.exp < Utc::now().timestamp_millis() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
