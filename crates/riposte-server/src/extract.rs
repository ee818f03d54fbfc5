//! Request metadata extraction.
//!
//! The service always runs behind a proxy, so client addresses come from
//! forwarding headers. Operators are authenticated by an access gateway
//! that injects a trusted email header after login.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::state::AppState;

/// Header the access gateway sets after authenticating an operator.
pub const OPERATOR_EMAIL_HEADER: &str = "cf-access-authenticated-user-email";

/// Forwarding headers consulted for the client address, most trusted first.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-forwarded-for", "x-real-ip"];

/// Best-effort client address from forwarding headers.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    for name in CLIENT_IP_HEADERS {
        let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        // x-forwarded-for lists hops client-first.
        let first = value.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    None
}

/// The user agent header, when present.
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// An authenticated operator on admin routes.
///
/// Extraction fails with 401 when the gateway header is missing or names
/// an email outside the admin directory.
#[derive(Debug, Clone)]
pub struct Operator {
    pub email: String,
}

impl FromRequestParts<AppState> for Operator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(OPERATOR_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        if !state.admins.is_admin(email) {
            return Err(ApiError::Unauthorized);
        }

        Ok(Self {
            email: email.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderName;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_cf_header_wins() {
        let h = headers(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.5"),
        ]);
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let h = headers(&[("x-forwarded-for", "203.0.113.5, 10.0.0.1, 10.0.0.2")]);
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.5"));
    }

    #[test]
    fn test_real_ip_is_the_fallback() {
        let h = headers(&[("x-real-ip", "198.51.100.7")]);
        assert_eq!(client_ip(&h).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn test_empty_header_values_are_skipped() {
        let h = headers(&[("cf-connecting-ip", ""), ("x-real-ip", "198.51.100.7")]);
        assert_eq!(client_ip(&h).as_deref(), Some("198.51.100.7"));
    }

    #[test]
    fn test_no_headers_means_no_address() {
        assert!(client_ip(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_user_agent_read() {
        let h = headers(&[("user-agent", "Mozilla/5.0")]);
        assert_eq!(user_agent(&h).as_deref(), Some("Mozilla/5.0"));
        assert!(user_agent(&HeaderMap::new()).is_none());
    }
}
