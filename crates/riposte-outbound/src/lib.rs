//! Riposte Outbound - external collaborators over HTTP.
//!
//! Everything the comment service talks to besides its own database lives
//! here:
//!
//! - Reputation checks against the Akismet comment-check API
//! - CAPTCHA verification against Cloudflare Turnstile
//! - Transactional email (Resend-style JSON API)
//! - Chat notifications (Telegram bot API)
//! - The notification dispatcher that fans deliveries out to worker tasks
//!
//! Every collaborator degrades gracefully when unconfigured: reputation
//! reads as [`riposte_core::ReputationVerdict::Unknown`], CAPTCHA
//! verification is skipped, and notifications are dropped with a debug log.

pub mod captcha;
pub mod chat;
mod client;
pub mod dispatch;
pub mod error;
pub mod mailer;
pub mod reputation;

pub use captcha::{CaptchaOutcome, CaptchaVerifier};
pub use chat::ChatNotifier;
pub use dispatch::{Dispatcher, Notification};
pub use error::{OutboundError, Result};
pub use mailer::Mailer;
pub use reputation::{CommentCheck, ReputationClient};
