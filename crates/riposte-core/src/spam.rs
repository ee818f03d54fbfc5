//! Heuristic spam scoring for comment submissions.
//!
//! Each submission is scored against a set of fixed-weight signals plus an
//! optional verdict from an external reputation service. The caller supplies
//! recent-activity counts so the scorer itself stays free of storage
//! concerns and fast to test.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::settings::SystemSettings;
use crate::status::CommentStatus;

/// Score at or above which a submission is spam, unless overridden.
pub const DEFAULT_SPAM_THRESHOLD: f32 = 0.7;

/// Floor applied to the score when the reputation service says spam.
const REPUTATION_SPAM_FLOOR: f32 = 0.9;

// Signal weights. The sum is clamped to 1.0.
const WEIGHT_RATE_LIMIT: f32 = 0.25;
const WEIGHT_DUPLICATE_CONTENT: f32 = 0.20;
const WEIGHT_TEMPORARY_EMAIL: f32 = 0.20;
const WEIGHT_TOO_MANY_LINKS: f32 = 0.15;
const WEIGHT_TOO_SHORT: f32 = 0.10;
const WEIGHT_EMAIL_BURST: f32 = 0.10;

// Signal trigger points.
const RATE_LIMIT_COUNT: i64 = 5;
const DUPLICATE_COUNT: i64 = 2;
const EMAIL_BURST_COUNT: i64 = 4;
const LINK_LIMIT: usize = 3;
const SHORT_CONTENT_LEN: usize = 10;

/// Throwaway email providers commonly used by spammers.
const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "tempmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "yopmail.com",
    "trashmail.com",
];

/// A signal that contributed to a spam score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamReason {
    /// Too many submissions from the same IP in a short window.
    RateLimit,
    /// Repeated identical bodies from the same IP.
    DuplicateContent,
    /// Author email uses a disposable provider.
    TemporaryEmail,
    /// Content carries an unusual number of links.
    TooManyLinks,
    /// Content too short to be a real comment.
    TooShort,
    /// Too many submissions under the same email address.
    EmailBurst,
    /// External reputation service flagged the submission.
    ReputationSpam,
}

impl SpamReason {
    /// Short label for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpamReason::RateLimit => "rate_limit",
            SpamReason::DuplicateContent => "duplicate_content",
            SpamReason::TemporaryEmail => "temporary_email",
            SpamReason::TooManyLinks => "too_many_links",
            SpamReason::TooShort => "too_short",
            SpamReason::EmailBurst => "email_burst",
            SpamReason::ReputationSpam => "reputation_spam",
        }
    }
}

/// Verdict from the external reputation service.
///
/// `Unknown` covers both "service not configured" and "service unreachable";
/// it never influences the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReputationVerdict {
    Spam,
    Ham,
    #[default]
    Unknown,
}

/// A submission to be scored.
#[derive(Debug, Clone)]
pub struct SpamInput<'a> {
    pub author_email: &'a str,
    pub content: &'a str,
    /// Client IP, when the transport could determine one.
    pub ip: Option<&'a str>,
}

/// Recent submission counts around this author, supplied by the caller.
///
/// Windows: `from_ip` covers the last 5 minutes, `duplicates` and
/// `from_email` the last 3 minutes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentActivity {
    /// Comments from the same IP.
    pub from_ip: i64,
    /// Identical bodies from the same IP.
    pub duplicates: i64,
    /// Comments under the same email address.
    pub from_email: i64,
}

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Serialize)]
pub struct SpamAssessment {
    /// Aggregate score in [0.0, 1.0].
    pub score: f32,
    /// Whether the score crossed the spam threshold.
    pub is_spam: bool,
    /// Signals that fired, in evaluation order.
    pub reasons: Vec<SpamReason>,
    /// What the reputation service said, if anything.
    pub reputation: ReputationVerdict,
}

impl SpamAssessment {
    /// Initial moderation status for a submission with this assessment.
    pub fn status_for(&self, settings: &SystemSettings) -> CommentStatus {
        if self.is_spam {
            CommentStatus::Spam
        } else if settings.auto_approve && self.score <= settings.auto_approve_threshold {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        }
    }
}

/// Heuristic spam scorer with pre-compiled patterns.
pub struct SpamScorer {
    link_pattern: Regex,
    disposable_domains: HashSet<&'static str>,
}

impl SpamScorer {
    /// Creates a new scorer with the default signal set.
    pub fn new() -> Self {
        Self {
            link_pattern: Regex::new(r"https?://").expect("Invalid link pattern"),
            disposable_domains: DISPOSABLE_DOMAINS.iter().copied().collect(),
        }
    }

    /// Scores a submission against recent activity and an optional
    /// reputation verdict.
    pub fn assess(
        &self,
        input: &SpamInput<'_>,
        activity: RecentActivity,
        reputation: ReputationVerdict,
        spam_threshold: f32,
    ) -> SpamAssessment {
        let mut score = 0.0_f32;
        let mut reasons = Vec::new();

        // IP-keyed signals only apply when the transport saw an IP.
        if input.ip.is_some() {
            if activity.from_ip >= RATE_LIMIT_COUNT {
                score += WEIGHT_RATE_LIMIT;
                reasons.push(SpamReason::RateLimit);
            }

            if activity.duplicates >= DUPLICATE_COUNT {
                score += WEIGHT_DUPLICATE_CONTENT;
                reasons.push(SpamReason::DuplicateContent);
            }
        }

        if self.has_disposable_email(input.author_email) {
            score += WEIGHT_TEMPORARY_EMAIL;
            reasons.push(SpamReason::TemporaryEmail);
        }

        if self.link_pattern.find_iter(input.content).count() >= LINK_LIMIT {
            score += WEIGHT_TOO_MANY_LINKS;
            reasons.push(SpamReason::TooManyLinks);
        }

        if input.content.trim().chars().count() < SHORT_CONTENT_LEN {
            score += WEIGHT_TOO_SHORT;
            reasons.push(SpamReason::TooShort);
        }

        if !input.author_email.is_empty() && activity.from_email >= EMAIL_BURST_COUNT {
            score += WEIGHT_EMAIL_BURST;
            reasons.push(SpamReason::EmailBurst);
        }

        score = score.clamp(0.0, 1.0);

        if reputation == ReputationVerdict::Spam {
            score = score.max(REPUTATION_SPAM_FLOOR);
            reasons.push(SpamReason::ReputationSpam);
        }

        SpamAssessment {
            score,
            is_spam: score >= spam_threshold,
            reasons,
            reputation,
        }
    }

    fn has_disposable_email(&self, email: &str) -> bool {
        email
            .rsplit_once('@')
            .map(|(_, domain)| {
                self.disposable_domains
                    .contains(domain.trim().to_lowercase().as_str())
            })
            .unwrap_or(false)
    }
}

impl Default for SpamScorer {
    fn default() -> Self {
        Self::new()
    }
}
