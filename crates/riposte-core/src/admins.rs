//! Admin identity directory.
//!
//! Operators authenticate at the proxy layer (an access gateway injects a
//! trusted email header), so the service itself only keeps a directory of
//! who the admins are. The directory loads from a JSON file or an inline
//! JSON string and is immutable at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A configured administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminProfile {
    /// Email the access gateway authenticates.
    pub email: String,
    /// Display name shown on admin-authored comments.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Avatar override; admins usually want a real picture, not a hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Stable identifier persisted on admin-authored comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Directory of administrators.
#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    admins: Vec<AdminProfile>,
}

impl AdminDirectory {
    pub fn new(admins: Vec<AdminProfile>) -> Self {
        Self { admins }
    }

    /// Parse a directory from a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self> {
        let admins: Vec<AdminProfile> = serde_json::from_str(json)?;
        Ok(Self { admins })
    }

    /// Load a directory from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Build a minimal directory from bare addresses, for deployments that
    /// configure admin emails without profile entries. Display names fall
    /// back to the address local part.
    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = emails
            .into_iter()
            .filter_map(|email| {
                let email = email.as_ref().trim().to_string();
                if email.is_empty() {
                    return None;
                }
                let name = email.split('@').next().unwrap_or("admin").to_string();
                Some(AdminProfile {
                    email,
                    name,
                    website: None,
                    avatar_url: None,
                    id: None,
                })
            })
            .collect();
        Self { admins }
    }

    /// Look up an admin by authenticated email (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> Option<&AdminProfile> {
        self.admins
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim()))
    }

    /// Look up an admin by stable id.
    pub fn find_by_id(&self, id: &str) -> Option<&AdminProfile> {
        self.admins
            .iter()
            .find(|a| a.id.as_deref() == Some(id))
    }

    /// Resolve the acting admin: an explicit id wins when it names an entry,
    /// otherwise the authenticated email decides.
    pub fn resolve(&self, admin_id: Option<&str>, email: &str) -> Option<&AdminProfile> {
        admin_id
            .and_then(|id| self.find_by_id(id))
            .or_else(|| self.find_by_email(email))
    }

    /// Whether the email belongs to a configured admin.
    pub fn is_admin(&self, email: &str) -> bool {
        self.find_by_email(email).is_some()
    }

    /// Emails of every configured admin, for moderation mail fan-out.
    pub fn emails(&self) -> Vec<String> {
        self.admins.iter().map(|a| a.email.clone()).collect()
    }

    pub fn all(&self) -> &[AdminProfile] {
        &self.admins
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}
