//! Riposte Core - domain logic for the Riposte comment service.
//!
//! This crate holds everything that does not touch the database or the
//! network: spam scoring, comment tree reconstruction, the typed settings
//! snapshot, signed moderation tokens, the admin directory, avatar
//! resolution, and HTML sanitization.

pub mod admins;
pub mod avatar;
pub mod error;
pub mod sanitize;
pub mod settings;
pub mod spam;
pub mod status;
pub mod token;
pub mod tree;

pub use admins::{AdminDirectory, AdminProfile};
pub use error::{CoreError, Result};
pub use sanitize::Sanitizer;
pub use settings::SystemSettings;
pub use spam::{RecentActivity, ReputationVerdict, SpamAssessment, SpamInput, SpamScorer};
pub use status::CommentStatus;
pub use token::{ActionKind, TokenClaims, TokenError, TokenSigner};
pub use tree::{build_tree, CommentNode, TreeStats};
