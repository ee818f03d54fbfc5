//! Commenter avatar resolution.
//!
//! Regular commenters get a deterministic Gravatar-compatible URL derived
//! from a SHA-256 of their normalized email. Admin-authored comments resolve
//! through the admin directory first so operators can pin a real picture.

use sha2::{Digest, Sha256};

use crate::admins::AdminDirectory;
use crate::tree::CommentNode;

/// Default avatar CDN; accepts SHA-256 email hashes.
pub const DEFAULT_AVATAR_BASE: &str = "https://gravatar.com/avatar";

/// Hash rendered when the commenter left no email.
const EMPTY_EMAIL_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Deterministic avatar URL for an email address.
pub fn avatar_url(base: &str, email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let hash = if normalized.is_empty() {
        EMPTY_EMAIL_HASH.to_string()
    } else {
        hex::encode(Sha256::digest(normalized.as_bytes()))
    };

    format!("{}/{}?d=identicon", base.trim_end_matches('/'), hash)
}

/// Fill `avatar_url` across a comment forest, admin overrides included.
pub fn annotate_forest(nodes: &mut [CommentNode], base: &str, admins: &AdminDirectory) {
    for node in nodes.iter_mut() {
        node.avatar_url = Some(resolve(node, base, admins));
        annotate_forest(&mut node.children, base, admins);
    }
}

fn resolve(node: &CommentNode, base: &str, admins: &AdminDirectory) -> String {
    if node.is_admin {
        let profile = node
            .admin_id
            .as_deref()
            .and_then(|id| admins.find_by_id(id))
            .or_else(|| admins.find_by_email(&node.author_email));

        if let Some(url) = profile.and_then(|p| p.avatar_url.clone()) {
            return url;
        }
    }

    avatar_url(base, &node.author_email)
}
