//! Comment tree reconstruction.
//!
//! Approved comments come out of storage as a flat list in creation order.
//! This module rebuilds the nested reply forest, annotates @mention targets,
//! and tolerates rows whose parent no longer resolves.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A comment prepared for display, with nested replies.
///
/// The author email rides along for avatar resolution but never serializes.
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<i64>,
    /// Display name of the comment this one @mentions, when resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_name: Option<String>,
    pub author_name: String,
    #[serde(skip)]
    pub author_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    pub content: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub children: Vec<CommentNode>,
}

/// Shape diagnostics from one tree build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Top-level nodes in the output forest.
    pub roots: usize,
    /// Parent references that did not resolve and degraded to root placement.
    pub dangling: usize,
}

/// Rebuild the reply forest from rows in creation-time ascending order.
///
/// Linking rules:
/// - a parent reference resolving to an earlier row nests the node there;
/// - a missing, forward, or self reference degrades the node to a root and
///   counts as dangling (old data may legitimately contain these);
/// - sibling order is input order, so creation order within a level.
///
/// Rows arrive creation-ascending and a child is always created after its
/// parent, so accepting only backward references keeps the forest acyclic.
pub fn build_tree(rows: Vec<CommentNode>) -> (Vec<CommentNode>, TreeStats) {
    let mut index_of: HashMap<i64, usize> = HashMap::with_capacity(rows.len());
    let mut names: HashMap<i64, String> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        index_of.insert(row.id, i);
        names.insert(row.id, row.author_name.clone());
    }

    let mut slots: Vec<Option<CommentNode>> = rows.into_iter().map(Some).collect();

    // Annotate @mention names. Display only; never affects nesting.
    for slot in slots.iter_mut() {
        if let Some(node) = slot {
            node.reply_to_name = node
                .reply_to_id
                .and_then(|target| names.get(&target).cloned());
        }
    }

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut root_indices: Vec<usize> = Vec::new();
    let mut dangling = 0usize;

    for i in 0..slots.len() {
        let parent_id = slots[i].as_ref().and_then(|n| n.parent_id);
        match parent_id {
            Some(pid) => match index_of.get(&pid) {
                Some(&pi) if pi < i => children_of[pi].push(i),
                _ => {
                    dangling += 1;
                    root_indices.push(i);
                }
            },
            None => root_indices.push(i),
        }
    }

    // Children always sit at higher indices than their parent, so walking
    // backwards completes every subtree before it gets attached.
    for i in (0..slots.len()).rev() {
        if children_of[i].is_empty() {
            continue;
        }
        let mut children = Vec::with_capacity(children_of[i].len());
        for &child in &children_of[i] {
            if let Some(node) = slots[child].take() {
                children.push(node);
            }
        }
        if let Some(node) = slots[i].as_mut() {
            node.children = children;
        }
    }

    let forest: Vec<CommentNode> = root_indices
        .iter()
        .filter_map(|&i| slots[i].take())
        .collect();

    let stats = TreeStats {
        roots: forest.len(),
        dangling,
    };

    (forest, stats)
}
