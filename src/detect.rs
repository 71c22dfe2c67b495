//! Repeated-sibling pattern detection
//!
//! A list is inferred purely from structure: any parent holding at least
//! [`MIN_GROUP_SIZE`] children of the same kind forms an [`ItemGroup`]. Nested
//! and overlapping groups are all kept.

use crate::dom::{DomTree, NodeRef};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Minimum number of same-kind siblings that make a group
pub const MIN_GROUP_SIZE: usize = 3;

/// Maximum length of a group's sample text, in characters
pub const SAMPLE_TEXT_LEN: usize = 50;

/// Sample text used when no item in the group has visible text
pub const NO_TEXT_PLACEHOLDER: &str = "[No Text]";

/// A detected set of same-kind siblings under one parent
#[derive(Debug, Clone, PartialEq)]
pub struct ItemGroup {
    /// Stable id within one scan, assigned in discovery order
    pub id: usize,
    pub parent: NodeRef,
    pub kind: String,
    pub items: Vec<NodeRef>,
    pub sample_text: String,
}

/// What a caller sees of a group when choosing one to export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroupSummary {
    pub id: usize,
    pub count: usize,
    pub kind: String,
    pub sample_text: String,
}

impl ItemGroup {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> ItemGroupSummary {
        ItemGroupSummary {
            id: self.id,
            count: self.items.len(),
            kind: self.kind.clone(),
            sample_text: self.sample_text.clone(),
        }
    }
}

/// Find every group in the tree, in discovery (pre-order) order
pub fn find_groups(tree: &DomTree) -> Vec<ItemGroup> {
    let mut groups = Vec::new();

    tree.walk(|node_ref, node| {
        if node.children.len() < 2 {
            return;
        }

        let mut by_kind: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (i, child) in node.children.iter().enumerate() {
            by_kind.entry(child.tag_name.as_str()).or_default().push(i);
        }

        for (kind, indices) in by_kind {
            if indices.len() < MIN_GROUP_SIZE {
                continue;
            }
            let items: Vec<NodeRef> = indices.iter().map(|&i| node_ref.child(i)).collect();
            let sample_text = sample_text(indices.iter().map(|&i| node.children[i].text()));
            groups.push(ItemGroup {
                id: groups.len(),
                parent: node_ref.clone(),
                kind: kind.to_string(),
                items,
                sample_text,
            });
        }
    });

    groups
}

/// Summaries ranked by descending item count; equal counts keep discovery order
pub fn rank(groups: &[ItemGroup]) -> Vec<ItemGroupSummary> {
    let mut summaries: Vec<_> = groups.iter().map(ItemGroup::summary).collect();
    summaries.sort_by(|a, b| b.count.cmp(&a.count));
    summaries
}

/// Detect groups and return their ranked summaries
pub fn detect(tree: &DomTree) -> Vec<ItemGroupSummary> {
    rank(&find_groups(tree))
}

fn sample_text<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(|text| {
            text.chars()
                .take(SAMPLE_TEXT_LEN)
                .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
                .collect()
        })
        .unwrap_or_else(|| NO_TEXT_PLACEHOLDER.to_string())
}
