//! DOM snapshot model
//!
//! This module provides the element tree the detector and harvester work on:
//! - ElementNode: Representation of DOM elements
//! - DomTree: Snapshot of a page rooted at `body`
//! - NodeRef: Stable reference to a node within one snapshot

pub mod element;
pub mod node_ref;
pub mod tree;

pub use element::{BoundingBox, ElementNode};
pub use node_ref::NodeRef;
pub use tree::DomTree;

use crate::error::Result;
use headless_chrome::Tab;
use std::sync::Arc;

/// Extract the DOM tree from a browser tab
pub fn extract_dom(tab: &Arc<Tab>) -> Result<DomTree> {
    DomTree::from_tab(tab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_node_export() {
        let element = ElementNode::new("DIV");
        assert_eq!(element.tag_name, "DIV");
    }

    #[test]
    fn test_node_ref_export() {
        assert_eq!(NodeRef::root().css_selector(), "body");
    }

    #[test]
    fn test_dom_tree_export() {
        let tree = DomTree::new(ElementNode::new("BODY"));
        assert_eq!(tree.root.tag_name, "BODY");
    }
}
