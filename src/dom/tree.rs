use crate::dom::element::ElementNode;
use crate::dom::node_ref::NodeRef;
use crate::error::{ExportError, Result};
use headless_chrome::Tab;
use std::sync::Arc;

/// Snapshot of a page's element tree, rooted at `body`
#[derive(Debug, Clone)]
pub struct DomTree {
    /// Root element of the DOM tree
    pub root: ElementNode,
}

impl DomTree {
    /// Create a DomTree from an already built root
    pub fn new(root: ElementNode) -> Self {
        Self { root }
    }

    /// Build DOM tree from a browser tab
    pub fn from_tab(tab: &Arc<Tab>) -> Result<Self> {
        // The script returns the serialized tree as a JSON string
        let js_code = include_str!("extract_dom.js");

        let result = tab
            .evaluate(js_code, false)
            .map_err(|e| ExportError::DomParseFailed(format!("Failed to execute DOM extraction script: {}", e)))?;

        let json_value = result
            .value
            .ok_or_else(|| ExportError::DomParseFailed("No value returned from DOM extraction".to_string()))?;

        let json_str: String = serde_json::from_value(json_value)
            .map_err(|e| ExportError::DomParseFailed(format!("Failed to get JSON string: {}", e)))?;

        Self::from_json(&json_str)
    }

    /// Parse a serialized snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let root: ElementNode = serde_json::from_str(json)
            .map_err(|e| ExportError::DomParseFailed(format!("Failed to parse DOM JSON: {}", e)))?;
        Ok(Self::new(root))
    }

    /// Convert the DOM tree to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.root)
            .map_err(|e| ExportError::DomParseFailed(format!("Failed to serialize DOM to JSON: {}", e)))
    }

    /// Resolve a node reference
    pub fn get(&self, node: &NodeRef) -> Option<&ElementNode> {
        node.path()
            .iter()
            .try_fold(&self.root, |current, &index| current.children.get(index))
    }

    /// Find the first element (document order) with the given `id` attribute
    pub fn find_by_id(&self, id: &str) -> Option<&ElementNode> {
        std::iter::once(&self.root)
            .chain(self.root.descendants())
            .find(|node| node.id().map(String::as_str) == Some(id))
    }

    /// Visit every node exactly once in pre-order, root first
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&NodeRef, &ElementNode),
    {
        let mut stack = vec![(NodeRef::root(), &self.root)];
        while let Some((node_ref, node)) = stack.pop() {
            visit(&node_ref, node);
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((node_ref.child(i), child));
            }
        }
    }

    /// Count total elements in the tree
    pub fn count_elements(&self) -> usize {
        1 + self.root.descendants().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> ElementNode {
        let mut root = ElementNode::new("BODY");

        let mut header = ElementNode::new("HEADER");
        header.add_child(ElementNode::new("BUTTON").with_attribute("id", "nav-btn").with_text("Menu"));

        let mut main = ElementNode::new("MAIN");
        main.add_child(ElementNode::new("A").with_attribute("href", "/page").with_text("Click here"));
        main.add_child(
            ElementNode::new("DIV")
                .with_attribute("id", "tip")
                .with_text_content("Hidden tooltip"),
        );

        root.add_child(header);
        root.add_child(main);

        root
    }

    #[test]
    fn test_dom_tree_creation() {
        let tree = DomTree::new(create_test_tree());

        assert_eq!(tree.root.tag_name, "BODY");
        assert_eq!(tree.root.children.len(), 2);
    }

    #[test]
    fn test_get_by_reference() {
        let tree = DomTree::new(create_test_tree());

        assert_eq!(tree.get(&NodeRef::root()).unwrap().tag_name, "BODY");
        assert_eq!(tree.get(&NodeRef::from(vec![1, 0])).unwrap().tag_name, "A");
        assert!(tree.get(&NodeRef::from(vec![1, 5])).is_none());
        assert!(tree.get(&NodeRef::from(vec![0, 0, 0])).is_none());
    }

    #[test]
    fn test_find_by_id() {
        let tree = DomTree::new(create_test_tree());

        let tip = tree.find_by_id("tip").unwrap();
        assert_eq!(tip.text_content.as_deref(), Some("Hidden tooltip"));
        assert!(tree.find_by_id("missing").is_none());
    }

    #[test]
    fn test_walk_visits_every_node_once() {
        let tree = DomTree::new(create_test_tree());

        let mut visited = Vec::new();
        tree.walk(|node_ref, node| visited.push((node_ref.clone(), node.tag_name.clone())));

        assert_eq!(visited.len(), tree.count_elements());
        let tags: Vec<_> = visited.iter().map(|(_, tag)| tag.as_str()).collect();
        assert_eq!(tags, vec!["BODY", "HEADER", "BUTTON", "MAIN", "A", "DIV"]);

        for (node_ref, tag) in &visited {
            assert_eq!(&tree.get(node_ref).unwrap().tag_name, tag);
        }
    }

    #[test]
    fn test_count_elements() {
        let tree = DomTree::new(create_test_tree());
        assert_eq!(tree.count_elements(), 6);
    }

    #[test]
    fn test_json_round_trip() {
        let tree = DomTree::new(create_test_tree());
        let json = tree.to_json().unwrap();

        assert!(json.contains("\"tag_name\": \"BODY\""));
        assert!(json.contains("nav-btn"));

        let parsed = DomTree::from_json(&json).unwrap();
        assert_eq!(parsed.root, tree.root);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = DomTree::from_json("not json").unwrap_err();
        assert!(matches!(err, ExportError::DomParseFailed(_)));
    }
}
