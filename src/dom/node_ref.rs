use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a node as the path of child indices from the tree root
///
/// References stay valid for the lifetime of the scan that produced them; a
/// rescan rebuilds the tree and every reference with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(Vec<usize>);

impl NodeRef {
    /// Reference to the tree root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Reference to the `index`-th child of this node
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// Reference to the parent node, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// Child indices from the root
    pub fn path(&self) -> &[usize] {
        &self.0
    }

    /// Number of steps from the root
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// CSS selector resolving this reference in a live document rooted at `body`
    pub fn css_selector(&self) -> String {
        let mut selector = String::from("body");
        for index in &self.0 {
            selector.push_str(&format!(" > :nth-child({})", index + 1));
        }
        selector
    }
}

impl From<Vec<usize>> for NodeRef {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_selector())
    }
}
