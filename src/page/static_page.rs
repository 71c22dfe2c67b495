use crate::dom::{BoundingBox, DomTree, ElementNode, NodeRef};
use crate::error::{ExportError, Result};
use crate::page::{Page, ScrollBehavior};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory page over a fixed element tree
///
/// Geometry comes from each node's `bounding_box`. Scrolls and outlines are
/// recorded rather than rendered, so callers can inspect what would have
/// happened on a live page. Used for offline scans of saved snapshots.
#[derive(Debug)]
pub struct StaticPage {
    tree: DomTree,
    scale_factor: f64,
    state: Mutex<PageState>,
}

#[derive(Debug, Default)]
struct PageState {
    scrolls: Vec<(NodeRef, ScrollBehavior)>,
    outlines: HashMap<NodeRef, String>,
    /// Outline each node had before a highlight was applied
    saved_outlines: HashMap<NodeRef, Option<String>>,
    /// Text changed after the snapshot
    texts: HashMap<NodeRef, String>,
    fail_outlines: bool,
}

impl StaticPage {
    pub fn new(root: ElementNode) -> Self {
        Self {
            tree: DomTree::new(root),
            scale_factor: 1.0,
            state: Mutex::new(PageState::default()),
        }
    }

    /// Builder method: set the device scale factor
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Builder method: give `node` an outline of its own
    pub fn with_outline(self, node: NodeRef, outline: impl Into<String>) -> Self {
        self.state().outlines.insert(node, outline.into());
        self
    }

    /// Every scroll performed so far, oldest first
    pub fn scrolls(&self) -> Vec<(NodeRef, ScrollBehavior)> {
        self.state().scrolls.clone()
    }

    /// Outline currently applied to `node`
    pub fn outline(&self, node: &NodeRef) -> Option<String> {
        self.state().outlines.get(node).cloned()
    }

    /// Number of nodes that currently carry an outline
    pub fn outlined_count(&self) -> usize {
        self.state().outlines.len()
    }

    /// Change the rendered text of `node` without touching the snapshot
    pub fn set_text(&self, node: &NodeRef, text: impl Into<String>) {
        self.state().texts.insert(node.clone(), text.into());
    }

    /// Make every outline change fail until switched off again
    pub fn fail_outlines(&self, fail: bool) {
        self.state().fail_outlines = fail;
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        // A panic while holding the lock leaves plain data behind; keep using it
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve(&self, node: &NodeRef) -> Result<&ElementNode> {
        self.tree
            .get(node)
            .ok_or_else(|| ExportError::EvaluationFailed(format!("No element matches '{}'", node)))
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn snapshot(&self) -> Result<DomTree> {
        Ok(self.tree.clone())
    }

    async fn scroll_into_view(&self, node: &NodeRef, behavior: ScrollBehavior) -> Result<()> {
        self.resolve(node)?;
        self.state().scrolls.push((node.clone(), behavior));
        Ok(())
    }

    async fn bounding_box(&self, node: &NodeRef) -> Result<BoundingBox> {
        Ok(self
            .resolve(node)?
            .bounding_box
            .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0)))
    }

    async fn inner_text(&self, node: &NodeRef) -> Result<String> {
        let element = self.resolve(node)?;
        Ok(self
            .state()
            .texts
            .get(node)
            .cloned()
            .unwrap_or_else(|| element.text().to_string()))
    }

    async fn scale_factor(&self) -> Result<f64> {
        Ok(self.scale_factor)
    }

    async fn set_outline(&self, nodes: &[NodeRef], outline: Option<&str>) -> Result<()> {
        let mut state = self.state();
        if state.fail_outlines {
            return Err(ExportError::EvaluationFailed("outline update rejected".to_string()));
        }

        let PageState {
            outlines,
            saved_outlines,
            ..
        } = &mut *state;
        for node in nodes {
            match outline {
                Some(style) => {
                    let own = outlines.insert(node.clone(), style.to_string());
                    saved_outlines.entry(node.clone()).or_insert(own);
                }
                None => match saved_outlines.remove(node) {
                    Some(Some(own)) => {
                        outlines.insert(node.clone(), own);
                    }
                    Some(None) => {
                        outlines.remove(node);
                    }
                    None => {}
                },
            }
        }
        Ok(())
    }
}
