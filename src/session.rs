use crate::detect::{self, ItemGroup, ItemGroupSummary};
use crate::dom::{DomTree, ElementNode, NodeRef};
use crate::error::{ExportError, Result};

/// State of the most recent scan: the snapshot, its groups and the active highlight
///
/// Group ids and node references are only meaningful against the snapshot
/// they were detected in, so every scan replaces all three together.
#[derive(Debug, Default)]
pub struct ScanSession {
    tree: Option<DomTree>,
    groups: Vec<ItemGroup>,
    highlighted: Option<usize>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session with a fresh scan of `tree`, returning ranked summaries
    ///
    /// Any highlight is dropped; the caller is responsible for reverting its
    /// visual side effects first (see [`ScanSession::release_highlight`]).
    pub fn rescan(&mut self, tree: DomTree) -> Vec<ItemGroupSummary> {
        self.groups = detect::find_groups(&tree);
        self.tree = Some(tree);
        self.highlighted = None;
        detect::rank(&self.groups)
    }

    pub fn tree(&self) -> Option<&DomTree> {
        self.tree.as_ref()
    }

    pub fn groups(&self) -> &[ItemGroup] {
        &self.groups
    }

    pub fn group(&self, id: usize) -> Result<&ItemGroup> {
        self.groups.get(id).ok_or(ExportError::GroupNotFound(id))
    }

    /// Reference to the `index`-th item of group `group_id`
    pub fn item(&self, group_id: usize, index: usize) -> Result<&NodeRef> {
        self.group(group_id)?
            .items
            .get(index)
            .ok_or(ExportError::ItemNotFound { group_id, index })
    }

    /// Resolve an item to its element in the snapshot
    pub fn item_node(&self, group_id: usize, index: usize) -> Result<&ElementNode> {
        let node_ref = self.item(group_id, index)?;
        self.tree
            .as_ref()
            .and_then(|tree| tree.get(node_ref))
            .ok_or(ExportError::ItemNotFound { group_id, index })
    }

    /// Currently highlighted group, if any
    pub fn highlighted(&self) -> Option<&ItemGroup> {
        self.highlighted.and_then(|id| self.groups.get(id))
    }

    /// Mark `id` as highlighted
    ///
    /// Recorded before the outlines are applied, so a partially applied
    /// highlight is still reverted later.
    pub fn set_highlight(&mut self, id: usize) -> Result<()> {
        self.group(id)?;
        self.highlighted = Some(id);
        Ok(())
    }

    /// Forget the highlight of group `id` once its outlines are reverted
    ///
    /// Returns `false` when `id` is no longer the highlighted group.
    pub fn release_highlight(&mut self, id: usize) -> bool {
        if self.highlighted == Some(id) {
            self.highlighted = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_lists() -> DomTree {
        let items = |kind: &str, n: usize| -> Vec<ElementNode> {
            (0..n).map(|i| ElementNode::new(kind).with_text(format!("row {}", i))).collect()
        };
        DomTree::new(ElementNode::new("BODY").with_children(vec![
            ElementNode::new("UL").with_children(items("LI", 3)),
            ElementNode::new("TABLE").with_children(items("TR", 6)),
        ]))
    }

    #[test]
    fn test_rescan_assigns_ids_and_ranks() {
        let mut session = ScanSession::new();
        let summaries = session.rescan(tree_with_lists());

        assert_eq!(session.groups().len(), 2);
        assert_eq!(summaries[0].kind, "TR");
        assert_eq!(summaries[0].id, 1);
        assert_eq!(summaries[1].id, 0);
    }

    #[test]
    fn test_lookup_errors() {
        let mut session = ScanSession::new();
        assert!(matches!(session.group(0), Err(ExportError::GroupNotFound(0))));

        session.rescan(tree_with_lists());
        assert!(session.group(1).is_ok());
        assert!(matches!(session.group(2), Err(ExportError::GroupNotFound(2))));
        assert!(matches!(
            session.item(0, 3),
            Err(ExportError::ItemNotFound { group_id: 0, index: 3 })
        ));
        assert_eq!(session.item_node(1, 5).unwrap().text(), "row 5");
    }

    #[test]
    fn test_highlight_replacement() {
        let mut session = ScanSession::new();
        session.rescan(tree_with_lists());

        session.set_highlight(0).unwrap();
        session.set_highlight(1).unwrap();
        assert_eq!(session.highlighted().map(|g| g.id), Some(1));

        assert!(!session.release_highlight(0));
        assert_eq!(session.highlighted().map(|g| g.id), Some(1));
        assert!(session.release_highlight(1));
        assert!(session.highlighted().is_none());
        assert!(!session.release_highlight(1));
    }

    #[test]
    fn test_highlight_unknown_group_keeps_state() {
        let mut session = ScanSession::new();
        session.rescan(tree_with_lists());
        session.set_highlight(0).unwrap();

        assert!(session.set_highlight(7).is_err());
        assert_eq!(session.highlighted().map(|g| g.id), Some(0));
    }

    #[test]
    fn test_rescan_clears_everything() {
        let mut session = ScanSession::new();
        session.rescan(tree_with_lists());
        session.set_highlight(1).unwrap();

        session.rescan(DomTree::new(ElementNode::new("BODY")));
        assert!(session.groups().is_empty());
        assert!(session.highlighted().is_none());
        assert_eq!(session.tree().unwrap().count_elements(), 1);
    }
}
