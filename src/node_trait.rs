use std::cell::OnceCell;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::model::{TreeModel, TreeSplice};
use crate::view_model::NodeIndex;

/// Which selection-like concept a trait tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraitKind {
    Focus,
    Selection,
    Anchor,
}

/// What triggered a trait change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// Programmatic call.
    #[default]
    Api,
    Keyboard,
    Mouse,
}

/// Notification carried by the focus/selection/anchor emitters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraitChangeEvent<N> {
    pub kind: TraitKind,
    pub nodes: Vec<N>,
    pub origin: ChangeOrigin,
}

/// Ordered set of nodes for one trait.
///
/// Membership checks go through a hash set built on first use after each
/// change.
#[derive(Clone, Debug)]
pub struct NodeTrait<N> {
    kind: TraitKind,
    nodes: Vec<N>,
    set: OnceCell<FxHashSet<N>>,
}

impl<N: Copy + Eq + Hash> NodeTrait<N> {
    pub const fn new(kind: TraitKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            set: OnceCell::new(),
        }
    }

    pub const fn kind(&self) -> TraitKind {
        self.kind
    }

    /// Replaces the tracked nodes.
    ///
    /// Returns `None` when the new sequence equals the current one, whatever
    /// the origin.
    pub fn set(&mut self, nodes: Vec<N>, origin: ChangeOrigin) -> Option<TraitChangeEvent<N>> {
        if nodes == self.nodes {
            return None;
        }
        Some(self.set_forced(nodes, origin))
    }

    /// Replaces the tracked nodes and always notifies, even when the set is
    /// unchanged.
    pub fn set_forced(&mut self, nodes: Vec<N>, origin: ChangeOrigin) -> TraitChangeEvent<N> {
        self.replace(nodes);
        TraitChangeEvent {
            kind: self.kind,
            nodes: self.nodes.clone(),
            origin,
        }
    }

    /// Replaces the tracked nodes without producing a notification.
    pub fn set_silent(&mut self, nodes: Vec<N>) {
        self.replace(nodes);
    }

    fn replace(&mut self, nodes: Vec<N>) {
        self.nodes = nodes;
        self.set = OnceCell::new();
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    pub fn first(&self) -> Option<N> {
        self.nodes.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn has(&self, node: N) -> bool {
        self.set
            .get_or_init(|| self.nodes.iter().copied().collect())
            .contains(&node)
    }

    /// Elements of the tracked nodes that still exist in the model.
    pub fn elements<'m, M>(&self, model: &'m M) -> Vec<&'m M::Element>
    where
        M: TreeModel<Node = N>,
    {
        self.nodes
            .iter()
            .filter(|node| model.contains(**node))
            .map(|node| model.element(*node))
            .collect()
    }

    /// Reconciles the tracked nodes with a structural change.
    ///
    /// `previous` is the index from before the splice and is used to walk
    /// deleted subtrees. Without identities, deleted nodes are dropped and a
    /// regular change notification is returned. With identities, a deleted
    /// node is replaced by the inserted node carrying the same id when that
    /// node is visible, and the update is silent.
    pub fn on_did_model_splice(
        &mut self,
        splice: &TreeSplice<N>,
        previous: &NodeIndex<N>,
        current: &NodeIndex<N>,
        is_visible: impl Fn(N) -> bool,
        fallback: impl FnOnce() -> Option<N>,
    ) -> Option<TraitChangeEvent<N>> {
        if self.nodes.is_empty() || splice.deleted.is_empty() {
            return None;
        }

        if !previous.has_identity() || !current.has_identity() {
            let mut deleted = FxHashSet::default();
            for root in &splice.deleted {
                previous.walk(*root, |node| {
                    deleted.insert(node);
                });
            }
            let nodes = self
                .nodes
                .iter()
                .copied()
                .filter(|node| !deleted.contains(node))
                .collect();
            let event = self.set(nodes, ChangeOrigin::Api);
            if event.is_some() {
                tracing::debug!(kind = ?self.kind, len = self.nodes.len(), "trait pruned after splice");
            }
            return event;
        }

        let mut deleted_ids: FxHashSet<&str> = FxHashSet::default();
        for root in &splice.deleted {
            previous.walk(*root, |node| {
                if let Some(id) = previous.id(node) {
                    deleted_ids.insert(id);
                }
            });
        }
        let mut inserted: FxHashMap<&str, N> = FxHashMap::default();
        for root in &splice.inserted {
            current.walk(*root, |node| {
                if let Some(id) = current.id(node) {
                    inserted.insert(id, node);
                }
            });
        }

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.iter().copied() {
            match previous.id(node) {
                Some(id) if deleted_ids.contains(id) => {
                    if let Some(replacement) = inserted.get(id).copied()
                        && is_visible(replacement)
                    {
                        nodes.push(replacement);
                    }
                }
                _ if current.contains(node) => nodes.push(node),
                _ => {}
            }
        }
        if nodes.is_empty() {
            nodes.extend(fallback());
        }
        tracing::debug!(kind = ?self.kind, len = nodes.len(), "trait resynced by identity");
        self.set_silent(nodes);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_model::{TestTree, label_id};

    fn index(tree: &TestTree, identity: bool) -> NodeIndex<usize> {
        if identity {
            NodeIndex::build(tree, Some(&label_id))
        } else {
            NodeIndex::build(tree, None)
        }
    }

    #[test]
    fn sequence_equal_set_is_silent() {
        let mut selection = NodeTrait::new(TraitKind::Selection);
        assert!(selection.set(vec![1, 2], ChangeOrigin::Api).is_some());
        assert!(selection.set(vec![1, 2], ChangeOrigin::Api).is_none());
        assert!(selection.set(vec![2, 1], ChangeOrigin::Api).is_some());
        assert!(selection.set(vec![2, 1], ChangeOrigin::Keyboard).is_none());
        assert!(selection.set(vec![2, 1], ChangeOrigin::Mouse).is_none());
        let event = selection.set_forced(vec![2, 1], ChangeOrigin::Mouse);
        assert_eq!(event.origin, ChangeOrigin::Mouse);
        assert_eq!(event.nodes, vec![2, 1]);
    }

    #[test]
    fn membership_tracks_latest_set() {
        let mut focus = NodeTrait::new(TraitKind::Focus);
        focus.set(vec![3], ChangeOrigin::Api);
        assert!(focus.has(3));
        focus.set(vec![4], ChangeOrigin::Api);
        assert!(!focus.has(3));
        assert!(focus.has(4));
    }

    #[test]
    fn deleting_sole_member_without_identity_empties_trait() {
        let mut tree = TestTree::from_outline("a\n  b\n    c\nd");
        let before = index(&tree, false);
        let mut selection = NodeTrait::new(TraitKind::Selection);
        let c = tree.find("c");
        selection.set(vec![c], ChangeOrigin::Api);

        tree.remove(tree.find("b"));
        let after = index(&tree, false);
        let splice = before.diff(&after);
        let event = selection.on_did_model_splice(&splice, &before, &after, |_| true, || None);

        assert!(selection.is_empty());
        assert_eq!(event.map(|event| event.nodes), Some(Vec::new()));
    }

    #[test]
    fn identity_remaps_to_reinserted_node_silently() {
        let mut tree = TestTree::from_outline("a\n  b\nd");
        let before = index(&tree, true);
        let b = tree.find("b");
        let mut focus = NodeTrait::new(TraitKind::Focus);
        focus.set(vec![b], ChangeOrigin::Api);

        tree.remove(b);
        let b2 = tree.add(Some(tree.find("a")), "b");
        let after = index(&tree, true);
        let splice = before.diff(&after);
        let event = focus.on_did_model_splice(&splice, &before, &after, |_| true, || None);

        assert_eq!(event, None);
        assert_eq!(focus.nodes(), &[b2]);
        assert_eq!(focus.elements(&tree), vec!["b"]);
    }

    #[test]
    fn identity_drops_invisible_replacement_and_falls_back() {
        let mut tree = TestTree::from_outline("a\n  b\nd");
        let before = index(&tree, true);
        let b = tree.find("b");
        let mut focus = NodeTrait::new(TraitKind::Focus);
        focus.set(vec![b], ChangeOrigin::Api);

        tree.remove(b);
        let b2 = tree.add(Some(tree.find("a")), "b");
        let after = index(&tree, true);
        let splice = before.diff(&after);
        let first = tree.find("a");
        focus.on_did_model_splice(&splice, &before, &after, |node| node != b2, || Some(first));

        assert_eq!(focus.nodes(), &[first]);
    }

    #[test]
    fn untouched_members_survive_identity_resync() {
        let mut tree = TestTree::from_outline("a\n  b\nd");
        let before = index(&tree, true);
        let (b, d) = (tree.find("b"), tree.find("d"));
        let mut selection = NodeTrait::new(TraitKind::Selection);
        selection.set(vec![d, b], ChangeOrigin::Api);

        tree.remove(b);
        let after = index(&tree, true);
        let splice = before.diff(&after);
        selection.on_did_model_splice(&splice, &before, &after, |_| true, || None);

        assert_eq!(selection.nodes(), &[d]);
    }
}
