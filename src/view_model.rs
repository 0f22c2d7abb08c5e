use std::hash::Hash;

use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

use crate::find::{FilterData, FilterResult};
use crate::model::{IdentityProvider, ListDelegate, TreeModel, TreeSplice, TreeVisibility};

/// Snapshot of the model's structure, rebuilt on every refresh.
///
/// The previous snapshot is what lets the view walk subtrees that are no
/// longer present in the model.
#[derive(Clone, Debug)]
pub struct NodeIndex<N> {
    entries: FxHashMap<N, IndexEntry<N>>,
    identity: bool,
}

#[derive(Clone, Debug)]
struct IndexEntry<N> {
    parent: Option<N>,
    children: SmallVec<[N; 4]>,
    collapsible: bool,
    id: Option<String>,
}

impl<N: Copy + Eq + Hash> Default for NodeIndex<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> NodeIndex<N> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            identity: false,
        }
    }

    /// Indexes every node of the model, recording ids when a provider is given.
    pub fn build<M>(model: &M, identity: Option<&dyn IdentityProvider<M::Element>>) -> Self
    where
        M: TreeModel<Node = N>,
    {
        let capacity = model.size_hint();
        let mut entries = FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher);
        let mut stack: Vec<(Option<N>, N)> = model
            .roots()
            .iter()
            .rev()
            .map(|root| (None, *root))
            .collect();
        while let Some((parent, node)) = stack.pop() {
            let children = model.children(node);
            entries.insert(
                node,
                IndexEntry {
                    parent,
                    children: children.iter().copied().collect(),
                    collapsible: model.is_collapsible(node),
                    id: identity.map(|provider| provider.id(model.element(node))),
                },
            );
            stack.extend(children.iter().rev().map(|child| (Some(node), *child)));
        }
        Self {
            entries,
            identity: identity.is_some(),
        }
    }

    pub fn contains(&self, node: N) -> bool {
        self.entries.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parent(&self, node: N) -> Option<N> {
        self.entries.get(&node).and_then(|entry| entry.parent)
    }

    pub fn children(&self, node: N) -> &[N] {
        self.entries
            .get(&node)
            .map_or(&[], |entry| entry.children.as_slice())
    }

    pub fn is_collapsible(&self, node: N) -> bool {
        self.entries.get(&node).is_some_and(|entry| entry.collapsible)
    }

    /// Identity recorded for the node, if the index was built with a provider.
    pub fn id(&self, node: N) -> Option<&str> {
        self.entries.get(&node).and_then(|entry| entry.id.as_deref())
    }

    pub const fn has_identity(&self) -> bool {
        self.identity
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, node: N) -> impl Iterator<Item = N> + '_ {
        std::iter::successors(self.parent(node), |current| self.parent(*current))
    }

    /// Depth-first walk of a subtree, the root included.
    pub fn walk(&self, root: N, mut visit: impl FnMut(N)) {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
    }

    /// Nodes together with their ids.
    pub fn ids(&self) -> impl Iterator<Item = (N, &str)> + '_ {
        self.entries
            .iter()
            .filter_map(|(node, entry)| entry.id.as_deref().map(|id| (*node, id)))
    }

    /// Roots of the subtrees removed from `self` and added in `next`.
    pub fn diff(&self, next: &Self) -> TreeSplice<N> {
        let deleted = self
            .entries
            .iter()
            .filter(|(node, entry)| {
                !next.contains(**node) && entry.parent.is_none_or(|parent| next.contains(parent))
            })
            .map(|(node, _)| *node)
            .collect();
        let inserted = next
            .entries
            .iter()
            .filter(|(node, entry)| {
                !self.contains(**node) && entry.parent.is_none_or(|parent| self.contains(parent))
            })
            .map(|(node, _)| *node)
            .collect();
        TreeSplice { deleted, inserted }
    }
}

/// A rendered row of the flattened tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedRow<N> {
    pub(crate) node: N,
    pub(crate) depth: u16,
    pub(crate) parent: Option<N>,
    pub(crate) collapsible: bool,
    pub(crate) collapsed: bool,
    pub(crate) height: u32,
    pub(crate) render_count: usize,
    pub(crate) is_tail_stack: SmallVec<[bool; 8]>,
}

impl<N: Copy> RenderedRow<N> {
    pub const fn node(&self) -> N {
        self.node
    }

    pub const fn depth(&self) -> u16 {
        self.depth
    }

    pub const fn parent(&self) -> Option<N> {
        self.parent
    }

    pub const fn is_collapsible(&self) -> bool {
        self.collapsible
    }

    pub const fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Rows occupied by this node and its rendered descendants.
    pub const fn render_count(&self) -> usize {
        self.render_count
    }

    /// For each ancestor level, whether that ancestor is the last visible sibling.
    pub fn is_tail_stack(&self) -> &[bool] {
        &self.is_tail_stack
    }
}

/// Collapse state and the filtered, flattened row list.
#[derive(Clone, Debug)]
pub struct TreeViewModel<N> {
    collapsed: FxHashMap<N, bool>,
    collapse_by_default: bool,
    index: NodeIndex<N>,
    rows: Vec<RenderedRow<N>>,
    row_index: FxHashMap<N, usize>,
    filter_data: FxHashMap<N, FilterData>,
}

impl<N: Copy + Eq + Hash> TreeViewModel<N> {
    pub fn new(collapse_by_default: bool) -> Self {
        Self {
            collapsed: FxHashMap::default(),
            collapse_by_default,
            index: NodeIndex::new(),
            rows: Vec::new(),
            row_index: FxHashMap::default(),
            filter_data: FxHashMap::default(),
        }
    }

    pub const fn set_collapse_by_default(&mut self, collapse_by_default: bool) {
        self.collapse_by_default = collapse_by_default;
    }

    pub const fn index(&self) -> &NodeIndex<N> {
        &self.index
    }

    pub fn rows(&self) -> &[RenderedRow<N>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&RenderedRow<N>> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// List index of a rendered node.
    pub fn index_of(&self, node: N) -> Option<usize> {
        self.row_index.get(&node).copied()
    }

    pub fn row_of(&self, node: N) -> Option<&RenderedRow<N>> {
        self.index_of(node).and_then(|index| self.rows.get(index))
    }

    pub fn node_at(&self, index: usize) -> Option<N> {
        self.rows.get(index).map(|row| row.node)
    }

    pub fn is_rendered(&self, node: N) -> bool {
        self.row_index.contains_key(&node)
    }

    /// Rows occupied by a rendered node's expanded subtree.
    pub fn render_count(&self, node: N) -> Option<usize> {
        self.row_of(node).map(|row| row.render_count)
    }

    pub fn parent(&self, node: N) -> Option<N> {
        self.index.parent(node)
    }

    pub fn filter_data(&self, node: N) -> Option<&FilterData> {
        self.filter_data.get(&node)
    }

    pub fn is_collapsed(&self, node: N) -> bool {
        self.collapsed
            .get(&node)
            .copied()
            .unwrap_or(self.collapse_by_default)
    }

    /// Replaces the structural snapshot and returns the splice against the
    /// previous one, together with that previous snapshot.
    pub fn refresh_index<M>(
        &mut self,
        model: &M,
        identity: Option<&dyn IdentityProvider<M::Element>>,
    ) -> (TreeSplice<N>, NodeIndex<N>)
    where
        M: TreeModel<Node = N>,
    {
        let next = NodeIndex::build(model, identity);
        let splice = self.index.diff(&next);
        let previous = std::mem::replace(&mut self.index, next);
        let index = &self.index;
        self.collapsed.retain(|node, _| index.contains(*node));
        (splice, previous)
    }

    /// Sets collapse state (`None` toggles); returns the nodes whose state changed.
    pub fn set_collapsed<M>(
        &mut self,
        model: &M,
        node: N,
        collapsed: Option<bool>,
        recursive: bool,
    ) -> Vec<(N, bool)>
    where
        M: TreeModel<Node = N>,
    {
        if !model.contains(node) || !model.is_collapsible(node) {
            return Vec::new();
        }
        let target = collapsed.unwrap_or_else(|| !self.is_collapsed(node));
        let mut changes = Vec::new();
        if recursive {
            let mut stack = vec![node];
            while let Some(current) = stack.pop() {
                if model.is_collapsible(current) {
                    self.store_collapsed(current, target, &mut changes);
                }
                stack.extend(model.children(current).iter().rev().copied());
            }
        } else {
            self.store_collapsed(node, target, &mut changes);
        }
        changes
    }

    /// Expands every ancestor of the node.
    pub fn expand_to(&mut self, node: N) -> Vec<(N, bool)> {
        let ancestors: SmallVec<[N; 16]> = self.index.ancestors(node).collect();
        let mut changes = Vec::new();
        for ancestor in ancestors.into_iter().rev() {
            if self.index.is_collapsible(ancestor) {
                self.store_collapsed(ancestor, false, &mut changes);
            }
        }
        changes
    }

    /// Applies one collapse state to every collapsible node.
    pub fn set_all_collapsed<M>(&mut self, model: &M, collapsed: bool) -> Vec<(N, bool)>
    where
        M: TreeModel<Node = N>,
    {
        let mut changes = Vec::new();
        for root in model.roots() {
            changes.extend(self.set_collapsed(model, *root, Some(collapsed), true));
        }
        changes
    }

    /// Restores collapse state for every indexed node whose id is known.
    pub fn apply_collapsed_ids(&mut self, expanded: impl Fn(&str) -> Option<bool>) {
        let updates: Vec<(N, bool)> = self
            .index
            .ids()
            .filter_map(|(node, id)| expanded(id).map(|is_expanded| (node, !is_expanded)))
            .collect();
        for (node, collapsed) in updates {
            if self.index.is_collapsible(node) {
                self.collapsed.insert(node, collapsed);
            }
        }
    }

    fn store_collapsed(&mut self, node: N, collapsed: bool, changes: &mut Vec<(N, bool)>) {
        if self.is_collapsed(node) != collapsed {
            changes.push((node, collapsed));
        }
        self.collapsed.insert(node, collapsed);
    }

    /// Rebuilds the rendered rows.
    ///
    /// Children of collapsed nodes are still filtered (a `Recurse` node needs
    /// them to decide its own visibility) but produce no rows.
    pub fn rebuild<M, F>(&mut self, model: &M, mut filter: F, delegate: &dyn ListDelegate<M>)
    where
        M: TreeModel<Node = N>,
        F: FnMut(&M, N, TreeVisibility) -> FilterResult,
    {
        self.rows.clear();
        self.row_index.clear();
        self.filter_data.clear();
        let hint = model.size_hint();
        self.rows.reserve(hint);
        self.row_index.reserve(hint);
        let mut is_tail_stack: SmallVec<[bool; 8]> = SmallVec::new();
        for root in model.roots() {
            self.build_node(
                model,
                *root,
                0,
                None,
                TreeVisibility::Visible,
                true,
                &mut is_tail_stack,
                &mut filter,
                delegate,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node<M, F>(
        &mut self,
        model: &M,
        node: N,
        depth: u16,
        parent: Option<N>,
        parent_visibility: TreeVisibility,
        render: bool,
        is_tail_stack: &mut SmallVec<[bool; 8]>,
        filter: &mut F,
        delegate: &dyn ListDelegate<M>,
    ) -> (bool, Option<usize>)
    where
        M: TreeModel<Node = N>,
        F: FnMut(&M, N, TreeVisibility) -> FilterResult,
    {
        let FilterResult { visibility, data } = filter(model, node, parent_visibility);
        if visibility == TreeVisibility::Hidden {
            return (false, None);
        }

        let collapsible = model.is_collapsible(node);
        let collapsed = collapsible && self.is_collapsed(node);
        let row = render.then(|| {
            let index = self.rows.len();
            self.rows.push(RenderedRow {
                node,
                depth,
                parent,
                collapsible,
                collapsed,
                height: delegate.height(model, node),
                render_count: 1,
                is_tail_stack: is_tail_stack.clone(),
            });
            index
        });

        let mut any_child_visible = false;
        let mut last_child_row = None;
        for child in model.children(node).iter().copied() {
            is_tail_stack.push(false);
            let (visible, child_row) = self.build_node(
                model,
                child,
                depth + 1,
                Some(node),
                visibility,
                render && !collapsed,
                is_tail_stack,
                filter,
                delegate,
            );
            is_tail_stack.pop();
            if visible {
                any_child_visible = true;
                if child_row.is_some() {
                    last_child_row = child_row;
                }
            }
        }

        if visibility == TreeVisibility::Recurse && !any_child_visible {
            if let Some(index) = row {
                self.rows.truncate(index);
            }
            return (false, None);
        }

        self.filter_data.insert(node, data);
        if let Some(index) = row {
            let end = self.rows.len();
            self.rows[index].render_count = end - index;
            if let Some(last) = last_child_row {
                // The last visible child closes the guide at this level.
                let slot = usize::from(depth);
                for row in &mut self.rows[last..end] {
                    row.is_tail_stack[slot] = true;
                }
            }
            self.row_index.insert(node, index);
        }
        (true, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UniformRowHeight;
    use crate::test_model::{TestTree, label_id};

    fn visible(_: &TestTree, _: usize, parent: TreeVisibility) -> FilterResult {
        let _ = parent;
        FilterResult::default()
    }

    fn rebuild(vm: &mut TreeViewModel<usize>, tree: &TestTree) {
        vm.refresh_index(tree, None);
        vm.rebuild(tree, visible, &UniformRowHeight(1));
    }

    fn labels(vm: &TreeViewModel<usize>, tree: &TestTree) -> Vec<String> {
        vm.rows()
            .iter()
            .map(|row| tree.label(row.node).to_owned())
            .collect()
    }

    #[test]
    fn builds_rows_with_expansion() {
        let tree = TestTree::from_outline("a\n  b\n    c\n    d\n  e\nf");
        let mut vm = TreeViewModel::new(false);
        rebuild(&mut vm, &tree);
        assert_eq!(labels(&vm, &tree), vec!["a", "b", "c", "d", "e", "f"]);
        let depths: Vec<_> = vm.rows().iter().map(|row| row.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1, 0]);
        assert_eq!(vm.render_count(tree.find("a")), Some(5));
        assert_eq!(vm.render_count(tree.find("b")), Some(3));
        assert_eq!(vm.render_count(tree.find("f")), Some(1));
        assert_eq!(vm.row_of(tree.find("d")).map(|row| row.is_tail_stack().to_vec()), Some(vec![false, true]));
        assert_eq!(vm.row_of(tree.find("e")).map(|row| row.is_tail_stack().to_vec()), Some(vec![true]));
    }

    #[test]
    fn collapsed_nodes_hide_descendants() {
        let tree = TestTree::from_outline("a\n  b\n    c\n  d");
        let mut vm = TreeViewModel::new(false);
        vm.refresh_index(&tree, None);
        let changes = vm.set_collapsed(&tree, tree.find("b"), Some(true), false);
        assert_eq!(changes, vec![(tree.find("b"), true)]);
        vm.rebuild(&tree, visible, &UniformRowHeight(1));
        assert_eq!(labels(&vm, &tree), vec!["a", "b", "d"]);
        assert!(vm.row_of(tree.find("b")).is_some_and(RenderedRow::is_collapsed));
        assert!(vm.set_collapsed(&tree, tree.find("c"), Some(true), false).is_empty());
    }

    #[test]
    fn toggling_recursively_applies_one_state() {
        let tree = TestTree::from_outline("a\n  b\n    c\n  d\n    e");
        let mut vm = TreeViewModel::new(false);
        vm.refresh_index(&tree, None);
        let changes = vm.set_collapsed(&tree, tree.find("a"), None, true);
        assert_eq!(changes.len(), 3);
        assert!(vm.is_collapsed(tree.find("d")));
        let changes = vm.expand_to(tree.find("e"));
        assert_eq!(changes, vec![(tree.find("a"), false), (tree.find("d"), false)]);
    }

    #[test]
    fn recurse_nodes_need_a_visible_descendant() {
        let tree = TestTree::from_outline("a\n  b\n  c\nd\n  e");
        let mut vm = TreeViewModel::new(false);
        vm.refresh_index(&tree, None);
        let keep = tree.find("c");
        vm.rebuild(
            &tree,
            |_: &TestTree, node: usize, _| FilterResult {
                visibility: if node == keep {
                    TreeVisibility::Visible
                } else {
                    TreeVisibility::Recurse
                },
                data: FilterData::Default,
            },
            &UniformRowHeight(1),
        );
        assert_eq!(labels(&vm, &tree), vec!["a", "c"]);
        assert_eq!(vm.row_of(keep).map(|row| row.is_tail_stack().to_vec()), Some(vec![true]));
    }

    #[test]
    fn collapsed_recurse_node_stays_visible_through_hidden_match() {
        let tree = TestTree::from_outline("a\n  b\nc");
        let mut vm = TreeViewModel::new(true);
        vm.refresh_index(&tree, None);
        let keep = tree.find("b");
        let mut evaluated = 0;
        vm.rebuild(
            &tree,
            |_: &TestTree, node: usize, _| {
                evaluated += 1;
                FilterResult {
                    visibility: if node == keep {
                        TreeVisibility::Visible
                    } else {
                        TreeVisibility::Recurse
                    },
                    data: FilterData::Default,
                }
            },
            &UniformRowHeight(1),
        );
        assert_eq!(evaluated, 3);
        assert_eq!(labels(&vm, &tree), vec!["a"]);
        assert!(vm.filter_data(keep).is_some());
    }

    #[test]
    fn index_diff_reports_subtree_roots() {
        let mut tree = TestTree::from_outline("a\n  b\n    c\nd");
        let mut vm = TreeViewModel::new(false);
        vm.refresh_index(&tree, Some(&label_id));
        let b = tree.find("b");
        let c = tree.find("c");
        tree.remove(b);
        let b2 = tree.add(Some(tree.find("a")), "b");
        let c2 = tree.add(Some(b2), "c");
        let (splice, previous) = vm.refresh_index(&tree, Some(&label_id));
        assert_eq!(splice.deleted, vec![b]);
        assert_eq!(splice.inserted, vec![b2]);
        assert_eq!(previous.children(b), &[c]);
        assert_eq!(vm.index().id(c2), Some("c"));
        assert!(vm.index().has_identity());
    }

    #[test]
    fn collapse_state_is_restored_by_id() {
        let tree = TestTree::from_outline("a\n  b\n    c");
        let mut vm = TreeViewModel::new(true);
        vm.refresh_index(&tree, Some(&label_id));
        vm.apply_collapsed_ids(|id| (id == "a").then_some(true));
        assert!(!vm.is_collapsed(tree.find("a")));
        assert!(vm.is_collapsed(tree.find("b")));
    }
}
