use std::borrow::Cow;
use std::fmt::Debug;
use std::hash::Hash;

/// Tree data contract consumed by the view.
///
/// A proper forest is expected (not a DAG):
/// - no cycles (DFS traversal is used directly);
/// - each node has at most one parent;
/// - node handles are stable while the node exists and are never reused for a
///   different node (a re-created node gets a new handle).
///
/// The view never owns the data: every operation that needs it takes `&M`.
pub trait TreeModel {
    /// Opaque node handle, distinct from the payload.
    type Node: Copy + Eq + Hash + Debug;
    /// User payload attached to each node.
    type Element;

    /// Returns the top-level nodes in a deterministic order.
    fn roots(&self) -> &[Self::Node];
    /// Returns the node's children in a deterministic order.
    fn children(&self, node: Self::Node) -> &[Self::Node];
    /// Returns the payload of a node.
    fn element(&self, node: Self::Node) -> &Self::Element;
    /// Returns `true` if the node exists in the model.
    fn contains(&self, node: Self::Node) -> bool;
    /// Returns `true` if the node can be expanded or collapsed.
    fn is_collapsible(&self, node: Self::Node) -> bool {
        !self.children(node).is_empty()
    }
    /// Returns an approximate size hint (not required to be exact).
    fn size_hint(&self) -> usize {
        0
    }
}

/// Filter verdict for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeVisibility {
    /// The node and its subtree are not rendered.
    Hidden,
    /// The node is rendered.
    #[default]
    Visible,
    /// The node is rendered only if one of its descendants is.
    Recurse,
}

/// Upstream visibility filter, applied before the find filter.
pub trait TreeFilter<T: TreeModel> {
    /// Returns `true` if the node matches the filter criteria.
    fn is_match(&self, model: &T, node: T::Node) -> bool;

    /// Returns the visibility of a node given its parent's visibility.
    ///
    /// Non-matching nodes stay visible when a descendant matches.
    fn visibility(&self, model: &T, node: T::Node, parent: TreeVisibility) -> TreeVisibility {
        let _ = parent;
        if self.is_match(model, node) {
            TreeVisibility::Visible
        } else {
            TreeVisibility::Recurse
        }
    }
}

impl<T, F> TreeFilter<T> for F
where
    T: TreeModel,
    F: Fn(&T, T::Node) -> bool,
{
    #[inline]
    fn is_match(&self, model: &T, node: T::Node) -> bool {
        self(model, node)
    }
}

/// Filter that matches every node.
#[derive(Clone, Copy, Debug)]
pub struct NoFilter;

impl<T: TreeModel> TreeFilter<T> for NoFilter {
    #[inline]
    fn is_match(&self, _model: &T, _node: T::Node) -> bool {
        true
    }
}

/// Maps an element to a stable identity, used by view state and trait resync.
pub trait IdentityProvider<E> {
    fn id(&self, element: &E) -> String;
}

impl<E, F> IdentityProvider<E> for F
where
    F: Fn(&E) -> String,
{
    #[inline]
    fn id(&self, element: &E) -> String {
        self(element)
    }
}

/// Label(s) used to match an element during find.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum NavigationLabel<'a> {
    #[default]
    None,
    One(Cow<'a, str>),
    Many(Vec<Cow<'a, str>>),
}

impl NavigationLabel<'_> {
    /// Iterates over the labels in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let (single, many) = match self {
            Self::None => (None, &[][..]),
            Self::One(label) => (Some(&**label), &[][..]),
            Self::Many(labels) => (None, labels.as_slice()),
        };
        single.into_iter().chain(many.iter().map(|label| &**label))
    }

    /// Returns `true` for multi-label elements.
    pub const fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }
}

/// Supplies find labels for elements.
pub trait KeyboardNavigationLabelProvider<E> {
    fn label<'a>(&self, element: &'a E) -> NavigationLabel<'a>;
}

impl<E, F> KeyboardNavigationLabelProvider<E> for F
where
    F: Fn(&E) -> String,
{
    fn label<'a>(&self, element: &'a E) -> NavigationLabel<'a> {
        NavigationLabel::One(Cow::Owned(self(element)))
    }
}

/// Row height source for the virtualized list.
pub trait ListDelegate<T: TreeModel> {
    fn height(&self, model: &T, node: T::Node) -> u32;
}

/// Every row has the same height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformRowHeight(pub u32);

impl Default for UniformRowHeight {
    fn default() -> Self {
        Self(1)
    }
}

impl<T: TreeModel> ListDelegate<T> for UniformRowHeight {
    #[inline]
    fn height(&self, _model: &T, _node: T::Node) -> u32 {
        self.0
    }
}

/// Structural edit: roots of removed and added subtrees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeSplice<N> {
    pub deleted: Vec<N>,
    pub inserted: Vec<N>,
}

impl<N> Default for TreeSplice<N> {
    fn default() -> Self {
        Self {
            deleted: Vec::new(),
            inserted: Vec::new(),
        }
    }
}

impl<N> TreeSplice<N> {
    pub const fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.inserted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_label_iterates_in_order() {
        let label = NavigationLabel::Many(vec![Cow::Borrowed("a"), Cow::Borrowed("b")]);
        assert_eq!(label.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(label.is_many());
        assert_eq!(NavigationLabel::None.iter().count(), 0);
        assert_eq!(
            NavigationLabel::One(Cow::Borrowed("x")).iter().collect::<Vec<_>>(),
            vec!["x"]
        );
    }
}
