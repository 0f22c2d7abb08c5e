use std::hash::Hash;
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::view_model::TreeViewModel;

/// When indent guides are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IndentGuideMode {
    None,
    /// Only while the pointer is over the tree.
    #[default]
    OnHover,
    Always,
}

/// Active indent guides: the guides of the expanded parents of focused and
/// selected rows are highlighted.
///
/// Recomputing is debounced. Changes call [`IndentGuides::schedule`], and the
/// active set is settled by [`IndentGuides::tick`] once the delay has passed.
#[derive(Clone, Debug)]
pub struct IndentGuides<N> {
    mode: IndentGuideMode,
    delay: Duration,
    deadline: Option<Instant>,
    active: FxHashSet<N>,
}

impl<N: Copy + Eq + Hash> IndentGuides<N> {
    pub fn new(mode: IndentGuideMode, delay: Duration) -> Self {
        Self {
            mode,
            delay,
            deadline: None,
            active: FxHashSet::default(),
        }
    }

    pub const fn mode(&self) -> IndentGuideMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: IndentGuideMode) {
        self.mode = mode;
        if mode == IndentGuideMode::None {
            self.active.clear();
            self.deadline = None;
        }
    }

    pub const fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Cycles None → OnHover → Always.
    pub fn cycle_mode(&mut self) -> IndentGuideMode {
        let next = match self.mode {
            IndentGuideMode::None => IndentGuideMode::OnHover,
            IndentGuideMode::OnHover => IndentGuideMode::Always,
            IndentGuideMode::Always => IndentGuideMode::None,
        };
        self.set_mode(next);
        next
    }

    /// Returns `true` if guides are drawn given the hover state.
    pub const fn is_visible(&self, hovered: bool) -> bool {
        match self.mode {
            IndentGuideMode::None => false,
            IndentGuideMode::OnHover => hovered,
            IndentGuideMode::Always => true,
        }
    }

    /// Restarts the debounce timer.
    pub fn schedule(&mut self, now: Instant) {
        if self.mode != IndentGuideMode::None {
            self.deadline = Some(now + self.delay);
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Settles the active set once the debounce delay has elapsed.
    ///
    /// Returns `true` if the active set changed.
    pub fn tick(
        &mut self,
        now: Instant,
        view: &TreeViewModel<N>,
        nodes: impl IntoIterator<Item = N>,
    ) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.recompute(view, nodes)
            }
            _ => false,
        }
    }

    /// Recomputes immediately; returns `true` if the active set changed.
    pub fn recompute(&mut self, view: &TreeViewModel<N>, nodes: impl IntoIterator<Item = N>) -> bool {
        let mut active = FxHashSet::default();
        for node in nodes {
            let Some(row) = view.row_of(node) else {
                continue;
            };
            if row.is_collapsible() && !row.is_collapsed() && row.render_count() > 1 {
                active.insert(node);
            } else if let Some(parent) = row.parent() {
                active.insert(parent);
            }
        }
        if active == self.active {
            return false;
        }
        self.active = active;
        true
    }

    pub fn is_active(&self, node: N) -> bool {
        self.active.contains(&node)
    }

    /// Per guide column of a row, whether the ancestor owning it is active.
    pub fn active_levels(&self, view: &TreeViewModel<N>, node: N) -> SmallVec<[bool; 8]> {
        let mut levels: SmallVec<[bool; 8]> = std::iter::successors(view.parent(node), |current| {
            view.parent(*current)
        })
        .map(|ancestor| self.active.contains(&ancestor))
        .collect();
        levels.reverse();
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::find::FilterResult;
    use crate::model::UniformRowHeight;
    use crate::test_model::TestTree;

    fn view(tree: &TestTree) -> TreeViewModel<usize> {
        let mut view = TreeViewModel::new(false);
        view.refresh_index(tree, None);
        view.rebuild(tree, |_: &TestTree, _: usize, _| FilterResult::default(), &UniformRowHeight(1));
        view
    }

    #[test]
    fn leaf_activates_its_parent_and_parent_itself() {
        let tree = TestTree::from_outline("a\n  b\n    c\n  d");
        let view = view(&tree);
        let mut guides = IndentGuides::new(IndentGuideMode::Always, Duration::ZERO);
        assert!(guides.recompute(&view, [tree.find("c")]));
        assert!(guides.is_active(tree.find("b")));
        assert!(!guides.is_active(tree.find("a")));
        assert!(guides.recompute(&view, [tree.find("a")]));
        assert!(guides.is_active(tree.find("a")));
        assert_eq!(guides.active_levels(&view, tree.find("c")).as_slice(), &[true, false]);
    }

    #[test]
    fn debounce_waits_for_the_delay() {
        let tree = TestTree::from_outline("a\n  b");
        let view = view(&tree);
        let mut guides = IndentGuides::new(IndentGuideMode::OnHover, Duration::from_millis(100));
        let start = Instant::now();
        guides.schedule(start);
        assert!(!guides.tick(start + Duration::from_millis(50), &view, [tree.find("b")]));
        assert!(guides.is_pending());
        assert!(guides.tick(start + Duration::from_millis(100), &view, [tree.find("b")]));
        assert!(!guides.is_pending());
        assert!(guides.is_active(tree.find("a")));
    }

    #[test]
    fn visibility_follows_mode() {
        let mut guides: IndentGuides<usize> = IndentGuides::new(IndentGuideMode::None, Duration::ZERO);
        assert!(!guides.is_visible(true));
        assert_eq!(guides.cycle_mode(), IndentGuideMode::OnHover);
        assert!(!guides.is_visible(false));
        assert!(guides.is_visible(true));
        assert_eq!(guides.cycle_mode(), IndentGuideMode::Always);
        assert!(guides.is_visible(false));
    }
}
