//! Sticky ancestors: the chain of ancestor rows pinned at the top of the
//! viewport while scrolling through their subtrees.
//!
//! Positions and heights use the list's row units. A node's `position` is its
//! offset from the viewport top; it can be smaller than the stacked height of
//! the rows above it when the node is being pushed out by the end of its own
//! subtree.

use std::fmt;
use std::hash::Hash;

use smallvec::SmallVec;

use crate::error::{Result, TreeError};
use crate::list::ListLayout;
use crate::model::TreeSplice;
use crate::view_model::{NodeIndex, RenderedRow, TreeViewModel};

/// One pinned row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StickyScrollNode<N> {
    pub node: N,
    pub position: i64,
    pub height: u32,
    /// List index of the node itself.
    pub start_index: usize,
    /// List index of the node's last rendered descendant.
    pub end_index: usize,
}

impl<N> StickyScrollNode<N> {
    pub fn bottom(&self) -> i64 {
        self.position + i64::from(self.height)
    }
}

/// Pinned rows from the outermost ancestor to the innermost.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StickyScrollState<N> {
    nodes: Vec<StickyScrollNode<N>>,
}

impl<N> Default for StickyScrollState<N> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<N: Copy + Eq> StickyScrollState<N> {
    pub const fn new(nodes: Vec<StickyScrollNode<N>>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[StickyScrollNode<N>] {
        &self.nodes
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&StickyScrollNode<N>> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&StickyScrollNode<N>> {
        self.nodes.last()
    }

    /// Rows covered by the overlay.
    pub fn height(&self) -> u32 {
        self.last()
            .map_or(0, |last| u32::try_from(last.bottom().max(0)).unwrap_or(u32::MAX))
    }

    pub fn contains(&self, node: N) -> bool {
        self.nodes.iter().any(|sticky| sticky.node == node)
    }

    /// Pinned row covering viewport row `y`.
    pub fn hit_test(&self, y: u32) -> Option<&StickyScrollNode<N>> {
        let y = i64::from(y);
        self.nodes
            .iter()
            .rev()
            .find(|sticky| sticky.position <= y && y < sticky.bottom())
    }
}

/// Reduces an over-budget stack.
///
/// The returned stack must hold at most `max_count` rows and its last row
/// must end within `max_height`; a strategy that breaks this is reported as
/// [`TreeError::StickyConstraintViolation`].
pub trait StickyConstrain<N> {
    fn constrain(
        &self,
        nodes: Vec<StickyScrollNode<N>>,
        max_count: usize,
        max_height: f64,
    ) -> Vec<StickyScrollNode<N>>;
}

/// Truncates at the first row that crosses the height budget or the count limit.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultStickyConstrain;

impl<N> StickyConstrain<N> for DefaultStickyConstrain {
    fn constrain(
        &self,
        mut nodes: Vec<StickyScrollNode<N>>,
        max_count: usize,
        max_height: f64,
    ) -> Vec<StickyScrollNode<N>> {
        let cut = nodes
            .iter()
            .enumerate()
            .position(|(i, node)| i >= max_count || to_f64(node.bottom()) > max_height);
        if let Some(cut) = cut {
            nodes.truncate(cut);
        }
        nodes
    }
}

#[allow(clippy::cast_precision_loss)]
const fn to_f64(value: i64) -> f64 {
    value as f64
}

/// What a structural change means for the pinned rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StickyRefresh {
    /// A pinned node was removed: the stack must be recomputed.
    Recompute,
    /// The pinned nodes survive but a pinned subtree changed: redraw only.
    Rerender,
    Unchanged,
}

/// Computes the pinned-ancestor stack.
pub struct StickyScrollController<N> {
    max_item_count: usize,
    max_view_ratio: f64,
    padding_top: u32,
    constrain: Box<dyn StickyConstrain<N>>,
    state: StickyScrollState<N>,
    focus: StickyScrollFocus,
}

impl<N> fmt::Debug for StickyScrollController<N>
where
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickyScrollController")
            .field("max_item_count", &self.max_item_count)
            .field("max_view_ratio", &self.max_view_ratio)
            .field("padding_top", &self.padding_top)
            .field("state", &self.state)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

impl<N: Copy + Eq + Hash + fmt::Debug> StickyScrollController<N> {
    pub fn new(max_item_count: usize, max_view_ratio: f64, padding_top: u32) -> Self {
        Self {
            max_item_count,
            max_view_ratio,
            padding_top,
            constrain: Box::new(DefaultStickyConstrain),
            state: StickyScrollState::default(),
            focus: StickyScrollFocus::default(),
        }
    }

    pub fn set_constrain(&mut self, constrain: impl StickyConstrain<N> + 'static) {
        self.constrain = Box::new(constrain);
    }

    /// Applies new limits; the caller recomputes afterwards.
    pub const fn set_limits(&mut self, max_item_count: usize, max_view_ratio: f64, padding_top: u32) {
        self.max_item_count = max_item_count;
        self.max_view_ratio = max_view_ratio;
        self.padding_top = padding_top;
    }

    pub const fn max_item_count(&self) -> usize {
        self.max_item_count
    }

    pub const fn state(&self) -> &StickyScrollState<N> {
        &self.state
    }

    pub const fn focus(&self) -> &StickyScrollFocus {
        &self.focus
    }

    pub const fn focus_mut(&mut self) -> &mut StickyScrollFocus {
        &mut self.focus
    }

    /// Height budget for the overlay.
    pub fn max_height(&self, layout: &ListLayout) -> f64 {
        f64::from(layout.viewport_height()) * self.max_view_ratio
    }

    /// Recomputes the stack and replaces the state; returns `true` if it changed.
    pub fn update(&mut self, view: &TreeViewModel<N>, layout: &ListLayout) -> Result<bool> {
        let state = match node_at_height(layout, self.padding_top) {
            Some(first) if layout.scroll_top() > self.padding_top => {
                self.find_sticky_state(view, layout, first)?
            }
            _ => StickyScrollState::default(),
        };
        if state == self.state {
            return Ok(false);
        }
        tracing::debug!(count = state.count(), height = state.height(), "sticky state replaced");
        self.state = state;
        self.focus.on_state_change(self.state.count());
        Ok(true)
    }

    /// Drops the stack, e.g. when sticky scroll is disabled.
    pub fn clear(&mut self) {
        self.state = StickyScrollState::default();
        self.focus.on_state_change(0);
    }

    /// Height the overlay would cover once `node` is scrolled to the top of
    /// the viewport: its rendered ancestors, outermost first, within the
    /// item and height limits.
    pub fn height_above(&self, view: &TreeViewModel<N>, layout: &ListLayout, node: N) -> u32 {
        let mut ancestors: SmallVec<[N; 16]> = view.index().ancestors(node).collect();
        ancestors.reverse();
        let budget = self.max_height(layout);
        let mut height = 0u32;
        for ancestor in ancestors.into_iter().take(self.max_item_count) {
            let Some(row_height) = view.row_of(ancestor).map(RenderedRow::height) else {
                break;
            };
            if f64::from(height.saturating_add(row_height)) > budget {
                break;
            }
            height = height.saturating_add(row_height);
        }
        height
    }

    /// Moves keyboard focus onto the innermost pinned row.
    pub fn enter_focus(&mut self) -> bool {
        self.focus.enter(&self.state)
    }

    pub fn focus_next(&mut self, layout: &ListLayout) -> StickyFocusMove {
        self.focus.focus_next(&self.state, layout)
    }

    pub const fn focus_previous(&mut self) -> StickyFocusMove {
        self.focus.focus_previous()
    }

    /// Node of the focused pinned row.
    pub fn focused_node(&self) -> Option<N> {
        self.focus
            .focused()
            .and_then(|index| self.state.nodes.get(index))
            .map(|sticky| sticky.node)
    }

    /// Classifies a structural change against the current stack.
    pub fn on_model_splice(
        &self,
        splice: &TreeSplice<N>,
        index: &NodeIndex<N>,
        view: &TreeViewModel<N>,
    ) -> StickyRefresh {
        if self.state.is_empty() || splice.is_empty() {
            return StickyRefresh::Unchanged;
        }
        let moved = self.state.nodes.iter().any(|sticky| {
            !index.contains(sticky.node)
                || view.index_of(sticky.node) != Some(sticky.start_index)
                || view.render_count(sticky.node).map(|count| sticky.start_index + count - 1)
                    != Some(sticky.end_index)
        });
        if moved {
            return StickyRefresh::Recompute;
        }
        let touched = splice.inserted.iter().chain(&splice.deleted).any(|node| {
            index
                .parent(*node)
                .is_some_and(|parent| self.state.contains(parent))
        });
        if touched {
            StickyRefresh::Rerender
        } else {
            StickyRefresh::Unchanged
        }
    }

    fn find_sticky_state(
        &self,
        view: &TreeViewModel<N>,
        layout: &ListLayout,
        first_visible: usize,
    ) -> Result<StickyScrollState<N>> {
        let mut nodes: Vec<StickyScrollNode<N>> = Vec::new();
        let mut under_widget = first_visible;
        let mut stacked_height: i64 = 0;
        let mut next = self.next_sticky_node(view, layout, under_widget, None, stacked_height);

        while let Some(sticky) = next {
            stacked_height += i64::from(sticky.height);
            let previous = sticky.node;
            let below = u32::try_from(sticky.bottom().max(0)).unwrap_or(u32::MAX);
            nodes.push(sticky);
            if nodes.len() <= self.max_item_count {
                match node_at_height(layout, below) {
                    Some(index) => under_widget = index,
                    None => break,
                }
            }
            next = self.next_sticky_node(view, layout, under_widget, Some(previous), stacked_height);
        }

        Ok(StickyScrollState::new(self.constrain_nodes(nodes, layout)?))
    }

    fn next_sticky_node(
        &self,
        view: &TreeViewModel<N>,
        layout: &ListLayout,
        under_widget: usize,
        previous: Option<N>,
        stacked_height: i64,
    ) -> Option<StickyScrollNode<N>> {
        let candidate = view.node_at(under_widget)?;
        let ancestor = ancestor_under_previous(view, candidate, previous)?;
        if ancestor == candidate {
            if !is_uncollapsed_parent(view, candidate) {
                return None;
            }
            if top_aligns_with_stack(layout, under_widget, stacked_height) {
                return None;
            }
        }
        self.sticky_node(view, layout, ancestor, stacked_height)
    }

    fn sticky_node(
        &self,
        view: &TreeViewModel<N>,
        layout: &ListLayout,
        node: N,
        stacked_height: i64,
    ) -> Option<StickyScrollNode<N>> {
        let start_index = view.index_of(node)?;
        let render_count = view.render_count(node)?;
        let end_index = start_index + render_count - 1;
        let height = layout.element_height(start_index)?;
        let position = sticky_position(layout, end_index, stacked_height, height);
        Some(StickyScrollNode {
            node,
            position,
            height,
            start_index,
            end_index,
        })
    }

    fn constrain_nodes(
        &self,
        nodes: Vec<StickyScrollNode<N>>,
        layout: &ListLayout,
    ) -> Result<Vec<StickyScrollNode<N>>> {
        let Some(last) = nodes.last() else {
            return Ok(nodes);
        };
        let budget = self.max_height(layout);
        if nodes.len() <= self.max_item_count && to_f64(last.bottom()) <= budget {
            return Ok(nodes);
        }
        let constrained = self.constrain.constrain(nodes, self.max_item_count, budget);
        if let Some(last) = constrained.last()
            && (constrained.len() > self.max_item_count || to_f64(last.bottom()) > budget)
        {
            return Err(TreeError::StickyConstraintViolation {
                count: constrained.len(),
                max_count: self.max_item_count,
                bottom: last.bottom(),
                budget,
            });
        }
        Ok(constrained)
    }
}

fn node_at_height(layout: &ListLayout, height: u32) -> Option<usize> {
    layout.index_at(layout.scroll_top().saturating_add(height))
}

/// Walks up from `node` to the child of `previous`. Without a previous
/// sticky node this is the root of `node`'s branch.
fn ancestor_under_previous<N: Copy + Eq + Hash>(
    view: &TreeViewModel<N>,
    node: N,
    previous: Option<N>,
) -> Option<N> {
    let mut current = node;
    while let Some(parent) = view.parent(current) {
        if Some(parent) == previous {
            return Some(current);
        }
        current = parent;
    }
    previous.is_none().then_some(current)
}

fn is_uncollapsed_parent<N: Copy + Eq + Hash>(view: &TreeViewModel<N>, node: N) -> bool {
    view.render_count(node).is_some_and(|count| count > 1)
}

fn top_aligns_with_stack(layout: &ListLayout, index: usize, stacked_height: i64) -> bool {
    layout
        .element_top(index)
        .is_some_and(|top| i64::from(layout.scroll_top()) == i64::from(top) - stacked_height)
}

/// Stacked position, pushed up so the row never covers past the end of its
/// own subtree.
fn sticky_position(layout: &ListLayout, last_descendant: usize, stacked_top: i64, height: u32) -> i64 {
    let mut last_top = layout.relative_top(last_descendant);
    // A last descendant cut off at the viewport top has no relative top;
    // derive it from the row below.
    if last_top.is_none()
        && layout.first_visible_index() == Some(last_descendant)
        && last_descendant + 1 < layout.len()
    {
        let own_height = layout.element_height(last_descendant).map_or(0, i64::from);
        last_top = layout
            .relative_top(last_descendant + 1)
            .map(|next_top| next_top - own_height);
    }
    let Some(last_top) = last_top else {
        return stacked_top;
    };
    let last_height = layout.element_height(last_descendant).map_or(0, i64::from);
    let last_bottom = last_top + last_height;
    let height = i64::from(height);
    if stacked_top + height > last_bottom && stacked_top <= last_bottom {
        last_bottom - height
    } else {
        stacked_top
    }
}

/// Result of moving keyboard focus inside the overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StickyFocusMove {
    /// Focus stays in the overlay on the given stack index.
    Within(usize),
    /// Focus leaves the overlay for the list row below it; the list should
    /// scroll so that row's top sits at `scroll_top`.
    Exit { list_index: usize, scroll_top: u32 },
    None,
}

/// Keyboard focus within the pinned rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StickyScrollFocus {
    focused: Option<usize>,
}

impl StickyScrollFocus {
    pub const fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub const fn is_focused(&self) -> bool {
        self.focused.is_some()
    }

    /// Enters the overlay on its innermost row.
    pub fn enter<N: Copy + Eq>(&mut self, state: &StickyScrollState<N>) -> bool {
        if state.is_empty() {
            return false;
        }
        self.focused = Some(state.count() - 1);
        true
    }

    pub fn set_focused<N: Copy + Eq>(&mut self, state: &StickyScrollState<N>, index: usize) -> bool {
        if index >= state.count() {
            return false;
        }
        self.focused = Some(index);
        true
    }

    pub const fn blur(&mut self) {
        self.focused = None;
    }

    pub const fn focus_previous(&mut self) -> StickyFocusMove {
        match self.focused {
            Some(index) => {
                let index = index.saturating_sub(1);
                self.focused = Some(index);
                StickyFocusMove::Within(index)
            }
            None => StickyFocusMove::None,
        }
    }

    /// Moves down; from the innermost row focus exits into the list.
    pub fn focus_next<N: Copy + Eq>(
        &mut self,
        state: &StickyScrollState<N>,
        layout: &ListLayout,
    ) -> StickyFocusMove {
        let Some(index) = self.focused else {
            return StickyFocusMove::None;
        };
        if index + 1 < state.count() {
            self.focused = Some(index + 1);
            return StickyFocusMove::Within(index + 1);
        }
        let Some(last) = state.last() else {
            return StickyFocusMove::None;
        };
        let list_index = last.start_index + 1;
        let Some(top) = layout.element_top(list_index) else {
            return StickyFocusMove::None;
        };
        self.focused = None;
        StickyFocusMove::Exit {
            list_index,
            scroll_top: top.saturating_sub(state.height()),
        }
    }

    /// Keeps the focused index inside a replaced stack.
    pub const fn on_state_change(&mut self, count: usize) {
        if let Some(index) = self.focused {
            self.focused = if count == 0 {
                None
            } else if index >= count {
                Some(count - 1)
            } else {
                Some(index)
            };
        }
    }

    /// Returns `true` if a click outside the overlay took focus away from it.
    pub const fn on_click_outside(&mut self) -> bool {
        self.focused.take().is_some()
    }
}
