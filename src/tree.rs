//! The tree façade: wires the rendered rows, traits, find, sticky scroll and
//! indent guides to a [`TreeModel`].
//!
//! The model is borrowed per call. After the model changes structurally, call
//! [`AbstractTree::refresh`] so the snapshot, the rows and the traits catch up.

#[cfg(feature = "keymap")]
use crossterm::event::KeyEvent;
use rustc_hash::FxHashMap;
use std::time::Instant;

use crate::action::{TreeAction, TreeEvent};
use crate::error::{Result, TreeError};
use crate::events::{Emitter, ListenerId};
use crate::find::{
    FilterData, FindController, FindFilter, FindMatchType, FindMessage, FindMode, FindVisibility,
    MATCH_TYPE_TOGGLE, MODE_TOGGLE,
};
use crate::indent::IndentGuides;
#[cfg(feature = "keymap")]
use crate::keymap::TreeKeyBindings;
use crate::list::ListLayout;
use crate::model::{
    IdentityProvider, KeyboardNavigationLabelProvider, ListDelegate, TreeFilter, TreeModel,
    TreeSplice, UniformRowHeight,
};
use crate::node_trait::{ChangeOrigin, NodeTrait, TraitChangeEvent, TraitKind};
use crate::options::TreeOptions;
use crate::sticky::{
    StickyConstrain, StickyFocusMove, StickyRefresh, StickyScrollController, StickyScrollState,
};
use crate::view_model::{NodeIndex, RenderedRow, TreeViewModel};
use crate::view_state::TreeViewState;

/// Collapse state change of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollapseStateChange<N> {
    pub node: N,
    pub collapsed: bool,
    pub recursive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickKind {
    Primary,
    Double,
    /// Click on the expand/collapse glyph.
    Twistie,
    Secondary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeMouseEvent<N> {
    /// `None` for clicks below the last row.
    pub node: Option<N>,
    pub kind: ClickKind,
    pub is_sticky_scroll: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeContextMenuEvent<N> {
    pub node: Option<N>,
    pub is_sticky_scroll: bool,
}

/// Notification channels of a tree.
///
/// Trait channels coalesce while events are buffered, so a batch of trait
/// updates is delivered as one notification per trait.
#[derive(Debug)]
pub struct TreeEvents<N> {
    pub focus: Emitter<TraitChangeEvent<N>>,
    pub selection: Emitter<TraitChangeEvent<N>>,
    pub anchor: Emitter<TraitChangeEvent<N>>,
    pub collapse_state: Emitter<CollapseStateChange<N>>,
    pub find_open_state: Emitter<bool>,
    pub find_mode: Emitter<FindMode>,
    pub find_match_type: Emitter<FindMatchType>,
    pub mouse_click: Emitter<TreeMouseEvent<N>>,
    pub context_menu: Emitter<TreeContextMenuEvent<N>>,
}

impl<N> Default for TreeEvents<N> {
    fn default() -> Self {
        Self {
            focus: Emitter::coalescing(),
            selection: Emitter::coalescing(),
            anchor: Emitter::coalescing(),
            collapse_state: Emitter::new(),
            find_open_state: Emitter::new(),
            find_mode: Emitter::new(),
            find_match_type: Emitter::new(),
            mouse_click: Emitter::new(),
            context_menu: Emitter::new(),
        }
    }
}

/// Interactive tree view over a borrowed model.
pub struct AbstractTree<M: TreeModel> {
    options: TreeOptions,
    view: TreeViewModel<M::Node>,
    layout: ListLayout,
    focus: NodeTrait<M::Node>,
    selection: NodeTrait<M::Node>,
    anchor: NodeTrait<M::Node>,
    filter: FindFilter<M>,
    find: Option<FindController>,
    sticky: StickyScrollController<M::Node>,
    indent: IndentGuides<M::Node>,
    identity: Option<Box<dyn IdentityProvider<M::Element>>>,
    delegate: Box<dyn ListDelegate<M>>,
    events: TreeEvents<M::Node>,
    has_focus: bool,
    hovered: bool,
    #[cfg(feature = "keymap")]
    keymap: TreeKeyBindings,
}

impl<M: TreeModel> std::fmt::Debug for AbstractTree<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractTree")
            .field("options", &self.options)
            .field("rows", &self.view.len())
            .field("focus", &self.focus.nodes())
            .field("selection", &self.selection.nodes())
            .field("find", &self.find)
            .field("sticky", &self.sticky)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn to_i64(value: usize) -> i64 {
    value as i64
}

impl<M: TreeModel + 'static> AbstractTree<M> {
    pub fn new(options: TreeOptions) -> Self {
        let mut filter = FindFilter::new(options.default_find_mode, options.default_find_match_type);
        if let Some(visibility) = options.default_find_visibility {
            filter.set_default_visibility(FindVisibility::Fixed(visibility));
        }
        Self {
            view: TreeViewModel::new(options.collapse_by_default),
            layout: ListLayout::new(),
            focus: NodeTrait::new(TraitKind::Focus),
            selection: NodeTrait::new(TraitKind::Selection),
            anchor: NodeTrait::new(TraitKind::Anchor),
            filter,
            find: None,
            sticky: StickyScrollController::new(
                options.sticky_scroll_max_item_count,
                options.sticky_scroll_max_view_ratio,
                options.padding_top,
            ),
            indent: IndentGuides::new(options.render_indent_guides, options.indent_guide_debounce),
            identity: None,
            delegate: Box::new(UniformRowHeight::default()),
            events: TreeEvents::default(),
            has_focus: false,
            hovered: false,
            #[cfg(feature = "keymap")]
            keymap: TreeKeyBindings::new(),
            options,
        }
    }

    /// Enables view-state persistence and identity-based trait resync.
    #[must_use]
    pub fn with_identity_provider(
        mut self,
        identity: impl IdentityProvider<M::Element> + 'static,
    ) -> Self {
        self.identity = Some(Box::new(identity));
        self
    }

    /// Enables find; the widget exists only when
    /// [`TreeOptions::find_widget_enabled`] is set.
    #[must_use]
    pub fn with_keyboard_navigation_label_provider(
        mut self,
        provider: impl KeyboardNavigationLabelProvider<M::Element> + 'static,
    ) -> Self {
        self.filter.set_label_provider(provider);
        self.ensure_find_controller();
        self
    }

    /// Application filter consulted before the find pattern.
    #[must_use]
    pub fn with_filter(mut self, filter: impl TreeFilter<M> + 'static) -> Self {
        self.filter.set_upstream(filter);
        self
    }

    #[must_use]
    pub fn with_list_delegate(mut self, delegate: impl ListDelegate<M> + 'static) -> Self {
        self.delegate = Box::new(delegate);
        self
    }

    #[must_use]
    pub fn with_sticky_constrain(
        mut self,
        constrain: impl StickyConstrain<M::Node> + 'static,
    ) -> Self {
        self.sticky.set_constrain(constrain);
        self
    }

    /// Visibility of non-matching rows in Filter mode.
    #[must_use]
    pub fn with_default_find_visibility(mut self, visibility: FindVisibility<M::Element>) -> Self {
        self.filter.set_default_visibility(visibility);
        self
    }

    #[cfg(feature = "keymap")]
    #[must_use]
    pub fn with_keymap(mut self, keymap: TreeKeyBindings) -> Self {
        self.keymap = keymap;
        self
    }

    fn ensure_find_controller(&mut self) {
        if self.find.is_none() && self.options.find_widget_enabled && self.filter.has_label_provider()
        {
            self.find = Some(FindController::new(
                self.filter.mode(),
                self.filter.match_type(),
                self.options.find_history_size,
            ));
        }
    }

    pub const fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub const fn view(&self) -> &TreeViewModel<M::Node> {
        &self.view
    }

    pub const fn layout(&self) -> &ListLayout {
        &self.layout
    }

    pub const fn filter(&self) -> &FindFilter<M> {
        &self.filter
    }

    pub const fn find(&self) -> Option<&FindController> {
        self.find.as_ref()
    }

    pub fn is_find_open(&self) -> bool {
        self.find.as_ref().is_some_and(FindController::is_open)
    }

    /// Sticky controller, when sticky scroll is enabled.
    pub const fn sticky_scroll(&self) -> Option<&StickyScrollController<M::Node>> {
        if self.options.sticky_scroll_enabled {
            Some(&self.sticky)
        } else {
            None
        }
    }

    pub fn sticky_state(&self) -> &StickyScrollState<M::Node> {
        self.sticky.state()
    }

    pub const fn indent_guides(&self) -> &IndentGuides<M::Node> {
        &self.indent
    }

    pub const fn events_mut(&mut self) -> &mut TreeEvents<M::Node> {
        &mut self.events
    }

    #[cfg(feature = "keymap")]
    pub const fn keymap_mut(&mut self) -> &mut TreeKeyBindings {
        &mut self.keymap
    }

    pub const fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub const fn set_has_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    pub const fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub const fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    pub fn focus(&self) -> &[M::Node] {
        self.focus.nodes()
    }

    pub fn selection(&self) -> &[M::Node] {
        self.selection.nodes()
    }

    pub fn anchor(&self) -> Option<M::Node> {
        self.anchor.first()
    }

    pub fn is_focused(&self, node: M::Node) -> bool {
        self.focus.has(node)
    }

    pub fn is_selected(&self, node: M::Node) -> bool {
        self.selection.has(node)
    }

    pub fn focused_elements<'m>(&self, model: &'m M) -> Vec<&'m M::Element> {
        self.focus.elements(model)
    }

    pub fn selected_elements<'m>(&self, model: &'m M) -> Vec<&'m M::Element> {
        self.selection.elements(model)
    }

    /// List index of the first focused node.
    pub fn focused_index(&self) -> Option<usize> {
        self.focus.first().and_then(|node| self.view.index_of(node))
    }

    pub fn filter_data(&self, node: M::Node) -> Option<&FilterData> {
        self.view.filter_data(node)
    }

    pub fn on_did_change_focus(
        &mut self,
        listener: impl FnMut(&TraitChangeEvent<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.focus.subscribe(listener)
    }

    pub fn on_did_change_selection(
        &mut self,
        listener: impl FnMut(&TraitChangeEvent<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.selection.subscribe(listener)
    }

    pub fn on_did_change_anchor(
        &mut self,
        listener: impl FnMut(&TraitChangeEvent<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.anchor.subscribe(listener)
    }

    pub fn on_did_change_collapse_state(
        &mut self,
        listener: impl FnMut(&CollapseStateChange<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.collapse_state.subscribe(listener)
    }

    pub fn on_did_change_find_open_state(
        &mut self,
        listener: impl FnMut(&bool) + 'static,
    ) -> ListenerId {
        self.events.find_open_state.subscribe(listener)
    }

    pub fn on_did_change_find_mode(&mut self, listener: impl FnMut(&FindMode) + 'static) -> ListenerId {
        self.events.find_mode.subscribe(listener)
    }

    pub fn on_did_change_find_match_type(
        &mut self,
        listener: impl FnMut(&FindMatchType) + 'static,
    ) -> ListenerId {
        self.events.find_match_type.subscribe(listener)
    }

    pub fn on_mouse_click(
        &mut self,
        listener: impl FnMut(&TreeMouseEvent<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.mouse_click.subscribe(listener)
    }

    pub fn on_context_menu(
        &mut self,
        listener: impl FnMut(&TreeContextMenuEvent<M::Node>) + 'static,
    ) -> ListenerId {
        self.events.context_menu.subscribe(listener)
    }

    /// Resynchronizes with the model after a change.
    ///
    /// Rebuilds the snapshot and the rows and reconciles the traits against
    /// the structural diff. The sticky stack is recomputed when a pinned row
    /// moved or was removed, when nothing is pinned, or when the row geometry
    /// changed; otherwise the pinned rows are only redrawn. The returned
    /// value is the classification that was applied.
    pub fn refresh(&mut self, model: &M) -> Result<StickyRefresh> {
        let geometry = self.geometry();
        let (splice, previous) = self.view.refresh_index(model, self.identity.as_deref());
        self.rebuild_rows(model);
        let mut refresh = self.sticky.on_model_splice(&splice, self.view.index(), &self.view);
        if !splice.is_empty() {
            tracing::debug!(
                deleted = splice.deleted.len(),
                inserted = splice.inserted.len(),
                ?refresh,
                "model spliced"
            );
            self.resync_traits(&splice, &previous);
        }
        self.retarget_focus();
        if geometry != self.geometry() || self.sticky.state().is_empty() {
            refresh = StickyRefresh::Recompute;
        }
        if refresh == StickyRefresh::Recompute {
            self.update_sticky()?;
        }
        self.schedule_indent_guides();
        Ok(refresh)
    }

    fn geometry(&self) -> (usize, u32, u32, u32) {
        (
            self.layout.len(),
            self.layout.content_height(),
            self.layout.scroll_top(),
            self.layout.viewport_height(),
        )
    }

    fn resync_traits(&mut self, splice: &TreeSplice<M::Node>, previous: &NodeIndex<M::Node>) {
        let view = &self.view;
        let current = view.index();
        let is_visible = |node| view.is_rendered(node);
        let first_visible = self.layout.first_visible_index().and_then(|index| view.node_at(index));

        self.events.focus.pause();
        self.events.selection.pause();
        self.events.anchor.pause();
        if let Some(event) =
            self.focus
                .on_did_model_splice(splice, previous, current, is_visible, || first_visible)
        {
            self.events.focus.fire(event);
        }
        if let Some(event) =
            self.selection
                .on_did_model_splice(splice, previous, current, is_visible, || None)
        {
            self.events.selection.fire(event);
        }
        if let Some(event) =
            self.anchor
                .on_did_model_splice(splice, previous, current, is_visible, || None)
        {
            self.events.anchor.fire(event);
        }
        self.events.anchor.resume();
        self.events.selection.resume();
        self.events.focus.resume();
    }

    fn rebuild_rows(&mut self, model: &M) {
        self.filter.reset();
        let filter = &mut self.filter;
        self.view.rebuild(
            model,
            |model, node, parent| filter.filter(model, node, parent),
            self.delegate.as_ref(),
        );
        self.layout
            .set_heights(self.view.rows().iter().map(RenderedRow::height));
        tracing::trace!(
            rows = self.view.len(),
            total = self.filter.total_count(),
            matches = self.filter.match_count(),
            "rows rebuilt"
        );
    }

    /// Moves focus off a node that is no longer rendered onto its nearest
    /// rendered ancestor.
    fn retarget_focus(&mut self) {
        let Some(node) = self.focus.first() else {
            return;
        };
        if self.view.is_rendered(node) || !self.view.index().contains(node) {
            return;
        }
        let target = self
            .view
            .index()
            .ancestors(node)
            .find(|ancestor| self.view.is_rendered(*ancestor));
        if let Some(target) = target {
            self.set_trait(TraitKind::Focus, vec![target], ChangeOrigin::Api);
        }
    }

    fn update_sticky(&mut self) -> Result<bool> {
        if !self.options.sticky_scroll_enabled {
            return Ok(false);
        }
        self.sticky.update(&self.view, &self.layout)
    }

    fn schedule_indent_guides(&mut self) {
        self.indent.schedule(Instant::now());
    }

    /// Settles debounced indent guide highlighting; returns `true` if it changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let nodes = self
            .focus
            .nodes()
            .iter()
            .chain(self.selection.nodes())
            .copied();
        self.indent.tick(now, &self.view, nodes)
    }

    pub fn collapse(&mut self, model: &M, node: M::Node, recursive: bool) -> Result<bool> {
        self.apply_collapsed(model, node, Some(true), recursive)
    }

    pub fn expand(&mut self, model: &M, node: M::Node, recursive: bool) -> Result<bool> {
        self.apply_collapsed(model, node, Some(false), recursive)
    }

    pub fn toggle_collapsed(&mut self, model: &M, node: M::Node, recursive: bool) -> Result<bool> {
        self.apply_collapsed(model, node, None, recursive)
    }

    pub fn is_collapsed(&self, node: M::Node) -> bool {
        self.view.is_collapsed(node)
    }

    pub fn expand_all(&mut self, model: &M) -> Result<bool> {
        let changes = self.view.set_all_collapsed(model, false);
        self.after_collapse_change(model, changes, true)
    }

    pub fn collapse_all(&mut self, model: &M) -> Result<bool> {
        let changes = self.view.set_all_collapsed(model, true);
        self.after_collapse_change(model, changes, true)
    }

    /// Expands every ancestor of `node`.
    pub fn expand_to(&mut self, model: &M, node: M::Node) -> Result<bool> {
        let changes = self.view.expand_to(node);
        self.after_collapse_change(model, changes, false)
    }

    fn apply_collapsed(
        &mut self,
        model: &M,
        node: M::Node,
        collapsed: Option<bool>,
        recursive: bool,
    ) -> Result<bool> {
        let changes = self.view.set_collapsed(model, node, collapsed, recursive);
        self.after_collapse_change(model, changes, recursive)
    }

    fn after_collapse_change(
        &mut self,
        model: &M,
        changes: Vec<(M::Node, bool)>,
        recursive: bool,
    ) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }
        self.rebuild_rows(model);
        self.retarget_focus();
        for (node, collapsed) in changes {
            self.events.collapse_state.fire(CollapseStateChange {
                node,
                collapsed,
                recursive,
            });
        }
        self.update_sticky()?;
        self.schedule_indent_guides();
        Ok(true)
    }

    /// Expands the ancestors of `node` and scrolls it into view.
    ///
    /// With `relative_top` the row is placed at that ratio of the viewport;
    /// otherwise the scroll policy decides. Rows under the sticky overlay
    /// count as hidden. Returns `true` if the list scrolled.
    pub fn reveal(&mut self, model: &M, node: M::Node, relative_top: Option<f64>) -> Result<bool> {
        self.expand_to(model, node)?;
        let Some(index) = self.view.index_of(node) else {
            return Ok(false);
        };
        let padding = self.sticky_padding(node);
        let scrolled = match relative_top {
            Some(ratio) => self.layout.reveal_relative(index, ratio, padding),
            None => self
                .layout
                .reveal_with_padding(index, self.options.scroll_policy, padding),
        };
        if scrolled {
            self.update_sticky()?;
        }
        Ok(scrolled)
    }

    fn reveal_index(&mut self, index: usize) -> Result<bool> {
        let Some(node) = self.view.node_at(index) else {
            return Ok(false);
        };
        let padding = self.sticky_padding(node);
        if !self
            .layout
            .reveal_with_padding(index, self.options.scroll_policy, padding)
        {
            return Ok(false);
        }
        self.update_sticky()
    }

    fn sticky_padding(&self, node: M::Node) -> u32 {
        if self.options.sticky_scroll_enabled {
            self.sticky.height_above(&self.view, &self.layout, node)
        } else {
            0
        }
    }

    pub fn set_scroll_top(&mut self, scroll_top: u32) -> Result<bool> {
        if !self.layout.set_scroll_top(scroll_top) {
            return Ok(false);
        }
        self.update_sticky()?;
        Ok(true)
    }

    pub fn scroll_by(&mut self, delta: i64) -> Result<bool> {
        let target = (i64::from(self.layout.scroll_top()) + delta).max(0);
        self.set_scroll_top(u32::try_from(target).unwrap_or(u32::MAX))
    }

    /// Applies the viewport height; called by the widget on every render.
    pub fn set_viewport_height(&mut self, height: u32) -> Result<bool> {
        if !self.layout.set_viewport_height(height) {
            return Ok(false);
        }
        self.update_sticky()?;
        Ok(true)
    }

    /// Focuses `nodes`; listeners see one notification.
    pub fn set_focus(&mut self, nodes: Vec<M::Node>) {
        self.buffer_events(|tree| tree.set_trait(TraitKind::Focus, nodes, ChangeOrigin::Api));
    }

    pub fn set_selection(&mut self, nodes: Vec<M::Node>) {
        self.buffer_events(|tree| tree.set_trait(TraitKind::Selection, nodes, ChangeOrigin::Api));
    }

    pub fn set_anchor(&mut self, node: Option<M::Node>) {
        self.buffer_events(|tree| {
            tree.set_trait(TraitKind::Anchor, node.into_iter().collect(), ChangeOrigin::Api);
        });
    }

    /// Focuses rows by list index.
    pub fn set_focus_indices(&mut self, indices: &[usize]) -> Result<()> {
        let nodes = self.nodes_at(indices)?;
        self.set_focus(nodes);
        Ok(())
    }

    pub fn set_selection_indices(&mut self, indices: &[usize]) -> Result<()> {
        let nodes = self.nodes_at(indices)?;
        self.set_selection(nodes);
        Ok(())
    }

    fn nodes_at(&self, indices: &[usize]) -> Result<Vec<M::Node>> {
        indices
            .iter()
            .map(|index| {
                self.view
                    .node_at(*index)
                    .ok_or(TreeError::FocusIndexOutOfRange {
                        index: *index,
                        len: self.view.len(),
                    })
            })
            .collect()
    }

    /// Sets a trait with the given origin; nodes missing from the model are dropped.
    pub fn set_trait(&mut self, kind: TraitKind, nodes: Vec<M::Node>, origin: ChangeOrigin) {
        self.apply_trait(kind, nodes, origin, false);
    }

    /// Like [`Self::set_trait`], but notifies even when the set is unchanged.
    pub fn set_trait_forced(&mut self, kind: TraitKind, nodes: Vec<M::Node>, origin: ChangeOrigin) {
        self.apply_trait(kind, nodes, origin, true);
    }

    fn apply_trait(&mut self, kind: TraitKind, nodes: Vec<M::Node>, origin: ChangeOrigin, force: bool) {
        let index = self.view.index();
        let nodes: Vec<_> = nodes.into_iter().filter(|node| index.contains(*node)).collect();
        let (node_trait, emitter) = match kind {
            TraitKind::Focus => (&mut self.focus, &mut self.events.focus),
            TraitKind::Selection => (&mut self.selection, &mut self.events.selection),
            TraitKind::Anchor => (&mut self.anchor, &mut self.events.anchor),
        };
        let event = if force {
            Some(node_trait.set_forced(nodes, origin))
        } else {
            node_trait.set(nodes, origin)
        };
        if let Some(event) = event {
            emitter.fire(event);
            if kind != TraitKind::Anchor {
                self.schedule_indent_guides();
            }
        }
    }

    /// Runs `f` with trait notifications buffered; each trait notifies at most
    /// once, with its final value, when `f` returns.
    pub fn buffer_events<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.events.focus.pause();
        self.events.selection.pause();
        self.events.anchor.pause();
        let result = f(self);
        self.events.anchor.resume();
        self.events.selection.resume();
        self.events.focus.resume();
        result
    }

    /// Whether keyboard navigation may land on the row.
    fn allows_focus(&self, index: usize) -> bool {
        let Some(find) = &self.find else {
            return true;
        };
        let data = self
            .view
            .node_at(index)
            .and_then(|node| self.view.filter_data(node));
        find.should_allow_focus(&self.filter, data)
    }

    fn find_next_index(&self, start: i64, looping: bool, accept: impl Fn(usize) -> bool) -> Option<usize> {
        let len = to_i64(self.view.len());
        let mut index = start.max(0);
        for _ in 0..len {
            if index >= len {
                if !looping {
                    return None;
                }
                index = index.rem_euclid(len);
            }
            let candidate = usize::try_from(index).ok()?;
            if accept(candidate) {
                return Some(candidate);
            }
            index += 1;
        }
        None
    }

    fn find_previous_index(
        &self,
        start: i64,
        looping: bool,
        accept: impl Fn(usize) -> bool,
    ) -> Option<usize> {
        let len = to_i64(self.view.len());
        let mut index = start.min(len - 1);
        for _ in 0..len {
            if index < 0 {
                if !looping {
                    return None;
                }
                index = index.rem_euclid(len);
            }
            let candidate = usize::try_from(index).ok()?;
            if accept(candidate) {
                return Some(candidate);
            }
            index -= 1;
        }
        None
    }

    fn focus_index(&mut self, index: Option<usize>, origin: ChangeOrigin) -> Result<bool> {
        let Some((index, node)) = index.and_then(|index| Some((index, self.view.node_at(index)?)))
        else {
            return Ok(false);
        };
        self.set_trait(TraitKind::Focus, vec![node], origin);
        self.reveal_index(index)?;
        Ok(true)
    }

    /// Focuses the `n`th focusable row after the focused one.
    pub fn focus_next(&mut self, n: usize, looping: bool, origin: ChangeOrigin) -> Result<bool> {
        if self.view.is_empty() {
            return Ok(false);
        }
        let start = self.focused_index().map_or(0, |index| to_i64(index) + to_i64(n));
        let target = self.find_next_index(start, looping, |index| self.allows_focus(index));
        self.focus_index(target, origin)
    }

    pub fn focus_previous(&mut self, n: usize, looping: bool, origin: ChangeOrigin) -> Result<bool> {
        if self.view.is_empty() {
            return Ok(false);
        }
        let start = self.focused_index().map_or(0, |index| to_i64(index) - to_i64(n));
        let target = self.find_previous_index(start, looping, |index| self.allows_focus(index));
        self.focus_index(target, origin)
    }

    pub fn focus_first(&mut self, origin: ChangeOrigin) -> Result<bool> {
        let target = self.find_next_index(0, false, |index| self.allows_focus(index));
        self.focus_index(target, origin)
    }

    pub fn focus_last(&mut self, origin: ChangeOrigin) -> Result<bool> {
        let last = to_i64(self.view.len()) - 1;
        let target = self.find_previous_index(last, false, |index| self.allows_focus(index));
        self.focus_index(target, origin)
    }

    fn page_height(&self) -> u32 {
        if self.layout.viewport_height() > 0 {
            self.layout.viewport_height()
        } else {
            self.options.page_size
        }
    }

    /// Focuses the last row of the page; when it is already focused, scrolls
    /// one page down first.
    pub fn focus_next_page(&mut self, origin: ChangeOrigin) -> Result<bool> {
        if self.view.is_empty() {
            return Ok(false);
        }
        for _ in 0..2 {
            let bottom = self.layout.scroll_top().saturating_add(self.page_height());
            let last_page_index = self
                .layout
                .index_at(bottom)
                .map_or(self.view.len() - 1, |index| index.saturating_sub(1));
            let current = self.focused_index();
            if current != Some(last_page_index) && current.is_none_or(|focused| last_page_index > focused) {
                let good = self.find_previous_index(to_i64(last_page_index), false, |index| {
                    self.allows_focus(index)
                });
                let target = match good {
                    Some(good) if current != Some(good) => good,
                    _ => last_page_index,
                };
                return self.focus_index(Some(target), origin);
            }
            let next = self.layout.scroll_top().saturating_add(self.page_height());
            if !self.set_scroll_top(next)? {
                return Ok(false);
            }
        }
        Ok(false)
    }

    /// Focuses the first row of the page below the sticky overlay; when it is
    /// already focused, scrolls one page up first.
    pub fn focus_previous_page(&mut self, origin: ChangeOrigin) -> Result<bool> {
        if self.view.is_empty() {
            return Ok(false);
        }
        for _ in 0..2 {
            let covered = if self.options.sticky_scroll_enabled {
                self.sticky.state().height()
            } else {
                0
            };
            let scroll_top = self.layout.scroll_top().saturating_add(covered);
            let first_page_index = if scroll_top == 0 {
                self.layout.index_at(0).unwrap_or(0)
            } else {
                self.layout
                    .index_at(scroll_top - 1)
                    .map_or(self.view.len() - 1, |index| (index + 1).min(self.view.len() - 1))
            };
            let current = self.focused_index();
            if current != Some(first_page_index) && current.is_none_or(|focused| focused >= first_page_index) {
                let good = self.find_next_index(to_i64(first_page_index), false, |index| {
                    self.allows_focus(index)
                });
                let target = match good {
                    Some(good) if current != Some(good) => good,
                    _ => first_page_index,
                };
                return self.focus_index(Some(target), origin);
            }
            let previous = self.layout.scroll_top().saturating_sub(self.page_height());
            if !self.set_scroll_top(previous)? {
                return Ok(false);
            }
        }
        Ok(false)
    }

    /// Focuses the parent of the focused row.
    pub fn focus_parent(&mut self, origin: ChangeOrigin) -> Result<bool> {
        let parent = self
            .focus
            .first()
            .and_then(|node| self.view.row_of(node))
            .and_then(RenderedRow::parent);
        let index = parent.and_then(|parent| self.view.index_of(parent));
        self.focus_index(index, origin)
    }

    /// Focuses the first rendered child of the focused row.
    pub fn focus_first_child(&mut self, origin: ChangeOrigin) -> Result<bool> {
        let Some(node) = self.focus.first() else {
            return Ok(false);
        };
        let child = self
            .view
            .index_of(node)
            .map(|index| index + 1)
            .filter(|index| {
                self.view
                    .row(*index)
                    .is_some_and(|row| row.parent() == Some(node))
            });
        self.focus_index(child, origin)
    }

    /// Left: collapse the focused row, or move to its parent.
    pub fn collapse_or_focus_parent(&mut self, model: &M) -> Result<bool> {
        let Some(node) = self.focus.first() else {
            return Ok(false);
        };
        if self.collapse(model, node, false)? {
            return Ok(true);
        }
        self.focus_parent(ChangeOrigin::Keyboard)
    }

    /// Right: expand the focused row, or move to its first child.
    pub fn expand_or_focus_first_child(&mut self, model: &M) -> Result<bool> {
        let Some(node) = self.focus.first() else {
            return Ok(false);
        };
        if self.expand(model, node, false)? {
            return Ok(true);
        }
        self.focus_first_child(ChangeOrigin::Keyboard)
    }

    /// Selects and anchors the focused row.
    pub fn select_focused(&mut self, origin: ChangeOrigin) -> bool {
        let nodes = self.focus.nodes().to_vec();
        if nodes.is_empty() {
            return false;
        }
        let anchor = nodes.first().copied();
        self.buffer_events(|tree| {
            tree.set_trait(TraitKind::Selection, nodes, origin);
            tree.set_trait(TraitKind::Anchor, anchor.into_iter().collect(), origin);
        });
        true
    }

    pub fn open_find(&mut self, model: &M) -> Result<bool> {
        self.open_find_with(model, None)
    }

    fn open_find_with(&mut self, model: &M, initial: Option<&str>) -> Result<bool> {
        let Some(find) = self.find.as_mut() else {
            return Ok(false);
        };
        if !find.open() {
            return Ok(false);
        }
        if let Some(initial) = initial {
            find.set_value(initial);
        }
        let pattern = find.value().to_owned();
        tracing::debug!(pattern = %pattern, "find opened");
        self.events.find_open_state.fire(true);
        self.apply_pattern(model, &pattern)?;
        Ok(true)
    }

    /// Closes the widget, clears the pattern and returns focus to the tree.
    pub fn close_find(&mut self, model: &M) -> Result<bool> {
        let Some(find) = self.find.as_mut() else {
            return Ok(false);
        };
        if !find.close() {
            return Ok(false);
        }
        tracing::debug!("find closed");
        self.apply_pattern(model, "")?;
        self.has_focus = true;
        self.events.find_open_state.fire(false);
        Ok(true)
    }

    /// Replaces the find input; opens the widget if it is closed.
    pub fn set_find_pattern(&mut self, model: &M, pattern: &str) -> Result<bool> {
        let Some(find) = self.find.as_mut() else {
            return Ok(false);
        };
        if !find.is_open() {
            return self.open_find_with(model, Some(pattern));
        }
        if !find.set_value(pattern) {
            return Ok(false);
        }
        self.apply_pattern(model, pattern)?;
        Ok(true)
    }

    /// Appends typed text to the find input, opening the widget on the first key.
    pub fn find_input(&mut self, model: &M, ch: char) -> Result<bool> {
        let Some(find) = self.find.as_mut() else {
            return Ok(false);
        };
        if !find.is_open() {
            let mut buf = [0; 4];
            let initial: &str = ch.encode_utf8(&mut buf);
            return self.open_find_with(model, Some(initial));
        }
        find.push_char(ch);
        let pattern = find.value().to_owned();
        self.apply_pattern(model, &pattern)?;
        Ok(true)
    }

    pub fn find_backspace(&mut self, model: &M) -> Result<bool> {
        let Some(find) = self.find.as_mut().filter(|find| find.is_open()) else {
            return Ok(false);
        };
        if !find.pop_char() {
            return Ok(false);
        }
        let pattern = find.value().to_owned();
        self.apply_pattern(model, &pattern)?;
        Ok(true)
    }

    /// Steps back through the find history.
    pub fn find_history_previous(&mut self, model: &M) -> Result<bool> {
        self.step_history(model, FindController::history_previous)
    }

    pub fn find_history_next(&mut self, model: &M) -> Result<bool> {
        self.step_history(model, FindController::history_next)
    }

    fn step_history(&mut self, model: &M, step: fn(&mut FindController) -> bool) -> Result<bool> {
        let Some(find) = self.find.as_mut().filter(|find| find.is_open()) else {
            return Ok(false);
        };
        if !step(find) {
            return Ok(false);
        }
        let pattern = find.value().to_owned();
        self.apply_pattern(model, &pattern)?;
        Ok(true)
    }

    /// Refilters with `pattern` and moves focus to the first match at or
    /// after the focused row, wrapping around.
    fn apply_pattern(&mut self, model: &M, pattern: &str) -> Result<()> {
        self.filter.set_pattern(pattern);
        self.rebuild_rows(model);

        if !pattern.is_empty() {
            let start = self.focused_index().map_or(0, to_i64);
            let view = &self.view;
            let target = self.find_next_index(start, true, |index| {
                view.node_at(index)
                    .and_then(|node| view.filter_data(node))
                    .is_some_and(|data| !data.is_default())
            });
            if let Some(node) = target.and_then(|index| self.view.node_at(index)) {
                self.set_trait(TraitKind::Focus, vec![node], ChangeOrigin::Api);
            }
        }
        self.retarget_focus();

        if let Some(index) = self.focused_index()
            && !self.layout.is_fully_visible(index)
        {
            let padding = self.view.node_at(index).map_or(0, |node| self.sticky_padding(node));
            self.layout.reveal_relative(index, 0.5, padding);
        }
        self.update_sticky()?;
        self.update_find_message(pattern);
        tracing::debug!(
            pattern,
            matches = self.filter.match_count(),
            total = self.filter.total_count(),
            "find pattern applied"
        );
        Ok(())
    }

    fn update_find_message(&mut self, pattern: &str) {
        let no_results = !pattern.is_empty()
            && self.filter.total_count() > 0
            && self.filter.match_count() == 0;
        if let Some(find) = self.find.as_mut() {
            find.set_message(no_results.then_some(FindMessage::NoResults));
        }
    }

    fn refilter(&mut self, model: &M) -> Result<()> {
        self.rebuild_rows(model);
        self.retarget_focus();
        self.update_sticky()?;
        let pattern = self.filter.pattern().to_owned();
        self.update_find_message(&pattern);
        Ok(())
    }

    pub fn set_find_mode(&mut self, model: &M, mode: FindMode) -> Result<bool> {
        if self.filter.mode() == mode {
            return Ok(false);
        }
        self.filter.set_mode(mode);
        if let Some(find) = self.find.as_mut() {
            find.set_toggle(MODE_TOGGLE, mode == FindMode::Filter)?;
        }
        self.refilter(model)?;
        self.events.find_mode.fire(mode);
        Ok(true)
    }

    pub fn set_find_match_type(&mut self, model: &M, match_type: FindMatchType) -> Result<bool> {
        if self.filter.match_type() == match_type {
            return Ok(false);
        }
        self.filter.set_match_type(match_type);
        if let Some(find) = self.find.as_mut() {
            find.set_toggle(MATCH_TYPE_TOGGLE, match_type == FindMatchType::Fuzzy)?;
        }
        self.refilter(model)?;
        self.events.find_match_type.fire(match_type);
        Ok(true)
    }

    /// Sets a find toggle by id; unknown ids are an error.
    pub fn set_find_toggle(&mut self, model: &M, id: &str, checked: bool) -> Result<bool> {
        let Some(find) = self.find.as_ref() else {
            return Err(TreeError::unknown_toggle(id));
        };
        find.toggles().get(id)?;
        match id {
            MODE_TOGGLE => {
                let mode = if checked { FindMode::Filter } else { FindMode::Highlight };
                self.set_find_mode(model, mode)
            }
            MATCH_TYPE_TOGGLE => {
                let match_type = if checked {
                    FindMatchType::Fuzzy
                } else {
                    FindMatchType::Contiguous
                };
                self.set_find_match_type(model, match_type)
            }
            _ => Err(TreeError::unknown_toggle(id)),
        }
    }

    pub fn toggle_find_toggle(&mut self, model: &M, id: &str) -> Result<bool> {
        let Some(find) = self.find.as_ref() else {
            return Err(TreeError::unknown_toggle(id));
        };
        let checked = find.toggles().get(id)?;
        self.set_find_toggle(model, id, !checked)
    }

    /// Snapshot of focus, selection, expansion and scroll position keyed by id.
    pub fn get_view_state(&self, model: &M) -> Result<TreeViewState> {
        let identity = self
            .identity
            .as_deref()
            .ok_or(TreeError::MissingIdentityProvider)?;
        let ids = |nodes: &[M::Node]| -> Vec<String> {
            nodes
                .iter()
                .filter(|node| model.contains(**node))
                .map(|node| identity.id(model.element(*node)))
                .collect()
        };
        let index = self.view.index();
        let expanded = index
            .ids()
            .filter(|(node, _)| index.is_collapsible(*node))
            .map(|(node, id)| (id.to_owned(), u8::from(!self.view.is_collapsed(node))))
            .collect();
        Ok(TreeViewState {
            focus: ids(self.focus.nodes()),
            selection: ids(self.selection.nodes()),
            expanded,
            scroll_top: self.layout.scroll_top(),
        })
    }

    /// Restores a snapshot from [`AbstractTree::get_view_state`].
    ///
    /// Ids absent from the model are ignored.
    pub fn restore_view_state(&mut self, model: &M, state: &TreeViewState) -> Result<()> {
        if self.identity.is_none() {
            return Err(TreeError::MissingIdentityProvider);
        }
        self.refresh(model)?;
        self.view.apply_collapsed_ids(|id| state.is_expanded(id));
        self.rebuild_rows(model);

        let by_id: FxHashMap<&str, M::Node> =
            self.view.index().ids().map(|(node, id)| (id, node)).collect();
        let lookup = |ids: &[String]| -> Vec<M::Node> {
            ids.iter()
                .filter_map(|id| by_id.get(id.as_str()).copied())
                .collect()
        };
        let focus = lookup(&state.focus);
        let selection = lookup(&state.selection);

        self.buffer_events(|tree| {
            tree.set_trait(TraitKind::Focus, focus, ChangeOrigin::Api);
            tree.set_trait(TraitKind::Selection, selection, ChangeOrigin::Api);
        });
        self.layout.set_scroll_top(state.scroll_top);
        self.update_sticky()?;
        tracing::debug!(
            focus = self.focus.len(),
            selection = self.selection.len(),
            scroll_top = self.layout.scroll_top(),
            "view state restored"
        );
        Ok(())
    }

    /// Applies new options. Rows, sticky stack and find widget follow.
    pub fn update_options(&mut self, model: &M, options: TreeOptions) -> Result<()> {
        let previous = std::mem::replace(&mut self.options, options);
        let options = &self.options;
        self.view.set_collapse_by_default(options.collapse_by_default);
        self.sticky.set_limits(
            options.sticky_scroll_max_item_count,
            options.sticky_scroll_max_view_ratio,
            options.padding_top,
        );
        if !options.sticky_scroll_enabled {
            self.sticky.clear();
        }
        self.indent.set_mode(options.render_indent_guides);
        self.indent.set_delay(options.indent_guide_debounce);
        if previous.default_find_visibility != options.default_find_visibility {
            if let Some(visibility) = options.default_find_visibility {
                self.filter.set_default_visibility(FindVisibility::Fixed(visibility));
            } else {
                self.filter.clear_default_visibility();
            }
        }

        if !self.options.find_widget_enabled && self.find.is_some() {
            self.close_find(model)?;
            self.find = None;
        }
        self.ensure_find_controller();

        self.rebuild_rows(model);
        self.retarget_focus();
        self.update_sticky()?;
        Ok(())
    }

    /// Handles a click on viewport row `row`.
    ///
    /// Clicks on the sticky overlay act on the pinned node and scroll it back
    /// to where it was pinned. Returns the clicked node.
    pub fn handle_click(&mut self, model: &M, row: u32, kind: ClickKind) -> Result<Option<M::Node>> {
        self.has_focus = true;
        let pinned = if self.options.sticky_scroll_enabled {
            self.sticky.state().hit_test(row).copied()
        } else {
            None
        };
        if let Some(pinned) = pinned {
            let node = pinned.node;
            if kind == ClickKind::Secondary {
                self.events.context_menu.fire(TreeContextMenuEvent {
                    node: Some(node),
                    is_sticky_scroll: true,
                });
                return Ok(Some(node));
            }
            if let Some(top) = self.layout.element_top(pinned.start_index) {
                let offset = u32::try_from(pinned.position.max(0)).unwrap_or(0);
                self.set_scroll_top(top.saturating_sub(offset))?;
            }
            self.sticky.focus_mut().blur();
            self.click_node(model, node, kind)?;
            self.events.mouse_click.fire(TreeMouseEvent {
                node: Some(node),
                kind,
                is_sticky_scroll: true,
            });
            return Ok(Some(node));
        }

        self.sticky.focus_mut().on_click_outside();
        let node = self
            .layout
            .index_at(self.layout.scroll_top().saturating_add(row))
            .and_then(|index| self.view.node_at(index));
        if kind == ClickKind::Secondary {
            if let Some(node) = node {
                self.set_trait(TraitKind::Focus, vec![node], ChangeOrigin::Mouse);
            }
            self.events.context_menu.fire(TreeContextMenuEvent {
                node,
                is_sticky_scroll: false,
            });
            return Ok(node);
        }
        if let Some(node) = node {
            self.click_node(model, node, kind)?;
        }
        self.events.mouse_click.fire(TreeMouseEvent {
            node,
            kind,
            is_sticky_scroll: false,
        });
        Ok(node)
    }

    fn click_node(&mut self, model: &M, node: M::Node, kind: ClickKind) -> Result<()> {
        if kind != ClickKind::Twistie {
            // A double click opens the node, so listeners hear it again.
            let force = kind == ClickKind::Double;
            self.buffer_events(|tree| {
                tree.apply_trait(TraitKind::Focus, vec![node], ChangeOrigin::Mouse, force);
                tree.apply_trait(TraitKind::Selection, vec![node], ChangeOrigin::Mouse, force);
                tree.apply_trait(TraitKind::Anchor, vec![node], ChangeOrigin::Mouse, false);
            });
        } else {
            self.set_trait(TraitKind::Focus, vec![node], ChangeOrigin::Mouse);
        }
        if matches!(kind, ClickKind::Twistie | ClickKind::Double) {
            self.toggle_collapsed(model, node, false)?;
        }
        Ok(())
    }

    /// Context menu for the keyboard-focused node, pinned or not.
    pub fn context_menu(&mut self) -> Option<M::Node> {
        let (node, is_sticky_scroll) = match self.sticky.focused_node() {
            Some(node) => (Some(node), true),
            None => (self.focus.first(), false),
        };
        self.events.context_menu.fire(TreeContextMenuEvent {
            node,
            is_sticky_scroll,
        });
        node
    }

    /// Moves keyboard focus into the sticky overlay.
    pub fn focus_sticky_scroll(&mut self) -> bool {
        self.options.sticky_scroll_enabled && self.sticky.enter_focus()
    }

    pub fn is_sticky_scroll_focused(&self) -> bool {
        self.sticky.focus().is_focused()
    }

    fn sticky_focus_next(&mut self) -> Result<bool> {
        match self.sticky.focus_next(&self.layout) {
            StickyFocusMove::Within(_) => Ok(true),
            StickyFocusMove::Exit {
                list_index,
                scroll_top,
            } => {
                self.set_scroll_top(scroll_top)?;
                if let Some(node) = self.view.node_at(list_index) {
                    self.set_trait(TraitKind::Focus, vec![node], ChangeOrigin::Keyboard);
                }
                Ok(true)
            }
            StickyFocusMove::None => Ok(false),
        }
    }

    fn sticky_select_focused(&mut self, model: &M) -> Result<bool> {
        let Some(node) = self.sticky.focused_node() else {
            return Ok(false);
        };
        let pinned = self
            .sticky
            .state()
            .nodes()
            .iter()
            .find(|pinned| pinned.node == node)
            .copied();
        if let Some(pinned) = pinned
            && let Some(top) = self.layout.element_top(pinned.start_index)
        {
            let offset = u32::try_from(pinned.position.max(0)).unwrap_or(0);
            self.set_scroll_top(top.saturating_sub(offset))?;
        }
        self.sticky.focus_mut().blur();
        self.click_node(model, node, ClickKind::Primary)?;
        Ok(true)
    }

    /// Runs an action. Custom actions are returned to the caller.
    pub fn handle_action<C>(&mut self, model: &M, action: TreeAction<C>) -> Result<TreeEvent<C>> {
        let keyboard = ChangeOrigin::Keyboard;
        let sticky_focused = self.is_sticky_scroll_focused();
        let handled = match action {
            TreeAction::Custom(_) => return Ok(TreeEvent::Action(action)),
            TreeAction::FocusPrevious if sticky_focused => {
                !matches!(self.sticky.focus_previous(), StickyFocusMove::None)
            }
            TreeAction::FocusNext if sticky_focused => self.sticky_focus_next()?,
            TreeAction::SelectFocused if sticky_focused => self.sticky_select_focused(model)?,
            TreeAction::CloseFind if sticky_focused && !self.is_find_open() => {
                self.sticky.focus_mut().blur();
                true
            }
            TreeAction::FocusPrevious => self.focus_previous(1, false, keyboard)?,
            TreeAction::FocusNext => self.focus_next(1, false, keyboard)?,
            TreeAction::FocusPreviousPage => self.focus_previous_page(keyboard)?,
            TreeAction::FocusNextPage => self.focus_next_page(keyboard)?,
            TreeAction::FocusFirst => self.focus_first(keyboard)?,
            TreeAction::FocusLast => self.focus_last(keyboard)?,
            TreeAction::CollapseOrFocusParent => self.collapse_or_focus_parent(model)?,
            TreeAction::ExpandOrFocusFirstChild => self.expand_or_focus_first_child(model)?,
            TreeAction::ToggleCollapsed | TreeAction::ToggleCollapsedRecursive => {
                let recursive = matches!(action, TreeAction::ToggleCollapsedRecursive);
                let node = self.sticky.focused_node().or_else(|| self.focus.first());
                match node {
                    Some(node) => self.toggle_collapsed(model, node, recursive)?,
                    None => false,
                }
            }
            TreeAction::ExpandAll => self.expand_all(model)?,
            TreeAction::CollapseAll => self.collapse_all(model)?,
            TreeAction::SelectFocused => self.select_focused(keyboard),
            TreeAction::FocusStickyScroll => self.focus_sticky_scroll(),
            TreeAction::OpenFind => self.open_find(model)?,
            TreeAction::CloseFind => self.close_find(model)?,
            TreeAction::FindInput(ch) => self.find_input(model, ch)?,
            TreeAction::FindBackspace => self.find_backspace(model)?,
            TreeAction::ToggleFindMode => {
                let mode = match self.filter.mode() {
                    FindMode::Highlight => FindMode::Filter,
                    FindMode::Filter => FindMode::Highlight,
                };
                self.find.is_some() && self.set_find_mode(model, mode)?
            }
            TreeAction::ToggleFindMatchType => {
                let match_type = match self.filter.match_type() {
                    FindMatchType::Fuzzy => FindMatchType::Contiguous,
                    FindMatchType::Contiguous => FindMatchType::Fuzzy,
                };
                self.find.is_some() && self.set_find_match_type(model, match_type)?
            }
            TreeAction::FindHistoryPrevious => self.find_history_previous(model)?,
            TreeAction::FindHistoryNext => self.find_history_next(model)?,
            TreeAction::CycleIndentGuides => {
                let mode = self.indent.cycle_mode();
                self.options.render_indent_guides = mode;
                true
            }
        };
        Ok(if handled {
            TreeEvent::Handled
        } else {
            TreeEvent::Unhandled
        })
    }

    #[cfg(feature = "keymap")]
    pub fn handle_key(&mut self, model: &M, key: KeyEvent) -> Result<TreeEvent> {
        let Some(action) = self.keymap.resolve(key, self.is_find_open()) else {
            return Ok(TreeEvent::Unhandled);
        };
        self.handle_action(model, action)
    }

    /// Like [`AbstractTree::handle_key`], with an application mapping tried first.
    #[cfg(feature = "keymap")]
    pub fn handle_key_with<C, F>(&mut self, model: &M, key: KeyEvent, custom: F) -> Result<TreeEvent<C>>
    where
        F: Fn(KeyEvent) -> Option<C>,
    {
        let Some(action) = self.keymap.resolve_with(key, self.is_find_open(), custom) else {
            return Ok(TreeEvent::Unhandled);
        };
        self.handle_action(model, action)
    }
}
