//! Virtualized tree view for ratatui with focus/selection traits, find-as-you-type and sticky ancestors.
//!
//! [`AbstractTree`] holds the interactive state over a borrowed [`TreeModel`];
//! [`TreeView`] renders it. Call [`AbstractTree::refresh`] after the model
//! changes structurally.
//!
//! Feature flags:
//! - `keymap`: crossterm-based key bindings and `AbstractTree::handle_key*` helpers.
//! - `serde`: serde support for [`TreeViewState`] and option enums.

mod action;
mod context;
mod error;
mod events;
mod find;
mod fuzzy;
mod glyphs;
mod indent;
#[cfg(feature = "keymap")]
mod keymap;
mod list;
mod model;
mod node_trait;
mod options;
pub mod prelude;
mod sticky;
mod style;
#[cfg(test)]
mod test_model;
mod tree;
mod view_model;
mod view_state;
mod widget;

pub use action::{TreeAction, TreeEvent};
pub use context::TreeRowContext;
pub use error::{Result, TreeError};
pub use events::{Emitter, ListenerId};
pub use find::{
    FilterData, FilterResult, FindController, FindFilter, FindHistory, FindMatchType,
    FindMessage, FindMode, FindToggles, FindVisibility, MATCH_TYPE_TOGGLE, MODE_TOGGLE,
};
pub use fuzzy::{FuzzyScore, MAX_SAFE_INTEGER, contiguous_score, fuzzy_score, lowercase};
pub use glyphs::{
    TreeGlyphs, TreeLabelPrefix, TreeLabelProvider, TreeLabelRenderer, tree_label_line,
};
pub use indent::{IndentGuideMode, IndentGuides};
#[cfg(feature = "keymap")]
pub use keymap::{KeymapProfile, TreeKeyBindings};
pub use list::ListLayout;
pub use model::{
    IdentityProvider, KeyboardNavigationLabelProvider, ListDelegate, NavigationLabel, NoFilter,
    TreeFilter, TreeModel, TreeSplice, TreeVisibility, UniformRowHeight,
};
pub use node_trait::{ChangeOrigin, NodeTrait, TraitChangeEvent, TraitKind};
pub use options::TreeOptions;
pub use sticky::{
    DefaultStickyConstrain, StickyConstrain, StickyFocusMove, StickyRefresh,
    StickyScrollController, StickyScrollFocus, StickyScrollNode, StickyScrollState,
};
pub use style::{TreeScrollPolicy, TreeViewStyle};
pub use tree::{
    AbstractTree, ClickKind, CollapseStateChange, TreeContextMenuEvent, TreeEvents,
    TreeMouseEvent,
};
pub use view_model::{NodeIndex, RenderedRow, TreeViewModel};
pub use view_state::TreeViewState;
pub use widget::TreeView;
