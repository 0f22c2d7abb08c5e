pub use crate::{
    AbstractTree, ChangeOrigin, ClickKind, FilterData, FindMatchType, FindMode, IdentityProvider,
    IndentGuideMode, KeyboardNavigationLabelProvider, ListDelegate, NavigationLabel, NoFilter,
    StickyRefresh, TraitChangeEvent, TreeAction, TreeError, TreeEvent, TreeFilter, TreeGlyphs,
    TreeLabelPrefix, TreeLabelProvider, TreeLabelRenderer, TreeModel, TreeOptions,
    TreeRowContext, TreeScrollPolicy, TreeView, TreeViewState, TreeViewStyle, TreeVisibility,
    UniformRowHeight, tree_label_line,
};

#[cfg(feature = "keymap")]
pub use crate::{KeymapProfile, TreeKeyBindings};
