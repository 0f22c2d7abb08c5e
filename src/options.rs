use std::time::Duration;

use crate::find::{FindMatchType, FindMode};
use crate::indent::IndentGuideMode;
use crate::model::TreeVisibility;
use crate::style::TreeScrollPolicy;

/// Behavioral configuration of an [`AbstractTree`](crate::AbstractTree).
///
/// Visual settings live in [`TreeViewStyle`](crate::TreeViewStyle).
#[derive(Clone, Debug, PartialEq)]
pub struct TreeOptions {
    /// Nodes without a stored state start collapsed.
    pub collapse_by_default: bool,
    pub sticky_scroll_enabled: bool,
    pub sticky_scroll_max_item_count: usize,
    /// Share of the viewport the sticky overlay may cover.
    pub sticky_scroll_max_view_ratio: f64,
    /// Offset of the sticky overlay from the viewport top.
    pub padding_top: u32,
    pub find_widget_enabled: bool,
    pub default_find_mode: FindMode,
    pub default_find_match_type: FindMatchType,
    /// Visibility of non-matching rows in Filter mode; `None` lets descendants decide.
    pub default_find_visibility: Option<TreeVisibility>,
    pub find_history_size: usize,
    pub render_indent_guides: IndentGuideMode,
    pub indent_guide_debounce: Duration,
    /// Rows moved by page navigation when the viewport height is unknown.
    pub page_size: u32,
    pub scroll_policy: TreeScrollPolicy,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            collapse_by_default: false,
            sticky_scroll_enabled: true,
            sticky_scroll_max_item_count: 7,
            sticky_scroll_max_view_ratio: 0.4,
            padding_top: 0,
            find_widget_enabled: true,
            default_find_mode: FindMode::Highlight,
            default_find_match_type: FindMatchType::Fuzzy,
            default_find_visibility: None,
            find_history_size: 50,
            render_indent_guides: IndentGuideMode::OnHover,
            indent_guide_debounce: Duration::from_millis(100),
            page_size: 10,
            scroll_policy: TreeScrollPolicy::KeepInView,
        }
    }
}

impl TreeOptions {
    #[must_use]
    pub const fn collapse_by_default(mut self, collapse: bool) -> Self {
        self.collapse_by_default = collapse;
        self
    }

    #[must_use]
    pub const fn sticky_scroll(mut self, enabled: bool) -> Self {
        self.sticky_scroll_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn sticky_scroll_limits(mut self, max_item_count: usize, max_view_ratio: f64) -> Self {
        self.sticky_scroll_max_item_count = max_item_count;
        self.sticky_scroll_max_view_ratio = max_view_ratio;
        self
    }

    #[must_use]
    pub const fn padding_top(mut self, padding_top: u32) -> Self {
        self.padding_top = padding_top;
        self
    }

    #[must_use]
    pub const fn find_widget(mut self, enabled: bool) -> Self {
        self.find_widget_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn find_defaults(mut self, mode: FindMode, match_type: FindMatchType) -> Self {
        self.default_find_mode = mode;
        self.default_find_match_type = match_type;
        self
    }

    #[must_use]
    pub const fn default_find_visibility(mut self, visibility: Option<TreeVisibility>) -> Self {
        self.default_find_visibility = visibility;
        self
    }

    #[must_use]
    pub const fn find_history_size(mut self, size: usize) -> Self {
        self.find_history_size = size;
        self
    }

    #[must_use]
    pub const fn indent_guides(mut self, mode: IndentGuideMode, debounce: Duration) -> Self {
        self.render_indent_guides = mode;
        self.indent_guide_debounce = debounce;
        self
    }

    #[must_use]
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn scroll_policy(mut self, policy: TreeScrollPolicy) -> Self {
        self.scroll_policy = policy;
        self
    }
}
