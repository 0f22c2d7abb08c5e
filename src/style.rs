use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Borders;

/// How the list scrolls when keyboard focus moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeScrollPolicy {
    KeepInView,
    CenterOnSelect,
}

/// Visual settings of [`TreeView`](crate::TreeView).
#[derive(Clone, Debug)]
pub struct TreeViewStyle<'a> {
    pub title: Option<Line<'a>>,
    pub block_style: Style,
    pub border_style: Style,
    /// Focused row while the tree has keyboard focus.
    pub focus_style: Style,
    pub selection_style: Style,
    pub line_style: Style,
    /// Indent guides of the focused/selected rows' parents.
    pub active_line_style: Style,
    /// Characters matched by the find pattern.
    pub match_style: Style,
    /// Rows pinned by sticky scroll.
    pub sticky_style: Style,
    /// Patched onto the innermost pinned row to separate the overlay from the list.
    pub sticky_shadow_style: Style,
    pub find_style: Style,
    pub find_message_style: Style,
    pub highlight_symbol: &'a str,
    pub borders: Borders,
}

impl Default for TreeViewStyle<'_> {
    fn default() -> Self {
        Self {
            title: None,
            block_style: Style::default(),
            border_style: Style::default(),
            focus_style: Style::default().add_modifier(Modifier::REVERSED),
            selection_style: Style::default().add_modifier(Modifier::BOLD),
            line_style: Style::default().add_modifier(Modifier::DIM),
            active_line_style: Style::default(),
            match_style: Style::default().add_modifier(Modifier::UNDERLINED),
            sticky_style: Style::default(),
            sticky_shadow_style: Style::default().add_modifier(Modifier::UNDERLINED),
            find_style: Style::default(),
            find_message_style: Style::default().add_modifier(Modifier::ITALIC),
            highlight_symbol: ">> ",
            borders: Borders::ALL,
        }
    }
}
