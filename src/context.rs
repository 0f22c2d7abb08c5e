use ratatui::style::Style;

/// Everything a label renderer needs to know about one row.
#[derive(Clone, Copy)]
pub struct TreeRowContext<'a> {
    pub level: u16,
    pub is_tail_stack: &'a [bool],
    pub is_expanded: bool,
    pub is_collapsible: bool,
    pub is_focused: bool,
    pub is_selected: bool,
    /// Row is drawn inside the sticky overlay.
    pub is_sticky: bool,
    pub draw_lines: bool,
    /// Per guide column, whether the ancestor owning it is highlighted.
    pub active_guides: &'a [bool],
    /// Matched character positions of the find pattern.
    pub matches: &'a [usize],
    /// Label the positions refer to, for elements with several labels.
    pub match_label: Option<&'a str>,
    pub line_style: Style,
    pub active_line_style: Style,
    pub match_style: Style,
}

impl TreeRowContext<'_> {
    pub(crate) fn guide_style(&self, column: usize) -> Style {
        if self.active_guides.get(column).copied().unwrap_or(false) {
            self.active_line_style
        } else {
            self.line_style
        }
    }

    /// Match positions that apply to `name`.
    pub fn matches_for(&self, name: &str) -> &[usize] {
        match self.match_label {
            Some(label) if label != name => &[],
            _ => self.matches,
        }
    }
}
