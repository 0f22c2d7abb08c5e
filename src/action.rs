/// Commands a user or application can issue to the tree view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeAction<Custom = ()> {
    /// Move focus to the previous focusable row.
    FocusPrevious,
    /// Move focus to the next focusable row.
    FocusNext,
    FocusPreviousPage,
    FocusNextPage,
    FocusFirst,
    FocusLast,
    /// Collapse the focused row, or focus its parent if it is already collapsed.
    CollapseOrFocusParent,
    /// Expand the focused row, or focus its first child if it is already expanded.
    ExpandOrFocusFirstChild,
    /// Toggle collapse state of the focused row.
    ToggleCollapsed,
    /// Toggle collapse state of the focused row and all its descendants.
    ToggleCollapsedRecursive,
    ExpandAll,
    CollapseAll,
    /// Select (and anchor) the focused row.
    SelectFocused,
    /// Move keyboard focus into the sticky overlay.
    FocusStickyScroll,
    OpenFind,
    CloseFind,
    /// Append a character to the find pattern, opening the widget if needed.
    FindInput(char),
    /// Remove the last character of the find pattern.
    FindBackspace,
    /// Switch between Highlight and Filter mode.
    ToggleFindMode,
    /// Switch between fuzzy and contiguous matching.
    ToggleFindMatchType,
    FindHistoryPrevious,
    FindHistoryNext,
    /// Cycle the indent guide mode.
    CycleIndentGuides,
    /// Custom action forwarded to the caller without internal handling.
    Custom(Custom),
}

/// Result of handling an action or key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeEvent<Custom = ()> {
    /// The action was handled internally and state was updated.
    Handled,
    /// The action was ignored (e.g., nothing focused / nothing to do).
    Unhandled,
    /// The action is forwarded to the caller for handling.
    Action(TreeAction<Custom>),
}
