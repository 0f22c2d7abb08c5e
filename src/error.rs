/// Errors reported by the tree view.
///
/// Every variant is a configuration or internal-consistency bug on the
/// caller's side. Expected absence (no match, node not rendered, empty sticky
/// stack) is reported through `Option` or empty collections instead.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// A find toggle id that was not registered when the find widget was built.
    #[error("unknown find toggle '{0}'")]
    UnknownToggle(String),

    /// View state was requested without an identity provider.
    #[error("view state requires an identity provider")]
    MissingIdentityProvider,

    /// A sticky constrain strategy returned a stack that breaks its budget.
    #[error(
        "sticky scroll constrain strategy violates its contract: {count} rows (max {max_count}), bottom {bottom} (budget {budget})"
    )]
    StickyConstraintViolation {
        count: usize,
        max_count: usize,
        bottom: i64,
        budget: f64,
    },

    /// A list index outside the rendered row range.
    #[error("focus index {index} is out of range for {len} rendered rows")]
    FocusIndexOutOfRange { index: usize, len: usize },
}

impl TreeError {
    /// Creates an unknown toggle error.
    pub fn unknown_toggle(id: impl Into<String>) -> Self {
        Self::UnknownToggle(id.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = TreeError> = std::result::Result<T, E>;
