use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Persistable view state keyed by element identity.
///
/// `expanded` maps ids to `1` (expanded) or `0` (collapsed). With the
/// `serde` feature enabled this type derives `Serialize`/`Deserialize` and
/// uses camelCase field names.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeViewState {
    pub focus: Vec<String>,
    pub selection: Vec<String>,
    pub expanded: BTreeMap<String, u8>,
    pub scroll_top: u32,
}

impl TreeViewState {
    /// Stored expansion of an id, if any.
    pub fn is_expanded(&self, id: &str) -> Option<bool> {
        self.expanded.get(id).map(|state| *state != 0)
    }
}
