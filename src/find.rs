//! Find-as-you-type: the per-node filter and the find widget state machine.

use std::collections::VecDeque;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{Result, TreeError};
use crate::fuzzy::{FuzzyScore, contiguous_score, fuzzy_score, lowercase};
use crate::model::{KeyboardNavigationLabelProvider, TreeFilter, TreeModel, TreeVisibility};

/// Toggle id for the Highlight/Filter mode (checked = Filter).
pub const MODE_TOGGLE: &str = "mode";
/// Toggle id for the match type (checked = Fuzzy).
pub const MATCH_TYPE_TOGGLE: &str = "matchType";

/// How non-matching rows are treated while a pattern is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FindMode {
    /// Everything stays visible; matches are highlighted.
    #[default]
    Highlight,
    /// Non-matching rows are hidden.
    Filter,
}

/// How the pattern is matched against labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FindMatchType {
    #[default]
    Fuzzy,
    Contiguous,
}

/// Per-node match data produced by a filter pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterData {
    /// Neutral: the node did not match (or no pattern is set).
    #[default]
    Default,
    Score(FuzzyScore),
    /// Match on one label of a multi-label element.
    Labeled { label: String, score: FuzzyScore },
}

impl FilterData {
    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    pub const fn score(&self) -> Option<&FuzzyScore> {
        match self {
            Self::Default => None,
            Self::Score(score) | Self::Labeled { score, .. } => Some(score),
        }
    }

    /// Winning label for multi-label matches.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Labeled { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Matched character positions in ascending order.
    pub fn matches(&self) -> SmallVec<[usize; 8]> {
        self.score().map(FuzzyScore::matches).unwrap_or_default()
    }
}

/// Filter verdict plus match data for one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterResult {
    pub visibility: TreeVisibility,
    pub data: FilterData,
}

impl FilterResult {
    pub const fn hidden() -> Self {
        Self {
            visibility: TreeVisibility::Hidden,
            data: FilterData::Default,
        }
    }
}

/// Visibility of non-matching rows in Filter mode.
pub enum FindVisibility<E> {
    Fixed(TreeVisibility),
    Predicate(Box<dyn Fn(&E) -> TreeVisibility>),
}

impl<E> fmt::Debug for FindVisibility<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(visibility) => f.debug_tuple("Fixed").field(visibility).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Scores nodes against the find pattern and counts matches per pass.
pub struct FindFilter<M: TreeModel> {
    pattern: String,
    lowercase_pattern: String,
    mode: FindMode,
    match_type: FindMatchType,
    total_count: usize,
    match_count: usize,
    labels: Option<Box<dyn KeyboardNavigationLabelProvider<M::Element>>>,
    upstream: Option<Box<dyn TreeFilter<M>>>,
    default_visibility: Option<FindVisibility<M::Element>>,
}

impl<M: TreeModel> fmt::Debug for FindFilter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FindFilter")
            .field("pattern", &self.pattern)
            .field("mode", &self.mode)
            .field("match_type", &self.match_type)
            .field("total_count", &self.total_count)
            .field("match_count", &self.match_count)
            .finish_non_exhaustive()
    }
}

impl<M: TreeModel> Default for FindFilter<M> {
    fn default() -> Self {
        Self::new(FindMode::default(), FindMatchType::default())
    }
}

impl<M: TreeModel> FindFilter<M> {
    pub fn new(mode: FindMode, match_type: FindMatchType) -> Self {
        Self {
            pattern: String::new(),
            lowercase_pattern: String::new(),
            mode,
            match_type,
            total_count: 0,
            match_count: 0,
            labels: None,
            upstream: None,
            default_visibility: None,
        }
    }

    pub fn set_label_provider(
        &mut self,
        provider: impl KeyboardNavigationLabelProvider<M::Element> + 'static,
    ) {
        self.labels = Some(Box::new(provider));
    }

    pub const fn has_label_provider(&self) -> bool {
        self.labels.is_some()
    }

    /// Installs the upstream filter consulted before matching.
    pub fn set_upstream(&mut self, filter: impl TreeFilter<M> + 'static) {
        self.upstream = Some(Box::new(filter));
    }

    pub fn set_default_visibility(&mut self, visibility: FindVisibility<M::Element>) {
        self.default_visibility = Some(visibility);
    }

    /// Lets misses in Filter mode fall back to `Recurse` again.
    pub fn clear_default_visibility(&mut self) {
        self.default_visibility = None;
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Sets the pattern; returns `true` if it changed.
    pub fn set_pattern(&mut self, pattern: &str) -> bool {
        if self.pattern == pattern {
            return false;
        }
        pattern.clone_into(&mut self.pattern);
        self.lowercase_pattern = lowercase(pattern);
        true
    }

    pub const fn mode(&self) -> FindMode {
        self.mode
    }

    pub const fn set_mode(&mut self, mode: FindMode) {
        self.mode = mode;
    }

    pub const fn match_type(&self) -> FindMatchType {
        self.match_type
    }

    pub const fn set_match_type(&mut self, match_type: FindMatchType) {
        self.match_type = match_type;
    }

    /// Nodes evaluated in the current pass (upstream-hidden nodes excluded).
    pub const fn total_count(&self) -> usize {
        self.total_count
    }

    /// Nodes that matched in the current pass.
    pub const fn match_count(&self) -> usize {
        self.match_count
    }

    /// Zeroes the counters; call before every pass.
    pub const fn reset(&mut self) {
        self.total_count = 0;
        self.match_count = 0;
    }

    /// Filters a single node.
    pub fn filter(
        &mut self,
        model: &M,
        node: M::Node,
        parent_visibility: TreeVisibility,
    ) -> FilterResult {
        let mut visibility = TreeVisibility::Visible;
        if let Some(upstream) = &self.upstream {
            visibility = upstream.visibility(model, node, parent_visibility);
            if visibility == TreeVisibility::Hidden {
                return FilterResult::hidden();
            }
        }

        self.total_count += 1;

        if self.pattern.is_empty() {
            self.match_count += 1;
            return FilterResult {
                visibility,
                data: FilterData::Default,
            };
        }

        let element = model.element(node);
        let labels = self
            .labels
            .as_ref()
            .map(|provider| provider.label(element))
            .unwrap_or_default();
        let many = labels.is_many();

        for label in labels.iter() {
            let score = match self.match_type {
                FindMatchType::Contiguous => contiguous_score(&self.lowercase_pattern, label),
                FindMatchType::Fuzzy => fuzzy_score(&self.pattern, label),
            };
            if let Some(score) = score {
                self.match_count += 1;
                let data = if many {
                    FilterData::Labeled {
                        label: label.to_owned(),
                        score,
                    }
                } else {
                    FilterData::Score(score)
                };
                return FilterResult { visibility, data };
            }
        }

        match self.mode {
            FindMode::Filter => {
                let visibility = match &self.default_visibility {
                    Some(FindVisibility::Fixed(visibility)) => *visibility,
                    Some(FindVisibility::Predicate(predicate)) => predicate(element),
                    None => TreeVisibility::Recurse,
                };
                FilterResult {
                    visibility,
                    data: FilterData::Default,
                }
            }
            FindMode::Highlight => FilterResult {
                visibility,
                data: FilterData::Default,
            },
        }
    }
}

/// Named boolean switches of the find widget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindToggles {
    states: SmallVec<[(String, bool); 4]>,
}

impl FindToggles {
    pub fn new<I, S>(toggles: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            states: toggles
                .into_iter()
                .map(|(id, checked)| (id.into(), checked))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Result<bool> {
        self.states
            .iter()
            .find(|(toggle, _)| toggle == id)
            .map(|(_, checked)| *checked)
            .ok_or_else(|| TreeError::unknown_toggle(id))
    }

    /// Sets a toggle; returns `true` if its state changed.
    pub fn set(&mut self, id: &str, checked: bool) -> Result<bool> {
        let slot = self
            .states
            .iter_mut()
            .find(|(toggle, _)| toggle == id)
            .map(|(_, state)| state)
            .ok_or_else(|| TreeError::unknown_toggle(id))?;
        let changed = *slot != checked;
        *slot = checked;
        Ok(changed)
    }

    /// Flips a toggle and returns its new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let checked = !self.get(id)?;
        self.set(id, checked)?;
        Ok(checked)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.states.iter().map(|(id, checked)| (id.as_str(), *checked))
    }
}

/// Bounded, de-duplicated list of past patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindHistory {
    entries: VecDeque<String>,
    capacity: usize,
    cursor: Option<usize>,
}

impl FindHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            cursor: None,
        }
    }

    /// Records a pattern as the most recent entry.
    pub fn push(&mut self, value: &str) {
        self.cursor = None;
        if value.is_empty() || self.capacity == 0 {
            return;
        }
        self.entries.retain(|entry| entry != value);
        self.entries.push_back(value.to_owned());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Steps back in time.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self
            .cursor
            .map_or(self.entries.len() - 1, |cursor| cursor.saturating_sub(1));
        self.cursor = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Steps forward; past the newest entry the cursor is cleared.
    pub fn next(&mut self) -> Option<&str> {
        let cursor = self.cursor?;
        if cursor + 1 < self.entries.len() {
            self.cursor = Some(cursor + 1);
            self.entries.get(cursor + 1).map(String::as_str)
        } else {
            self.cursor = None;
            None
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inline message shown by the find widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FindMessage {
    NoResults,
}

impl FindMessage {
    pub const fn text(self) -> &'static str {
        match self {
            Self::NoResults => "No results",
        }
    }
}

/// Find widget lifecycle: closed, or open with an input value.
#[derive(Clone, Debug)]
pub struct FindController {
    open: bool,
    toggles: FindToggles,
    history: FindHistory,
    value: String,
    previous_value: String,
    message: Option<FindMessage>,
}

impl FindController {
    pub fn new(mode: FindMode, match_type: FindMatchType, history_size: usize) -> Self {
        Self {
            open: false,
            toggles: FindToggles::new([
                (MODE_TOGGLE, mode == FindMode::Filter),
                (MATCH_TYPE_TOGGLE, match_type == FindMatchType::Fuzzy),
            ]),
            history: FindHistory::new(history_size),
            value: String::new(),
            previous_value: String::new(),
            message: None,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Opens the widget and restores the last session's value.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        self.value.clone_from(&self.previous_value);
        true
    }

    /// Closes the widget; the value is kept for the next session and recorded in history.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        self.history.push(&self.value);
        self.previous_value = std::mem::take(&mut self.value);
        self.message = None;
        true
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets the input value; returns `true` if it changed.
    pub fn set_value(&mut self, value: &str) -> bool {
        if self.value == value {
            return false;
        }
        value.clone_into(&mut self.value);
        true
    }

    pub fn push_char(&mut self, ch: char) {
        self.value.push(ch);
    }

    /// Removes the last character; returns `false` if the value was empty.
    pub fn pop_char(&mut self) -> bool {
        self.value.pop().is_some()
    }

    pub const fn toggles(&self) -> &FindToggles {
        &self.toggles
    }

    /// Sets a registered toggle; returns `true` if it changed.
    pub fn set_toggle(&mut self, id: &str, checked: bool) -> Result<bool> {
        self.toggles.set(id, checked)
    }

    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        self.toggles.toggle(id)
    }

    pub fn mode(&self) -> FindMode {
        if self.toggles.get(MODE_TOGGLE).unwrap_or(false) {
            FindMode::Filter
        } else {
            FindMode::Highlight
        }
    }

    pub fn match_type(&self) -> FindMatchType {
        if self.toggles.get(MATCH_TYPE_TOGGLE).unwrap_or(true) {
            FindMatchType::Fuzzy
        } else {
            FindMatchType::Contiguous
        }
    }

    pub const fn message(&self) -> Option<FindMessage> {
        self.message
    }

    pub const fn set_message(&mut self, message: Option<FindMessage>) {
        self.message = message;
    }

    pub const fn history(&self) -> &FindHistory {
        &self.history
    }

    /// Replaces the value with the previous history entry.
    pub fn history_previous(&mut self) -> bool {
        match self.history.previous().map(str::to_owned) {
            Some(value) => self.set_value(&value),
            None => false,
        }
    }

    /// Replaces the value with the next history entry (or clears it).
    pub fn history_next(&mut self) -> bool {
        let value = self.history.next().map(str::to_owned).unwrap_or_default();
        self.set_value(&value)
    }

    /// Keyboard-focus gate: while a pattern narrows the tree to several
    /// matches, only matching rows accept focus.
    pub fn should_allow_focus<M: TreeModel>(
        &self,
        filter: &FindFilter<M>,
        data: Option<&FilterData>,
    ) -> bool {
        if !self.open || filter.pattern().is_empty() {
            return true;
        }
        if filter.total_count() > 0 && filter.match_count() <= 1 {
            return true;
        }
        data.is_some_and(|data| !data.is_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_model::TestTree;

    fn labelled() -> FindFilter<TestTree> {
        let mut filter = FindFilter::new(FindMode::Highlight, FindMatchType::Fuzzy);
        filter.set_label_provider(|label: &String| label.clone());
        filter
    }

    fn run_pass(filter: &mut FindFilter<TestTree>, tree: &TestTree) -> Vec<FilterResult> {
        filter.reset();
        tree.preorder()
            .into_iter()
            .map(|node| filter.filter(tree, node, TreeVisibility::Visible))
            .collect()
    }

    #[test]
    fn empty_pattern_counts_every_node_as_match() {
        let tree = TestTree::from_outline("a\n  b\n  c\nd");
        let mut filter = labelled();
        let results = run_pass(&mut filter, &tree);
        assert!(results.iter().all(|r| r.data.is_default()));
        assert_eq!(filter.total_count(), 4);
        assert_eq!(filter.match_count(), 4);
    }

    #[test]
    fn counters_track_matches_and_reset() {
        let tree = TestTree::from_outline("apple\n  banana\n  apricot\ncherry");
        let mut filter = labelled();
        filter.set_pattern("ap");
        run_pass(&mut filter, &tree);
        assert_eq!(filter.total_count(), 4);
        assert_eq!(filter.match_count(), 2);
        filter.reset();
        assert_eq!(filter.total_count(), 0);
        assert_eq!(filter.match_count(), 0);
    }

    #[test]
    fn exact_label_scores_above_subsequence() {
        let tree = TestTree::from_outline("xaxbxc\nabc");
        let mut filter = labelled();
        filter.set_pattern("abc");
        let results = run_pass(&mut filter, &tree);
        let scattered = results[0].data.score().expect("subsequence");
        let exact = results[1].data.score().expect("exact");
        assert!(exact > scattered);
    }

    #[test]
    fn highlight_mode_keeps_misses_visible() {
        let tree = TestTree::from_outline("alpha\nbeta");
        let mut filter = labelled();
        filter.set_pattern("zz");
        let results = run_pass(&mut filter, &tree);
        assert!(results.iter().all(|r| r.visibility == TreeVisibility::Visible));
        assert!(results.iter().all(|r| r.data.is_default()));
        assert_eq!(filter.match_count(), 0);
    }

    #[test]
    fn filter_mode_misses_recurse_by_default() {
        let tree = TestTree::from_outline("alpha\nbeta");
        let mut filter = labelled();
        filter.set_mode(FindMode::Filter);
        filter.set_pattern("al");
        let results = run_pass(&mut filter, &tree);
        assert_eq!(results[0].visibility, TreeVisibility::Visible);
        assert_eq!(results[1].visibility, TreeVisibility::Recurse);

        filter.set_default_visibility(FindVisibility::Fixed(TreeVisibility::Hidden));
        let results = run_pass(&mut filter, &tree);
        assert_eq!(results[1].visibility, TreeVisibility::Hidden);

        filter.set_default_visibility(FindVisibility::Predicate(Box::new(|label: &String| {
            if label.starts_with('b') {
                TreeVisibility::Visible
            } else {
                TreeVisibility::Hidden
            }
        })));
        let results = run_pass(&mut filter, &tree);
        assert_eq!(results[1].visibility, TreeVisibility::Visible);
    }

    #[test]
    fn upstream_hidden_short_circuits_without_counting() {
        let tree = TestTree::from_outline("keep\ndrop");
        let mut filter = labelled();
        filter.set_upstream(|model: &TestTree, node: usize| model.label(node) != "drop");
        let results = run_pass(&mut filter, &tree);
        // The closure filter maps misses to Recurse, so both are counted.
        assert_eq!(results[1].visibility, TreeVisibility::Recurse);
        assert_eq!(filter.total_count(), 2);

        struct Hide;
        impl TreeFilter<TestTree> for Hide {
            fn is_match(&self, model: &TestTree, node: usize) -> bool {
                model.label(node) != "drop"
            }
            fn visibility(
                &self,
                model: &TestTree,
                node: usize,
                _parent: TreeVisibility,
            ) -> TreeVisibility {
                if self.is_match(model, node) {
                    TreeVisibility::Visible
                } else {
                    TreeVisibility::Hidden
                }
            }
        }
        filter.set_upstream(Hide);
        let results = run_pass(&mut filter, &tree);
        assert_eq!(results[1], FilterResult::hidden());
        assert_eq!(filter.total_count(), 1);
        assert_eq!(filter.match_count(), 1);
    }

    #[test]
    fn contiguous_match_type_requires_substring() {
        let tree = TestTree::from_outline("foobar\nfxoxo");
        let mut filter = labelled();
        filter.set_match_type(FindMatchType::Contiguous);
        filter.set_pattern("OO");
        let results = run_pass(&mut filter, &tree);
        assert!(results[0].data.score().is_some_and(FuzzyScore::is_contiguous));
        assert!(results[1].data.is_default());
    }

    #[test]
    fn multi_label_wraps_winning_label() {
        let tree = TestTree::from_outline("main.rs");
        let mut filter: FindFilter<TestTree> = FindFilter::default();
        struct PathLabels;
        impl KeyboardNavigationLabelProvider<String> for PathLabels {
            fn label<'a>(&self, element: &'a String) -> crate::model::NavigationLabel<'a> {
                crate::model::NavigationLabel::Many(vec![
                    "src/".into(),
                    std::borrow::Cow::Borrowed(element.as_str()),
                ])
            }
        }
        filter.set_label_provider(PathLabels);
        filter.set_pattern("main");
        let results = run_pass(&mut filter, &tree);
        assert_eq!(results[0].data.label(), Some("main.rs"));
        assert_eq!(results[0].data.matches().as_slice(), &[0, 1, 2, 3]);
    }

    #[test]
    fn toggles_reject_unknown_ids() {
        let mut toggles = FindToggles::new([(MODE_TOGGLE, false)]);
        assert_eq!(toggles.get(MODE_TOGGLE), Ok(false));
        assert_eq!(toggles.toggle(MODE_TOGGLE), Ok(true));
        assert_eq!(toggles.set(MODE_TOGGLE, true), Ok(false));
        assert_eq!(
            toggles.get("caseSensitive"),
            Err(TreeError::UnknownToggle("caseSensitive".into()))
        );
        assert!(toggles.set("caseSensitive", true).is_err());
    }

    #[test]
    fn history_is_bounded_and_deduplicated() {
        let mut history = FindHistory::new(2);
        history.push("a");
        history.push("b");
        history.push("a");
        history.push("");
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["b", "a"]);
        history.push("c");
        assert_eq!(history.entries().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(history.previous(), Some("c"));
        assert_eq!(history.previous(), Some("a"));
        assert_eq!(history.previous(), Some("a"));
        assert_eq!(history.next(), Some("c"));
        assert_eq!(history.next(), None);
    }

    #[test]
    fn controller_restores_previous_value_on_open() {
        let mut find = FindController::new(FindMode::Highlight, FindMatchType::Fuzzy, 10);
        assert!(find.open());
        assert!(!find.open());
        find.set_value("src");
        assert!(find.close());
        assert!(!find.close());
        assert_eq!(find.value(), "");
        assert!(find.open());
        assert_eq!(find.value(), "src");
        assert_eq!(find.history().entries().collect::<Vec<_>>(), vec!["src"]);
    }

    #[test]
    fn controller_mode_follows_toggles() {
        let mut find = FindController::new(FindMode::Highlight, FindMatchType::Fuzzy, 10);
        assert_eq!(find.mode(), FindMode::Highlight);
        assert_eq!(find.toggle(MODE_TOGGLE), Ok(true));
        assert_eq!(find.mode(), FindMode::Filter);
        assert_eq!(find.set_toggle(MATCH_TYPE_TOGGLE, false), Ok(true));
        assert_eq!(find.match_type(), FindMatchType::Contiguous);
        assert!(find.toggle("bogus").is_err());
    }

    #[test]
    fn focus_gate_only_applies_with_several_matches() {
        let tree = TestTree::from_outline("apple\napricot\ncherry");
        let mut filter = labelled();
        let mut find = FindController::new(FindMode::Highlight, FindMatchType::Fuzzy, 10);
        let miss = FilterData::Default;

        assert!(find.should_allow_focus(&filter, Some(&miss)));
        find.open();
        assert!(find.should_allow_focus(&filter, Some(&miss)));

        filter.set_pattern("ap");
        let results = run_pass(&mut filter, &tree);
        assert!(!find.should_allow_focus(&filter, Some(&results[2].data)));
        assert!(find.should_allow_focus(&filter, Some(&results[0].data)));

        filter.set_pattern("che");
        let results = run_pass(&mut filter, &tree);
        assert!(find.should_allow_focus(&filter, Some(&results[0].data)));
    }
}
