//! Label scoring for find-as-you-type.
//!
//! A [`FuzzyScore`] is a sequence `[score, label_start, positions...]` compared
//! lexicographically. Matched positions are stored in descending order, which
//! is the order the backtracking pass produces them. Contiguous matches use
//! [`MAX_SAFE_INTEGER`] as the leading score so they outrank every fuzzy match.

use smallvec::SmallVec;

/// Leading score of a contiguous match.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Labels longer than this are truncated before fuzzy scoring.
pub const MAX_FUZZY_LABEL_LEN: usize = 128;

const DEFAULT_SCORE: i64 = -100;
const CHAR_MATCH: i64 = 1;
const CASE_MATCH_BONUS: i64 = 1;
const LABEL_START_BONUS: i64 = 8;
const WORD_START_BONUS: i64 = 5;
const CAMEL_CASE_BONUS: i64 = 2;
const CONSECUTIVE_BONUS: i64 = 5;
const FULL_LABEL_BONUS: i64 = 10;

/// Lexicographically ordered match score.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FuzzyScore(SmallVec<[i64; 8]>);

impl Default for FuzzyScore {
    fn default() -> Self {
        Self::neutral()
    }
}

impl FuzzyScore {
    /// The neutral score given to elements that did not take part in matching.
    pub fn neutral() -> Self {
        Self(SmallVec::from_slice(&[DEFAULT_SCORE, 0]))
    }

    fn with_positions(score: i64, positions_desc: impl IntoIterator<Item = usize>) -> Self {
        let mut values = SmallVec::new();
        values.push(score);
        values.push(0);
        values.extend(
            positions_desc
                .into_iter()
                .map(|pos| i64::try_from(pos).unwrap_or(i64::MAX)),
        );
        Self(values)
    }

    /// Returns the leading score.
    pub fn score(&self) -> i64 {
        self.0[0]
    }

    /// Returns `true` for the neutral score.
    pub fn is_neutral(&self) -> bool {
        self.0.as_slice() == [DEFAULT_SCORE, 0]
    }

    /// Returns `true` if this score comes from a contiguous match.
    pub fn is_contiguous(&self) -> bool {
        self.score() == MAX_SAFE_INTEGER
    }

    /// Matched character positions in ascending order.
    pub fn matches(&self) -> SmallVec<[usize; 8]> {
        self.0[2..]
            .iter()
            .rev()
            .filter_map(|pos| usize::try_from(*pos).ok())
            .collect()
    }

    /// Raw sequence, mainly for inspection in tests.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

/// Lowercases one `char` at a time so character indices line up with the
/// original text.
pub fn lowercase(text: &str) -> String {
    text.chars().map(lower).collect()
}

/// Case-insensitive substring match.
///
/// `pattern_low` must already be lowercase (see [`lowercase`]). Positions are
/// character indices into `label`.
pub fn contiguous_score(pattern_low: &str, label: &str) -> Option<FuzzyScore> {
    let pattern: SmallVec<[char; 32]> = pattern_low.chars().map(lower).collect();
    if pattern.is_empty() {
        return None;
    }
    let label_low: SmallVec<[char; 64]> = label.chars().map(lower).collect();
    let start = label_low
        .windows(pattern.len())
        .position(|window| window == pattern.as_slice())?;
    Some(FuzzyScore::with_positions(
        MAX_SAFE_INTEGER,
        (start..start + pattern.len()).rev(),
    ))
}

/// Subsequence match with bonuses for the label start, word starts,
/// consecutive runs and a full-label match.
///
/// Case is folded per character, so positions are character indices into
/// `label`.
pub fn fuzzy_score(pattern: &str, label: &str) -> Option<FuzzyScore> {
    let pattern: SmallVec<[char; 32]> = pattern.chars().collect();
    let pattern_low: SmallVec<[char; 32]> = pattern.iter().map(|ch| lower(*ch)).collect();
    if pattern.is_empty() {
        return None;
    }
    let word: SmallVec<[char; 64]> = label.chars().take(MAX_FUZZY_LABEL_LEN).collect();
    let word_low: SmallVec<[char; 64]> = word.iter().map(|ch| lower(*ch)).collect();
    let n = pattern.len();
    let m = word.len();
    if n > m || !is_subsequence(&pattern_low, &word_low) {
        return None;
    }

    // best[i * m + j]: best score for pattern[..=i] with pattern[i] at word[j].
    let mut best: Vec<Option<i64>> = vec![None; n * m];
    let mut from: Vec<usize> = vec![usize::MAX; n * m];

    for i in 0..n {
        // Running max over best[i - 1][..j - 1], i.e. matches that leave a gap.
        let mut gap_best: Option<(i64, usize)> = None;
        for j in i..m {
            if i > 0 && j >= 2 {
                let k = j - 2;
                if let Some(prev) = best[(i - 1) * m + k]
                    && gap_best.is_none_or(|(score, _)| prev > score)
                {
                    gap_best = Some((prev, k));
                }
            }
            if pattern_low[i] != word_low[j] {
                continue;
            }
            let char_score = char_score(&pattern, &word, i, j);
            if i == 0 {
                best[j] = Some(char_score);
                continue;
            }
            let diagonal = best[(i - 1) * m + j - 1]
                .map(|prev| (prev + char_score + CONSECUTIVE_BONUS, j - 1));
            let gapped = gap_best.map(|(prev, k)| (prev + char_score, k));
            let chosen = match (diagonal, gapped) {
                (Some(d), Some(g)) => Some(if d.0 >= g.0 { d } else { g }),
                (d, g) => d.or(g),
            };
            if let Some((score, prev)) = chosen {
                best[i * m + j] = Some(score);
                from[i * m + j] = prev;
            }
        }
    }

    let last_row = (n - 1) * m;
    let (mut end, mut score) = (0..m)
        .filter_map(|j| best[last_row + j].map(|score| (j, score)))
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))?;
    if n == m {
        score += FULL_LABEL_BONUS;
    }

    let mut positions: SmallVec<[usize; 16]> = SmallVec::with_capacity(n);
    for i in (0..n).rev() {
        positions.push(end);
        if i > 0 {
            end = from[i * m + end];
        }
    }
    Some(FuzzyScore::with_positions(score, positions))
}

fn char_score(pattern: &[char], word: &[char], i: usize, j: usize) -> i64 {
    let mut score = CHAR_MATCH;
    if pattern[i] == word[j] {
        score += CASE_MATCH_BONUS;
    }
    if j == 0 {
        score += LABEL_START_BONUS;
    } else if is_separator(word[j - 1]) {
        score += WORD_START_BONUS;
    } else if word[j].is_uppercase() && !word[j - 1].is_uppercase() {
        score += CAMEL_CASE_BONUS;
    }
    score
}

fn is_subsequence(pattern: &[char], word: &[char]) -> bool {
    let mut rest = word.iter();
    pattern.iter().all(|ch| rest.any(|w| w == ch))
}

const fn is_separator(ch: char) -> bool {
    matches!(
        ch,
        '_' | '-' | '.' | ' ' | '/' | '\\' | '\'' | '"' | ':' | '$' | '<' | '>' | '(' | ')' | '['
            | ']' | '{' | '}'
    )
}

fn lower(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fuzzy(pattern: &str, label: &str) -> Option<FuzzyScore> {
        fuzzy_score(pattern, label)
    }

    #[test]
    fn exact_label_outranks_scattered_subsequence() {
        let scattered = fuzzy("abc", "xaxbxc").expect("subsequence");
        let exact = fuzzy("abc", "abc").expect("exact");
        assert!(exact > scattered);
        assert_eq!(exact.matches().as_slice(), &[0, 1, 2]);
        assert_eq!(scattered.matches().as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn non_subsequence_does_not_match() {
        assert_eq!(fuzzy("abd", "abc"), None);
        assert_eq!(fuzzy("abcd", "abc"), None);
    }

    #[test]
    fn fuzzy_is_case_insensitive() {
        let score = fuzzy("fb", "FooBar").expect("match");
        assert_eq!(score.matches().as_slice(), &[0, 3]);
    }

    #[test]
    fn prefers_consecutive_run() {
        let score = fuzzy("ab", "xa_ab").expect("match");
        assert_eq!(score.matches().as_slice(), &[3, 4]);
    }

    #[test]
    fn contiguous_positions_are_descending() {
        let score = contiguous_score("bar", "FooBar").expect("match");
        assert_eq!(score.as_slice(), &[MAX_SAFE_INTEGER, 0, 5, 4, 3]);
        assert_eq!(score.matches().as_slice(), &[3, 4, 5]);
        assert!(score.is_contiguous());
    }

    #[test]
    fn contiguous_requires_adjacent_characters() {
        assert_eq!(contiguous_score("fb", "FooBar"), None);
    }

    #[test]
    fn expanding_lowercase_keeps_label_positions() {
        let score = contiguous_score("a", "İa").expect("match");
        assert_eq!(score.matches().as_slice(), &[1]);
        let score = contiguous_score(&lowercase("Ab"), "İİab").expect("match");
        assert_eq!(score.matches().as_slice(), &[2, 3]);
        assert_eq!(lowercase("İa").chars().count(), 2);
    }

    #[test]
    fn pattern_with_expanding_lowercase_still_matches() {
        let score = fuzzy("İ", "İstanbul").expect("match");
        assert_eq!(score.matches().as_slice(), &[0]);
        let score = fuzzy("İb", "xİstanbul").expect("match");
        assert_eq!(score.matches().as_slice(), &[1, 6]);
    }

    #[test]
    fn neutral_score_is_recognised() {
        assert!(FuzzyScore::neutral().is_neutral());
        assert!(!fuzzy("a", "a").expect("match").is_neutral());
    }

    proptest! {
        #[test]
        fn contiguous_outranks_fuzzy(label in "[a-z]{1,20}", start in 0usize..20, len in 1usize..6) {
            let chars: Vec<char> = label.chars().collect();
            let start = start.min(chars.len() - 1);
            let end = (start + len).min(chars.len());
            let pattern: String = chars[start..end].iter().collect();
            let contiguous = contiguous_score(&pattern, &label).expect("substring");
            let fuzzy = fuzzy(&pattern, &label).expect("subsequence");
            prop_assert!(contiguous > fuzzy);
        }

        #[test]
        fn fuzzy_positions_match_pattern(label in "[a-zA-Z_]{1,30}", picks in proptest::collection::vec(any::<bool>(), 30)) {
            let pattern: String = label
                .chars()
                .zip(picks.iter())
                .filter_map(|(ch, keep)| keep.then_some(ch))
                .collect();
            prop_assume!(!pattern.is_empty());
            let score = fuzzy(&pattern, &label).expect("subsequence of label");
            let positions = score.matches();
            let chars: Vec<char> = label.chars().collect();
            prop_assert_eq!(positions.len(), pattern.chars().count());
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
            for (pos, ch) in positions.iter().zip(pattern.chars()) {
                prop_assert_eq!(lower(chars[*pos]), lower(ch));
            }
        }
    }
}
