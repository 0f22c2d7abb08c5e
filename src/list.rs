use std::ops::Range;

use crate::style::TreeScrollPolicy;

/// Geometry of the virtualized row list.
///
/// Heights are abstract units (terminal rows for the bundled widget). Only
/// the rows intersecting `[scroll_top, scroll_top + viewport_height)` are
/// rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListLayout {
    // Prefix sums: tops[i] is the top of row i, tops[len] the content height.
    tops: Vec<u32>,
    scroll_top: u32,
    viewport_height: u32,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ListLayout {
    pub fn new() -> Self {
        Self {
            tops: vec![0],
            scroll_top: 0,
            viewport_height: 0,
        }
    }

    /// Replaces the row heights, keeping the scroll position clamped.
    pub fn set_heights(&mut self, heights: impl IntoIterator<Item = u32>) {
        self.tops.clear();
        self.tops.push(0);
        let mut top = 0u32;
        for height in heights {
            top = top.saturating_add(height);
            self.tops.push(top);
        }
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
    }

    /// Number of rows.
    pub const fn len(&self) -> usize {
        self.tops.len().saturating_sub(1)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn content_height(&self) -> u32 {
        self.tops.last().copied().unwrap_or(0)
    }

    pub const fn scroll_top(&self) -> u32 {
        self.scroll_top
    }

    pub const fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    pub fn max_scroll_top(&self) -> u32 {
        self.content_height().saturating_sub(self.viewport_height)
    }

    /// Sets the viewport height; returns `true` if it changed.
    pub fn set_viewport_height(&mut self, height: u32) -> bool {
        if self.viewport_height == height {
            return false;
        }
        self.viewport_height = height;
        self.scroll_top = self.scroll_top.min(self.max_scroll_top());
        true
    }

    /// Sets the scroll position (clamped); returns `true` if it changed.
    pub fn set_scroll_top(&mut self, scroll_top: u32) -> bool {
        let clamped = scroll_top.min(self.max_scroll_top());
        if clamped == self.scroll_top {
            return false;
        }
        self.scroll_top = clamped;
        true
    }

    /// Top of a row in content coordinates.
    pub fn element_top(&self, index: usize) -> Option<u32> {
        (index < self.len()).then(|| self.tops[index])
    }

    pub fn element_height(&self, index: usize) -> Option<u32> {
        (index < self.len()).then(|| self.tops[index + 1] - self.tops[index])
    }

    /// Row containing the content offset `y`, if any.
    pub fn index_at(&self, y: u32) -> Option<usize> {
        if y >= self.content_height() {
            return None;
        }
        let after = self.tops.partition_point(|top| *top <= y);
        after.checked_sub(1)
    }

    /// First row intersecting the viewport.
    pub fn first_visible_index(&self) -> Option<usize> {
        self.index_at(self.scroll_top)
    }

    /// Rows intersecting the viewport.
    pub fn visible_range(&self) -> Range<usize> {
        let Some(start) = self.first_visible_index() else {
            return 0..0;
        };
        let bottom = self.scroll_top.saturating_add(self.viewport_height);
        let end = self.tops.partition_point(|top| *top < bottom).min(self.len());
        start..end.max(start)
    }

    /// Top of a fully visible row relative to the viewport top.
    pub fn relative_top(&self, index: usize) -> Option<i64> {
        let top = self.element_top(index)?;
        let height = self.element_height(index)?;
        let bottom = top.saturating_add(height);
        if top < self.scroll_top || bottom > self.scroll_top.saturating_add(self.viewport_height) {
            return None;
        }
        Some(i64::from(top) - i64::from(self.scroll_top))
    }

    pub fn is_fully_visible(&self, index: usize) -> bool {
        self.relative_top(index).is_some()
    }

    /// Scrolls so the row is visible; returns `true` if the scroll position changed.
    pub fn reveal(&mut self, index: usize, policy: TreeScrollPolicy) -> bool {
        self.reveal_with_padding(index, policy, 0)
    }

    /// Like [`ListLayout::reveal`], but the top `padding` rows of the
    /// viewport count as covered (e.g. by the sticky overlay).
    pub fn reveal_with_padding(&mut self, index: usize, policy: TreeScrollPolicy, padding: u32) -> bool {
        let (Some(top), Some(height)) = (self.element_top(index), self.element_height(index))
        else {
            return false;
        };
        let padding = padding.min(self.viewport_height.saturating_sub(height));
        match policy {
            TreeScrollPolicy::KeepInView => {
                let bottom = top.saturating_add(height);
                if top < self.scroll_top.saturating_add(padding) {
                    self.set_scroll_top(top.saturating_sub(padding))
                } else if bottom > self.scroll_top.saturating_add(self.viewport_height) {
                    self.set_scroll_top(bottom.saturating_sub(self.viewport_height))
                } else {
                    false
                }
            }
            TreeScrollPolicy::CenterOnSelect => {
                // Center the row, then clamp to the valid scroll range.
                let center = top.saturating_add(height / 2);
                self.set_scroll_top(center.saturating_sub(self.viewport_height / 2))
            }
        }
    }

    /// Places the row at `ratio` (0 = top, 1 = bottom) of the uncovered viewport.
    pub fn reveal_relative(&mut self, index: usize, ratio: f64, padding: u32) -> bool {
        let (Some(top), Some(height)) = (self.element_top(index), self.element_height(index))
        else {
            return false;
        };
        let free = f64::from(self.viewport_height) - f64::from(height) - f64::from(padding);
        let offset = (free.max(0.0) * ratio.clamp(0.0, 1.0)).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let offset = offset as u32;
        self.set_scroll_top(top.saturating_sub(offset.saturating_add(padding)))
    }

    /// Scrolls so the row's top sits at `offset` below the viewport top.
    pub fn reveal_at(&mut self, index: usize, offset: u32) -> bool {
        self.element_top(index)
            .is_some_and(|top| self.set_scroll_top(top.saturating_sub(offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(heights: &[u32], viewport: u32) -> ListLayout {
        let mut layout = ListLayout::new();
        layout.set_heights(heights.iter().copied());
        layout.set_viewport_height(viewport);
        layout
    }

    #[test]
    fn index_at_uses_row_boundaries() {
        let layout = layout(&[2, 3, 1], 4);
        assert_eq!(layout.index_at(0), Some(0));
        assert_eq!(layout.index_at(1), Some(0));
        assert_eq!(layout.index_at(2), Some(1));
        assert_eq!(layout.index_at(5), Some(2));
        assert_eq!(layout.index_at(6), None);
    }

    #[test]
    fn scroll_top_is_clamped() {
        let mut layout = layout(&[1; 10], 4);
        assert!(layout.set_scroll_top(100));
        assert_eq!(layout.scroll_top(), 6);
        layout.set_heights([1; 3]);
        assert_eq!(layout.scroll_top(), 0);
    }

    #[test]
    fn relative_top_requires_full_visibility() {
        let mut layout = layout(&[2; 10], 5);
        layout.set_scroll_top(1);
        assert_eq!(layout.relative_top(0), None);
        assert_eq!(layout.relative_top(1), Some(1));
        assert_eq!(layout.relative_top(2), Some(3));
        assert_eq!(layout.relative_top(3), None);
        assert_eq!(layout.visible_range(), 0..3);
    }

    #[test]
    fn reveal_keeps_row_in_view() {
        let mut layout = layout(&[1; 20], 5);
        assert!(layout.reveal(10, TreeScrollPolicy::KeepInView));
        assert_eq!(layout.scroll_top(), 6);
        assert!(!layout.reveal(8, TreeScrollPolicy::KeepInView));
        assert!(layout.reveal(2, TreeScrollPolicy::KeepInView));
        assert_eq!(layout.scroll_top(), 2);
    }

    #[test]
    fn reveal_keeps_row_below_padding() {
        let mut layout = layout(&[1; 20], 5);
        layout.set_scroll_top(10);
        assert!(layout.reveal_with_padding(11, TreeScrollPolicy::KeepInView, 2));
        assert_eq!(layout.scroll_top(), 9);
        assert!(!layout.reveal_with_padding(12, TreeScrollPolicy::KeepInView, 2));
    }

    #[test]
    fn reveal_relative_centers_in_free_space() {
        let mut layout = layout(&[1; 20], 5);
        assert!(layout.reveal_relative(10, 0.5, 0));
        assert_eq!(layout.scroll_top(), 8);
        assert!(layout.reveal_relative(10, 0.0, 1));
        assert_eq!(layout.scroll_top(), 9);
    }

    #[test]
    fn reveal_can_center() {
        let mut layout = layout(&[1; 20], 5);
        layout.reveal(10, TreeScrollPolicy::CenterOnSelect);
        assert_eq!(layout.scroll_top(), 8);
        layout.reveal(19, TreeScrollPolicy::CenterOnSelect);
        assert_eq!(layout.scroll_top(), 15);
    }
}
