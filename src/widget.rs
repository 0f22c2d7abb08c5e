use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Clear, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, Widget,
};

use crate::context::TreeRowContext;
use crate::find::{FilterData, FindMatchType, FindMode};
use crate::glyphs::{TreeGlyphs, TreeLabelRenderer};
use crate::model::TreeModel;
use crate::style::TreeViewStyle;
use crate::tree::AbstractTree;
use crate::view_model::RenderedRow;

/// How a row is placed: in the list, or pinned in the sticky overlay.
#[derive(Clone, Copy)]
enum Placement {
    List,
    Sticky { focused: bool, innermost: bool },
}

/// Renders an [`AbstractTree`]: visible rows, sticky overlay, find line and scrollbar.
pub struct TreeView<'a, M, L>
where
    M: TreeModel,
    L: TreeLabelRenderer<M>,
{
    model: &'a M,
    label: &'a L,
    style: TreeViewStyle<'a>,
    glyphs: TreeGlyphs<'a>,
}

impl<'a, M, L> TreeView<'a, M, L>
where
    M: TreeModel + 'static,
    L: TreeLabelRenderer<M>,
{
    pub const fn new(model: &'a M, label: &'a L, style: TreeViewStyle<'a>) -> Self {
        Self {
            model,
            label,
            style,
            glyphs: TreeGlyphs::unicode(),
        }
    }

    #[must_use]
    pub const fn glyphs(mut self, glyphs: TreeGlyphs<'a>) -> Self {
        self.glyphs = glyphs;
        self
    }

    fn render_rows(&self, area: Rect, buf: &mut Buffer, tree: &AbstractTree<M>) {
        let layout = tree.layout();
        let scroll_top = layout.scroll_top();
        for index in layout.visible_range() {
            let (Some(row), Some(top)) = (tree.view().row(index), layout.element_top(index)) else {
                continue;
            };
            // Rows starting above the viewport are only partially visible; skip them.
            let Some(offset) = top.checked_sub(scroll_top) else {
                continue;
            };
            let Ok(offset) = u16::try_from(offset) else {
                break;
            };
            if offset >= area.height {
                break;
            }
            let height = u16::try_from(row.height())
                .unwrap_or(u16::MAX)
                .min(area.height - offset);
            let rect = Rect {
                y: area.y + offset,
                height,
                ..area
            };
            self.render_row(rect, buf, tree, row, Placement::List);
        }
    }

    fn render_sticky(&self, area: Rect, buf: &mut Buffer, tree: &AbstractTree<M>) {
        if tree.sticky_scroll().is_none() {
            return;
        }
        let state = tree.sticky_state();
        let focused = tree
            .sticky_scroll()
            .and_then(|sticky| sticky.focus().focused());
        let last = state.count().saturating_sub(1);
        for (i, pinned) in state.nodes().iter().enumerate() {
            let Some(row) = tree.view().row(pinned.start_index) else {
                continue;
            };
            let top = pinned.position.max(0);
            let bottom = pinned.bottom().min(i64::from(area.height));
            let (Ok(top), Ok(bottom)) = (u16::try_from(top), u16::try_from(bottom)) else {
                continue;
            };
            if bottom <= top {
                continue;
            }
            let rect = Rect {
                y: area.y + top,
                height: bottom - top,
                ..area
            };
            Clear.render(rect, buf);
            let placement = Placement::Sticky {
                focused: focused == Some(i),
                innermost: i == last,
            };
            self.render_row(rect, buf, tree, row, placement);
        }
    }

    fn render_row(
        &self,
        rect: Rect,
        buf: &mut Buffer,
        tree: &AbstractTree<M>,
        row: &RenderedRow<M::Node>,
        placement: Placement,
    ) {
        let node = row.node();
        let (is_sticky, is_focused) = match placement {
            Placement::List => (false, tree.is_focused(node) && !tree.is_sticky_scroll_focused()),
            Placement::Sticky { focused, .. } => (true, focused),
        };
        let is_selected = tree.is_selected(node);
        let data = tree.filter_data(node);
        let matches = data.map(FilterData::matches).unwrap_or_default();
        let active_guides = tree.indent_guides().active_levels(tree.view(), node);
        let ctx = TreeRowContext {
            level: row.depth(),
            is_tail_stack: row.is_tail_stack(),
            is_expanded: !row.is_collapsed(),
            is_collapsible: row.is_collapsible(),
            is_focused,
            is_selected,
            is_sticky,
            draw_lines: tree.indent_guides().is_visible(tree.is_hovered()),
            active_guides: &active_guides,
            matches: &matches,
            match_label: data.and_then(FilterData::label),
            line_style: self.style.line_style,
            active_line_style: self.style.active_line_style,
            match_style: self.style.match_style,
        };

        let mut style = if is_sticky {
            self.style.sticky_style
        } else {
            Style::default()
        };
        if is_selected {
            style = style.patch(self.style.selection_style);
        }
        if is_focused && tree.has_focus() {
            style = style.patch(self.style.focus_style);
        }
        if matches!(placement, Placement::Sticky { innermost: true, .. }) {
            style = style.patch(self.style.sticky_shadow_style);
        }
        buf.set_style(rect, style);

        let symbol = Span::raw(self.style.highlight_symbol);
        let symbol_width = u16::try_from(symbol.width()).unwrap_or(rect.width);
        if is_focused {
            buf.set_span(rect.x, rect.y, &symbol, rect.width);
        }
        let line = self.label.line(self.model, node, &ctx, &self.glyphs);
        let x = rect.x.saturating_add(symbol_width);
        buf.set_line(x, rect.y, &line, rect.width.saturating_sub(symbol_width));
    }

    fn render_find(&self, area: Rect, buf: &mut Buffer, tree: &AbstractTree<M>) {
        let Some(find) = tree.find() else {
            return;
        };
        let mode = match find.mode() {
            FindMode::Highlight => "highlight",
            FindMode::Filter => "filter",
        };
        let match_type = match find.match_type() {
            FindMatchType::Fuzzy => "fuzzy",
            FindMatchType::Contiguous => "contiguous",
        };
        let filter = tree.filter();
        let mut spans = vec![
            Span::styled(format!("/{}", find.value()), self.style.find_style),
            Span::raw(format!(
                "  [{mode}|{match_type}] {}/{}",
                filter.match_count(),
                filter.total_count()
            )),
        ];
        if let Some(message) = find.message() {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(message.text(), self.style.find_message_style));
        }
        Clear.render(area, buf);
        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }

    fn render_scrollbar(&self, area: Rect, buf: &mut Buffer, tree: &AbstractTree<M>) {
        let layout = tree.layout();
        let scroll_len = usize::try_from(layout.max_scroll_top())
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let position = usize::try_from(layout.scroll_top())
            .unwrap_or(0)
            .min(scroll_len.saturating_sub(1));
        let mut scrollbar_state = ScrollbarState::new(scroll_len)
            .position(position)
            .viewport_content_length(usize::try_from(layout.viewport_height()).unwrap_or(0));
        Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .style(self.style.line_style)
            .render(area, buf, &mut scrollbar_state);
    }
}

impl<M, L> StatefulWidget for TreeView<'_, M, L>
where
    M: TreeModel + 'static,
    L: TreeLabelRenderer<M>,
{
    type State = AbstractTree<M>;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let _span = tracing::debug_span!("tree_view.render", rows = state.view().len()).entered();

        let mut block = Block::default().borders(self.style.borders);
        if let Some(title) = self.style.title.clone() {
            block = block.title(title);
        }
        block = block
            .style(self.style.block_style)
            .border_style(self.style.border_style);
        let inner = block.inner(area);
        block.render(area, buf);

        let find_height = u16::from(state.is_find_open() && inner.height > 1);
        let list_area = Rect {
            height: inner.height - find_height,
            ..inner
        };
        if let Err(err) = state.set_viewport_height(u32::from(list_area.height)) {
            tracing::error!(%err, "sticky scroll update failed");
        }

        let layout = state.layout();
        let scrollable = layout.content_height() > layout.viewport_height();
        let (rows_area, scrollbar_area) = if scrollable && list_area.width > 1 {
            (
                Rect {
                    width: list_area.width - 1,
                    ..list_area
                },
                Some(Rect {
                    x: list_area.right() - 1,
                    width: 1,
                    ..list_area
                }),
            )
        } else {
            (list_area, None)
        };

        self.render_rows(rows_area, buf, state);
        self.render_sticky(rows_area, buf, state);
        if find_height > 0 {
            let find_area = Rect {
                y: list_area.bottom(),
                height: 1,
                ..inner
            };
            self.render_find(find_area, buf, state);
        }
        if let Some(scrollbar_area) = scrollbar_area {
            self.render_scrollbar(scrollbar_area, buf, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyphs::{TreeLabelPrefix, TreeLabelProvider};
    use crate::options::TreeOptions;
    use crate::test_model::TestTree;

    struct Names;

    impl TreeLabelProvider<TestTree> for Names {
        fn label_parts<'a>(&'a self, model: &'a TestTree, node: usize) -> TreeLabelPrefix<'a> {
            TreeLabelPrefix {
                name: model.label(node),
                prefix: None,
            }
        }
    }

    fn wide_tree() -> TestTree {
        let mut outline = String::from("root\n");
        for i in 0..20 {
            outline.push_str(&format!("  child{i}\n"));
        }
        TestTree::from_outline(outline.trim_end())
    }

    fn tree_over(model: &TestTree) -> AbstractTree<TestTree> {
        let mut tree = AbstractTree::new(TreeOptions::default())
            .with_keyboard_navigation_label_provider(|label: &String| label.clone());
        tree.refresh(model).unwrap();
        tree
    }

    fn line_text(buf: &Buffer, y: u16) -> String {
        (buf.area.x..buf.area.right())
            .map(|x| buf[(x, y)].symbol())
            .collect()
    }

    fn render(model: &TestTree, tree: &mut AbstractTree<TestTree>, area: Rect) -> Buffer {
        let mut buffer = Buffer::empty(area);
        TreeView::new(model, &Names, TreeViewStyle::default()).render(area, &mut buffer, tree);
        buffer
    }

    #[test]
    fn render_smoke_with_scrollbar() {
        let model = wide_tree();
        let mut tree = tree_over(&model);
        let buffer = render(&model, &mut tree, Rect::new(0, 0, 20, 6));
        assert_eq!(tree.layout().viewport_height(), 4);
        assert!(line_text(&buffer, 1).contains("root"));
    }

    #[test]
    fn pinned_ancestor_covers_the_first_row() {
        let model = wide_tree();
        let mut tree = tree_over(&model);
        let area = Rect::new(0, 0, 24, 8);
        render(&model, &mut tree, area);
        tree.set_scroll_top(5).unwrap();
        let buffer = render(&model, &mut tree, area);
        assert!(line_text(&buffer, 1).contains("root"));
        assert!(line_text(&buffer, 2).contains("child5"));
    }

    #[test]
    fn find_line_shows_pattern_and_message() {
        let model = wide_tree();
        let mut tree = tree_over(&model);
        tree.set_find_pattern(&model, "zzz").unwrap();
        let buffer = render(&model, &mut tree, Rect::new(0, 0, 40, 6));
        let find_line = line_text(&buffer, 4);
        assert!(find_line.contains("/zzz"));
        assert!(find_line.contains("No results"));
    }

    #[test]
    fn focused_row_gets_the_highlight_symbol() {
        let model = TestTree::from_outline("a\nb");
        let mut tree = tree_over(&model);
        tree.set_focus(vec![model.find("b")]);
        let buffer = render(&model, &mut tree, Rect::new(0, 0, 20, 4));
        assert!(line_text(&buffer, 2).starts_with("│>> "));
    }
}
