use std::borrow::Cow;

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::context::TreeRowContext;
use crate::model::TreeModel;

#[derive(Clone, Copy, Debug)]
pub struct TreeGlyphs<'a> {
    pub indent: &'a str,
    pub branch_last: &'a str,
    pub branch: &'a str,
    pub vert: &'a str,
    pub empty: &'a str,
    pub leaf: &'a str,
    pub expanded: &'a str,
    pub collapsed: &'a str,
}

impl TreeGlyphs<'static> {
    pub const fn unicode() -> Self {
        Self {
            indent: "   ",
            branch_last: "└──",
            branch: "├──",
            vert: "│  ",
            empty: "   ",
            leaf: "•",
            expanded: "▼",
            collapsed: "▶",
        }
    }

    pub const fn ascii() -> Self {
        Self {
            indent: "   ",
            branch_last: "`--",
            branch: "|--",
            vert: "|  ",
            empty: "   ",
            leaf: "*",
            expanded: "v",
            collapsed: ">",
        }
    }
}

#[derive(Clone)]
pub struct TreeLabelPrefix<'a> {
    pub name: &'a str,
    /// Decoration drawn between the expander and the name (e.g. an icon).
    pub prefix: Option<Cow<'a, str>>,
}

/// Supplies the visible name of a node; rendering is handled by [`tree_label_line`].
pub trait TreeLabelProvider<T: TreeModel> {
    fn label_parts<'a>(&'a self, model: &'a T, node: T::Node) -> TreeLabelPrefix<'a>;
}

/// Full control over a row's line.
pub trait TreeLabelRenderer<T: TreeModel> {
    fn line<'a>(
        &'a self,
        model: &'a T,
        node: T::Node,
        ctx: &TreeRowContext,
        glyphs: &TreeGlyphs<'a>,
    ) -> Line<'a>;
}

impl<T, P> TreeLabelRenderer<T> for P
where
    T: TreeModel,
    P: TreeLabelProvider<T>,
{
    fn line<'a>(
        &'a self,
        model: &'a T,
        node: T::Node,
        ctx: &TreeRowContext,
        glyphs: &TreeGlyphs<'a>,
    ) -> Line<'a> {
        let parts = self.label_parts(model, node);
        tree_label_line(ctx, parts, glyphs)
    }
}

pub fn tree_label_line<'a>(
    ctx: &TreeRowContext<'_>,
    parts: TreeLabelPrefix<'a>,
    glyphs: &TreeGlyphs<'a>,
) -> Line<'a> {
    let TreeLabelPrefix { name, prefix: op } = parts;
    let op = op.filter(|value| !value.is_empty());
    let expander = if ctx.is_collapsible {
        if ctx.is_expanded {
            glyphs.expanded
        } else {
            glyphs.collapsed
        }
    } else if ctx.level == 0 {
        ""
    } else {
        glyphs.leaf
    };

    let mut spans = Vec::with_capacity(ctx.is_tail_stack.len() + 6);
    if ctx.level == 0 || !ctx.draw_lines {
        for _ in 0..ctx.level {
            spans.push(Span::raw(glyphs.empty));
        }
    } else {
        let own = usize::from(ctx.level) - 1;
        for (l, is_last) in ctx.is_tail_stack.iter().enumerate() {
            let part = if l == own {
                if *is_last {
                    glyphs.branch_last
                } else {
                    glyphs.branch
                }
            } else if *is_last {
                glyphs.indent
            } else {
                glyphs.vert
            };
            spans.push(Span::styled(part, ctx.guide_style(l)));
        }
    }

    if !expander.is_empty() {
        spans.push(Span::raw(expander));
    }
    spans.push(Span::raw(" "));
    if let Some(op) = op {
        spans.push(Span::raw(op));
        spans.push(Span::raw(" "));
    }
    push_highlighted(&mut spans, name, ctx.matches_for(name), ctx.match_style);
    Line::from(spans)
}

/// Splits `name` into plain and matched runs.
fn push_highlighted<'a>(spans: &mut Vec<Span<'a>>, name: &'a str, matches: &[usize], style: Style) {
    if matches.is_empty() {
        spans.push(Span::raw(name));
        return;
    }
    let mut run_start = 0;
    let mut in_match = false;
    for (char_index, (byte_index, _)) in name.char_indices().enumerate() {
        let hit = matches.binary_search(&char_index).is_ok();
        if hit != in_match {
            push_run(spans, &name[run_start..byte_index], in_match, style);
            run_start = byte_index;
            in_match = hit;
        }
    }
    push_run(spans, &name[run_start..], in_match, style);
}

fn push_run<'a>(spans: &mut Vec<Span<'a>>, text: &'a str, matched: bool, style: Style) {
    if text.is_empty() {
        return;
    }
    spans.push(if matched {
        Span::styled(text, style)
    } else {
        Span::raw(text)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Modifier;

    fn ctx<'a>(level: u16, tail: &'a [bool], matches: &'a [usize]) -> TreeRowContext<'a> {
        TreeRowContext {
            level,
            is_tail_stack: tail,
            is_expanded: false,
            is_collapsible: false,
            is_focused: false,
            is_selected: false,
            is_sticky: false,
            draw_lines: true,
            active_guides: &[],
            matches,
            match_label: None,
            line_style: Style::default(),
            active_line_style: Style::default(),
            match_style: Style::default().add_modifier(Modifier::BOLD),
        }
    }

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn nested_leaf_draws_branches() {
        let parts = TreeLabelPrefix {
            name: "leaf",
            prefix: None,
        };
        let line = tree_label_line(&ctx(2, &[false, true], &[]), parts, &TreeGlyphs::ascii());
        assert_eq!(text(&line), "|  `--* leaf");
    }

    #[test]
    fn matched_characters_get_their_own_spans() {
        let parts = TreeLabelPrefix {
            name: "banana",
            prefix: None,
        };
        let line = tree_label_line(&ctx(0, &[], &[0, 1]), parts, &TreeGlyphs::ascii());
        let bold: Vec<&str> = line
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::BOLD))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(bold, vec!["ba"]);
        assert_eq!(text(&line), " banana");
    }

    #[test]
    fn positions_for_another_label_are_ignored() {
        let mut context = ctx(0, &[], &[0]);
        context.match_label = Some("alias");
        assert!(context.matches_for("name").is_empty());
        assert_eq!(context.matches_for("alias"), &[0]);
    }
}
