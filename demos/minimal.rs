// Minimal demo: a small tree, a find pattern and a scrolled viewport with a pinned ancestor.
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::StatefulWidget;

use tui_stickytree::{
    AbstractTree, TreeLabelPrefix, TreeLabelProvider, TreeModel, TreeOptions, TreeView,
    TreeViewStyle,
};

// In-memory forest; nodes are indices into the vectors.
struct Model {
    names: Vec<String>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl Model {
    // One root with thirty children, enough to scroll.
    fn new() -> Self {
        let mut names = vec!["workspace".to_string()];
        let mut children = vec![Vec::new()];
        for i in 0..30 {
            names.push(format!("file_{i:02}.rs"));
            children.push(Vec::new());
            children[0].push(i + 1);
        }
        Self {
            names,
            children,
            roots: vec![0],
        }
    }
}

impl TreeModel for Model {
    type Node = usize;
    type Element = String;

    fn roots(&self) -> &[usize] {
        &self.roots
    }

    fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    fn element(&self, node: usize) -> &String {
        &self.names[node]
    }

    fn contains(&self, node: usize) -> bool {
        node < self.names.len()
    }
}

struct Label;

impl TreeLabelProvider<Model> for Label {
    fn label_parts<'a>(&'a self, model: &'a Model, node: usize) -> TreeLabelPrefix<'a> {
        TreeLabelPrefix {
            name: &model.names[node],
            prefix: None,
        }
    }
}

fn main() -> tui_stickytree::Result<()> {
    let model = Model::new();
    // The tree state lives across frames; the model is passed per call.
    let mut tree = AbstractTree::new(TreeOptions::default())
        .with_identity_provider(|name: &String| name.clone())
        .with_keyboard_navigation_label_provider(|name: &String| name.clone());
    tree.refresh(&model)?;

    let area = Rect::new(0, 0, 40, 12);
    let mut buffer = Buffer::empty(area);
    TreeView::new(&model, &Label, TreeViewStyle::default()).render(area, &mut buffer, &mut tree);

    // Scrolling pins "workspace" above the first visible row.
    tree.set_scroll_top(12)?;
    tree.set_find_pattern(&model, "f2")?;
    TreeView::new(&model, &Label, TreeViewStyle::default()).render(area, &mut buffer, &mut tree);

    let state = tree.get_view_state(&model)?;
    println!("focus: {:?}, scroll_top: {}", state.focus, state.scroll_top);
    Ok(())
}
