//! Arena-backed forest shared by the unit tests.

use crate::model::TreeModel;

pub struct TestTree {
    labels: Vec<String>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    alive: Vec<bool>,
    roots: Vec<usize>,
}

impl TestTree {
    pub const fn new() -> Self {
        Self {
            labels: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            alive: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Builds a forest from an outline indented by two spaces per level.
    pub fn from_outline(outline: &str) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<usize> = Vec::new();
        for line in outline.lines().filter(|line| !line.trim().is_empty()) {
            let depth = (line.len() - line.trim_start().len()) / 2;
            stack.truncate(depth);
            let parent = stack.last().copied();
            let node = tree.add(parent, line.trim());
            stack.push(node);
        }
        tree
    }

    /// Appends a node; handles are never reused.
    pub fn add(&mut self, parent: Option<usize>, label: &str) -> usize {
        let len = parent.map_or(self.roots.len(), |parent| self.children[parent].len());
        self.insert(parent, len, label)
    }

    pub fn insert(&mut self, parent: Option<usize>, index: usize, label: &str) -> usize {
        let node = self.labels.len();
        self.labels.push(label.to_owned());
        self.children.push(Vec::new());
        self.parents.push(parent);
        self.alive.push(true);
        match parent {
            Some(parent) => self.children[parent].insert(index, node),
            None => self.roots.insert(index, node),
        }
        node
    }

    /// Detaches a node and drops its whole subtree.
    pub fn remove(&mut self, node: usize) {
        match self.parents[node] {
            Some(parent) => self.children[parent].retain(|child| *child != node),
            None => self.roots.retain(|root| *root != node),
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.alive[current] = false;
            stack.extend(self.children[current].iter().copied());
        }
    }

    /// Swaps a node for a fresh leaf with the same label at the same position.
    pub fn replace(&mut self, node: usize) -> usize {
        let parent = self.parents[node];
        let siblings = parent.map_or(&self.roots, |parent| &self.children[parent]);
        let index = siblings.iter().position(|sibling| *sibling == node).unwrap_or(0);
        let label = self.labels[node].clone();
        self.remove(node);
        self.insert(parent, index, &label)
    }

    pub fn label(&self, node: usize) -> &str {
        &self.labels[node]
    }

    /// Handle of the live node with the given label.
    pub fn find(&self, label: &str) -> usize {
        (0..self.labels.len())
            .find(|node| self.alive[*node] && self.labels[*node] == label)
            .unwrap_or_else(|| panic!("no live node labelled {label}"))
    }

    /// Live nodes in depth-first pre-order.
    pub fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children[node].iter().rev().copied());
        }
        out
    }
}

impl TreeModel for TestTree {
    type Node = usize;
    type Element = String;

    fn roots(&self) -> &[usize] {
        &self.roots
    }

    fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    fn element(&self, node: usize) -> &String {
        &self.labels[node]
    }

    fn contains(&self, node: usize) -> bool {
        self.alive.get(node).copied().unwrap_or(false)
    }
}

/// Identity provider keyed by label.
pub fn label_id(label: &String) -> String {
    label.clone()
}
