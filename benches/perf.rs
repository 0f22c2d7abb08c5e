//! Run with: cargo bench --bench perf

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use tui_stickytree::{AbstractTree, TreeModel, TreeOptions, fuzzy_score};

/// Balanced forest: `fanout` children per node down to `depth` levels.
struct Forest {
    labels: Vec<String>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl Forest {
    fn new(fanout: usize, depth: usize) -> Self {
        let mut forest = Self {
            labels: Vec::new(),
            children: Vec::new(),
            roots: Vec::new(),
        };
        for i in 0..fanout {
            let root = forest.push(format!("src_{i}"));
            forest.roots.push(root);
            forest.grow(root, fanout, depth - 1);
        }
        forest
    }

    fn push(&mut self, label: String) -> usize {
        self.labels.push(label);
        self.children.push(Vec::new());
        self.labels.len() - 1
    }

    fn grow(&mut self, parent: usize, fanout: usize, depth: usize) {
        if depth == 0 {
            return;
        }
        for i in 0..fanout {
            let label = format!("{}/node_{i}.rs", self.labels[parent]);
            let child = self.push(label);
            self.children[parent].push(child);
            self.grow(child, fanout, depth - 1);
        }
    }
}

impl TreeModel for Forest {
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
        node < self.labels.len()
    }

    fn size_hint(&self) -> usize {
        self.labels.len()
    }
}

fn tree_over(forest: &Forest) -> AbstractTree<Forest> {
    let mut tree = AbstractTree::new(TreeOptions::default())
        .with_keyboard_navigation_label_provider(|label: &String| label.clone());
    tree.set_viewport_height(40).expect("viewport");
    tree.refresh(forest).expect("refresh");
    tree
}

fn bench_fuzzy(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzzy");
    let forest = Forest::new(8, 4);
    group.throughput(Throughput::Elements(forest.labels.len() as u64));
    for pattern in ["n", "node7", "s1n2rs"] {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), &forest, |b, forest| {
            b.iter(|| {
                forest
                    .labels
                    .iter()
                    .filter_map(|label| fuzzy_score(pattern, black_box(label)))
                    .count()
            });
        });
    }
    group.finish();
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");
    for fanout in [4, 8] {
        let forest = Forest::new(fanout, 4);
        group.throughput(Throughput::Elements(forest.labels.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fanout), &forest, |b, forest| {
            b.iter(|| black_box(tree_over(forest)));
        });
    }
    group.finish();
}

fn bench_sticky_scroll(c: &mut Criterion) {
    let forest = Forest::new(8, 4);
    let mut tree = tree_over(&forest);
    let max = tree.layout().max_scroll_top();
    c.bench_function("sticky/scroll_sweep", |b| {
        b.iter(|| {
            for top in (0..max).step_by(37) {
                tree.set_scroll_top(top).expect("sticky update");
                black_box(tree.sticky_state().count());
            }
        });
    });
}

fn bench_find_pattern(c: &mut Criterion) {
    let forest = Forest::new(8, 4);
    let mut tree = tree_over(&forest);
    c.bench_function("find/type_pattern", |b| {
        b.iter(|| {
            for pattern in ["s", "s3", "s3n", "s3n5"] {
                tree.set_find_pattern(&forest, pattern).expect("pattern");
            }
            tree.close_find(&forest).expect("close");
        });
    });
}

criterion_group!(
    benches,
    bench_fuzzy,
    bench_refresh,
    bench_sticky_scroll,
    bench_find_pattern
);
criterion_main!(benches);
