//! Proportional placement of frames on the character grid.

use super::color::heat_color;
use super::tree::{FrameId, FrameTree};
use ratatui::style::Color;
use std::collections::HashMap;

/// Which way depth grows on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Direction {
    /// Root frames on the first row, callees below
    #[default]
    TopDown,
    /// Root frames on the last row, callees above
    BottomUp,
}

impl Direction {
    /// Screen row of frames at `depth` (0 = children of the root)
    pub fn row(self, origin: i32, depth: usize) -> i32 {
        match self {
            Direction::TopDown => origin + depth as i32,
            Direction::BottomUp => origin - depth as i32,
        }
    }

    /// Row offset from a frame to its children
    pub fn child_step(self) -> i32 {
        match self {
            Direction::TopDown => 1,
            Direction::BottomUp => -1,
        }
    }
}

/// Where one frame landed in the current layout pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedFrame {
    pub frame: FrameId,
    /// Position in the pass's rendering order
    pub index: usize,
    pub x: u32,
    pub y: i32,
    pub width: u32,
    pub depth: usize,
    pub color: Color,
}

impl RenderedFrame {
    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn contains(&self, column: u32, row: i32) -> bool {
        row == self.y && column >= self.x && column < self.right()
    }

    pub fn overlaps(&self, other: &RenderedFrame) -> bool {
        self.x < other.right() && other.x < self.right()
    }
}

/// Flat list of rendered frames plus the frame-to-record index.
///
/// Rebuilt from scratch on every pass; never patched.
#[derive(Debug, Default, Clone)]
pub struct FrameLayout {
    frames: Vec<RenderedFrame>,
    by_frame: HashMap<FrameId, usize>,
}

impl FrameLayout {
    pub fn frames(&self) -> &[RenderedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RenderedFrame> {
        self.frames.get(index)
    }

    /// Record of `frame` in this pass, if it was laid out
    pub fn record_of(&self, frame: FrameId) -> Option<&RenderedFrame> {
        self.by_frame.get(&frame).map(|&i| &self.frames[i])
    }

    fn push(&mut self, mut record: RenderedFrame) {
        record.index = self.frames.len();
        self.by_frame.insert(record.frame, record.index);
        self.frames.push(record);
    }
}

/// Lay out every non-root frame of `tree`.
///
/// `x` and `width` describe the columns available to the root's children;
/// `origin_row` is the row of depth 0.
pub fn layout(
    tree: &FrameTree,
    x: u32,
    width: u32,
    origin_row: i32,
    direction: Direction,
) -> FrameLayout {
    let mut out = FrameLayout::default();
    if tree.is_empty() {
        return out;
    }
    let mut pass = Pass {
        tree,
        origin_row,
        direction,
        max_count: tree.max_count(),
        out: &mut out,
    };
    pass.place_children(FrameId::ROOT, x, width, 0);
    out
}

struct Pass<'a> {
    tree: &'a FrameTree,
    origin_row: i32,
    direction: Direction,
    max_count: u64,
    out: &'a mut FrameLayout,
}

impl Pass<'_> {
    fn place_children(&mut self, parent: FrameId, x: u32, width: u32, depth: usize) {
        let tree = self.tree;
        let children = &tree.frame(parent).children;
        if children.is_empty() {
            return;
        }
        let total: u64 = children.iter().map(|&c| tree.frame(c).count).sum();
        let row = self.direction.row(self.origin_row, depth);

        let mut cursor = x;
        for &child in children {
            let count = tree.frame(child).count;
            let child_width = share(width, count, total);
            let relative = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            };
            self.out.push(RenderedFrame {
                frame: child,
                index: 0,
                x: cursor,
                y: row,
                width: child_width,
                depth,
                color: heat_color(count, self.max_count, relative),
            });
            self.place_children(child, cursor, child_width, depth + 1);
            cursor += child_width;
        }
    }
}

/// `floor(width * count / total)`, never less than one column.
///
/// Many small siblings can therefore overflow the parent's width.
pub fn share(width: u32, count: u64, total: u64) -> u32 {
    if total == 0 {
        return 1;
    }
    let exact = u128::from(width) * u128::from(count) / u128::from(total);
    u32::try_from(exact).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flamegraph::ingest::tree_from_text;

    fn widths(layout: &FrameLayout, depth: usize) -> Vec<u32> {
        layout
            .frames()
            .iter()
            .filter(|r| r.depth == depth)
            .map(|r| r.width)
            .collect()
    }

    #[test]
    fn test_share_exact_split() {
        assert_eq!(share(100, 90, 100), 90);
        assert_eq!(share(100, 10, 100), 10);
    }

    #[test]
    fn test_two_children_fill_parent() {
        let tree = tree_from_text("p;a 90\np;b 10\n");
        let layout = layout(&tree, 0, 100, 0, Direction::TopDown);

        assert_eq!(widths(&layout, 0), vec![100]);
        assert_eq!(widths(&layout, 1), vec![90, 10]);
        let b = layout.record_of(tree.find(&["p", "b"]).unwrap()).unwrap();
        assert_eq!((b.x, b.y), (90, 1));
    }

    #[test]
    fn test_equal_children_of_narrow_parent() {
        let tree = tree_from_text("p;a 1\np;b 1\np;c 1\np;d 1\np;e 1\n");
        let layout = layout(&tree, 0, 10, 0, Direction::TopDown);

        let w = widths(&layout, 1);
        assert_eq!(w.len(), 5);
        assert!(w.iter().all(|&w| w >= 1));
        assert!(w.iter().sum::<u32>() >= 10);
    }

    #[test]
    fn test_tiny_children_get_one_column_each() {
        let mut text = String::from("p;big 1000\n");
        for i in 0..5 {
            text.push_str(&format!("p;t{i} 1\n"));
        }
        let tree = tree_from_text(&text);
        let layout = layout(&tree, 0, 10, 0, Direction::TopDown);

        let w = widths(&layout, 1);
        assert_eq!(w, vec![9, 1, 1, 1, 1, 1]);
        // 14 columns placed inside a 10-column parent
        let last = layout.frames().last().unwrap();
        assert_eq!(last.right(), 14);
    }

    #[test]
    fn test_children_placed_left_to_right_from_parent() {
        let tree = tree_from_text("a;x 2\na;y 2\nb;z 4\n");
        let layout = layout(&tree, 5, 80, 3, Direction::TopDown);

        let xs: Vec<(String, u32, i32)> = layout
            .frames()
            .iter()
            .map(|r| (tree.frame(r.frame).name.clone(), r.x, r.y))
            .collect();
        assert_eq!(
            xs,
            vec![
                ("a".to_string(), 5, 3),
                ("x".to_string(), 5, 4),
                ("y".to_string(), 25, 4),
                ("b".to_string(), 45, 3),
                ("z".to_string(), 45, 4),
            ]
        );
    }

    #[test]
    fn test_bottom_up_rows() {
        let tree = tree_from_text("a;b;c 1\n");
        let layout = layout(&tree, 0, 10, 20, Direction::BottomUp);

        let rows: Vec<i32> = layout.frames().iter().map(|r| r.y).collect();
        assert_eq!(rows, vec![20, 19, 18]);
    }

    #[test]
    fn test_every_non_root_frame_is_indexed() {
        let tree = tree_from_text("a;b 3\na;c;d 2\ne 1\n");
        let layout = layout(&tree, 0, 60, 0, Direction::TopDown);

        assert_eq!(layout.len(), tree.len() - 1);
        for (i, record) in layout.frames().iter().enumerate() {
            assert_eq!(record.index, i);
            assert_eq!(layout.record_of(record.frame), Some(record));
        }
        assert!(layout.record_of(FrameId::ROOT).is_none());
    }

    #[test]
    fn test_empty_tree_has_no_layout() {
        let tree = FrameTree::new();
        assert!(layout(&tree, 0, 80, 0, Direction::TopDown).is_empty());
    }

    #[test]
    fn test_zero_count_children_do_not_divide_by_zero() {
        let tree = tree_from_text("a;b 0\na;c 0\n");
        let layout = layout(&tree, 0, 10, 0, Direction::TopDown);

        assert_eq!(widths(&layout, 0), vec![1]);
        assert_eq!(widths(&layout, 1), vec![1, 1]);
        assert!(layout.frames().iter().all(|r| r.color == crate::flamegraph::color::NEUTRAL));
    }

    #[test]
    fn test_layout_is_repeatable() {
        let tree = tree_from_text("a;b 7\na;c 3\nd;e;f 5\n");
        let first = layout(&tree, 0, 37, 0, Direction::TopDown);
        let second = layout(&tree, 0, 37, 0, Direction::TopDown);

        assert_eq!(first.frames(), second.frames());
    }
}
