//! Aggregated call tree.
//!
//! Frames live in a flat arena and refer to each other by [`FrameId`].
//! Children are owned through the `children` index list; `parent` is a plain
//! back-reference used for upward navigation only.

/// Name of the synthetic root frame
pub const ROOT_NAME: &str = "root";

/// Stable handle of a frame inside one [`FrameTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(usize);

impl FrameId {
    /// The synthetic root of every tree
    pub const ROOT: FrameId = FrameId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One label at one depth of the aggregated stacks
#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub count: u64,
    pub parent: Option<FrameId>,
    /// In order of first appearance during ingestion, not by count
    pub children: Vec<FrameId>,
}

impl Frame {
    fn new(name: String, parent: Option<FrameId>) -> Self {
        Frame {
            name,
            count: 0,
            parent,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameTree {
    frames: Vec<Frame>,
    max_depth: usize,
    max_count: u64,
}

impl Default for FrameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTree {
    /// Create an empty tree holding only the root frame
    pub fn new() -> Self {
        FrameTree {
            frames: vec![Frame::new(ROOT_NAME.to_string(), None)],
            max_depth: 0,
            max_count: 0,
        }
    }

    /// Build and finalize a tree from a batch of stacks
    pub fn from_stacks<I, S>(stacks: I) -> Self
    where
        I: IntoIterator<Item = (Vec<S>, u64)>,
        S: AsRef<str>,
    {
        let mut tree = FrameTree::new();
        for (stack, weight) in stacks {
            tree.add_stack(&stack, weight);
        }
        tree.finalize();
        tree
    }

    /// Add one weighted sample, creating frames along the path as needed.
    ///
    /// Labels are matched only against siblings at the same level, so a
    /// repeated path accumulates into the existing frames.
    pub fn add_stack<S: AsRef<str>>(&mut self, stack: &[S], weight: u64) {
        let mut node = FrameId::ROOT;
        for label in stack {
            let label = label.as_ref();
            let child = match self.find_child(node, label) {
                Some(child) => child,
                None => self.push_child(node, label),
            };
            self.frames[child.0].count += weight;
            node = child;
        }
    }

    /// Recompute the derived aggregates after an ingestion batch
    pub fn finalize(&mut self) {
        let root_count = self.frames[0]
            .children
            .iter()
            .map(|c| self.frames[c.0].count)
            .sum();
        self.frames[0].count = root_count;

        let mut max_depth = 0;
        let mut max_count = 0;
        let mut pending: Vec<(FrameId, usize)> = self.frames[0]
            .children
            .iter()
            .map(|&c| (c, 1))
            .collect();
        while let Some((id, depth)) = pending.pop() {
            let frame = &self.frames[id.0];
            max_depth = max_depth.max(depth);
            max_count = max_count.max(frame.count);
            pending.extend(frame.children.iter().map(|&c| (c, depth + 1)));
        }
        self.max_depth = max_depth;
        self.max_count = max_count;
    }

    fn find_child(&self, node: FrameId, name: &str) -> Option<FrameId> {
        self.frames[node.0]
            .children
            .iter()
            .copied()
            .find(|c| self.frames[c.0].name == name)
    }

    fn push_child(&mut self, node: FrameId, name: &str) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame::new(name.to_string(), Some(node)));
        self.frames[node.0].children.push(id);
        id
    }

    pub fn root(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0]
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Number of frames, root included
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max_depth == 0
    }

    /// Longest ingested stack, as of the last `finalize`
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Largest count among non-root frames, as of the last `finalize`
    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// All frame handles in arena order, root first
    pub fn ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        (0..self.frames.len()).map(FrameId)
    }

    /// Labels from the root (exclusive) down to `id`
    pub fn stack_of(&self, id: FrameId) -> Vec<String> {
        let mut labels = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let frame = &self.frames[current.0];
            if frame.parent.is_none() {
                break;
            }
            labels.push(frame.name.clone());
            cursor = frame.parent;
        }
        labels.reverse();
        labels
    }

    /// Resolve a root-exclusive label path to a frame
    pub fn find<S: AsRef<str>>(&self, labels: &[S]) -> Option<FrameId> {
        let mut node = FrameId::ROOT;
        for label in labels {
            node = self.find_child(node, label.as_ref())?;
        }
        Some(node)
    }

    /// Copy `id` and its descendants into a new tree where `id` is the only
    /// top-level frame.
    pub fn subtree(&self, id: FrameId) -> FrameTree {
        let mut tree = FrameTree::new();
        if id == FrameId::ROOT {
            tree.frames = self.frames.clone();
            tree.finalize();
            return tree;
        }

        let mut pending = vec![(id, FrameId::ROOT)];
        while let Some((source, parent)) = pending.pop() {
            let frame = &self.frames[source.0];
            let copy = tree.push_child(parent, &frame.name);
            tree.frames[copy.0].count = frame.count;
            // Reverse so the stack pops children in their original order
            pending.extend(frame.children.iter().rev().map(|&c| (c, copy)));
        }
        tree.finalize();
        tree
    }

    /// Weight of stacks that end exactly at `id`
    pub fn self_count(&self, id: FrameId) -> u64 {
        let frame = &self.frames[id.0];
        let children: u64 = frame
            .children
            .iter()
            .map(|&c| self.frames[c.0].count)
            .sum();
        frame.count.saturating_sub(children)
    }

    /// Every leaf frame with its root-exclusive label path
    pub fn leaf_stacks(&self) -> Vec<(Vec<String>, u64)> {
        self.ids()
            .skip(1)
            .filter(|&id| self.frames[id.0].children.is_empty())
            .map(|id| (self.stack_of(id), self.frames[id.0].count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(stack: &str) -> Vec<&str> {
        stack.split(';').collect()
    }

    fn names(tree: &FrameTree, ids: &[FrameId]) -> Vec<String> {
        ids.iter().map(|&id| tree.frame(id).name.clone()).collect()
    }

    fn assert_aggregation(tree: &FrameTree) {
        for id in tree.ids() {
            let frame = tree.frame(id);
            if frame.children.is_empty() {
                continue;
            }
            let sum: u64 = frame.children.iter().map(|&c| tree.frame(c).count).sum();
            assert_eq!(frame.count, sum, "frame {} breaks the sum rule", frame.name);
        }
    }

    #[test]
    fn test_two_stacks_share_prefix() {
        let tree = FrameTree::from_stacks(vec![(split("a;b"), 10), (split("a;c"), 5)]);

        assert_eq!(tree.root().count, 15);
        let a = tree.find(&["a"]).unwrap();
        assert_eq!(tree.frame(a).count, 15);
        assert_eq!(names(&tree, &tree.frame(a).children), vec!["b", "c"]);
        assert_eq!(tree.frame(tree.find(&["a", "b"]).unwrap()).count, 10);
        assert_eq!(tree.frame(tree.find(&["a", "c"]).unwrap()).count, 5);
        assert_eq!(tree.max_depth(), 2);
        assert_eq!(tree.max_count(), 15);
    }

    #[test]
    fn test_children_keep_first_appearance_order() {
        let tree = FrameTree::from_stacks(vec![
            (split("main;small"), 1),
            (split("main;big"), 100),
            (split("main;small"), 1),
            (split("other"), 3),
        ]);

        let main = tree.find(&["main"]).unwrap();
        assert_eq!(names(&tree, &tree.frame(main).children), vec!["small", "big"]);
        assert_eq!(names(&tree, &tree.root().children), vec!["main", "other"]);
    }

    #[test]
    fn test_root_count_is_total_weight() {
        let stacks = vec![
            (split("a;b;c"), 7),
            (split("a;b"), 0),
            (split("x;y"), 11),
            (split("a;d"), 2),
            (split("x"), 4),
        ];
        let total: u64 = stacks.iter().map(|(_, w)| w).sum();
        let tree = FrameTree::from_stacks(stacks);

        assert_eq!(tree.root().count, total);
        assert_aggregation(&tree);
    }

    #[test]
    fn test_same_label_at_different_levels_is_distinct() {
        let tree = FrameTree::from_stacks(vec![(split("f;f;f"), 2), (split("f"), 0)]);

        // root + three nested "f" frames
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.max_depth(), 3);
        assert_eq!(tree.frame(tree.find(&["f", "f", "f"]).unwrap()).count, 2);
    }

    #[test]
    fn test_empty_stack_is_noop() {
        let mut tree = FrameTree::new();
        tree.add_stack::<&str>(&[], 42);
        tree.finalize();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().count, 0);
        assert!(tree.is_empty());
        assert_eq!(tree.max_count(), 0);
    }

    #[test]
    fn test_stack_of_and_parents() {
        let tree = FrameTree::from_stacks(vec![(split("a;b;c"), 1)]);
        let c = tree.find(&["a", "b", "c"]).unwrap();

        assert_eq!(tree.stack_of(c), vec!["a", "b", "c"]);
        assert_eq!(tree.stack_of(FrameId::ROOT), Vec::<String>::new());

        let b = tree.frame(c).parent.unwrap();
        assert_eq!(tree.frame(b).name, "b");
        assert_eq!(tree.root().parent, None);
    }

    #[test]
    fn test_subtree_keeps_order_and_counts() {
        let tree = FrameTree::from_stacks(vec![
            (split("main;run;z"), 4),
            (split("main;run;a"), 6),
            (split("main;idle"), 1),
        ]);
        let run = tree.find(&["main", "run"]).unwrap();
        let sub = tree.subtree(run);

        assert_eq!(names(&sub, &sub.root().children), vec!["run"]);
        let sub_run = sub.find(&["run"]).unwrap();
        assert_eq!(names(&sub, &sub.frame(sub_run).children), vec!["z", "a"]);
        assert_eq!(sub.root().count, 10);
        assert_eq!(sub.max_depth(), 2);
        assert_aggregation(&sub);
    }

    #[test]
    fn test_leaf_stacks() {
        let tree = FrameTree::from_stacks(vec![(split("a;b"), 3), (split("a;c"), 2)]);
        let leaves = tree.leaf_stacks();

        assert_eq!(
            leaves,
            vec![
                (vec!["a".to_string(), "b".to_string()], 3),
                (vec!["a".to_string(), "c".to_string()], 2),
            ]
        );
    }

    #[test]
    fn test_self_count() {
        let tree = FrameTree::from_stacks(vec![(split("a"), 5), (split("a;b"), 3)]);
        let a = tree.find(&["a"]).unwrap();
        let b = tree.find(&["a", "b"]).unwrap();

        assert_eq!(tree.frame(a).count, 8);
        assert_eq!(tree.self_count(a), 5);
        assert_eq!(tree.self_count(b), 3);
        assert_eq!(tree.self_count(FrameId::ROOT), 0);
    }
}
