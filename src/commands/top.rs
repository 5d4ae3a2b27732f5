use crate::error::{Error, Result};
use crate::flamegraph::FrameTree;
use crate::storage::StackSource;
use std::path::Path;

/// One line of the `top` report
#[derive(Debug, Clone, PartialEq)]
pub struct StackEntry {
    pub stack: Vec<String>,
    pub count: u64,
    pub percent: f64,
}

pub fn run(file: &Path, query_id: Option<&str>, limit: usize, threshold: f64) -> Result<()> {
    if !file.exists() {
        return Err(Error::ProfileNotFound(file.display().to_string()));
    }
    let source = StackSource::detect(file)?;
    let tree = source.load(query_id)?;
    if tree.is_empty() {
        return Err(Error::EmptyProfile(file.display().to_string()));
    }

    let entries = top_stacks(&tree, limit, threshold);
    print_table(file, &tree, &entries);
    Ok(())
}

/// Heaviest stacks by self weight, at most `limit`, each at least
/// `threshold` percent. Interior frames show up when samples stop at them.
pub fn top_stacks(tree: &FrameTree, limit: usize, threshold: f64) -> Vec<StackEntry> {
    let total = tree.root().count;
    if total == 0 {
        return Vec::new();
    }

    let mut entries: Vec<StackEntry> = tree
        .ids()
        .skip(1)
        .filter_map(|id| {
            let count = tree.self_count(id);
            let is_leaf = tree.frame(id).children.is_empty();
            (is_leaf || count > 0).then(|| StackEntry {
                stack: tree.stack_of(id),
                count,
                percent: count as f64 * 100.0 / total as f64,
            })
        })
        .filter(|e| e.percent >= threshold)
        .collect();

    // Stable sort keeps first-seen order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(limit);
    entries
}

fn print_table(file: &Path, tree: &FrameTree, entries: &[StackEntry]) {
    println!("# {}", file.display());
    println!(
        "# Samples: {} | Frames: {} | Max depth: {}",
        tree.root().count,
        tree.len() - 1,
        tree.max_depth()
    );
    println!();

    println!("{:>6}  {:>10}  STACK", "PCT", "SAMPLES");
    println!("{}", "-".repeat(80));

    for entry in entries {
        println!(
            "{:>5.1}%  {:>10}  {}",
            entry.percent,
            entry.count,
            format_stack(&entry.stack, 3)
        );
    }
}

/// Join a stack, eliding the middle when it is deeper than `keep * 2`
fn format_stack(stack: &[String], keep: usize) -> String {
    if stack.len() <= keep * 2 {
        return stack.join(";");
    }
    format!(
        "{};…;{}",
        stack[..keep].join(";"),
        stack[stack.len() - keep..].join(";")
    )
}
