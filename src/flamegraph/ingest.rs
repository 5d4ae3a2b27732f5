//! Turning folded text and database rows into frame trees.

use super::tree::FrameTree;
use log::{debug, warn};
use std::io::BufRead;

/// Separator between labels of a folded stack
pub const STACK_SEPARATOR: char = ';';

/// One `(count, stack)` row as returned by a stack query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRow {
    pub count: u64,
    pub stack: String,
}

impl StackRow {
    pub fn new(count: u64, stack: impl Into<String>) -> Self {
        StackRow {
            count,
            stack: stack.into(),
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        split_stack(&self.stack)
    }
}

/// Counters for one text ingestion batch. Blank lines are read but never
/// counted as skipped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    pub lines: usize,
    pub skipped: usize,
}

fn split_stack(stack: &str) -> impl Iterator<Item = &str> {
    stack.split(STACK_SEPARATOR)
}

/// Parse one `a;b;c <count>` line.
///
/// The first whitespace-separated field is the stack and the second is the
/// count; anything after that is ignored. Returns `None` for lines with fewer
/// than two fields and for counts that are not non-negative integers.
pub fn parse_folded_line(line: &str) -> Option<(Vec<&str>, u64)> {
    let mut fields = line.split_whitespace();
    let stack = fields.next()?;
    let count = fields.next()?.parse::<u64>().ok()?;
    Some((split_stack(stack).collect(), count))
}

/// Feed every well-formed line into `tree` and finalize it.
///
/// Malformed lines are skipped; read errors abort the batch.
pub fn ingest_text<R: BufRead>(tree: &mut FrameTree, reader: R) -> std::io::Result<TextStats> {
    let mut stats = TextStats::default();
    for line in reader.lines() {
        let line = line?;
        stats.lines += 1;
        if line.trim().is_empty() {
            continue;
        }
        match parse_folded_line(&line) {
            Some((stack, count)) => tree.add_stack(&stack, count),
            None => {
                debug!("Skipping malformed folded line {}: {:?}", stats.lines, line);
                stats.skipped += 1;
            }
        }
    }
    tree.finalize();
    if stats.skipped > 0 {
        warn!("Skipped {} of {} folded lines", stats.skipped, stats.lines);
    }
    Ok(stats)
}

/// Parse an in-memory folded document into a fresh tree
pub fn tree_from_text(text: &str) -> FrameTree {
    let mut tree = FrameTree::new();
    for line in text.lines() {
        if let Some((stack, count)) = parse_folded_line(line) {
            tree.add_stack(&stack, count);
        }
    }
    tree.finalize();
    tree
}

/// Feed query rows into `tree`.
///
/// The first row error stops ingestion and is returned as is. Rows already
/// aggregated stay in `tree` and it is left unfinalized, so the caller
/// decides whether the partial tree is worth keeping.
pub fn ingest_rows<I, E>(tree: &mut FrameTree, rows: I) -> Result<usize, E>
where
    I: IntoIterator<Item = Result<StackRow, E>>,
{
    let mut ingested = 0;
    for row in rows {
        let row = row?;
        let labels: Vec<&str> = row.labels().collect();
        tree.add_stack(&labels, row.count);
        ingested += 1;
    }
    tree.finalize();
    debug!(
        "Ingested {} rows into {} frames (max depth {})",
        ingested,
        tree.len(),
        tree.max_depth()
    );
    Ok(ingested)
}
