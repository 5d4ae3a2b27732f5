//! End-to-end checks from folded text through storage to the flame graph view.

use flamescope::commands::{import, list, top};
use flamescope::flamegraph::events::PAGE_QUERIES;
use flamescope::flamegraph::{Direction, EventLog, FlameGraphView, FrameTree};
use flamescope::storage::{StackQuery, StackSource, load_tree, query_summaries};
use pretty_assertions::assert_eq;
use ratatui::{buffer::Buffer, layout::Rect};
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

const FOLDED: &str = "\
main;parse;lex 30
main;parse;ast 10
main;eval 40
idle 20
this line is broken
";

fn write_folded(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("stacks.folded");
    fs::write(&path, FOLDED).unwrap();
    path
}

fn assert_sum_rule(tree: &FrameTree) {
    for id in tree.ids() {
        let frame = tree.frame(id);
        if !frame.children.is_empty() {
            let sum: u64 = frame.children.iter().map(|&c| tree.frame(c).count).sum();
            assert_eq!(frame.count, sum, "{}", frame.name);
        }
    }
}

#[test]
fn import_then_load_matches_folded_file() {
    let dir = TempDir::new().unwrap();
    let folded = write_folded(&dir);
    let db = dir.path().join("profile.db");

    let stats = import::run(&db, &folded, "q1", false).unwrap();
    assert_eq!((stats.imported, stats.skipped), (4, 1));

    let conn = Connection::open(&db).unwrap();
    let from_db = load_tree(&conn, &StackQuery::for_query("q1")).unwrap();
    let from_file = StackSource::Folded { path: folded }.load(None).unwrap();

    assert_eq!(from_db.root().count, 100);
    assert_eq!(from_db.leaf_stacks(), from_file.leaf_stacks());
    assert_sum_rule(&from_db);

    let summaries = query_summaries(&conn).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].samples, 100);
}

#[test]
fn reimport_with_replace_does_not_double_count() {
    let dir = TempDir::new().unwrap();
    let folded = write_folded(&dir);
    let db = dir.path().join("profile.db");

    import::run(&db, &folded, "q1", false).unwrap();
    import::run(&db, &folded, "q1", true).unwrap();

    let tree = StackSource::Database { path: db, sql: None }
        .load(Some("q1"))
        .unwrap();
    assert_eq!(tree.root().count, 100);
}

#[test]
fn top_reports_heaviest_leaves() {
    let dir = TempDir::new().unwrap();
    let folded = write_folded(&dir);
    let tree = StackSource::detect(&folded).unwrap().load(None).unwrap();

    let entries = top::top_stacks(&tree, 3, 0.0);
    let rows: Vec<(String, u64)> = entries
        .iter()
        .map(|e| (e.stack.join(";"), e.count))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("main;eval".to_string(), 40),
            ("main;parse;lex".to_string(), 30),
            ("idle".to_string(), 20),
        ]
    );
}

#[test]
fn list_finds_imported_profiles_only() {
    let dir = TempDir::new().unwrap();
    let folded = write_folded(&dir);
    import::run(&dir.path().join("a.db"), &folded, "q1", false).unwrap();
    fs::write(dir.path().join("junk.db"), b"not sqlite").unwrap();

    let profiles = list::find_profiles(dir.path()).unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].samples, 100);
    assert_eq!(profiles[0].queries, 1);
}

#[test]
fn loaded_tree_drives_the_view() {
    let dir = TempDir::new().unwrap();
    let folded = write_folded(&dir);
    let tree = StackSource::detect(&folded).unwrap().load(None).unwrap();

    let area = Rect::new(0, 0, 100, 8);
    let mut view = FlameGraphView::new(Direction::BottomUp, PAGE_QUERIES);
    view.replace_tree(tree);
    let mut buf = Buffer::empty(area);
    view.draw(area, &mut buf);

    // bottom-up: top-level frames sit on the last row
    assert_eq!(buf[(0, 7)].symbol(), "m");
    assert_eq!(buf[(80, 7)].symbol(), "i");
    assert_eq!(buf[(0, 6)].symbol(), "p");
    assert_eq!(buf[(0, 5)].symbol(), "l");

    let mut events = EventLog::default();
    view.move_down();
    view.move_down();
    view.activate(&mut events);
    assert_eq!(
        events.selections,
        vec![(
            vec!["main".to_string(), "parse".to_string(), "lex".to_string()],
            30
        )]
    );
}
