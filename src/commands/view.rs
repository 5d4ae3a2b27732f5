use crate::error::{Error, Result};
use crate::flamegraph::Direction;
use crate::storage::StackSource;
use crate::tui;
use std::path::Path;
use std::time::Duration;

/// Run the view command - browse a profile database in the TUI
pub fn run(
    file: &Path,
    query_id: Option<String>,
    sql: Option<String>,
    direction: Direction,
    refresh: Option<Duration>,
) -> Result<()> {
    if !file.exists() {
        return Err(Error::ProfileNotFound(file.display().to_string()));
    }
    let source = StackSource::Database {
        path: file.to_path_buf(),
        sql,
    };
    tui::run_database(source, query_id, direction, refresh)
}

/// Run the fold command - show a folded stacks file in the TUI
pub fn run_folded(file: &Path, direction: Direction) -> Result<()> {
    if !file.exists() {
        return Err(Error::ProfileNotFound(file.display().to_string()));
    }
    let source = StackSource::Folded {
        path: file.to_path_buf(),
    };
    tui::run_folded(source, direction)
}
