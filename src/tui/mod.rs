mod app;
mod ui;

use crate::error::Result;
use crate::flamegraph::Direction;
use crate::storage::StackSource;
use std::time::Duration;

pub use app::{App, PAGE_COMMAND_LINE, Page};

/// Browse a profile database interactively
pub fn run_database(
    source: StackSource,
    query_id: Option<String>,
    direction: Direction,
    refresh: Option<Duration>,
) -> Result<()> {
    let mut app = App::for_database(source, query_id, direction, refresh)?;
    app.run()
}

/// Show a folded stacks file interactively
pub fn run_folded(source: StackSource, direction: Direction) -> Result<()> {
    let mut app = App::for_folded(source, direction)?;
    app.run()
}
