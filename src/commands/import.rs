use crate::error::{Error, Result};
use crate::storage::{ImportStats, Storage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Run the import command - store a folded stacks file under `query_id`
pub fn run(db: &Path, file: &Path, query_id: &str, replace: bool) -> Result<ImportStats> {
    if !file.exists() {
        return Err(Error::ProfileNotFound(file.display().to_string()));
    }
    let reader = BufReader::new(File::open(file)?);
    let mut storage = Storage::open(db)?;
    let stats = storage.import_folded(query_id, reader, replace)?;

    println!(
        "Imported {} stacks into {} as '{}'",
        stats.imported,
        db.display(),
        query_id
    );
    if stats.skipped > 0 {
        println!("Skipped {} malformed lines", stats.skipped);
    }
    Ok(stats)
}
