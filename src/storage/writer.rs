use super::schema::{self, SCHEMA_VERSION};
use crate::error::Result;
use crate::flamegraph::{FrameTree, StackRow, ingest_rows, parse_folded_line};
use log::{debug, info, warn};
use rusqlite::{Connection, params_from_iter};
use std::io::BufRead;
use std::path::Path;

/// Outcome of importing one folded file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub imported: usize,
    pub skipped: usize,
}

/// Storage writer for stack profiles
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open a profile database, creating its tables if needed
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        schema::create_tables(&conn)?;
        if schema::get_meta(&conn, "version")?.is_none() {
            schema::set_meta(&conn, "version", &SCHEMA_VERSION.to_string())?;
            schema::set_meta(&conn, "created", &chrono::Utc::now().to_rfc3339())?;
        }
        Ok(Storage { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Import folded stacks under `query_id` in a single transaction.
    ///
    /// Malformed lines are skipped and counted. With `replace`, rows already
    /// stored for `query_id` are removed first.
    pub fn import_folded<R: BufRead>(
        &mut self,
        query_id: &str,
        reader: R,
        replace: bool,
    ) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let tx = self.conn.transaction()?;
        if replace {
            let removed = tx.execute("DELETE FROM stack_samples WHERE query_id = ?", [query_id])?;
            debug!("Removed {} existing rows for {}", removed, query_id);
        }
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO stack_samples (query_id, count, stack) VALUES (?, ?, ?)",
            )?;
            for line in reader.lines() {
                let line = line?;
                let Some((stack, count)) = parse_folded_line(&line) else {
                    if !line.trim().is_empty() {
                        stats.skipped += 1;
                    }
                    continue;
                };
                let count = i64::try_from(count).unwrap_or(i64::MAX);
                stmt.execute(rusqlite::params![query_id, count, stack.join(";")])?;
                stats.imported += 1;
            }
        }
        schema::set_meta(&tx, "source", query_id)?;
        tx.commit()?;

        if stats.skipped > 0 {
            warn!("Skipped {} malformed lines while importing {}", stats.skipped, query_id);
        }
        info!("Imported {} stacks into {}", stats.imported, query_id);
        Ok(stats)
    }

    /// Total weight across all stored stacks
    pub fn total_samples(&self) -> Result<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(count), 0) FROM stack_samples",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }
}

/// One recorded query in a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySummary {
    pub query_id: String,
    pub samples: u64,
    pub stacks: u64,
}

/// Recorded queries, heaviest first
pub fn query_summaries(conn: &Connection) -> rusqlite::Result<Vec<QuerySummary>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT query_id, COALESCE(SUM(count), 0) AS samples, COUNT(*) AS stacks
        FROM stack_samples
        GROUP BY query_id
        ORDER BY samples DESC, query_id ASC
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        let samples: i64 = row.get(1)?;
        let stacks: i64 = row.get(2)?;
        Ok(QuerySummary {
            query_id: row.get(0)?,
            samples: samples.max(0) as u64,
            stacks: stacks.max(0) as u64,
        })
    })?;

    rows.collect()
}

/// Which rows feed a flame graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackQuery {
    /// Custom SQL returning `(count, stack)`; `?1` binds the query id
    pub sql: Option<String>,
    pub query_id: Option<String>,
}

impl StackQuery {
    pub fn for_query(query_id: impl Into<String>) -> Self {
        StackQuery {
            sql: None,
            query_id: Some(query_id.into()),
        }
    }

    fn statement(&self) -> &str {
        match (&self.sql, &self.query_id) {
            (Some(sql), _) => sql,
            (None, Some(_)) => {
                "SELECT count, stack FROM stack_samples WHERE query_id = ?1 ORDER BY rowid"
            }
            (None, None) => "SELECT count, stack FROM stack_samples ORDER BY rowid",
        }
    }
}

/// Run `query` and aggregate its rows into a finalized tree.
///
/// A row that cannot be read as `(non-negative integer, text)` aborts the
/// load with [`crate::Error::Database`].
pub fn load_tree(conn: &Connection, query: &StackQuery) -> Result<FrameTree> {
    let mut stmt = conn.prepare(query.statement())?;
    let params: Vec<&str> = match &query.query_id {
        Some(id) if stmt.parameter_count() >= 1 => vec![id.as_str()],
        _ => Vec::new(),
    };

    let rows = stmt.query_map(params_from_iter(params), |row| {
        let count: i64 = row.get(0)?;
        let count =
            u64::try_from(count).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, count))?;
        Ok(StackRow::new(count, row.get::<_, String>(1)?))
    })?;

    let mut tree = FrameTree::new();
    let ingested = ingest_rows(&mut tree, rows)?;
    debug!("Loaded {} stack rows for {:?}", ingested, query.query_id);
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn storage_with(query_id: &str, folded: &str) -> Storage {
        let mut storage = Storage::open_in_memory().unwrap();
        storage
            .import_folded(query_id, Cursor::new(folded), false)
            .unwrap();
        storage
    }

    #[test]
    fn test_import_counts_skipped_lines() {
        let mut storage = Storage::open_in_memory().unwrap();
        let stats = storage
            .import_folded("q1", Cursor::new("a;b 10\ngarbage\n\na;c 5\n"), false)
            .unwrap();

        assert_eq!(stats, ImportStats { imported: 2, skipped: 1 });
        assert_eq!(storage.total_samples().unwrap(), 15);
    }

    #[test]
    fn test_import_and_text_ingestion_agree_on_skips() {
        let folded = "a;b 10\n\ngarbage\n   \na;c x\na;c 5 trailing\n";
        let mut storage = Storage::open_in_memory().unwrap();
        let imported = storage
            .import_folded("q1", Cursor::new(folded), false)
            .unwrap();
        let mut tree = FrameTree::new();
        let ingested = crate::flamegraph::ingest::ingest_text(&mut tree, Cursor::new(folded)).unwrap();

        assert_eq!(imported, ImportStats { imported: 2, skipped: 2 });
        assert_eq!(ingested.skipped, imported.skipped);
        assert_eq!(storage.total_samples().unwrap(), tree.root().count);
    }

    #[test]
    fn test_import_replace() {
        let mut storage = storage_with("q1", "a 1\n");
        storage
            .import_folded("q1", Cursor::new("b 2\n"), true)
            .unwrap();

        assert_eq!(storage.total_samples().unwrap(), 2);
    }

    #[test]
    fn test_load_tree_for_query() {
        let mut storage = storage_with("q1", "a;b 10\na;c 5\n");
        storage
            .import_folded("q2", Cursor::new("z 100\n"), false)
            .unwrap();

        let tree = load_tree(storage.conn(), &StackQuery::for_query("q1")).unwrap();
        assert_eq!(tree.root().count, 15);
        assert!(tree.find(&["z"]).is_none());

        let all = load_tree(storage.conn(), &StackQuery::default()).unwrap();
        assert_eq!(all.root().count, 115);
    }

    #[test]
    fn test_custom_sql() {
        let storage = storage_with("q1", "a;b 10\na;c 5\n");
        let query = StackQuery {
            sql: Some("SELECT count * 2, 'top;' || stack FROM stack_samples".to_string()),
            query_id: None,
        };

        let tree = load_tree(storage.conn(), &query).unwrap();
        assert_eq!(tree.root().count, 30);
        assert_eq!(tree.frame(tree.find(&["top", "a", "c"]).unwrap()).count, 10);
    }

    #[test]
    fn test_bad_row_aborts_load() {
        let storage = storage_with("q1", "a 1\n");
        storage
            .conn()
            .execute(
                "INSERT INTO stack_samples (query_id, count, stack) VALUES ('q1', -3, 'b')",
                [],
            )
            .unwrap();

        let err = load_tree(storage.conn(), &StackQuery::for_query("q1")).unwrap_err();
        assert!(matches!(err, crate::Error::Database(_)));
    }

    #[test]
    fn test_query_summaries() {
        let mut storage = storage_with("small", "a 1\nb 1\n");
        storage
            .import_folded("big", Cursor::new("c 50\n"), false)
            .unwrap();

        let summaries = query_summaries(storage.conn()).unwrap();
        assert_eq!(
            summaries,
            vec![
                QuerySummary { query_id: "big".into(), samples: 50, stacks: 1 },
                QuerySummary { query_id: "small".into(), samples: 2, stacks: 2 },
            ]
        );
    }
}
