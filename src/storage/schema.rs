use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

/// Create tables that do not exist yet
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Metadata table
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- One row per folded stack; count is the stack's weight
        CREATE TABLE IF NOT EXISTS stack_samples (
            query_id TEXT NOT NULL,
            count INTEGER NOT NULL,
            stack TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_stack_samples_query ON stack_samples(query_id);
        "#,
    )
}

/// Set a metadata key
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
        [key, value],
    )?;
    Ok(())
}

/// Get a metadata key
pub fn get_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
        row.get(0)
    })
    .optional()
}

trait OptionalExt<T> {
    fn optional(self) -> rusqlite::Result<Option<T>>;
}

impl<T> OptionalExt<T> for rusqlite::Result<T> {
    fn optional(self) -> rusqlite::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        set_meta(&conn, "version", "1").unwrap();
        create_tables(&conn).unwrap();

        assert_eq!(get_meta(&conn, "version").unwrap().as_deref(), Some("1"));
        assert_eq!(get_meta(&conn, "missing").unwrap(), None);
    }
}
