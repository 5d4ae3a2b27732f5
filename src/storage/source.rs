use super::writer::{StackQuery, load_tree};
use crate::error::Result;
use crate::flamegraph::{FrameTree, ingest_text};
use rusqlite::{Connection, OpenFlags};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Where flame graph stacks are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSource {
    /// Profile database, optionally with a custom stack query
    Database { path: PathBuf, sql: Option<String> },
    /// Plain folded stacks file
    Folded { path: PathBuf },
}

/// First bytes of every SQLite database file
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

impl StackSource {
    /// Pick the source kind by sniffing the file header
    pub fn detect(path: &Path) -> Result<Self> {
        let mut header = [0u8; 16];
        let mut file = File::open(path)?;
        let read = file.read(&mut header)?;
        let path = path.to_path_buf();
        if read == header.len() && &header == SQLITE_MAGIC {
            Ok(StackSource::Database { path, sql: None })
        } else {
            Ok(StackSource::Folded { path })
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            StackSource::Database { path, .. } | StackSource::Folded { path } => path,
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, StackSource::Database { .. })
    }

    /// Open an existing database; `None` for folded files
    pub fn connect(&self) -> Result<Option<Connection>> {
        match self {
            StackSource::Database { path, .. } => Ok(Some(Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE,
            )?)),
            StackSource::Folded { .. } => Ok(None),
        }
    }

    /// Build a complete tree. Safe to call from a worker thread; every call
    /// opens its own handles.
    pub fn load(&self, query_id: Option<&str>) -> Result<FrameTree> {
        match self {
            StackSource::Database { sql, .. } => {
                let conn = self.connect()?.ok_or_else(|| {
                    crate::Error::InvalidArgument("not a database source".to_string())
                })?;
                let query = StackQuery {
                    sql: sql.clone(),
                    query_id: query_id.map(str::to_string),
                };
                load_tree(&conn, &query)
            }
            StackSource::Folded { path } => {
                let reader = BufReader::new(File::open(path)?);
                let mut tree = FrameTree::new();
                ingest_text(&mut tree, reader)?;
                Ok(tree)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    #[test]
    fn test_detect_and_load_both_kinds() {
        let dir = TempDir::new().unwrap();

        let db = dir.path().join("p.db");
        let mut storage = Storage::open(&db).unwrap();
        storage
            .import_folded("q", Cursor::new("a;b 2\n"), false)
            .unwrap();
        drop(storage);

        let folded = dir.path().join("stacks.txt");
        let mut file = File::create(&folded).unwrap();
        file.write_all(b"a;b 3\n").unwrap();
        drop(file);

        let db_source = StackSource::detect(&db).unwrap();
        assert!(db_source.is_database());
        assert_eq!(db_source.load(Some("q")).unwrap().root().count, 2);

        let folded_source = StackSource::detect(&folded).unwrap();
        assert_eq!(folded_source, StackSource::Folded { path: folded.clone() });
        assert_eq!(folded_source.load(None).unwrap().root().count, 3);
        assert!(folded_source.connect().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = StackSource::Folded {
            path: PathBuf::from("/nonexistent/stacks.txt"),
        };
        assert!(matches!(source.load(None), Err(crate::Error::Io(_))));
    }
}
