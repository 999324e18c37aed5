use rusqlite::Connection;
use std::path::Path;
use tracing::info;

use crate::errors::StoreError;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Columns added after the first release. Older databases get them on open.
const ADDED_COLUMNS: [(&str, &str); 1] = [("image_url", "TEXT")];

pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Opens (or creates) the database file and brings its schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path_str = path.as_ref().display().to_string();
        let conn = Connection::open(path.as_ref())
            .map_err(|e| StoreError::Open(format!("{path_str}: {e}")))?;

        let db = Self {
            conn,
            path: path_str,
        };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;

        let db = Self {
            conn,
            path: ":memory:".to_string(),
        };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides the connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        f(&self.conn)
    }

    /// Creates missing tables, then adds any missing columns. Never drops.
    pub fn init(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(SCHEMA_SQL)
                .map_err(|e| StoreError::Schema(format!("Failed to apply schema: {e}")))?;

            let existing = table_columns(conn, "apartments")?;
            for (column, ty) in ADDED_COLUMNS {
                if existing.iter().any(|c| c == column) {
                    continue;
                }
                conn.execute(&format!("ALTER TABLE apartments ADD COLUMN {column} {ty}"), [])
                    .map_err(|e| StoreError::Schema(format!("Failed to add {column}: {e}")))?;
                info!("Added {column} column to existing database");
            }
            Ok(())
        })
    }

    pub fn columns(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| table_columns(conn, "apartments"))
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| StoreError::Schema(e.to_string()))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    #[test]
    fn fresh_database_has_every_column() {
        let db = Database::open_in_memory().unwrap();
        let cols = db.columns().unwrap();

        for expected in [
            "id", "title", "price", "address", "url", "bedrooms", "bathrooms", "sqft",
            "image_url", "first_seen",
        ] {
            assert!(cols.iter().any(|c| c == expected), "missing {expected}");
        }
    }

    #[test]
    fn old_schema_gains_image_url_without_losing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apartments.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE apartments (
                    id TEXT PRIMARY KEY, title TEXT, price TEXT, address TEXT, url TEXT,
                    bedrooms TEXT, bathrooms TEXT, sqft TEXT,
                    first_seen TIMESTAMP DEFAULT CURRENT_TIMESTAMP
                 );",
            )
            .unwrap();
            conn.execute(
                "INSERT INTO apartments (id, title, url) VALUES (?1, ?2, ?3)",
                params!["abc", "Old Listing", "https://streeteasy.com/rental/1"],
            )
            .unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.columns().unwrap().iter().any(|c| c == "image_url"));

        let title: String = db
            .with_conn(|conn| {
                conn.query_row("SELECT title FROM apartments WHERE id = 'abc'", [], |r| r.get(0))
                    .map_err(StoreError::from)
            })
            .unwrap();
        assert_eq!(title, "Old Listing");
    }

    #[test]
    fn reopening_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apartments.db");

        let first = Database::open(&path).unwrap().columns().unwrap();
        let second = Database::open(&path).unwrap().columns().unwrap();
        assert_eq!(first, second);
    }
}
