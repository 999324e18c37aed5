use crate::db::connection::Database;
use crate::db::DedupStore;
use crate::errors::StoreError;
use crate::scraper::ListingRecord;
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};

/// A listing as read back from the store, with the time it was first recorded.
#[derive(Debug, Clone)]
pub struct StoredListing {
    pub listing: ListingRecord,
    pub first_seen: NaiveDateTime,
}

impl DedupStore for Database {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let found: Option<String> = conn
                .query_row(
                    "SELECT id FROM apartments WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| StoreError::DbError(format!("exists lookup failed: {e}")))?;
            Ok(found.is_some())
        })
    }

    fn record(&self, listing: &ListingRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT OR IGNORE INTO apartments
                    (id, title, price, address, url, bedrooms, bathrooms, sqft, image_url)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    listing.id,
                    listing.title,
                    listing.price,
                    listing.address,
                    listing.url,
                    listing.bedrooms,
                    listing.bathrooms,
                    listing.sqft,
                    listing.image_url,
                ],
            )
            .map_err(|e| StoreError::DbError(format!("save listing failed: {e}")))?;
            Ok(())
        })
    }
}

pub fn get_listing(db: &Database, id: &str) -> Result<Option<StoredListing>, StoreError> {
    db.with_conn(|conn| {
        conn.query_row(
            r#"
            SELECT
                id,          -- 0
                title,       -- 1
                price,       -- 2
                address,     -- 3
                url,         -- 4
                bedrooms,    -- 5
                bathrooms,   -- 6
                sqft,        -- 7
                image_url,   -- 8
                first_seen   -- 9
            FROM apartments
            WHERE id = ?1
            "#,
            params![id],
            stored_from_row,
        )
        .optional()
        .map_err(|e| StoreError::DbError(e.to_string()))
    })
}

/// Most recently first-seen listings, newest first.
pub fn recent_listings(db: &Database, limit: usize) -> Result<Vec<StoredListing>, StoreError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, title, price, address, url, bedrooms, bathrooms, sqft, image_url, first_seen
                FROM apartments
                ORDER BY first_seen DESC, rowid DESC
                LIMIT ?1
                "#,
            )
            .map_err(|e| StoreError::DbError(e.to_string()))?;

        let rows = stmt
            .query_map(params![limit as i64], stored_from_row)
            .map_err(|e| StoreError::DbError(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::DbError(e.to_string()))
    })
}

pub fn count_listings(db: &Database) -> Result<i64, StoreError> {
    db.with_conn(|conn| {
        conn.query_row("SELECT COUNT(*) FROM apartments", [], |row| row.get(0))
            .map_err(|e| StoreError::DbError(e.to_string()))
    })
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredListing> {
    // Rows written by older versions may have NULLs in the text columns.
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .unwrap_or_else(|| crate::scraper::UNKNOWN.to_string()))
    };

    Ok(StoredListing {
        listing: ListingRecord {
            id: row.get(0)?,
            title: text(1)?,
            price: text(2)?,
            address: text(3)?,
            url: text(4)?,
            bedrooms: text(5)?,
            bathrooms: text(6)?,
            sqft: text(7)?,
            image_url: row.get(8)?,
        },
        first_seen: row.get(9)?,
    })
}
