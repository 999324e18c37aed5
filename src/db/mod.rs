pub mod connection;
pub mod listings;

pub use connection::Database;
pub use listings::{count_listings, get_listing, recent_listings, StoredListing};

use crate::errors::StoreError;
use crate::scraper::ListingRecord;

/// Insert-once set of listing ids.
pub trait DedupStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Inserting an id that is already present is a no-op.
    fn record(&self, listing: &ListingRecord) -> Result<(), StoreError>;
}
