pub mod extractor;
pub mod fetcher;
pub mod identity;
pub mod models;
pub mod rules;
pub mod scraper_error;

pub use extractor::{Extractor, ListingCard};
pub use fetcher::{Fetcher, RequestConfig, RetryPolicy};
pub use identity::compute_id;
pub use models::{ListingRecord, RawPage, UNKNOWN};
pub use scraper_error::{FetchError, ParseError, TransportError};
