// src/pipeline.rs
use crate::db::{Database, DedupStore};
use crate::errors::StoreError;
use crate::mailer::Notifier;
use crate::scraper::fetcher::{Fetcher, ReqwestTransport, Sleeper, ThreadSleeper, Transport};
use crate::scraper::{Extractor, ListingRecord};
use tracing::{error, info, warn};

/// Fetch, extract, dedup, notify. One call to `run_cycle` is one cycle.
pub struct Pipeline<T = ReqwestTransport, S = ThreadSleeper, D = Database> {
    target_url: String,
    fetcher: Fetcher<T, S>,
    extractor: Extractor,
    store: D,
    notifier: Option<Box<dyn Notifier>>,
}

impl<T: Transport, S: Sleeper, D: DedupStore> Pipeline<T, S, D> {
    pub fn new(
        target_url: impl Into<String>,
        fetcher: Fetcher<T, S>,
        extractor: Extractor,
        store: D,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            fetcher,
            extractor,
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn fetcher(&self) -> &Fetcher<T, S> {
        &self.fetcher
    }

    /// Runs one cycle and returns the listings not seen before, in page order.
    ///
    /// A failed fetch is logged and yields an empty result with no store
    /// changes. A store error aborts the cycle; listings recorded before it
    /// stay recorded. Notification failures are logged and never returned.
    ///
    /// Takes `&mut self` so two cycles cannot run on one pipeline at once.
    pub fn run_cycle(&mut self) -> Result<Vec<ListingRecord>, StoreError> {
        info!("Checking for new listings...");

        let page = match self.fetcher.fetch(&self.target_url) {
            Ok(page) => page,
            Err(e) => {
                error!(attempts = e.attempts(), "Error scraping listings: {e}");
                return Ok(Vec::new());
            }
        };

        let listings = self.extractor.extract(&page);
        if listings.is_empty() {
            warn!("No listings found - this might be temporary");
            return Ok(Vec::new());
        }

        let new_listings = self.dedup(listings)?;

        if new_listings.is_empty() {
            info!("No new listings found");
        } else {
            info!("Found {} new listings!", new_listings.len());
            self.notify(&new_listings);
        }

        Ok(new_listings)
    }

    fn dedup(&self, listings: Vec<ListingRecord>) -> Result<Vec<ListingRecord>, StoreError> {
        let mut new_listings = Vec::new();
        for listing in listings {
            if self.store.exists(&listing.id)? {
                continue;
            }
            self.store.record(&listing)?;
            new_listings.push(listing);
        }
        Ok(new_listings)
    }

    fn notify(&self, new_listings: &[ListingRecord]) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        if let Err(e) = notifier.notify(new_listings) {
            error!("❌ Error sending email: {e}");
        }
    }
}
