// Test doubles for the network, clock, store and notifier.
use crate::db::DedupStore;
use crate::errors::StoreError;
use crate::mailer::{MailerError, Notifier};
use crate::scraper::fetcher::{HttpResponse, RequestConfig, Sleeper, Transport};
use crate::scraper::{ListingRecord, TransportError};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

type Scripted = Result<HttpResponse, TransportError>;

/// Replays canned responses in order and remembers the identity of each request.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Scripted>>,
    user_agents: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            user_agents: RefCell::new(Vec::new()),
        }
    }

    /// Serves `body` with 200 for every request.
    pub fn always(body: &str, times: usize) -> Self {
        Self::new((0..times).map(|_| Self::ok(body)).collect())
    }

    pub fn ok(body: &str) -> Scripted {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    pub fn status(status: u16) -> Scripted {
        Ok(HttpResponse {
            status,
            body: String::new(),
        })
    }

    pub fn network_error(msg: &str) -> Scripted {
        Err(TransportError::Network(msg.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.user_agents.borrow().len()
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.borrow().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, _url: &str, request: &RequestConfig) -> Result<HttpResponse, TransportError> {
        self.user_agents
            .borrow_mut()
            .push(request.user_agent().to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Self::network_error("script exhausted"))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.delays.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

/// Keeps every batch it is handed. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    batches: Rc<RefCell<Vec<Vec<ListingRecord>>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<ListingRecord>> {
        self.batches.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, listings: &[ListingRecord]) -> Result<(), MailerError> {
        self.batches.borrow_mut().push(listings.to_vec());
        if self.fail {
            return Err(MailerError::ApiError("smtp down".into()));
        }
        Ok(())
    }
}

/// Store whose writes start failing after `ok_writes` successful ones.
pub struct FlakyStore {
    ids: RefCell<Vec<String>>,
    ok_writes: usize,
    lookups: Cell<usize>,
}

impl FlakyStore {
    pub fn new(ok_writes: usize) -> Self {
        Self {
            ids: RefCell::new(Vec::new()),
            ok_writes,
            lookups: Cell::new(0),
        }
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.borrow().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl DedupStore for FlakyStore {
    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.lookups.set(self.lookups.get() + 1);
        Ok(self.ids.borrow().iter().any(|known| known == id))
    }

    fn record(&self, listing: &ListingRecord) -> Result<(), StoreError> {
        let mut ids = self.ids.borrow_mut();
        if ids.len() >= self.ok_writes {
            return Err(StoreError::DbError("disk I/O error".into()));
        }
        if !ids.contains(&listing.id) {
            ids.push(listing.id.clone());
        }
        Ok(())
    }
}
