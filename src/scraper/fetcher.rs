// fetcher.rs
use crate::scraper::models::RawPage;
use crate::scraper::scraper_error::{FetchError, TransportError};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Alternate identities, only used after the site answers 403/429.
pub const IDENTITY_POOL: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

const BROWSER_HEADERS: [(&str, &str); 10] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("upgrade-insecure-requests", "1"),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("cache-control", "max-age=0"),
];

/// Identity and headers for one request.
///
/// Never mutated: rotating the identity produces a new value which is then
/// threaded into the next attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    user_agent: String,
    headers: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn browser_default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: BROWSER_HEADERS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn with_user_agent(&self, user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            headers: self.headers.clone(),
        }
    }

    /// Picks a different identity from `pool`. Falls back to `self` when the
    /// pool has nothing else to offer.
    pub fn rotated<R: Rng + ?Sized>(&self, pool: &[String], rng: &mut R) -> Self {
        let candidates: Vec<&String> = pool.iter().filter(|ua| **ua != self.user_agent).collect();

        match candidates.choose(rng) {
            Some(ua) => self.with_user_agent(ua.as_str()),
            None => self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// One GET, no retries. The fetcher owns the retry policy.
pub trait Transport {
    fn get(&self, url: &str, request: &RequestConfig) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str, request: &RequestConfig) -> Result<HttpResponse, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Header(e.to_string()))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| TransportError::Header(e.to_string()))?;
            headers.insert(name, value);
        }
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(request.user_agent())
                .map_err(|e| TransportError::Header(e.to_string()))?,
        );

        let resp = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Blocking pause between attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Uniform in `[min_delay, max_delay]`.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let lo = self.min_delay.as_secs_f64();
        let hi = self.max_delay.as_secs_f64();
        if hi <= lo {
            return self.min_delay;
        }
        Duration::from_secs_f64(rng.gen_range(lo..=hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptStatus {
    Success,
    Blocked,
    Failed,
}

fn classify(status: u16) -> AttemptStatus {
    match status {
        200..=299 => AttemptStatus::Success,
        403 | 429 => AttemptStatus::Blocked,
        _ => AttemptStatus::Failed,
    }
}

pub struct Fetcher<T = ReqwestTransport, S = ThreadSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
    identities: Vec<String>,
    base_request: RequestConfig,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self::with_parts(
            ReqwestTransport::new(timeout)?,
            ThreadSleeper,
            policy,
        ))
    }
}

impl<T: Transport, S: Sleeper> Fetcher<T, S> {
    pub fn with_parts(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
            identities: IDENTITY_POOL.iter().map(|s| s.to_string()).collect(),
            base_request: RequestConfig::browser_default(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetches `url`, retrying up to the policy bound.
    ///
    /// 2xx returns immediately. 403/429 rotate the identity before the next
    /// attempt; any other status or a transport error retries as-is.
    pub fn fetch(&self, url: &str) -> Result<RawPage, FetchError> {
        self.fetch_with_rng(url, &mut rand::thread_rng())
    }

    pub fn fetch_with_rng<R: Rng + ?Sized>(
        &self,
        url: &str,
        rng: &mut R,
    ) -> Result<RawPage, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut request = self.base_request.clone();
        let mut last = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.backoff_delay(&mut *rng);
                info!("Waiting {:.1} seconds before retry...", delay.as_secs_f64());
                self.sleeper.sleep(delay);
            }

            info!("Attempting to fetch page (attempt {attempt}/{max_attempts})...");

            match self.transport.get(url, &request) {
                Ok(resp) => match classify(resp.status) {
                    AttemptStatus::Success => return Ok(RawPage::new(resp.body)),
                    AttemptStatus::Blocked => {
                        warn!(status = resp.status, "Blocked - attempt #{attempt}");
                        last = format!("HTTP {}", resp.status);
                        request = request.rotated(&self.identities, &mut *rng);
                    }
                    AttemptStatus::Failed => {
                        warn!("HTTP {} - attempt #{attempt}", resp.status);
                        last = format!("HTTP {}", resp.status);
                    }
                },
                Err(e) => {
                    warn!("Request failed on attempt {attempt}: {e}");
                    last = e.to_string();
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: max_attempts,
            last,
        })
    }
}
