use thiserror::Error;

/// Failure of a single HTTP attempt, before the retry policy decides what to do.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid header value: {0}")]
    Header(String),
}

/// The fetcher ran out of attempts.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch page after {attempts} attempts (last: {last})")]
    Exhausted { attempts: u32, last: String },
    #[error("HTTP client init failed: {0}")]
    Client(String),
}

impl FetchError {
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } => *attempts,
            FetchError::Client(_) => 0,
        }
    }
}

/// Problems turning markup into records. Only `Selector` is fatal, and only at
/// extractor construction time; everything else is scoped to one card.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("invalid base origin {0:?}")]
    BaseOrigin(String),
    #[error("cannot resolve link {href:?}: {reason}")]
    Link { href: String, reason: String },
}
