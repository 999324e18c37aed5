// src/scraper/identity.rs
use sha2::{Digest, Sha256};

const SEPARATOR: char = '_';

/// Deterministic listing id: lowercase hex SHA-256 of `title_address_price`.
///
/// A price change yields a new id, so a repriced apartment is reported again.
pub fn compute_id(title: &str, address: &str, price: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity_string(title, address, price).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn identity_string(title: &str, address: &str, price: &str) -> String {
    format!("{title}{SEPARATOR}{address}{SEPARATOR}{price}")
}
