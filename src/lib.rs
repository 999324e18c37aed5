//! Watches a rental listings page and reports apartments it has not seen before.

pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod mailer;
pub mod pipeline;
pub mod scheduler;
pub mod scraper;
pub mod templates;

#[cfg(test)]
mod tests;
