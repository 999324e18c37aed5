// src/mailer.rs

use crate::scraper::ListingRecord;
use crate::templates::email::{compose, test_message, Email};
use base64::Engine;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Email not configured: {0}")]
    Config(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("API error: {0}")]
    ApiError(String),
}

/// Receives each cycle's new listings. Never called with an empty slice.
pub trait Notifier {
    fn notify(&self, listings: &[ListingRecord]) -> Result<(), MailerError>;
}

/// Fetches listing photos for embedding. `None` means "leave it out".
pub trait ImageSource {
    fn download_image(&self, image_url: &str) -> Option<Vec<u8>>;
}

pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MailerError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageSource for HttpImageSource {
    fn download_image(&self, image_url: &str) -> Option<Vec<u8>> {
        let resp = match self.client.get(image_url).send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Failed to download image from {image_url}: {e}");
                return None;
            }
        };

        if !resp.status().is_success() {
            warn!("Failed to download image from {image_url}: HTTP {}", resp.status());
            return None;
        }

        match resp.bytes() {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!("Failed to read image from {image_url}: {e}");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MailerConfig {
    pub api_key: Option<String>,
    pub sender_email: Option<String>,
    pub sender_name: String,
    /// Falls back to the sender when unset.
    pub to_email: Option<String>,
}

pub struct BrevoMailer<I = HttpImageSource> {
    config: MailerConfig,
    images: I,
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct BrevoSender<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoRecipient<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct BrevoAttachment<'a> {
    name: &'a str,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoPayload<'a> {
    sender: BrevoSender<'a>,
    to: Vec<BrevoRecipient<'a>>,
    subject: &'a str,
    html_content: &'a str,
    text_content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<BrevoAttachment<'a>>,
}

impl<I: ImageSource> BrevoMailer<I> {
    pub fn new(config: MailerConfig, images: I) -> Self {
        Self {
            config,
            images,
            client: Client::new(),
            endpoint: BREVO_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sender and recipient addresses plus the API key, or a config error.
    fn credentials(&self) -> Result<(&str, &str, &str), MailerError> {
        let api_key = self.config.api_key.as_deref().filter(|s| !s.is_empty());
        let sender = self.config.sender_email.as_deref().filter(|s| !s.is_empty());

        match (api_key, sender) {
            (Some(api_key), Some(sender)) => {
                let to = self
                    .config
                    .to_email
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(sender);
                Ok((api_key, sender, to))
            }
            _ => Err(MailerError::Config(
                "set TRACKER_BREVO_API_KEY and TRACKER_SENDER_EMAIL".into(),
            )),
        }
    }

    pub fn compose(&self, listings: &[ListingRecord]) -> Email {
        compose(listings, |url| self.images.download_image(url))
    }

    /// Sends a fixed test message to check the credentials and the endpoint.
    pub fn send_test(&self) -> Result<(), MailerError> {
        let (_, sender, to) = self.credentials()?;
        info!("Sending test email from {sender} to {to}...");
        self.send(&test_message())?;
        info!("✅ Test email sent successfully");
        Ok(())
    }

    fn send(&self, email: &Email) -> Result<(), MailerError> {
        let (api_key, sender, to) = self.credentials()?;

        let payload = BrevoPayload {
            sender: BrevoSender {
                name: &self.config.sender_name,
                email: sender,
            },
            to: vec![BrevoRecipient { email: to }],
            subject: &email.subject,
            html_content: &email.html,
            text_content: &email.text,
            attachment: email
                .images
                .iter()
                .map(|img| BrevoAttachment {
                    name: &img.name,
                    content: base64::engine::general_purpose::STANDARD.encode(&img.bytes),
                })
                .collect(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .map_err(|e| MailerError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_body = resp.text().unwrap_or_else(|_| "(no body)".to_string());
            return Err(MailerError::ApiError(format!(
                "Brevo API error: {status} - {error_body}"
            )));
        }

        Ok(())
    }
}

impl<I: ImageSource> Notifier for BrevoMailer<I> {
    fn notify(&self, listings: &[ListingRecord]) -> Result<(), MailerError> {
        // Check credentials before downloading any images.
        self.credentials()?;

        let email = self.compose(listings);
        self.send(&email)?;

        info!(
            "✅ Email notification sent successfully for {} listings with {} images",
            listings.len(),
            email.images.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    #[derive(Default)]
    struct CountingImages {
        requested: RefCell<Vec<String>>,
    }

    impl ImageSource for CountingImages {
        fn download_image(&self, image_url: &str) -> Option<Vec<u8>> {
            self.requested.borrow_mut().push(image_url.to_string());
            Some(vec![0xFF, 0xD8])
        }
    }

    fn configured() -> MailerConfig {
        MailerConfig {
            api_key: Some("key".into()),
            sender_email: Some("me@example.com".into()),
            sender_name: "Apartment Tracker".into(),
            to_email: Some("you@example.com".into()),
        }
    }

    /// Accepts one request, answers with `status`, and hands back the raw request.
    fn one_shot_server(status: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let body_len = text[..end]
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + body_len {
                        break;
                    }
                }
            }

            let response =
                format!("HTTP/1.1 {status}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}");
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}/v3/smtp/email"), handle)
    }

    fn listing() -> ListingRecord {
        ListingRecord {
            id: "id".to_string(),
            title: "120 East 5th Street 3A".to_string(),
            price: "$2,500".to_string(),
            address: "120 East 5th Street".to_string(),
            url: "https://streeteasy.com/rental/abc123".to_string(),
            bedrooms: "N/A".to_string(),
            bathrooms: "N/A".to_string(),
            sqft: "N/A".to_string(),
            image_url: Some("https://photos.example.com/1.jpg".to_string()),
        }
    }

    #[test]
    fn missing_credentials_fail_before_any_download() {
        let mailer = BrevoMailer::new(MailerConfig::default(), CountingImages::default());

        let err = mailer.notify(&[listing()]).unwrap_err();
        assert!(matches!(err, MailerError::Config(_)));
        assert!(mailer.images.requested.borrow().is_empty());
    }

    #[test]
    fn recipient_defaults_to_sender() {
        let mailer = BrevoMailer::new(
            MailerConfig {
                api_key: Some("key".into()),
                sender_email: Some("me@example.com".into()),
                sender_name: "Apartment Tracker".into(),
                to_email: None,
            },
            CountingImages::default(),
        );

        let (_, sender, to) = mailer.credentials().unwrap();
        assert_eq!(sender, "me@example.com");
        assert_eq!(to, "me@example.com");
    }

    #[test]
    fn compose_downloads_each_image_once() {
        let mailer = BrevoMailer::new(MailerConfig::default(), CountingImages::default());
        let email = mailer.compose(&[listing()]);

        assert_eq!(email.images.len(), 1);
        assert_eq!(
            *mailer.images.requested.borrow(),
            vec!["https://photos.example.com/1.jpg".to_string()]
        );
    }

    #[test]
    fn unreachable_endpoint_is_a_request_error() {
        let mailer = BrevoMailer::new(
            MailerConfig {
                api_key: Some("key".into()),
                sender_email: Some("me@example.com".into()),
                sender_name: "Apartment Tracker".into(),
                to_email: None,
            },
            CountingImages::default(),
        )
        .with_endpoint("http://127.0.0.1:9/v3/smtp/email");

        let err = mailer.notify(&[listing()]).unwrap_err();
        assert!(matches!(err, MailerError::RequestFailed(_)));
    }

    #[test]
    fn test_email_posts_fixed_message_to_recipient() {
        let (endpoint, server) = one_shot_server("201 Created");
        let mailer =
            BrevoMailer::new(configured(), CountingImages::default()).with_endpoint(endpoint);

        mailer.send_test().unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /v3/smtp/email"));
        assert!(request.to_ascii_lowercase().contains("api-key: key"));
        assert!(request.contains("Test Email - Apartment Tracker"));
        assert!(request.contains(r#""to":[{"email":"you@example.com"}]"#));
        assert!(!request.contains("attachment"));
        assert!(mailer.images.requested.borrow().is_empty());
    }

    #[test]
    fn test_email_reports_api_rejection() {
        let (endpoint, server) = one_shot_server("401 Unauthorized");
        let mailer =
            BrevoMailer::new(configured(), CountingImages::default()).with_endpoint(endpoint);

        let err = mailer.send_test().unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, MailerError::ApiError(ref msg) if msg.contains("401")));
    }

    #[test]
    fn test_email_needs_credentials() {
        let mailer = BrevoMailer::new(MailerConfig::default(), CountingImages::default());
        assert!(matches!(mailer.send_test(), Err(MailerError::Config(_))));
    }
}
