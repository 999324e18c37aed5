// src/templates/email.rs
use crate::scraper::ListingRecord;
use maud::{html, Markup, DOCTYPE};

/// An image downloaded for a listing, embedded in the message.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Email {
    pub subject: String,
    pub html: String,
    pub text: String,
    pub images: Vec<InlineImage>,
}

pub fn subject(count: usize) -> String {
    format!("🏠 {count} New Apartment Listing(s) Found!")
}

/// Builds the notification for `listings`. `image_for` returns the bytes of a
/// listing's photo, or `None` to leave the photo out.
pub fn compose<F>(listings: &[ListingRecord], mut image_for: F) -> Email
where
    F: FnMut(&str) -> Option<Vec<u8>>,
{
    let mut images = Vec::new();
    let mut cards = Vec::with_capacity(listings.len());

    for (i, listing) in listings.iter().enumerate() {
        let image_name = listing
            .image_url
            .as_deref()
            .and_then(|url| image_for(url))
            .map(|bytes| {
                let name = format!("image{}.jpg", i + 1);
                images.push(InlineImage {
                    name: name.clone(),
                    bytes,
                });
                name
            });

        cards.push(listing_card(listing, image_name.as_deref()));
    }

    Email {
        subject: subject(listings.len()),
        html: html_body(&cards).into_string(),
        text: text_body(listings),
        images,
    }
}

fn html_body(cards: &[Markup]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
            }
            body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #ffffff;" {
                div style="max-width: 1200px; margin: 0 auto;" {
                    h2 style="color: #2c5aa0; text-align: center; margin-bottom: 10px;" {
                        "🏠 New Apartment Listings Found!"
                    }
                    p style="text-align: center; font-size: 1.1em; margin-bottom: 30px;" {
                        "Here are the new apartments that match your criteria:"
                    }
                    // table layout renders in more mail clients than divs
                    table width="100%" cellpadding="0" cellspacing="0" border="0" {
                        tr { td { @for card in cards { (card) } } }
                    }
                    hr style="margin: 30px 0; border: none; border-top: 1px solid #ddd;";
                    p style="color: #666; font-size: 14px; text-align: center; margin: 20px 0;" {
                        "This is an automated notification from your apartment tracker."
                        br;
                        "Happy apartment hunting! 🏠"
                    }
                }
            }
        }
    }
}

fn listing_card(listing: &ListingRecord, image_name: Option<&str>) -> Markup {
    html! {
        table width="100%" cellpadding="0" cellspacing="0" border="0"
            style="margin-bottom: 25px; border: 1px solid #ddd; border-radius: 12px; background-color: #f9f9f9;" {
            tr {
                td style="padding: 20px;" {
                    h3 style="color: #2c5aa0; margin: 0 0 15px 0; font-size: 18px; font-weight: bold;" {
                        (listing.title)
                    }
                    @if let Some(name) = image_name {
                        img src=(format!("cid:{name}")) alt="Apartment Image"
                            style="width: 100%; max-width: 300px; height: 200px; object-fit: cover; border-radius: 8px; margin-bottom: 15px;";
                    }
                    div style="color: #e74c3c; font-size: 20px; font-weight: bold; margin: 15px 0;" {
                        "💰 " (listing.price)
                    }
                    div style="margin: 15px 0; color: #555;" {
                        p style="margin: 8px 0; font-size: 14px;" {
                            strong { "📍 Address:" } " " (listing.address)
                        }
                        p style="margin: 8px 0; font-size: 14px;" {
                            strong { "🏠 Details:" } " " (listing.details_line())
                        }
                    }
                    table cellpadding="0" cellspacing="0" border="0" {
                        tr {
                            td style="background-color: #2c5aa0; border-radius: 6px; padding: 12px 24px;" {
                                a href=(listing.url)
                                    style="color: #ffffff !important; text-decoration: none; font-weight: bold; font-size: 14px; display: block;" {
                                    "View Full Listing"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn text_body(listings: &[ListingRecord]) -> String {
    let mut out = format!("New apartment listings found ({} total):\n\n", listings.len());

    for (i, listing) in listings.iter().enumerate() {
        out.push_str(&format!("#{} {}\n", i + 1, listing.title));
        out.push_str(&format!("💰 {}\n", listing.price));
        out.push_str(&format!("📍 {}\n", listing.address));
        out.push_str(&format!("🏠 {}\n", listing.details_line()));
        out.push_str(&format!("🔗 {}\n", listing.url));
        if let Some(image_url) = &listing.image_url {
            out.push_str(&format!("🖼️ Image: {image_url}\n"));
        }
        out.push_str(&"-".repeat(50));
        out.push_str("\n\n");
    }

    out
}

/// A one-off message for checking that mail delivery works.
pub fn test_message() -> Email {
    let text = "This is a test email from your apartment tracker!".to_string();
    let html = html! {
        (DOCTYPE)
        html {
            body style="font-family: Arial, sans-serif; color: #333; padding: 20px;" {
                h2 style="color: #2c5aa0;" { "🧪 Test Email" }
                p { (text) }
            }
        }
    };

    Email {
        subject: "🧪 Test Email - Apartment Tracker".to_string(),
        html: html.into_string(),
        text,
        images: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(title: &str, image_url: Option<&str>) -> ListingRecord {
        ListingRecord {
            id: "id".to_string(),
            title: title.to_string(),
            price: "$2,500".to_string(),
            address: "120 East 5th Street".to_string(),
            url: "https://streeteasy.com/rental/abc123".to_string(),
            bedrooms: "1 bed".to_string(),
            bathrooms: "1 bath".to_string(),
            sqft: "N/A".to_string(),
            image_url: image_url.map(str::to_string),
        }
    }

    #[test]
    fn subject_counts_listings() {
        assert_eq!(subject(3), "🏠 3 New Apartment Listing(s) Found!");
    }

    #[test]
    fn html_and_text_carry_every_listing() {
        let listings = vec![listing("First <Place>", None), listing("Second", None)];
        let email = compose(&listings, |_| None);

        assert!(email.html.contains("First &lt;Place&gt;"));
        assert!(email.html.contains("Second"));
        assert!(email.html.contains("https://streeteasy.com/rental/abc123"));
        assert!(email.text.contains("#1 First <Place>"));
        assert!(email.text.contains("#2 Second"));
        assert!(email.text.contains("🏠 1 bed | 1 bath | N/A"));
        assert!(email.images.is_empty());
    }

    #[test]
    fn downloaded_images_are_embedded_by_name() {
        let listings = vec![
            listing("With photo", Some("https://photos.example.com/1.jpg")),
            listing("Broken photo", Some("https://photos.example.com/404.jpg")),
            listing("No photo", None),
        ];

        let email = compose(&listings, |url| url.ends_with("1.jpg").then(|| vec![1, 2, 3]));

        assert_eq!(email.images.len(), 1);
        assert_eq!(email.images[0].name, "image1.jpg");
        assert_eq!(email.images[0].bytes, vec![1, 2, 3]);
        assert!(email.html.contains("cid:image1.jpg"));
        assert!(!email.html.contains("cid:image2.jpg"));
        assert!(email.text.contains("🖼️ Image: https://photos.example.com/404.jpg"));
    }

    #[test]
    fn test_message_has_no_listings_or_images() {
        let email = test_message();

        assert_eq!(email.subject, "🧪 Test Email - Apartment Tracker");
        assert_eq!(email.text, "This is a test email from your apartment tracker!");
        assert!(email.html.contains("This is a test email from your apartment tracker!"));
        assert!(email.images.is_empty());
    }
}
