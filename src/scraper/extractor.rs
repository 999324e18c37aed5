// extractor.rs
use crate::scraper::identity::compute_id;
use crate::scraper::models::{ListingRecord, RawPage, UNKNOWN};
use crate::scraper::rules::{self, element_text, Cascade};
use crate::scraper::scraper_error::ParseError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

const PRICE_PATTERN: &str = r"\$[\d,]+";
const PRICE_QUALIFIERS: [&str; 3] = ["base", "net", "rent"];
const STREET_KEYWORDS: [&str; 5] = ["street", "avenue", "road", "place", "drive"];
const ALT_DELIMITER: &str = "image";

/// One listing element out of the page. Borrowed from the parsed document.
#[derive(Clone, Copy)]
pub struct ListingCard<'a> {
    element: ElementRef<'a>,
}

impl<'a> ListingCard<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub fn element(&self) -> ElementRef<'a> {
        self.element
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fact {
    Bedrooms,
    Bathrooms,
    Sqft,
}

pub struct Extractor {
    base: Url,
    card: Selector,
    link: Cascade,
    image: Cascade,
    title: Cascade,
    price: Cascade,
    facts_container: Selector,
    fact_item: Selector,
    price_pattern: Regex,
}

impl Extractor {
    pub fn new(base_origin: &str) -> Result<Self, ParseError> {
        let base =
            Url::parse(base_origin).map_err(|_| ParseError::BaseOrigin(base_origin.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ParseError::BaseOrigin(base_origin.to_string()));
        }

        Ok(Self {
            base,
            card: rules::compile(rules::CARD)?,
            link: Cascade::new(rules::LINK_RULES)?,
            image: Cascade::new(rules::IMAGE_RULES)?,
            title: Cascade::new(rules::TITLE_RULES)?,
            price: Cascade::new(rules::PRICE_RULES)?,
            facts_container: rules::compile(rules::FACTS_CONTAINER)?,
            fact_item: rules::compile(rules::FACT_ITEM)?,
            price_pattern: Regex::new(PRICE_PATTERN).map_err(|e| ParseError::Selector {
                selector: PRICE_PATTERN.to_string(),
                reason: e.to_string(),
            })?,
        })
    }

    /// Every complete listing on the page, in markup order.
    ///
    /// A page without listing cards is an empty result, not an error. Cards
    /// missing a title or link are dropped; cards that fail to parse are
    /// logged and skipped.
    pub fn extract(&self, page: &RawPage) -> Vec<ListingRecord> {
        let document = Html::parse_document(page.as_str());
        let cards: Vec<ListingCard<'_>> = document.select(&self.card).map(ListingCard::new).collect();

        if cards.is_empty() {
            warn!("No apartment cards found with listing-card selector");
            return Vec::new();
        }

        info!("Found {} apartment cards", cards.len());

        let mut listings = Vec::with_capacity(cards.len());
        for (index, card) in cards.iter().enumerate() {
            match self.extract_card(card) {
                Ok(Some(listing)) => listings.push(listing),
                Ok(None) => {}
                Err(e) => warn!(card = index, "Error parsing individual listing: {e}"),
            }
        }

        info!("Successfully scraped {} listings", listings.len());
        listings
    }

    pub fn extract_card(&self, card: &ListingCard<'_>) -> Result<Option<ListingRecord>, ParseError> {
        let Some(url) = self.extract_url(card)? else {
            debug!("No link element found in card");
            return Ok(None);
        };

        let (image_title, image_url) = self.extract_image(card);
        let Some(title) = image_title.or_else(|| self.title.first_value(card.element())) else {
            debug!(url = %url, "Skipping listing without title");
            return Ok(None);
        };

        let price = self.extract_price(card);
        let address = address_from_title(&title);
        let (bedrooms, bathrooms, sqft) = self.extract_facts(card);

        debug!(%title, %price, %address, %url, "Extracted listing");

        Ok(Some(ListingRecord {
            id: compute_id(&title, &address, &price),
            title,
            price,
            address,
            url,
            bedrooms,
            bathrooms,
            sqft,
            image_url,
        }))
    }

    fn extract_url(&self, card: &ListingCard<'_>) -> Result<Option<String>, ParseError> {
        match self.link.first_value(card.element()) {
            Some(href) => self.resolve(&href).map(Some),
            None => Ok(None),
        }
    }

    /// Title from the image's alt text, image link from `src` or `data-src`.
    /// An image link that does not resolve is dropped, not the card.
    fn extract_image(&self, card: &ListingCard<'_>) -> (Option<String>, Option<String>) {
        let Some(img) = self.image.first_element(card.element()) else {
            return (None, None);
        };

        let title = img.value().attr("alt").and_then(title_from_alt);

        let src = ["src", "data-src"]
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .find(|s| !s.is_empty());
        let image_url = src.and_then(|src| match self.resolve(src) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!("Ignoring image link: {e}");
                None
            }
        });

        (title, image_url)
    }

    fn extract_price(&self, card: &ListingCard<'_>) -> String {
        match self.price.first_value(card.element()) {
            Some(raw) => normalize_price(&raw, &self.price_pattern),
            None => UNKNOWN.to_string(),
        }
    }

    fn extract_facts(&self, card: &ListingCard<'_>) -> (String, String, String) {
        let mut bedrooms = None;
        let mut bathrooms = None;
        let mut sqft = None;

        if let Some(container) = card.element().select(&self.facts_container).next() {
            for item in container.select(&self.fact_item) {
                let text = element_text(item);
                let slot = match classify_fact(&text) {
                    Some(Fact::Bedrooms) => &mut bedrooms,
                    Some(Fact::Bathrooms) => &mut bathrooms,
                    Some(Fact::Sqft) => &mut sqft,
                    None => continue,
                };
                if slot.is_none() {
                    *slot = Some(text);
                }
            }
        }

        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        (or_unknown(bedrooms), or_unknown(bathrooms), or_unknown(sqft))
    }

    fn resolve(&self, href: &str) -> Result<String, ParseError> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Ok(href.to_string());
        }
        self.base
            .join(href)
            .map(String::from)
            .map_err(|e| ParseError::Link {
                href: href.to_string(),
                reason: e.to_string(),
            })
    }
}

/// "528 East 13th Street 1D image 1 of 23" -> "528 East 13th Street 1D"
fn title_from_alt(alt: &str) -> Option<String> {
    let title = match alt.find(ALT_DELIMITER) {
        Some(idx) => &alt[..idx],
        None => alt,
    }
    .trim();

    (!title.is_empty()).then(|| title.to_string())
}

/// Reduces price text to a `$`-prefixed amount, or N/A.
fn normalize_price(raw: &str, pattern: &Regex) -> String {
    if let Some(m) = pattern.find(raw) {
        return m.as_str().to_string();
    }

    let trimmed = PRICE_QUALIFIERS
        .iter()
        .fold(raw, |acc, word| acc.split(word).next().unwrap_or(acc))
        .trim();

    if trimmed.starts_with('$') {
        trimmed.to_string()
    } else {
        UNKNOWN.to_string()
    }
}

/// Best effort: drops the last token (the unit) from a street-looking title.
fn address_from_title(title: &str) -> String {
    let lower = title.to_lowercase();
    if !STREET_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return UNKNOWN.to_string();
    }

    let parts: Vec<&str> = title.split_whitespace().collect();
    if parts.len() < 3 {
        return UNKNOWN.to_string();
    }

    parts[..parts.len() - 1].join(" ")
}

fn classify_fact(text: &str) -> Option<Fact> {
    let lower = text.to_lowercase();
    if lower.contains("bed") {
        Some(Fact::Bedrooms)
    } else if lower.contains("bath") {
        Some(Fact::Bathrooms)
    } else if lower.contains("ft²") || lower.contains("sq ft") || lower.contains("sqft") {
        Some(Fact::Sqft)
    } else {
        None
    }
}
