/// Placeholder stored for any field the extractor could not find.
pub const UNKNOWN: &str = "N/A";

/// Markup returned by the fetcher. Lives for one cycle only.
#[derive(Debug, Clone)]
pub struct RawPage(String);

impl RawPage {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// listing
//  ├── id          sha256(title _ address _ price)
//  ├── title       building / unit name, mandatory
//  ├── price       "$2,500" or N/A
//  ├── address     derived from title or N/A
//  ├── url         absolute link, mandatory
//  ├── bedrooms / bathrooms / sqft
//  └── image_url   optional

/// One apartment as extracted from a listings page.
///
/// Records are built once by the extractor and never mutated afterwards.
/// `first_seen` is not part of the record: the store assigns it on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: String,
    pub title: String,
    pub price: String,
    pub address: String,
    pub url: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub sqft: String,
    pub image_url: Option<String>,
}

impl ListingRecord {
    /// "1 bed | 1 bath | 650 ft²" with N/A for the missing parts.
    pub fn details_line(&self) -> String {
        format!("{} | {} | {}", self.bedrooms, self.bathrooms, self.sqft)
    }
}
