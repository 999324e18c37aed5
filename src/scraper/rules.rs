// rules.rs
use crate::scraper::scraper_error::ParseError;
use scraper::{ElementRef, Selector};

/// How one step of a cascade reads a value out of a card.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Whitespace-normalized text of the first element matching the selector.
    Text(&'static str),
    /// Attribute value of the first matching element carrying it.
    Attr(&'static str, &'static str),
    /// The first matching element itself.
    Element(&'static str),
}

impl Rule {
    fn selector(&self) -> &'static str {
        match *self {
            Rule::Text(s) | Rule::Attr(s, _) | Rule::Element(s) => s,
        }
    }
}

// Selector tables, tried top to bottom. The hashed module class names come
// from the site's CSS build and are the first thing to break; the generic
// fallbacks below them keep extraction alive when that happens.

pub const CARD: &str = r#"[data-testid="listing-card"]"#;

pub const LINK_RULES: &[Rule] = &[
    Rule::Attr("a.ImageContainer-module__listingLink___sYIL9", "href"),
    Rule::Attr(r#"a[href*="/rental/"]"#, "href"),
    Rule::Attr(r#"a[href*="/building/"]"#, "href"),
];

pub const IMAGE_RULES: &[Rule] = &[
    Rule::Element("img.CardImage-module__cardImage__cirIn"),
    Rule::Element("img"),
    Rule::Element(r#"[data-testid="listing-image"] img"#),
];

pub const TITLE_RULES: &[Rule] = &[
    Rule::Text(r#"[data-testid="listing-title"]"#),
    Rule::Text(".ListingCard-module__address__"),
    Rule::Text(".address"),
    Rule::Text("h3"),
    Rule::Text("h2"),
    Rule::Text(r#"[class*="address"]"#),
    Rule::Text(r#"[class*="title"]"#),
];

pub const PRICE_RULES: &[Rule] = &[
    Rule::Text(".PriceInfo-module__priceText___Ej9Ej"),
    Rule::Text(".price"),
    Rule::Text(r#"[data-testid="price"]"#),
    Rule::Text(".ListingDetails-module__price___"),
    Rule::Text(r#"[class*="price"]"#),
    Rule::Text(r#"[class*="Price"]"#),
    Rule::Text(".rent-price"),
    Rule::Text(".listing-price"),
];

pub const FACTS_CONTAINER: &str = ".BedsBathsSqft-module__bedsBathsSqft___QFOK-";
pub const FACT_ITEM: &str = ".BedsBathsSqft-module__text___lnveO";

pub fn compile(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector).map_err(|e| ParseError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

struct CompiledRule {
    rule: Rule,
    selector: Selector,
}

/// An ordered list of rules for one field. First rule to yield a value wins.
pub struct Cascade {
    rules: Vec<CompiledRule>,
}

impl Cascade {
    pub fn new(rules: &[Rule]) -> Result<Self, ParseError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    rule: *rule,
                    selector: compile(rule.selector())?,
                })
            })
            .collect::<Result<Vec<_>, ParseError>>()?;

        Ok(Self { rules })
    }

    /// First non-empty string produced by a `Text` or `Attr` rule.
    pub fn first_value(&self, scope: ElementRef<'_>) -> Option<String> {
        self.rules
            .iter()
            .find_map(|compiled| apply(compiled, scope))
    }

    /// First element matched by any rule, whatever its kind.
    pub fn first_element<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.rules
            .iter()
            .find_map(|compiled| scope.select(&compiled.selector).next())
    }
}

fn apply(compiled: &CompiledRule, scope: ElementRef<'_>) -> Option<String> {
    match compiled.rule {
        Rule::Text(_) => scope
            .select(&compiled.selector)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty()),
        Rule::Attr(_, attr) => scope
            .select(&compiled.selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string),
        Rule::Element(_) => None,
    }
}

/// Text of all descendants, each fragment trimmed, joined by single spaces.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
