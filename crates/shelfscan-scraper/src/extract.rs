//! Extraction helpers shared by the HTML sources.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use shelfscan_core::Price;

static DOLLAR_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?").expect("valid price regex")
});

static BARE_AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?").expect("valid price regex")
});

static UPC_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)"(?:upc|gtin|gtin12|gtin13)"\s*:\s*"(\d{12,13})""#,
        r"(?i)\b(?:upc|gtin|universal product code)\b[^0-9]{0,40}(\d{12,13})\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid UPC regex"))
    .collect()
});

const OUT_OF_STOCK: [&str; 5] = [
    "out of stock",
    "sold out",
    "unavailable",
    "not available",
    "coming soon",
];

const IN_STOCK: [&str; 6] = [
    "add to cart",
    "in stock",
    "ship it",
    "pick it up",
    "shipping",
    "available",
];

/// Elements that only appear on challenge interstitials.
const CHALLENGE_ELEMENTS: [(&str, &str); 4] = [
    ("#px-captcha", "perimeterx"),
    ("#challenge-form", "cloudflare"),
    ("#cf-challenge-running", "cloudflare"),
    ("form#captcha-form", "captcha"),
];

/// Lowercase title and heading phrases of block pages.
const CHALLENGE_HEADINGS: [(&str, &str); 5] = [
    ("just a moment", "cloudflare"),
    ("attention required", "cloudflare"),
    ("robot or human", "robot check"),
    ("verify you are a human", "robot check"),
    ("access denied", "block page"),
];

/// Parse a displayed price such as `$1,299.99` or `Now $24.99 - $39.99`.
///
/// Ranges resolve to their first (lowest) amount; text without a dollar sign
/// falls back to the first bare number.
pub fn parse_price_text(text: &str) -> Option<Price> {
    let captures = DOLLAR_AMOUNT
        .captures(text)
        .or_else(|| BARE_AMOUNT.captures(text))?;

    let units = captures.get(1)?.as_str().replace(',', "");
    match captures.get(2) {
        Some(fraction) => Price::parse(&format!("{units}.{}", fraction.as_str())),
        None => Price::parse(&units),
    }
}

/// Find a 12 or 13 digit UPC/GTIN in page text or embedded JSON.
pub fn find_upc(text: &str) -> Option<String> {
    UPC_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify availability text. `None` when the text says nothing either way.
pub fn classify_stock(text: &str) -> Option<bool> {
    let text = text.to_ascii_lowercase();
    if OUT_OF_STOCK.iter().any(|marker| text.contains(marker)) {
        Some(false)
    } else if IN_STOCK.iter().any(|marker| text.contains(marker)) {
        Some(true)
    } else {
        None
    }
}

/// Name of the challenge mechanism if `body` is a block page.
///
/// Widgets embedded in an ordinary page (a newsletter reCAPTCHA, the
/// Cloudflare beacon script) do not count.
pub fn detect_challenge(body: &str) -> Option<&'static str> {
    let document = Html::parse_document(body);

    if let Some((_, indicator)) = CHALLENGE_ELEMENTS
        .iter()
        .find(|(css, _)| has_match(&document, css))
    {
        return Some(*indicator);
    }

    let root = document.root_element();
    select_all(&root, "title, h1")
        .iter()
        .map(|element| text_of(element).to_lowercase())
        .find_map(|heading| {
            CHALLENGE_HEADINGS
                .iter()
                .find(|(phrase, _)| heading.contains(phrase))
                .map(|(_, indicator)| *indicator)
        })
}

/// Whitespace-collapsed text of an element.
pub fn text_of(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every element under `scope` matching `css`. Invalid selectors match nothing.
pub fn select_all<'a>(scope: &ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| scope.select(&selector).collect())
        .unwrap_or_default()
}

/// First element under `scope` matching any of `selectors`, tried in order.
pub fn first_match<'a>(scope: &ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|css| {
        Selector::parse(css)
            .ok()
            .and_then(|selector| scope.select(&selector).next())
    })
}

/// Non-empty text of the first element matching any of `selectors`.
pub fn first_text(scope: &ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    first_match(scope, selectors)
        .map(|element| text_of(&element))
        .filter(|text| !text.is_empty())
}

/// Non-empty attribute of the first element matching `css`.
pub fn first_attr(scope: &ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    first_match(scope, &[css])
        .and_then(|element| element.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Whether the document contains any element matching `css`.
pub fn has_match(document: &Html, css: &str) -> bool {
    !select_all(&document.root_element(), css).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_text() {
        assert_eq!(parse_price_text("$19.99").map(|p| p.cents()), Some(1999));
        assert_eq!(parse_price_text("$1,299.99").map(|p| p.cents()), Some(129_999));
        assert_eq!(parse_price_text("Now $24.99 - $39.99").map(|p| p.cents()), Some(2499));
        assert_eq!(parse_price_text("$5").map(|p| p.cents()), Some(500));
        assert_eq!(parse_price_text("$12.5").map(|p| p.cents()), Some(1250));
        assert_eq!(parse_price_text("34.00").map(|p| p.cents()), Some(3400));
        assert_eq!(parse_price_text("See price in cart"), None);
    }

    #[test]
    fn test_dollar_amount_preferred_over_other_numbers() {
        assert_eq!(
            parse_price_text("Save 20% today: $15.99").map(|p| p.cents()),
            Some(1599)
        );
    }

    #[test]
    fn test_find_upc() {
        assert_eq!(
            find_upc("Specifications UPC: 097855142283 Model M185").as_deref(),
            Some("097855142283")
        );
        assert_eq!(
            find_upc(r#"{"sku":"6413439","gtin13":"0097855142283"}"#).as_deref(),
            Some("0097855142283")
        );
        assert_eq!(find_upc("UPC: 12345"), None);
        assert_eq!(find_upc("no identifiers here"), None);
    }

    #[test]
    fn test_classify_stock() {
        assert_eq!(classify_stock("Add to Cart"), Some(true));
        assert_eq!(classify_stock("Shipping arrives by Tue"), Some(true));
        assert_eq!(classify_stock("Sold Out"), Some(false));
        assert_eq!(classify_stock("Currently unavailable"), Some(false));
        assert_eq!(classify_stock(""), None);
    }

    #[test]
    fn test_detect_challenge() {
        assert_eq!(
            detect_challenge("<h1>Robot or human?</h1><div id=\"px-captcha\"></div>"),
            Some("perimeterx")
        );
        assert_eq!(
            detect_challenge("<title>Just a moment...</title><form id=\"challenge-form\"></form>"),
            Some("cloudflare")
        );
        assert_eq!(
            detect_challenge("<html><body><h1>Robot or human?</h1></body></html>"),
            Some("robot check")
        );
        assert_eq!(detect_challenge("<div class=\"search-results\"></div>"), None);
    }

    #[test]
    fn test_embedded_widgets_are_not_challenges() {
        let results_page = r#"<html><head><title>mouse : Target</title></head><body>
            <div data-test="product-card"><a href="/p/-/A-1">Wireless Mouse</a></div>
            <form class="newsletter"><div class="g-recaptcha" data-sitekey="x"></div></form>
            <script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script>
            <script>document.cookie = "_pxhd=abc";</script>
        </body></html>"#;
        assert_eq!(detect_challenge(results_page), None);
    }

    #[test]
    fn test_selector_helpers() {
        let html = Html::parse_document(
            r#"<div class="card">
                 <a class="title" href="/p/1">  Wireless
                   Mouse </a>
                 <span class="price">$9.99</span>
                 <img src="https://img.example.com/1.jpg">
               </div>"#,
        );
        let root = html.root_element();

        assert_eq!(first_text(&root, &["h3", "a.title"]).as_deref(), Some("Wireless Mouse"));
        assert_eq!(first_attr(&root, "a.title", "href").as_deref(), Some("/p/1"));
        assert_eq!(first_attr(&root, "img", "alt"), None);
        assert_eq!(select_all(&root, "span.price").len(), 1);
        assert!(select_all(&root, "[[invalid").is_empty());
        assert!(has_match(&html, "div.card"));
    }
}
