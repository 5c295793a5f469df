use super::HtmlListing;
use crate::context::Page;
use crate::contract::{Listing, SiteAdapter};
use crate::error::{Result, ScrapeError};
use crate::extract::{find_upc, first_attr, first_text, has_match, parse_price_text, select_all};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use shelfscan_core::{Identifiers, Price, SourceName};

pub const NAME: &str = "target";
pub const CATEGORY: &str = "General Retail";

const DOMAIN: &str = "www.target.com";
const PAGE_SIZE: u32 = 24;

static TCIN_IN_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"/A-(\d{6,10})").expect("valid TCIN regex"));
static TCIN_IN_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"tcin"\s*:\s*"?(\d{6,10})"#).expect("valid TCIN regex"));

#[derive(Debug, Clone)]
pub struct TargetAdapter {
    source: SourceName,
}

impl TargetAdapter {
    pub fn new(source: SourceName) -> Self {
        Self { source }
    }

    fn card(card: &ElementRef<'_>) -> HtmlListing {
        HtmlListing {
            title: first_text(card, &[r#"a[data-test="product-title"]"#, "h3"]),
            href: first_attr(card, r#"a[data-test="product-title"]"#, "href")
                .or_else(|| first_attr(card, "a[href]", "href")),
            price_text: first_text(
                card,
                &[r#"[data-test="current-price"]"#, r#"[data-test="product-price"]"#],
            ),
            availability: first_text(
                card,
                &[
                    r#"[data-test="fulfillment-shipping"]"#,
                    r#"[data-test="out-of-stock"]"#,
                ],
            )
            .unwrap_or_default(),
            image: first_attr(card, "img", "src"),
            brand: first_text(card, &[r#"[data-test="product-brand"]"#]),
            sku: None,
            markup: card.html(),
        }
    }
}

impl SiteAdapter for TargetAdapter {
    type Item = HtmlListing;

    fn source(&self) -> &SourceName {
        &self.source
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        let mut url = format!(
            "https://{DOMAIN}/s?searchTerm={}",
            urlencoding::encode(query)
        );
        if page > 1 {
            url.push_str(&format!("&Nao={}", (page - 1) * PAGE_SIZE));
        }
        url
    }

    fn extract_items(&self, page: &Page) -> Result<Vec<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        let cards = select_all(&document.root_element(), r#"[data-test="product-card"]"#);

        if cards.is_empty() {
            if has_match(&document, r#"[data-test="no-results-message"]"#) {
                return Ok(Vec::new());
            }
            return Err(ScrapeError::parse(
                "product cards",
                &page.url,
                "no product cards and no no-results message",
            ));
        }

        Ok(cards.iter().map(Self::card).collect())
    }

    fn extract_detail(&self, page: &Page) -> Result<Option<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        if has_match(&document, r#"[data-test="product-not-found"]"#) {
            return Ok(None);
        }

        let root = document.root_element();
        Ok(Some(HtmlListing {
            title: first_text(
                &root,
                &[r#"h1[data-test="product-title"]"#, r#"[data-test="product-title"]"#, "h1"],
            ),
            href: Some(page.url.clone()),
            price_text: first_text(&root, &[r#"[data-test="product-price"]"#]),
            availability: first_text(
                &root,
                &[
                    r#"[data-test="fulfillment-cell-shipping"]"#,
                    r#"[data-test="fulfillment-shipping"]"#,
                    r#"[data-test="outOfStockMessage"]"#,
                ],
            )
            .unwrap_or_default(),
            image: first_attr(&root, r#"img[data-test="product-image"]"#, "src")
                .or_else(|| first_attr(&root, "picture img", "src")),
            brand: first_text(&root, &[r#"[data-test="product-brand"]"#]),
            sku: None,
            markup: page.body.clone(),
        }))
    }

    fn parse_listing(&self, item: &HtmlListing, page: &Page) -> Option<Listing> {
        item.listing(page)
    }

    fn parse_price(&self, item: &HtmlListing) -> Option<Price> {
        item.price_text.as_deref().and_then(parse_price_text)
    }

    fn parse_stock(&self, item: &HtmlListing) -> bool {
        item.stock_from_text()
    }

    fn parse_identifiers(&self, item: &HtmlListing) -> Identifiers {
        let tcin = item
            .href
            .as_deref()
            .and_then(|href| TCIN_IN_URL.captures(href))
            .or_else(|| TCIN_IN_MARKUP.captures(&item.markup))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());

        Identifiers {
            upc: find_upc(&item.markup),
            sku: tcin,
        }
    }
}
