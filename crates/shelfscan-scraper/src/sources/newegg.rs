use super::HtmlListing;
use crate::context::Page;
use crate::contract::{Listing, SiteAdapter};
use crate::error::{Result, ScrapeError};
use crate::extract::{
    classify_stock, find_upc, first_attr, first_text, has_match, parse_price_text, select_all,
};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use shelfscan_core::{Identifiers, Price, SourceName};

pub const NAME: &str = "newegg";
pub const CATEGORY: &str = "Electronics";

const DOMAIN: &str = "www.newegg.com";

static ITEM_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/p/([0-9A-Z]{8,20})").expect("valid item number regex"));

#[derive(Debug, Clone)]
pub struct NeweggAdapter {
    source: SourceName,
}

impl NeweggAdapter {
    pub fn new(source: SourceName) -> Self {
        Self { source }
    }

    fn card(cell: &ElementRef<'_>) -> HtmlListing {
        HtmlListing {
            title: first_text(cell, &["a.item-title"]),
            href: first_attr(cell, "a.item-title", "href"),
            price_text: first_text(cell, &["li.price-current"]),
            availability: first_text(cell, &["p.item-promo"]).unwrap_or_default(),
            image: first_attr(cell, "a.item-img img", "src")
                .or_else(|| first_attr(cell, "img", "src")),
            brand: first_attr(cell, "a.item-brand img", "title"),
            sku: None,
            markup: cell.html(),
        }
    }
}

impl SiteAdapter for NeweggAdapter {
    type Item = HtmlListing;

    fn source(&self) -> &SourceName {
        &self.source
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        format!(
            "https://{DOMAIN}/p/pl?d={}&page={page}",
            urlencoding::encode(query)
        )
    }

    fn extract_items(&self, page: &Page) -> Result<Vec<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        let cells = select_all(&document.root_element(), "div.item-cell");

        if cells.is_empty() {
            if has_match(&document, ".result-message") {
                return Ok(Vec::new());
            }
            return Err(ScrapeError::parse(
                "product cards",
                &page.url,
                "no div.item-cell results and no result message",
            ));
        }

        Ok(cells.iter().map(Self::card).collect())
    }

    fn extract_detail(&self, page: &Page) -> Result<Option<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        if has_match(&document, ".page-404") {
            return Ok(None);
        }

        let root = document.root_element();
        Ok(Some(HtmlListing {
            title: first_text(&root, &["h1.product-title", "h1"]),
            href: Some(page.url.clone()),
            price_text: first_text(&root, &[".product-price li.price-current", "li.price-current"]),
            availability: first_text(&root, &[".product-inventory", ".product-buy .btn-primary"])
                .unwrap_or_default(),
            image: first_attr(&root, "img.product-view-img-original", "src"),
            brand: first_attr(&root, ".product-view-brand a", "title")
                .or_else(|| first_text(&root, &[".product-view-brand"])),
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

    /// Newegg only labels unavailable items; a priced cell without a label is buyable.
    fn parse_stock(&self, item: &HtmlListing) -> bool {
        classify_stock(&item.availability).unwrap_or_else(|| self.parse_price(item).is_some())
    }

    fn parse_identifiers(&self, item: &HtmlListing) -> Identifiers {
        let item_number = item
            .href
            .as_deref()
            .and_then(|href| ITEM_NUMBER.captures(href))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());

        Identifiers {
            upc: find_upc(&item.markup),
            sku: item_number,
        }
    }
}
