use super::HtmlListing;
use crate::context::Page;
use crate::contract::{Listing, SiteAdapter};
use crate::error::{Result, ScrapeError};
use crate::extract::{
    find_upc, first_attr, first_match, first_text, has_match, parse_price_text, select_all,
};
use scraper::{ElementRef, Html};
use shelfscan_core::{Identifiers, Price, SourceName};

pub const NAME: &str = "bestbuy";
pub const CATEGORY: &str = "Electronics";

const DOMAIN: &str = "www.bestbuy.com";

#[derive(Debug, Clone)]
pub struct BestBuyAdapter {
    source: SourceName,
}

impl BestBuyAdapter {
    pub fn new(source: SourceName) -> Self {
        Self { source }
    }

    fn card(card: &ElementRef<'_>) -> HtmlListing {
        HtmlListing {
            title: first_text(card, &["h4.sku-title", ".sku-title", "h3"]),
            href: first_attr(card, "h4.sku-title a", "href")
                .or_else(|| first_attr(card, "a[href]", "href")),
            price_text: first_text(
                card,
                &[
                    ".priceView-customer-price span",
                    ".priceView-hero-price span",
                    ".pricing-price",
                ],
            ),
            availability: first_text(
                card,
                &[
                    "button.add-to-cart-button",
                    ".fulfillment-add-to-cart-button button",
                ],
            )
            .unwrap_or_default(),
            image: first_attr(card, "img.product-image", "src")
                .or_else(|| first_attr(card, "img", "src")),
            brand: None,
            sku: card
                .value()
                .attr("data-sku-id")
                .map(str::to_string)
                .or_else(|| first_attr(card, "[data-sku-id]", "data-sku-id")),
            markup: card.html(),
        }
    }
}

impl SiteAdapter for BestBuyAdapter {
    type Item = HtmlListing;

    fn source(&self) -> &SourceName {
        &self.source
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        format!(
            "https://{DOMAIN}/site/searchpage.jsp?st={}&cp={page}",
            urlencoding::encode(query)
        )
    }

    fn extract_items(&self, page: &Page) -> Result<Vec<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        let cards = select_all(&document.root_element(), "li.sku-item");

        if cards.is_empty() {
            if has_match(&document, ".no-results-message") {
                return Ok(Vec::new());
            }
            return Err(ScrapeError::parse(
                "product cards",
                &page.url,
                "no li.sku-item cards and no no-results message",
            ));
        }

        Ok(cards.iter().map(Self::card).collect())
    }

    fn extract_detail(&self, page: &Page) -> Result<Option<HtmlListing>> {
        let document = Html::parse_document(&page.body);
        if has_match(&document, ".product-not-found") {
            return Ok(None);
        }

        let root = document.root_element();
        let sku = first_match(&root, &["[data-sku-id]"])
            .and_then(|el| el.value().attr("data-sku-id"))
            .map(str::to_string)
            .or_else(|| first_text(&root, &[".sku .product-data-value"]));

        Ok(Some(HtmlListing {
            title: first_text(&root, &[".sku-title h1", "h1"]),
            href: Some(page.url.clone()),
            price_text: first_text(
                &root,
                &[".priceView-hero-price span", ".priceView-customer-price span"],
            ),
            availability: first_text(&root, &["button.add-to-cart-button"]).unwrap_or_default(),
            image: first_attr(&root, "img.primary-image", "src"),
            brand: first_text(&root, &[".product-brand", "a[data-track=\"Brand\"]"]),
            sku,
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
        Identifiers {
            upc: find_upc(&item.markup),
            sku: item.sku.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <ol class="sku-item-list">
            <li class="sku-item" data-sku-id="6413439">
              <img class="product-image" src="https://pisces.bbystatic.com/image2/6413439.jpg">
              <h4 class="sku-title"><a href="/site/logitech-pebble-m350/6413439.p?skuId=6413439">Logitech - Pebble M350 Wireless Mouse</a></h4>
              <div class="priceView-customer-price"><span>$24.99</span></div>
              <button class="add-to-cart-button">Add to Cart</button>
            </li>
            <li class="sku-item" data-sku-id="6502574">
              <h4 class="sku-title"><a href="/site/razer-mouse/6502574.p?skuId=6502574">Razer - Basilisk V3 Pro</a></h4>
              <div class="priceView-customer-price"><span>$1,159.99</span></div>
              <button class="add-to-cart-button" disabled>Sold Out</button>
            </li>
          </ol>
        </body></html>
    "#;

    fn adapter() -> BestBuyAdapter {
        BestBuyAdapter::new(SourceName::new(NAME).unwrap())
    }

    fn page(body: &str) -> Page {
        Page {
            url: "https://www.bestbuy.com/site/searchpage.jsp?st=wireless%20mouse&cp=1".to_string(),
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            adapter().search_url("wireless mouse", 2),
            "https://www.bestbuy.com/site/searchpage.jsp?st=wireless%20mouse&cp=2"
        );
    }

    #[test]
    fn test_extract_sku_items() {
        let adapter = adapter();
        let page = page(SEARCH_PAGE);
        let items = adapter.extract_items(&page).unwrap();
        assert_eq!(items.len(), 2);

        let listing = adapter.parse_listing(&items[0], &page).unwrap();
        assert_eq!(listing.title, "Logitech - Pebble M350 Wireless Mouse");
        assert_eq!(
            listing.product_url,
            "https://www.bestbuy.com/site/logitech-pebble-m350/6413439.p?skuId=6413439"
        );
        assert_eq!(
            listing.image_url.as_deref(),
            Some("https://pisces.bbystatic.com/image2/6413439.jpg")
        );
        assert_eq!(adapter.parse_identifiers(&items[0]).sku.as_deref(), Some("6413439"));
        assert!(adapter.parse_stock(&items[0]));

        assert_eq!(adapter.parse_price(&items[1]).map(|p| p.cents()), Some(115_999));
        assert!(!adapter.parse_stock(&items[1]));
    }

    #[test]
    fn test_no_results() {
        let body = r#"<html><body><div class="no-results-message">Hmm, we didn't find anything</div></body></html>"#;
        assert!(adapter().extract_items(&page(body)).unwrap().is_empty());
    }

    #[test]
    fn test_layout_change_is_parse_error() {
        let body = r#"<html><body><div class="product-grid-v2"></div></body></html>"#;
        assert!(matches!(
            adapter().extract_items(&page(body)),
            Err(ScrapeError::Parse { .. })
        ));
    }

    #[test]
    fn test_product_page() {
        let body = r#"
            <html><body>
              <div class="sku-title"><h1>Logitech - Pebble M350 Wireless Mouse</h1></div>
              <div class="product-brand">Logitech</div>
              <div class="priceView-hero-price"><span>$24.99</span></div>
              <div class="sku"><span class="product-data-value">6413439</span></div>
              <li><div class="title">UPC</div><div class="value">097855142283</div></li>
              <button class="add-to-cart-button">Add to Cart</button>
            </body></html>
        "#;
        let page = Page {
            url: "https://www.bestbuy.com/site/6413439.p?skuId=6413439".to_string(),
            status: 200,
            body: body.to_string(),
        };

        let adapter = adapter();
        let item = adapter.extract_detail(&page).unwrap().unwrap();
        assert_eq!(item.title.as_deref(), Some("Logitech - Pebble M350 Wireless Mouse"));
        assert_eq!(item.brand.as_deref(), Some("Logitech"));

        let ids = adapter.parse_identifiers(&item);
        assert_eq!(ids.sku.as_deref(), Some("6413439"));
        assert_eq!(ids.upc.as_deref(), Some("097855142283"));
    }
}
