//! Walmart renders results client-side from the `__NEXT_DATA__` JSON blob, so
//! this source reads that state instead of the markup.

use crate::context::Page;
use crate::contract::{Listing, SiteAdapter};
use crate::error::{Result, ScrapeError};
use crate::extract::{first_match, parse_price_text};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use shelfscan_core::{Identifiers, Price, SourceName};
use shelfscan_net::absolutize;

pub const NAME: &str = "walmart";
pub const CATEGORY: &str = "General Retail";

const DOMAIN: &str = "www.walmart.com";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalmartItem {
    pub name: Option<String>,
    pub canonical_url: Option<String>,
    pub us_item_id: Option<String>,
    pub upc: Option<String>,
    pub brand: Option<String>,
    pub image_info: Option<ImageInfo>,
    pub price_info: Option<PriceInfo>,
    pub availability_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageInfo {
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceInfo {
    pub current_price: Option<CurrentPrice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrentPrice {
    pub price: Option<f64>,
    pub price_string: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WalmartAdapter {
    source: SourceName,
}

impl WalmartAdapter {
    pub fn new(source: SourceName) -> Self {
        Self { source }
    }
}

fn next_data(page: &Page) -> Result<Value> {
    let document = Html::parse_document(&page.body);
    let script = first_match(&document.root_element(), &["script#__NEXT_DATA__"])
        .map(|element| element.text().collect::<String>())
        .ok_or_else(|| ScrapeError::parse("__NEXT_DATA__", &page.url, "embedded state missing"))?;

    serde_json::from_str(&script)
        .map_err(|e| ScrapeError::parse("__NEXT_DATA__", &page.url, e.to_string()))
}

impl SiteAdapter for WalmartAdapter {
    type Item = WalmartItem;

    fn source(&self) -> &SourceName {
        &self.source
    }

    fn domain(&self) -> &str {
        DOMAIN
    }

    fn search_url(&self, query: &str, page: u32) -> String {
        let mut url = format!("https://{DOMAIN}/search?q={}", urlencoding::encode(query));
        if page > 1 {
            url.push_str(&format!("&page={page}"));
        }
        url
    }

    fn extract_items(&self, page: &Page) -> Result<Vec<WalmartItem>> {
        let state = next_data(page)?;
        let stacks = state
            .pointer("/props/pageProps/initialData/searchResult/itemStacks")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ScrapeError::parse("searchResult", &page.url, "itemStacks missing from state")
            })?;

        Ok(stacks
            .iter()
            .filter_map(|stack| stack.get("items").and_then(Value::as_array))
            .flatten()
            .filter(|item| item.get("__typename").and_then(Value::as_str) != Some("AdPlaceholder"))
            .filter_map(|item| WalmartItem::deserialize(item).ok())
            .collect())
    }

    fn extract_detail(&self, page: &Page) -> Result<Option<WalmartItem>> {
        let state = next_data(page)?;
        let data = state
            .pointer("/props/pageProps/initialData/data")
            .ok_or_else(|| ScrapeError::parse("product", &page.url, "product data missing"))?;

        match data.get("product") {
            None | Some(Value::Null) => Ok(None),
            Some(product) => WalmartItem::deserialize(product)
                .map(Some)
                .map_err(|e| ScrapeError::parse("product", &page.url, e.to_string())),
        }
    }

    fn parse_listing(&self, item: &WalmartItem, page: &Page) -> Option<Listing> {
        let title = item.name.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let product_url = absolutize(&page.url, item.canonical_url.as_deref()?)?;
        let image_url = item
            .image_info
            .as_ref()
            .and_then(|info| info.thumbnail_url.clone());

        Some(Listing {
            title: title.to_string(),
            product_url,
            image_url,
            brand: item.brand.clone(),
        })
    }

    fn parse_price(&self, item: &WalmartItem) -> Option<Price> {
        let current = item.price_info.as_ref()?.current_price.as_ref()?;
        current
            .price_string
            .as_deref()
            .and_then(parse_price_text)
            .or_else(|| {
                current
                    .price
                    .filter(|price| price.is_finite() && *price >= 0.0)
                    .and_then(|price| Price::parse(&format!("{price:.2}")))
            })
    }

    fn parse_stock(&self, item: &WalmartItem) -> bool {
        item.availability_status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("IN_STOCK"))
    }

    fn parse_identifiers(&self, item: &WalmartItem) -> Identifiers {
        Identifiers {
            upc: item.upc.clone().filter(|upc| {
                matches!(upc.len(), 12 | 13) && upc.bytes().all(|b| b.is_ascii_digit())
            }),
            sku: item.us_item_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(state: &str) -> String {
        format!(
            r#"<html><head></head><body><div id="__next"></div>
               <script id="__NEXT_DATA__" type="application/json">{state}</script>
               </body></html>"#
        )
    }

    fn adapter() -> WalmartAdapter {
        WalmartAdapter::new(SourceName::new(NAME).unwrap())
    }

    fn page(body: String) -> Page {
        Page {
            url: "https://www.walmart.com/search?q=wireless%20mouse".to_string(),
            status: 200,
            body,
        }
    }

    const SEARCH_STATE: &str = r#"{"props":{"pageProps":{"initialData":{"searchResult":{"itemStacks":[{"items":[
        {"__typename":"Product","name":"onn. Wireless Mouse","canonicalUrl":"/ip/onn-Wireless-Mouse/314022535",
         "usItemId":"314022535","brand":"onn.","imageInfo":{"thumbnailUrl":"https://i5.walmartimages.com/1.jpg"},
         "priceInfo":{"currentPrice":{"price":9.97,"priceString":"$9.97"}},"availabilityStatus":"IN_STOCK"},
        {"__typename":"AdPlaceholder"},
        {"__typename":"Product","name":"Logitech M185","canonicalUrl":"/ip/Logitech-M185/16726538",
         "usItemId":"16726538","priceInfo":{"currentPrice":{"price":14.5}},"availabilityStatus":"OUT_OF_STOCK"}
    ]}]}}}}}"#;

    #[test]
    fn test_search_url() {
        assert_eq!(
            adapter().search_url("wireless mouse", 1),
            "https://www.walmart.com/search?q=wireless%20mouse"
        );
        assert_eq!(
            adapter().search_url("wireless mouse", 2),
            "https://www.walmart.com/search?q=wireless%20mouse&page=2"
        );
    }

    #[test]
    fn test_extract_from_next_data() {
        let adapter = adapter();
        let page = page(wrap(SEARCH_STATE));
        let items = adapter.extract_items(&page).unwrap();
        assert_eq!(items.len(), 2);

        let listing = adapter.parse_listing(&items[0], &page).unwrap();
        assert_eq!(listing.title, "onn. Wireless Mouse");
        assert_eq!(
            listing.product_url,
            "https://www.walmart.com/ip/onn-Wireless-Mouse/314022535"
        );
        assert_eq!(adapter.parse_price(&items[0]).map(|p| p.cents()), Some(997));
        assert!(adapter.parse_stock(&items[0]));
        assert_eq!(adapter.parse_identifiers(&items[0]).sku.as_deref(), Some("314022535"));

        assert_eq!(adapter.parse_price(&items[1]).map(|p| p.cents()), Some(1450));
        assert!(!adapter.parse_stock(&items[1]));
    }

    #[test]
    fn test_empty_stack_means_no_results() {
        let state = r#"{"props":{"pageProps":{"initialData":{"searchResult":{"itemStacks":[{"items":[]}]}}}}}"#;
        assert!(adapter().extract_items(&page(wrap(state))).unwrap().is_empty());
    }

    #[test]
    fn test_missing_state_is_parse_error() {
        let err = adapter()
            .extract_items(&page("<html><body>nothing</body></html>".to_string()))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { ref field, .. } if field == "__NEXT_DATA__"));

        let err = adapter()
            .extract_items(&page(wrap(r#"{"props":{}}"#)))
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Parse { ref field, .. } if field == "searchResult"));
    }

    #[test]
    fn test_product_detail() {
        let state = r#"{"props":{"pageProps":{"initialData":{"data":{"product":
            {"name":"onn. Wireless Mouse","canonicalUrl":"/ip/onn-Wireless-Mouse/314022535","usItemId":"314022535",
             "upc":"681131169284","brand":"onn.","priceInfo":{"currentPrice":{"price":9.97}},"availabilityStatus":"IN_STOCK"}
        }}}}}"#;
        let adapter = adapter();
        let item = adapter
            .extract_detail(&page(wrap(state)))
            .unwrap()
            .unwrap();
        assert_eq!(adapter.parse_identifiers(&item).upc.as_deref(), Some("681131169284"));
        assert_eq!(adapter.parse_price(&item).map(|p| p.cents()), Some(997));
    }

    #[test]
    fn test_product_gone() {
        let state = r#"{"props":{"pageProps":{"initialData":{"data":{"product":null}}}}}"#;
        assert!(adapter().extract_detail(&page(wrap(state))).unwrap().is_none());
    }
}
