//! Reference retail sources.
//!
//! Three HTML sources share [`HtmlListing`] as their raw item; Walmart reads
//! the JSON state embedded in its pages.

pub mod bestbuy;
pub mod newegg;
pub mod target;
pub mod walmart;

pub use bestbuy::BestBuyAdapter;
pub use newegg::NeweggAdapter;
pub use target::TargetAdapter;
pub use walmart::WalmartAdapter;

use crate::context::Page;
use crate::contract::Listing;
use crate::extract::classify_stock;
use shelfscan_net::absolutize;

/// Raw fields pulled from an HTML product card or product page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlListing {
    pub title: Option<String>,
    pub href: Option<String>,
    pub price_text: Option<String>,
    pub availability: String,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    /// Markup searched for identifiers
    pub markup: String,
}

impl HtmlListing {
    pub(crate) fn listing(&self, page: &Page) -> Option<Listing> {
        let title = self.title.clone().filter(|t| !t.is_empty())?;
        let product_url = absolutize(&page.url, self.href.as_deref()?)?;
        let image_url = self
            .image
            .as_deref()
            .and_then(|src| absolutize(&page.url, src));

        Some(Listing {
            title,
            product_url,
            image_url,
            brand: self.brand.clone(),
        })
    }

    /// In stock unless the availability text says otherwise; no text means unknown.
    pub(crate) fn stock_from_text(&self) -> bool {
        classify_stock(&self.availability).unwrap_or(!self.availability.trim().is_empty())
    }
}
