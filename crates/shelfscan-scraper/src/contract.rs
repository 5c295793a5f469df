//! The contract every retail source fulfils.
//!
//! [`ProductScraper`] is what the registry dispatches to. Most sources do not
//! implement it directly: they implement the [`SiteAdapter`] parsing hooks and
//! are wrapped in a [`SiteScraper`], which owns the fetch pipeline, paging,
//! record assembly and validation.

use crate::context::{Page, ScrapeContext};
use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use shelfscan_core::{Identifiers, Price, ProductRecord, SourceName};
use tracing::debug;

/// A source that can search for and look up products.
#[async_trait]
pub trait ProductScraper: Send + Sync {
    /// Registry key of this source.
    fn name(&self) -> &SourceName;

    /// Domain the source fetches from.
    fn domain(&self) -> &str;

    /// Search for `query`, returning at most the configured number of
    /// records in site order. An empty query returns nothing without any
    /// network traffic.
    async fn search(&self, query: &str) -> Result<Vec<ProductRecord>>;

    /// Fetch a single listing. `None` when the page says the item is gone.
    async fn get_product(&self, url: &str) -> Result<Option<ProductRecord>>;
}

/// Display fields of a listing, before price, stock and identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Listing title
    pub title: String,
    /// Absolute product link
    pub product_url: String,
    /// Absolute image link
    pub image_url: Option<String>,
    /// Brand, when shown
    pub brand: Option<String>,
}

/// Site-specific parsing hooks.
///
/// Hooks are synchronous: parsed documents never live across an await.
pub trait SiteAdapter: Send + Sync + 'static {
    /// Raw listing extracted from a page.
    type Item: Send;

    /// Registry key stamped on every record.
    fn source(&self) -> &SourceName;

    /// Domain all of the source's URLs point at.
    fn domain(&self) -> &str;

    /// URL of result page `page` (1-based) for `query`.
    fn search_url(&self, query: &str, page: u32) -> String;

    /// Raw listings of a search results page, in site order.
    ///
    /// An empty vector means the site reported no results; a page that
    /// matches neither the results layout nor the no-results layout is a
    /// [`ScrapeError::Parse`].
    fn extract_items(&self, page: &Page) -> Result<Vec<Self::Item>>;

    /// The listing on a product page, `None` if the page says it is gone.
    fn extract_detail(&self, page: &Page) -> Result<Option<Self::Item>>;

    /// Title, link, image and brand. `None` skips the item.
    fn parse_listing(&self, item: &Self::Item, page: &Page) -> Option<Listing>;

    /// Current price, `None` when the listing shows none.
    fn parse_price(&self, item: &Self::Item) -> Option<Price>;

    /// Whether the item can be bought now.
    fn parse_stock(&self, item: &Self::Item) -> bool;

    /// UPC and retailer SKU.
    fn parse_identifiers(&self, item: &Self::Item) -> Identifiers;
}

/// Drives a [`SiteAdapter`] through the shared fetch pipeline.
#[derive(Debug)]
pub struct SiteScraper<A> {
    adapter: A,
    context: ScrapeContext,
}

impl<A: SiteAdapter> SiteScraper<A> {
    /// Wrap `adapter` around the shared fetch pipeline.
    pub fn new(adapter: A, context: ScrapeContext) -> Self {
        Self { adapter, context }
    }

    /// The wrapped parsing hooks.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Lazily fetch result pages 1..=`max_pages`, one page per poll.
    ///
    /// Stops at the first page that yields no records or at the first error.
    /// Every call starts again from page 1.
    pub fn search_pages<'a>(&'a self, query: &'a str) -> BoxStream<'a, Result<Vec<ProductRecord>>> {
        let query = query.trim();
        if query.is_empty() {
            return stream::empty().boxed();
        }

        let max_pages = self.context.limits().max_pages.max(1);
        stream::unfold(Some(1u32), move |next| async move {
            let page_number = next?;
            match self.fetch_results(query, page_number).await {
                Ok(records) if records.is_empty() => None,
                Ok(records) => {
                    let next = (page_number < max_pages).then_some(page_number + 1);
                    Some((Ok(records), next))
                }
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }

    async fn fetch_results(&self, query: &str, page_number: u32) -> Result<Vec<ProductRecord>> {
        let url = self.adapter.search_url(query, page_number);
        let page = self.context.fetch_page(&url).await?;

        let items = self.adapter.extract_items(&page)?;
        let found = items.len();
        let records: Vec<ProductRecord> = items
            .iter()
            .filter_map(|item| self.build_record(item, &page))
            .collect();

        debug!(
            source = %self.adapter.source(),
            page = page_number,
            found,
            kept = records.len(),
            "parsed results page"
        );
        Ok(records)
    }

    fn build_record(&self, item: &A::Item, page: &Page) -> Option<ProductRecord> {
        let listing = self.adapter.parse_listing(item, page)?;
        let record = ProductRecord::new(
            listing.title,
            listing.product_url,
            self.adapter.source().clone(),
        )
        .with_price(self.adapter.parse_price(item))
        .with_stock(self.adapter.parse_stock(item))
        .with_image(listing.image_url)
        .with_brand(listing.brand)
        .with_identifiers(self.adapter.parse_identifiers(item));

        match record.validate() {
            Ok(()) => Some(record),
            Err(e) => {
                debug!(source = %self.adapter.source(), error = %e, "dropping invalid record");
                None
            }
        }
    }
}

#[async_trait]
impl<A: SiteAdapter> ProductScraper for SiteScraper<A> {
    fn name(&self) -> &SourceName {
        self.adapter.source()
    }

    fn domain(&self) -> &str {
        self.adapter.domain()
    }

    async fn search(&self, query: &str) -> Result<Vec<ProductRecord>> {
        let limit = self.context.limits().max_results;
        let mut records = Vec::new();
        if limit == 0 {
            return Ok(records);
        }

        let mut pages = self.search_pages(query);
        while let Some(page) = pages.next().await {
            records.extend(page?);
            if records.len() >= limit {
                break;
            }
        }
        records.truncate(limit);
        Ok(records)
    }

    async fn get_product(&self, url: &str) -> Result<Option<ProductRecord>> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ScrapeError::InvalidUrl("empty product URL".to_string()));
        }

        let page = match self.context.fetch_page(url).await {
            Ok(page) => page,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(item) = self.adapter.extract_detail(&page)? else {
            return Ok(None);
        };

        let mut record = self
            .build_record(&item, &page)
            .ok_or_else(|| ScrapeError::parse("listing", url, "product page lacks a title"))?;
        record.product_url = url.to_string();
        Ok(Some(record))
    }
}
