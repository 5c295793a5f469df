//! Static catalog of the built-in sources.

use crate::error::Result;
use crate::registry::ScraperRegistry;
use shelfscan_core::AppConfig;
use shelfscan_scraper::sources::{bestbuy, newegg, target, walmart};
use shelfscan_scraper::sources::{BestBuyAdapter, NeweggAdapter, TargetAdapter, WalmartAdapter};
use shelfscan_scraper::{ScrapeContext, SiteScraper};
use tracing::{info, warn};

impl ScraperRegistry {
    /// Registry holding every built-in source, configured from `config`.
    ///
    /// Names listed in `registry.disabled_sources` start disabled; unknown
    /// names there are logged and ignored.
    pub fn with_default_sources(context: ScrapeContext, config: &AppConfig) -> Result<Self> {
        let registry = Self::from_config(context, &config.registry);
        registry.register_default_sources()?;

        for name in &config.registry.disabled_sources {
            if registry.contains(name) {
                registry.set_enabled(name, false)?;
            } else {
                warn!(source = %name, "ignoring unknown source in disabled_sources");
            }
        }

        info!(sources = registry.count(), "loaded default source catalog");
        Ok(registry)
    }

    /// Register the built-in sources on an existing registry.
    pub fn register_default_sources(&self) -> Result<()> {
        self.register(target::NAME, target::CATEGORY, |name, context| {
            SiteScraper::new(TargetAdapter::new(name), context)
        })?;
        self.register(bestbuy::NAME, bestbuy::CATEGORY, |name, context| {
            SiteScraper::new(BestBuyAdapter::new(name), context)
        })?;
        self.register(newegg::NAME, newegg::CATEGORY, |name, context| {
            SiteScraper::new(NeweggAdapter::new(name), context)
        })?;
        self.register(walmart::NAME, walmart::CATEGORY, |name, context| {
            SiteScraper::new(WalmartAdapter::new(name), context)
        })?;
        Ok(())
    }
}
