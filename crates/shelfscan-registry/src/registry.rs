//! Central source catalog with lazy instantiation and concurrent batch search.

use crate::batch::{BatchResults, SourceResult};
use crate::descriptor::{ScraperFactory, SourceDescriptor, SourceStats};
use crate::error::{RegistryError, Result};
use crate::selection::SourceSelection;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use shelfscan_core::{Category, RegistryConfig, SourceName};
use shelfscan_scraper::{ErrorKind, ProductScraper, ScrapeContext, SourceError};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

enum Target {
    Dispatch(Arc<SourceDescriptor>),
    Disabled(String),
}

/// Catalog of sources keyed by name.
///
/// Scrapers are built on first use from their registered factory and cached
/// for the life of the registry. Every scraper receives a clone of the same
/// [`ScrapeContext`], so compliance cache, rate limits and sessions are shared
/// across sources targeting the same domain.
pub struct ScraperRegistry {
    context: ScrapeContext,
    sources: RwLock<BTreeMap<String, Arc<SourceDescriptor>>>,
    max_concurrent: usize,
    source_timeout: Duration,
}

impl std::fmt::Debug for ScraperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScraperRegistry")
            .field("sources", &self.names())
            .field("max_concurrent", &self.max_concurrent)
            .field("source_timeout", &self.source_timeout)
            .finish_non_exhaustive()
    }
}

impl ScraperRegistry {
    /// Create an empty registry with default concurrency and deadline.
    #[must_use]
    pub fn new(context: ScrapeContext) -> Self {
        Self::from_config(context, &RegistryConfig::default())
    }

    /// Create an empty registry using the `[registry]` settings.
    ///
    /// `disabled_sources` only applies to sources registered afterwards
    /// through [`ScraperRegistry::with_default_sources`].
    #[must_use]
    pub fn from_config(context: ScrapeContext, config: &RegistryConfig) -> Self {
        Self {
            context,
            sources: RwLock::new(BTreeMap::new()),
            max_concurrent: config.max_concurrent_sources.max(1),
            source_timeout: config.source_timeout(),
        }
    }

    /// Cap on sources searched at the same time.
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Deadline for a single source within a batch.
    #[must_use]
    pub fn with_source_timeout(mut self, source_timeout: Duration) -> Self {
        self.source_timeout = source_timeout;
        self
    }

    /// Context handed to every scraper this registry builds.
    #[must_use]
    pub fn context(&self) -> &ScrapeContext {
        &self.context
    }

    /// Register a source, or update an existing one in place.
    ///
    /// Re-registering keeps the accumulated counters and the enabled flag but
    /// drops any cached instance, so the next use builds one from `factory`.
    pub fn register<F, S>(&self, name: &str, category: &str, factory: F) -> Result<()>
    where
        F: Fn(SourceName, ScrapeContext) -> S + Send + Sync + 'static,
        S: ProductScraper + 'static,
    {
        let source = SourceName::new(name)?;
        let category = Category::new(category)?;
        let factory: ScraperFactory = Arc::new(move |name, context| {
            Arc::new(factory(name, context)) as Arc<dyn ProductScraper>
        });

        let mut sources = self.sources.write().expect("acquire write lock on sources");
        if let Some(existing) = sources.get(name) {
            existing.replace(category, factory);
            info!(source = %source, "re-registered source");
        } else {
            info!(source = %source, category = %category, "registered source");
            sources.insert(
                name.to_string(),
                Arc::new(SourceDescriptor::new(source, category, factory)),
            );
        }
        Ok(())
    }

    fn descriptor(&self, name: &str) -> Result<Arc<SourceDescriptor>> {
        self.sources
            .read()
            .expect("acquire read lock on sources")
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSource {
                name: name.to_string(),
            })
    }

    /// The scraper for `name`, built on first call and cached afterwards.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProductScraper>> {
        Ok(self.descriptor(name)?.instance(&self.context))
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<SourceName> {
        self.sources
            .read()
            .expect("acquire read lock on sources")
            .values()
            .map(|descriptor| descriptor.name().clone())
            .collect()
    }

    /// Distinct categories in sorted order.
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self
            .sources
            .read()
            .expect("acquire read lock on sources")
            .values()
            .map(|descriptor| descriptor.category())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    /// Sources whose category matches `label`, ignoring case.
    #[must_use]
    pub fn sources_in_category(&self, label: &str) -> Vec<SourceName> {
        self.sources
            .read()
            .expect("acquire read lock on sources")
            .values()
            .filter(|descriptor| descriptor.category().matches(label))
            .map(|descriptor| descriptor.name().clone())
            .collect()
    }

    /// Number of registered sources, enabled or not.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sources.read().expect("acquire read lock on sources").len()
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources
            .read()
            .expect("acquire read lock on sources")
            .contains_key(name)
    }

    /// Number of sources per category.
    #[must_use]
    pub fn count_by_category(&self) -> BTreeMap<Category, usize> {
        let sources = self.sources.read().expect("acquire read lock on sources");

        let mut counts = BTreeMap::new();
        for descriptor in sources.values() {
            *counts.entry(descriptor.category()).or_insert(0) += 1;
        }
        counts
    }

    /// Category of `name`, `None` if unregistered.
    #[must_use]
    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.descriptor(name).ok().map(|descriptor| descriptor.category())
    }

    /// Counter snapshot for one source.
    pub fn stats(&self, name: &str) -> Result<SourceStats> {
        Ok(self.descriptor(name)?.stats())
    }

    /// Snapshots of every source, sorted by name.
    #[must_use]
    pub fn all_stats(&self) -> Vec<SourceStats> {
        self.sources
            .read()
            .expect("acquire read lock on sources")
            .values()
            .map(|descriptor| descriptor.stats())
            .collect()
    }

    /// Enable or disable a source. Disabled sources are skipped by category
    /// and all-source batches.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        self.descriptor(name)?.set_enabled(enabled);
        info!(source = %name, enabled, "changed source state");
        Ok(())
    }

    /// Whether `name` takes part in category and all-source batches.
    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.descriptor(name)?.is_enabled())
    }

    /// Give the source's domain session a fresh identity and empty cookie jar.
    ///
    /// Returns `false` when the domain has no session yet.
    pub fn rotate_identity(&self, name: &str) -> Result<bool> {
        let scraper = self.get(name)?;
        let rotated = self.context.sessions().rotate_identity(scraper.domain());
        info!(source = %name, domain = %scraper.domain(), rotated, "identity rotation requested");
        Ok(rotated)
    }

    /// Search `query` across the selected sources.
    ///
    /// `sources` wins over `categories`; with neither, every enabled source is
    /// searched. See [`ScraperRegistry::batch_search_with`].
    pub async fn batch_search(
        &self,
        query: &str,
        sources: Option<&[String]>,
        categories: Option<&[String]>,
    ) -> Result<BatchResults> {
        let selection = SourceSelection::from_filters(sources, categories);
        self.batch_search_with(query, &selection).await
    }

    /// Search `query` across `selection`, at most `max_concurrent` sources at a time.
    ///
    /// Unknown explicit names fail the whole call before anything is
    /// dispatched. After that, every source gets exactly one entry: its
    /// records, or the error, deadline expiry or panic that ended it.
    /// Explicitly requested disabled sources get a `disabled` entry without
    /// being searched.
    pub async fn batch_search_with(
        &self,
        query: &str,
        selection: &SourceSelection,
    ) -> Result<BatchResults> {
        let targets = self.resolve(selection)?;
        let started = Instant::now();
        let mut batch = BatchResults::new(query);
        info!(
            batch_id = %batch.id,
            query = %query,
            sources = targets.len(),
            max_concurrent = self.max_concurrent,
            "starting batch search"
        );

        let mut futures = FuturesUnordered::new();

        for target in targets {
            match target {
                Target::Disabled(name) => {
                    debug!(source = %name, "skipping disabled source");
                    batch.insert(
                        name,
                        SourceResult::failure(
                            SourceError::new(ErrorKind::Disabled, "source is disabled"),
                            0,
                        ),
                    );
                }
                Target::Dispatch(descriptor) => {
                    futures.push(self.dispatch(descriptor, query));

                    // Respect concurrency limit
                    while futures.len() >= self.max_concurrent {
                        if let Some((name, result)) = futures.next().await {
                            batch.insert(name, result);
                        }
                    }
                }
            }
        }

        while let Some((name, result)) = futures.next().await {
            batch.insert(name, result);
        }

        info!(
            batch_id = %batch.id,
            succeeded = batch.succeeded().len(),
            failed = batch.failed().len(),
            records = batch.total_records(),
            elapsed_ms = millis(started.elapsed()),
            "batch search finished"
        );
        Ok(batch)
    }

    fn resolve(&self, selection: &SourceSelection) -> Result<Vec<Target>> {
        let sources = self.sources.read().expect("acquire read lock on sources");

        match selection {
            SourceSelection::Sources(names) => {
                let mut seen = HashSet::new();
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    let descriptor =
                        sources
                            .get(name.as_str())
                            .ok_or_else(|| RegistryError::UnknownSource {
                                name: name.clone(),
                            })?;
                    if !seen.insert(name.as_str()) {
                        continue;
                    }
                    targets.push(if descriptor.is_enabled() {
                        Target::Dispatch(Arc::clone(descriptor))
                    } else {
                        Target::Disabled(name.clone())
                    });
                }
                Ok(targets)
            }
            selection => Ok(sources
                .values()
                .filter(|descriptor| {
                    descriptor.is_enabled() && selection.includes_category(&descriptor.category())
                })
                .map(|descriptor| Target::Dispatch(Arc::clone(descriptor)))
                .collect()),
        }
    }

    /// Run one source's search behind its deadline and a panic boundary.
    async fn dispatch(
        &self,
        descriptor: Arc<SourceDescriptor>,
        query: &str,
    ) -> (String, SourceResult) {
        let name = descriptor.name().to_string();
        let started = Instant::now();

        let run = async {
            let scraper = descriptor.instance(&self.context);
            timeout(self.source_timeout, scraper.search(query)).await
        };

        let failure = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(Ok(records))) => {
                descriptor.record_success();
                let elapsed_ms = millis(started.elapsed());
                debug!(source = %name, records = records.len(), elapsed_ms, "source finished");
                return (name, SourceResult::success(records, elapsed_ms));
            }
            Ok(Ok(Err(e))) => {
                warn!(source = %name, kind = %e.kind(), error = %e, "source failed");
                SourceError::from(e)
            }
            Ok(Err(_)) => {
                warn!(
                    source = %name,
                    timeout_secs = self.source_timeout.as_secs(),
                    "source exceeded its deadline"
                );
                SourceError::new(
                    ErrorKind::Timeout,
                    format!(
                        "no result within {}ms",
                        millis(self.source_timeout)
                    ),
                )
            }
            Err(payload) => {
                let message = panic_message(&*payload);
                error!(source = %name, panic = %message, "source panicked");
                SourceError::new(ErrorKind::Panicked, message)
            }
        };

        descriptor.record_failure(&failure);
        (name, SourceResult::failure(failure, millis(started.elapsed())))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "scraper panicked".to_string())
}
