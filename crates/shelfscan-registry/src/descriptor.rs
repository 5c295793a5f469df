//! Per-source registry metadata and counters.

use serde::{Deserialize, Serialize};
use shelfscan_core::{Category, SourceName, Timestamp};
use shelfscan_scraper::{ProductScraper, ScrapeContext, SourceError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Builds a scraper for a source from its registry key and the shared context.
pub type ScraperFactory =
    Arc<dyn Fn(SourceName, ScrapeContext) -> Arc<dyn ProductScraper> + Send + Sync>;

#[derive(Debug, Default)]
struct History {
    last_success: Option<Timestamp>,
    last_failure: Option<Timestamp>,
    last_error: Option<String>,
}

/// Registry entry for one source.
///
/// Descriptors live for the life of the registry. Re-registration swaps the
/// category and factory in place, so counters survive it.
pub struct SourceDescriptor {
    name: SourceName,
    category: RwLock<Category>,
    factory: RwLock<ScraperFactory>,
    instance: Mutex<Option<Arc<dyn ProductScraper>>>,
    enabled: AtomicBool,
    successes: AtomicU64,
    failures: AtomicU64,
    history: Mutex<History>,
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("name", &self.name)
            .field("category", &self.category())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl SourceDescriptor {
    pub(crate) fn new(name: SourceName, category: Category, factory: ScraperFactory) -> Self {
        Self {
            name,
            category: RwLock::new(category),
            factory: RwLock::new(factory),
            instance: Mutex::new(None),
            enabled: AtomicBool::new(true),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            history: Mutex::new(History::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &SourceName {
        &self.name
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
            .read()
            .expect("acquire read lock on category")
            .clone()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Swap category and factory; the cached instance is dropped.
    pub(crate) fn replace(&self, category: Category, factory: ScraperFactory) {
        *self.category.write().expect("acquire write lock on category") = category;
        *self.factory.write().expect("acquire write lock on factory") = factory;
        self.instance
            .lock()
            .expect("acquire scraper instance lock")
            .take();
    }

    /// The cached scraper, built on first use.
    ///
    /// The factory runs without the instance lock held, so a panicking factory
    /// leaves the descriptor usable. When two callers race, the first stored
    /// instance wins.
    pub(crate) fn instance(&self, context: &ScrapeContext) -> Arc<dyn ProductScraper> {
        if let Some(scraper) = self
            .instance
            .lock()
            .expect("acquire scraper instance lock")
            .as_ref()
        {
            return Arc::clone(scraper);
        }

        let factory = Arc::clone(&*self.factory.read().expect("acquire read lock on factory"));
        let built = factory(self.name.clone(), context.clone());

        let mut instance = self.instance.lock().expect("acquire scraper instance lock");
        Arc::clone(instance.get_or_insert(built))
    }

    pub(crate) fn is_instantiated(&self) -> bool {
        self.instance
            .lock()
            .expect("acquire scraper instance lock")
            .is_some()
    }

    pub(crate) fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::AcqRel);
        self.history.lock().expect("acquire history lock").last_success = Some(Timestamp::now());
    }

    pub(crate) fn record_failure(&self, error: &SourceError) {
        self.failures.fetch_add(1, Ordering::AcqRel);
        let mut history = self.history.lock().expect("acquire history lock");
        history.last_failure = Some(Timestamp::now());
        history.last_error = Some(error.to_string());
    }

    /// Point-in-time copy of the counters.
    #[must_use]
    pub fn stats(&self) -> SourceStats {
        let history = self.history.lock().expect("acquire history lock");
        SourceStats {
            name: self.name.to_string(),
            category: self.category().to_string(),
            enabled: self.is_enabled(),
            success_count: self.successes.load(Ordering::Acquire),
            failure_count: self.failures.load(Ordering::Acquire),
            last_success: history.last_success,
            last_failure: history.last_failure,
            last_error: history.last_error.clone(),
        }
    }
}

/// Monitoring snapshot of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub name: String,
    pub category: String,
    pub enabled: bool,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_success: Option<Timestamp>,
    pub last_failure: Option<Timestamp>,
    /// Message of the most recent failure
    pub last_error: Option<String>,
}
