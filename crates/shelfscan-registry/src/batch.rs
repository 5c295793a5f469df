//! Batch search result map.

use serde::{Deserialize, Serialize};
use shelfscan_core::ProductRecord;
use shelfscan_scraper::SourceError;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Outcome of one source within a batch.
///
/// An empty `records` list with no `error` means the source found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Records in the order the site listed them
    pub records: Vec<ProductRecord>,
    /// Present when the source failed
    pub error: Option<SourceError>,
    /// Wall time spent on this source
    pub elapsed_ms: u64,
}

impl SourceResult {
    #[must_use]
    pub fn success(records: Vec<ProductRecord>, elapsed_ms: u64) -> Self {
        Self {
            records,
            error: None,
            elapsed_ms,
        }
    }

    #[must_use]
    pub fn failure(error: SourceError, elapsed_ms: u64) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
            elapsed_ms,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One entry per requested source, keyed by source name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Correlates the batch with its log lines
    pub id: Uuid,
    pub query: String,
    pub results: BTreeMap<String, SourceResult>,
}

impl BatchResults {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            results: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, source: impl Into<String>, result: SourceResult) {
        self.results.insert(source.into(), result);
    }

    #[must_use]
    pub fn get(&self, source: &str) -> Option<&SourceResult> {
        self.results.get(source)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Sources that completed without error.
    #[must_use]
    pub fn succeeded(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, result)| result.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Sources that failed, with their errors.
    #[must_use]
    pub fn failed(&self) -> Vec<(&str, &SourceError)> {
        self.results
            .iter()
            .filter_map(|(name, result)| result.error.as_ref().map(|e| (name.as_str(), e)))
            .collect()
    }

    #[must_use]
    pub fn total_records(&self) -> usize {
        self.results.values().map(|result| result.records.len()).sum()
    }

    /// Every record, grouped by source name order.
    #[must_use]
    pub fn all_records(&self) -> Vec<&ProductRecord> {
        self.results
            .values()
            .flat_map(|result| result.records.iter())
            .collect()
    }
}
