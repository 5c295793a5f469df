//! Which sources a batch search targets.

use serde::{Deserialize, Serialize};
use shelfscan_core::Category;

/// Target set of a batch search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    /// Every enabled source
    #[default]
    All,
    /// Enabled sources whose category matches any label, ignoring case
    Categories(Vec<String>),
    /// Exactly these sources, in the order given
    Sources(Vec<String>),
}

impl SourceSelection {
    /// Resolve the optional filters of a batch request.
    ///
    /// An explicit source list wins over categories; empty lists count as
    /// absent.
    pub fn from_filters(sources: Option<&[String]>, categories: Option<&[String]>) -> Self {
        match (sources, categories) {
            (Some(names), _) if !names.is_empty() => Self::Sources(dedup(names)),
            (_, Some(labels)) if !labels.is_empty() => Self::Categories(dedup(labels)),
            _ => Self::All,
        }
    }

    pub fn sources<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sources(names.into_iter().map(Into::into).collect())
    }

    pub fn categories<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Categories(labels.into_iter().map(Into::into).collect())
    }

    /// Whether an enabled source in `category` is picked up by a non-explicit selection.
    pub fn includes_category(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Categories(labels) => labels.iter().any(|label| category.matches(label)),
            Self::Sources(_) => false,
        }
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !seen.iter().any(|v: &String| v == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
