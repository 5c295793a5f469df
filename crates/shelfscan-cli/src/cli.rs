//! Command-line arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Search retail sites for products and print standardized records as JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "shelfscan", version, about)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "SHELFSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Search every selected source concurrently
    Search {
        /// Free-text product query
        query: String,

        /// Restrict to these sources (repeatable, wins over --category)
        #[arg(long = "source", short = 's')]
        sources: Vec<String>,

        /// Restrict to sources in these categories (repeatable)
        #[arg(long = "category", short = 'c')]
        categories: Vec<String>,
    },

    /// Look up a single product page
    Product {
        /// Registered source name
        source: String,

        /// Product page URL
        url: String,
    },

    /// List registered sources with their counters
    Sources,
}
