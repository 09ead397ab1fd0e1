//! Batch queries for gcamreader.
//!
//! This module holds the query descriptor, the batch document parser, and
//! the executor that runs a batch against a database connection.

pub mod batch;
pub mod executor;

pub use batch::{parse_batch_query, parse_batch_str};
pub use executor::{BatchExecutor, BatchSummary};

/// One named query parsed from a batch document.
///
/// The definition is the verbatim XML of the query element and is handed to
/// the engine unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    title: String,
    definition: String,
    regions: Vec<String>,
}

impl Query {
    /// Creates a query with no region filter.
    pub fn new(title: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            definition: definition.into(),
            regions: Vec::new(),
        }
    }

    /// Restricts the query to the given regions.
    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    /// Returns the query title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the XML query definition.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns the region filter. Empty means all regions.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }
}
