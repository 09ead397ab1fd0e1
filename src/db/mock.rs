//! Mock database client for testing.
//!
//! Returns canned outcomes keyed by query title and counts engine calls.

use super::{DatabaseClient, QueryOutcome, QueryResult};
use crate::query::Query;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A mock database client that returns predefined results.
///
/// Titles without a canned outcome get a one-row result naming the title.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    outcomes: HashMap<String, QueryOutcome>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates a new mock client with no canned outcomes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the outcome returned for queries titled `title`.
    pub fn with_outcome(mut self, title: impl Into<String>, outcome: QueryOutcome) -> Self {
        self.outcomes.insert(title.into(), outcome);
        self
    }

    /// Registers a no-result outcome for queries titled `title`.
    pub fn failing(self, title: impl Into<String>) -> Self {
        self.with_outcome(title, QueryOutcome::no_result("mock engine failure"))
    }

    /// Number of queries run so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Titles of the queries run so far, in call order.
    pub fn titles_seen(&self) -> Vec<String> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn run_query(&self, query: &Query) -> QueryOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.title().to_string());
        }

        self.outcomes.get(query.title()).cloned().unwrap_or_else(|| {
            QueryOutcome::Data(QueryResult::with_data(
                vec!["title".to_string(), "value".to_string()],
                vec![vec![query.title().to_string(), "1".to_string()]],
            ))
        })
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
