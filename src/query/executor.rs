//! Batch execution.
//!
//! Runs every query of a batch, in order, over one database connection and
//! hands each result to the writer. A query that yields nothing, or whose
//! file cannot be written, is logged and skipped; the rest of the batch
//! still runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, warn};

use crate::db::{DatabaseClient, QueryOutcome};
use crate::export::{absolute, ResultWriter};
use crate::query::Query;

/// Runs batches of queries against one database client.
pub struct BatchExecutor<'a> {
    db: &'a dyn DatabaseClient,
    writer: &'a ResultWriter,
}

impl<'a> BatchExecutor<'a> {
    /// Creates a new batch executor.
    pub fn new(db: &'a dyn DatabaseClient, writer: &'a ResultWriter) -> Self {
        Self { db, writer }
    }

    /// Runs `queries` sequentially in the given order.
    ///
    /// Every query ends up either saved or failed in the returned summary.
    pub async fn run(&self, queries: &[Query]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut written: HashMap<PathBuf, &str> = HashMap::new();

        for query in queries {
            info!("running: {}", query.title());
            let start = Instant::now();

            let result = match self.db.run_query(query).await {
                QueryOutcome::Data(result) => result,
                QueryOutcome::NoResult { reason } => {
                    warn!("failed: {} ({})", query.title(), reason);
                    summary.failed.push(FailedQuery::new(query, reason));
                    continue;
                }
            };

            let path = self.writer.output_path(query);
            if !self.writer.stays_in_output_dir(query) {
                warn!(
                    "'{}' resolves outside the output directory: {}",
                    query.title(),
                    path.display()
                );
            }
            if let Some(previous) = written.get(&path) {
                warn!(
                    "'{}' and '{}' share {}; overwriting",
                    previous,
                    query.title(),
                    path.display()
                );
            }

            match self.writer.write(query, &result) {
                Ok(path) => {
                    info!(
                        "saved: {} ({} rows in {:?})",
                        absolute(&path).display(),
                        result.row_count(),
                        start.elapsed()
                    );
                    written.insert(path.clone(), query.title());
                    summary.saved.push(path);
                }
                Err(e) => {
                    warn!("failed: {} ({})", query.title(), e);
                    summary.failed.push(FailedQuery::new(query, e.to_string()));
                }
            }
        }

        summary
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Files written, in query order.
    pub saved: Vec<PathBuf>,
    /// Queries that produced no file, in query order.
    pub failed: Vec<FailedQuery>,
}

impl BatchSummary {
    /// Total number of queries accounted for.
    pub fn total(&self) -> usize {
        self.saved.len() + self.failed.len()
    }
}

/// A query that produced no output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedQuery {
    pub title: String,
    pub reason: String,
}

impl FailedQuery {
    fn new(query: &Query, reason: impl Into<String>) -> Self {
        Self {
            title: query.title().to_string(),
            reason: reason.into(),
        }
    }
}
