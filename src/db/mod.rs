//! Database abstraction layer for gcamreader.
//!
//! Provides a trait-based interface over the two ways of reaching a
//! scenario database, so the batch executor does not care which is in use.

mod local;
mod mock;
mod remote;
mod types;
pub mod xquery;

pub use local::{verify_database_dir, LocalClient};
pub use mock::MockDatabaseClient;
pub use remote::RemoteClient;
pub use types::{QueryOutcome, QueryResult, Row};

use crate::config::{ConnectionConfig, EngineConfig};
use crate::error::Result;
use crate::query::Query;
use async_trait::async_trait;

/// Creates a database client for the given connection.
///
/// This is the central factory function for database connections. Local
/// databases must already have passed [`verify_database_dir`].
pub async fn connect(
    config: &ConnectionConfig,
    engine: &EngineConfig,
    scenarios: &[String],
) -> Result<Box<dyn DatabaseClient>> {
    match config {
        ConnectionConfig::Local(local) => {
            Ok(Box::new(LocalClient::connect(local, engine, scenarios)))
        }
        ConnectionConfig::Remote(remote) => {
            let client = RemoteClient::connect(remote, engine, scenarios).await?;
            Ok(Box::new(client))
        }
    }
}

/// Trait defining the interface for scenario database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Runs one query.
    ///
    /// Failures scoped to this query come back as [`QueryOutcome::NoResult`];
    /// they never abort the caller's batch.
    async fn run_query(&self, query: &Query) -> QueryOutcome;

    /// Display-safe description of the database, for logs.
    fn describe(&self) -> String;
}
