//! Remote scenario database client.
//!
//! Sends queries to a BaseX server through its REST interface
//! (`http://host:port/rest/<database>`) using HTTP basic authentication.

use crate::config::{EngineConfig, RemoteConfig};
use crate::db::xquery::build_xquery;
use crate::db::{DatabaseClient, QueryOutcome};
use crate::error::{GcamError, Result};
use crate::query::Query;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Maximum number of connection attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Query used to check credentials and database access.
const PROBE_QUERY: &str = "1";

/// Client for a database hosted on a BaseX server.
#[derive(Debug)]
pub struct RemoteClient {
    client: Client,
    url: Url,
    config: RemoteConfig,
    scenarios: Vec<String>,
}

impl RemoteClient {
    /// Connects to the server and verifies the credentials.
    ///
    /// Rejected credentials fail with an authentication error; an unknown
    /// database or unreachable server fails with a connection error.
    pub async fn connect(
        config: &RemoteConfig,
        engine: &EngineConfig,
        scenarios: &[String],
    ) -> Result<Self> {
        Self::connect_with_retry(
            config,
            engine,
            scenarios,
            MAX_RETRY_ATTEMPTS,
            Duration::from_millis(RETRY_BASE_DELAY_MS),
        )
        .await
    }

    async fn connect_with_retry(
        config: &RemoteConfig,
        engine: &EngineConfig,
        scenarios: &[String],
        attempts: u32,
        base_delay: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(engine.timeout_secs))
            .build()
            .map_err(|e| GcamError::connection(format!("Failed to create HTTP client: {}", e)))?;

        let remote = Self {
            client,
            url: config.rest_url()?,
            config: config.clone(),
            scenarios: scenarios.to_vec(),
        };

        let mut delay = base_delay;
        for attempt in 1..=attempts {
            debug!("Connection attempt {} of {}", attempt, attempts);

            match remote.probe().await {
                Ok(()) => {
                    debug!("Connected to {}", remote.url);
                    return Ok(remote);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    if attempt == attempts {
                        return Err(GcamError::connection(format!(
                            "cannot reach {}:{}: {}",
                            config.hostname, config.port, e
                        )));
                    }
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(map_probe_error(e, config)),
            }
        }

        Err(GcamError::connection(format!(
            "cannot reach {}:{}",
            config.hostname, config.port
        )))
    }

    async fn probe(&self) -> std::result::Result<(), ProbeError> {
        let response = self
            .post(rest_envelope(PROBE_QUERY, false))
            .send()
            .await
            .map_err(ProbeError::Transport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ProbeError::Status(status, body))
        }
    }

    fn post(&self, body: String) -> reqwest::RequestBuilder {
        self.client
            .post(self.url.clone())
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(CONTENT_TYPE, "application/xml")
            .body(body)
    }

    async fn fetch(&self, xquery: &str) -> Result<String> {
        let response = self
            .post(rest_envelope(xquery, true))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GcamError::query("request timed out")
                } else if e.is_connect() {
                    GcamError::query(format!("failed to connect to {}", self.url))
                } else {
                    GcamError::query(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GcamError::query(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(GcamError::query(format!(
                "server error ({}): {}",
                status,
                body.trim()
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl DatabaseClient for RemoteClient {
    async fn run_query(&self, query: &Query) -> QueryOutcome {
        let xquery = build_xquery(query, &self.scenarios);
        match self.fetch(&xquery).await {
            Ok(body) => QueryOutcome::from_engine_output(&body),
            Err(e) => QueryOutcome::no_result(e.to_string()),
        }
    }

    fn describe(&self) -> String {
        self.config.display_string()
    }
}

#[derive(Debug)]
enum ProbeError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

impl ProbeError {
    fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Status(status, body) if body.trim().is_empty() => write!(f, "{}", status),
            Self::Status(status, body) => write!(f, "{}: {}", status, body.trim()),
        }
    }
}

/// Maps a non-transient probe failure to a user-facing error.
fn map_probe_error(err: ProbeError, config: &RemoteConfig) -> GcamError {
    match &err {
        ProbeError::Status(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            GcamError::authentication(format!(
                "server rejected credentials for '{}'",
                config.username
            ))
        }
        ProbeError::Status(StatusCode::NOT_FOUND, _) => GcamError::connection(format!(
            "database '{}' not found on {}:{}",
            config.database_name, config.hostname, config.port
        )),
        _ => GcamError::connection(format!(
            "{}:{} refused the connection: {}",
            config.hostname, config.port, err
        )),
    }
}

/// Wraps an XQuery in a BaseX REST `<query>` request body.
///
/// With `csv` set the server serializes the result as CSV with a header row.
fn rest_envelope(xquery: &str, csv: bool) -> String {
    let mut body = String::from("<query xmlns=\"http://basex.org/rest\">\n");
    body.push_str("  <text><![CDATA[");
    body.push_str(&xquery.replace("]]>", "]]]]><![CDATA[>"));
    body.push_str("]]></text>\n");
    if csv {
        body.push_str("  <parameter name=\"method\" value=\"csv\"/>\n");
        body.push_str("  <parameter name=\"csv\" value=\"header=yes\"/>\n");
    }
    body.push_str("</query>");
    body
}
