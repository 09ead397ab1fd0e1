//! Local scenario database client.
//!
//! Runs each query by spawning the ModelInterface/BaseX engine in a JVM
//! against an on-disk BaseX database and reading CSV from its stdout.

use crate::config::{EngineConfig, LocalConfig};
use crate::db::xquery::build_xquery;
use crate::db::{DatabaseClient, QueryOutcome};
use crate::error::{GcamError, Result};
use crate::query::Query;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Engine entry point class.
const BASEX_MAIN: &str = "org.basex.BaseX";

/// Checks that `path` is a BaseX database directory.
///
/// The directory must contain at least one `*.basex` file.
pub fn verify_database_dir(path: &Path) -> Result<()> {
    let entries = std::fs::read_dir(path).map_err(|e| {
        GcamError::connection(format!("cannot open database {}: {}", path.display(), e))
    })?;

    let has_basex = entries
        .filter_map(|entry| entry.ok())
        .any(|entry| entry.path().extension().is_some_and(|ext| ext == "basex"));

    if has_basex {
        Ok(())
    } else {
        Err(GcamError::connection(format!(
            "basex files missing: {}",
            path.display()
        )))
    }
}

/// Client for an on-disk scenario database.
#[derive(Debug)]
pub struct LocalClient {
    database: LocalConfig,
    engine: EngineConfig,
    scenarios: Vec<String>,
}

impl LocalClient {
    /// Creates a client for the database at `database.database_path`.
    ///
    /// The directory is assumed to have passed [`verify_database_dir`].
    pub fn connect(database: &LocalConfig, engine: &EngineConfig, scenarios: &[String]) -> Self {
        debug!(
            "Local engine: {} -cp {} (db root {}, db {})",
            engine.java(),
            engine.classpath(),
            database.db_root().display(),
            database.db_name()
        );
        Self {
            database: database.clone(),
            engine: engine.clone(),
            scenarios: scenarios.to_vec(),
        }
    }

    /// Arguments passed to the java executable for one XQuery.
    fn engine_args(&self, xquery: &str) -> Vec<OsString> {
        let mut db_path = OsString::from("-Dorg.basex.DBPATH=");
        db_path.push(self.database.db_root());

        vec![
            format!("-Xmx{}", self.engine.max_memory).into(),
            "-cp".into(),
            self.engine.classpath().into(),
            db_path,
            "-DModelInterface.SUPPRESS_OUTPUT=true".into(),
            BASEX_MAIN.into(),
            "-smethod=csv".into(),
            "-scsv=header=yes".into(),
            "-i".into(),
            self.database.db_name().into(),
            xquery.into(),
        ]
    }

    async fn run_engine(&self, xquery: &str) -> Result<String> {
        let mut child = Command::new(self.engine.java())
            .args(self.engine_args(xquery))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GcamError::query(format!("failed to start {}: {}", self.engine.java(), e))
            })?;

        // Drain both pipes before wait() so a chatty engine cannot block on a full pipe
        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        let secs = self.engine.timeout_secs;
        let (status, stdout, stderr) = timeout(Duration::from_secs(secs), async {
            let (stdout_result, stderr_result) = tokio::join!(
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut out) = stdout_handle {
                        out.read_to_end(&mut buf).await?;
                    }
                    Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
                },
                async {
                    let mut buf = Vec::new();
                    if let Some(ref mut err) = stderr_handle {
                        err.read_to_end(&mut buf).await?;
                    }
                    Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf).into_owned())
                }
            );

            let stdout = stdout_result?;
            let stderr = stderr_result?;
            let status = child.wait().await?;

            Ok::<_, std::io::Error>((status, stdout, stderr))
        })
        .await
        .map_err(|_| GcamError::query(format!("engine timed out after {secs} seconds")))?
        .map_err(|e| GcamError::query(e.to_string()))?;

        if !status.success() {
            let detail = stderr.trim();
            return Err(GcamError::query(if detail.is_empty() {
                format!("engine exited with {status}")
            } else {
                format!("engine exited with {status}: {detail}")
            }));
        }

        if !stderr.trim().is_empty() {
            debug!("engine stderr: {}", stderr.trim());
        }

        Ok(stdout)
    }
}

#[async_trait]
impl DatabaseClient for LocalClient {
    async fn run_query(&self, query: &Query) -> QueryOutcome {
        let xquery = build_xquery(query, &self.scenarios);
        match self.run_engine(&xquery).await {
            Ok(stdout) => QueryOutcome::from_engine_output(&stdout),
            Err(e) => QueryOutcome::no_result(e.to_string()),
        }
    }

    fn describe(&self) -> String {
        self.database.database_path.display().to_string()
    }
}
