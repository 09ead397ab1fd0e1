//! Command orchestration for gcamreader.
//!
//! Resolves configuration, opens the database connection, parses the batch
//! file and drives the batch executor for the `local` and `remote` commands.

use std::io;

use tracing::{debug, info};

use crate::cli::{BatchArgs, Cli, Command, LocalArgs, RemoteArgs};
use crate::config::{
    Config, ConnectionConfig, LocalConfig, RemoteConfig, DEFAULT_HOSTNAME, DEFAULT_PORT,
};
use crate::db::{self, verify_database_dir};
use crate::error::{GcamError, Result};
use crate::export::{absolute, ResultWriter};
use crate::query::{parse_batch_query, BatchExecutor, BatchSummary};

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<BatchSummary> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.engine.apply_env_defaults();

    match &cli.command {
        Command::Local(args) => run_local(args, &config).await,
        Command::Remote(args) => run_remote(args, &config, prompt_password).await,
    }
}

/// Runs a batch against an on-disk database.
///
/// Fails before any query runs if the directory holds no `*.basex` files.
pub async fn run_local(args: &LocalArgs, config: &Config) -> Result<BatchSummary> {
    info!("opening: {}", absolute(&args.database_path).display());
    verify_database_dir(&args.database_path)?;

    let connection = ConnectionConfig::Local(LocalConfig {
        database_path: args.database_path.clone(),
    });
    run_batch(&connection, &args.batch, config).await
}

/// Runs a batch against a BaseX server.
///
/// `prompt` is asked for the password when none was supplied.
pub async fn run_remote<P>(args: &RemoteArgs, config: &Config, prompt: P) -> Result<BatchSummary>
where
    P: FnOnce(&str) -> io::Result<String>,
{
    let remote = resolve_remote(args, config, prompt)?;
    info!("opening: {}", remote.display_string());
    run_batch(&ConnectionConfig::Remote(remote), &args.batch, config).await
}

/// Builds the remote connection from CLI arguments, then config, then defaults.
pub fn resolve_remote<P>(args: &RemoteArgs, config: &Config, prompt: P) -> Result<RemoteConfig>
where
    P: FnOnce(&str) -> io::Result<String>,
{
    let username = args
        .username
        .clone()
        .or_else(|| config.remote.username.clone())
        .ok_or_else(|| {
            GcamError::config("a username is required (--username or remote.username in config)")
        })?;

    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt("Password: ")
            .map_err(|e| GcamError::internal(format!("Failed to read password: {e}")))?,
    };

    let hostname = args
        .hostname
        .clone()
        .or_else(|| config.remote.hostname.clone())
        .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string());

    let port = args.port.or(config.remote.port).unwrap_or(DEFAULT_PORT);

    Ok(RemoteConfig {
        username,
        password,
        hostname,
        port,
        database_name: args.database_name.clone(),
    })
}

async fn run_batch(
    connection: &ConnectionConfig,
    batch: &BatchArgs,
    config: &Config,
) -> Result<BatchSummary> {
    let client = db::connect(connection, &config.engine, &batch.scenarios).await?;
    debug!("Connected to {}", client.describe());

    let file_name = batch
        .query_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("parsing: {}", file_name);
    let queries = parse_batch_query(&batch.query_path)?;

    let writer = ResultWriter::new(batch.output_dir(), config.output.delimiter as u8);
    debug!("Writing results to {}", absolute(writer.output_dir()).display());
    let summary = BatchExecutor::new(client.as_ref(), &writer)
        .run(&queries)
        .await;

    info!(
        "extract complete ({} queries: {} saved, {} failed)",
        summary.total(),
        summary.saved.len(),
        summary.failed.len()
    );
    Ok(summary)
}

fn prompt_password(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}
