//! Command-line argument parsing for gcamreader.
//!
//! Uses clap to parse the `local` and `remote` subcommands. `local` is the
//! default subcommand when none is named.

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Run queries against a gcam scenario database.
///
/// Saves outputs as .csv
#[derive(Parser, Debug)]
#[command(name = "gcamreader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query gcam scenario databases
    Local(LocalArgs),

    /// Query a remote server containing gcam scenario databases
    Remote(RemoteArgs),
}

/// Options for the `local` subcommand.
#[derive(Args, Debug)]
pub struct LocalArgs {
    /// Path to database file (i.e. parent of *.basex dir)
    #[arg(short = 'd', long = "database_path", value_name = "DIR", value_parser = existing_dir)]
    pub database_path: PathBuf,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Options for the `remote` subcommand.
#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Username of remote server authentication
    #[arg(short = 'u', long, value_name = "USER")]
    pub username: Option<String>,

    /// Password of remote server authentication (prompted if omitted)
    #[arg(
        short = 'w',
        long,
        value_name = "PASSWORD",
        env = "GCAMREADER_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    /// Hostname of remote server [default: localhost]
    #[arg(short = 'n', long, value_name = "HOST")]
    pub hostname: Option<String>,

    /// Port of remote server [default: 8984]
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Name of database to query (i.e. parent of *.basex dir)
    #[arg(short = 'd', long = "database_name", value_name = "NAME")]
    pub database_name: String,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Options shared by both subcommands.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Path to xml with queries to run (i.e: Main_queries.xml)
    #[arg(short = 'q', long = "query_path", value_name = "FILE", value_parser = existing_file)]
    pub query_path: PathBuf,

    /// Path to output (i.e. where .csv files should be created) [default: .]
    #[arg(short = 'o', long = "output_path", value_name = "DIR", value_parser = existing_dir)]
    pub output_path: Option<PathBuf>,

    /// Only query this scenario (repeatable; default: all scenarios)
    #[arg(short = 's', long = "scenario", value_name = "NAME")]
    pub scenarios: Vec<String>,
}

impl BatchArgs {
    /// Directory results are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.output_path.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse_from(with_default_subcommand(std::env::args_os()))
    }
}

/// Inserts `local` when the arguments do not start with a subcommand.
///
/// Leading `--config` options are skipped over, and top-level help and
/// version flags are left alone.
pub fn with_default_subcommand<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let mut idx = 1;
    while let Some(arg) = args.get(idx).and_then(|a| a.to_str()) {
        if arg == "--config" {
            // Leave a dangling `--config` for clap to reject
            if idx + 1 >= args.len() {
                break;
            }
            idx += 2;
        } else if arg.starts_with("--config=") {
            idx += 1;
        } else {
            break;
        }
    }

    let explicit = args.get(idx).and_then(|a| a.to_str()).is_some_and(|first| {
        matches!(
            first,
            "local" | "remote" | "help" | "-h" | "--help" | "-V" | "--version"
        )
    });

    if !explicit {
        let at = idx.min(args.len());
        args.insert(at, OsString::from("local"));
    }
    args
}

fn existing_dir(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory '{s}' does not exist"))
    }
}

fn existing_file(s: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(s);
    if path.is_file() {
        Ok(path)
    } else {
        Err(format!("file '{s}' does not exist"))
    }
}
