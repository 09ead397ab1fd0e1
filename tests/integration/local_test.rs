//! End-to-end tests of the `local` command.
//!
//! A shell script stands in for the java engine: it records its arguments
//! and prints canned CSV depending on which query it was handed.

use super::common::{batch_args, file_names};
use gcamreader::app::run_local;
use gcamreader::cli::LocalArgs;
use gcamreader::config::Config;
use gcamreader::error::GcamError;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct LocalFixture {
    dir: TempDir,
}

impl LocalFixture {
    /// Creates a database directory holding `*.basex` files and an output directory.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("output").join("database_basexdb");
        fs::create_dir_all(&db).unwrap();
        fs::write(db.join("tbl.basex"), b"").unwrap();
        fs::write(db.join("inf.basex"), b"").unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();
        Self { dir }
    }

    fn database_path(&self) -> PathBuf {
        self.dir.path().join("output").join("database_basexdb")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn calls_file(&self) -> PathBuf {
        self.dir.path().join("calls.log")
    }

    fn args_file(&self) -> PathBuf {
        self.dir.path().join("args.log")
    }

    fn args(&self, queries: &str) -> LocalArgs {
        LocalArgs {
            database_path: self.database_path(),
            batch: batch_args(queries, &self.out()),
        }
    }

    fn engine_calls(&self) -> usize {
        fs::read_to_string(self.calls_file())
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    /// Writes the stub engine and returns a config that runs it.
    #[cfg(unix)]
    fn config(&self) -> Config {
        use std::os::unix::fs::PermissionsExt;

        let script = self.dir.path().join("fake-java");
        let body = format!(
            r#"#!/bin/sh
echo call >> "{calls}"
printf '%s\n' "$@" > "{args}"
for last in "$@"; do :; done
case "$last" in
  *"Land Allocation"*) echo "Stopped at line 3: query failed" >&2; exit 1 ;;
  *"CO2 Emissions"*) printf 'scenario,region,Year,value,Units\nReference,USA,2020,5012.3,MTCO2\n' ;;
  *) printf 'scenario,region,Year,value,Units\nReference,USA,2020,331.5,thous\nReference,China,2020,1411.1,thous\n' ;;
esac
"#,
            calls = self.calls_file().display(),
            args = self.args_file().display(),
        );
        fs::write(&script, body).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.engine.java = Some(script.to_string_lossy().into_owned());
        config.engine.classpath = Some("/opt/gcam/ModelInterface.jar".to_string());
        config
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_writes_one_file_per_successful_query() {
    let fx = LocalFixture::new();
    let config = fx.config();

    let summary = run_local(&fx.args("main_queries.xml"), &config).await.unwrap();

    assert_eq!(fx.engine_calls(), 3);
    assert_eq!(summary.saved.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].title, "Land Allocation");
    assert!(summary.failed[0].reason.contains("query failed"));
    assert_eq!(
        file_names(&fx.out()),
        vec!["co2_emissions.csv", "population_by_region.csv"]
    );

    assert_eq!(
        read(&fx.out().join("population_by_region.csv")),
        "scenario|region|Year|value|Units\n\
         Reference|USA|2020|331.5|thous\n\
         Reference|China|2020|1411.1|thous\n"
    );
    assert_eq!(
        read(&fx.out().join("co2_emissions.csv")),
        "scenario|region|Year|value|Units\nReference|USA|2020|5012.3|MTCO2\n"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_engine_arguments() {
    let fx = LocalFixture::new();
    let config = fx.config();

    let mut args = fx.args("main_queries.xml");
    args.batch.scenarios = vec!["Reference".to_string()];
    run_local(&args, &config).await.unwrap();

    // The last invocation is the Land Allocation query
    let recorded = read(&fx.args_file());
    let db_root = fx.dir.path().join("output");
    assert!(recorded.contains(&format!("-Dorg.basex.DBPATH={}", db_root.display())));
    assert!(recorded.contains("-cp\n/opt/gcam/ModelInterface.jar\n"));
    assert!(recorded.contains("-i\ndatabase_basexdb\n"));
    assert!(recorded.contains("mi:runMIQuery(<supplyDemandQuery title=\"Land Allocation\">"));
    assert!(recorded.contains("(\"Reference\"), ())"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_runs_are_byte_identical() {
    let fx = LocalFixture::new();
    let config = fx.config();

    run_local(&fx.args("main_queries.xml"), &config).await.unwrap();
    let first = fs::read(fx.out().join("population_by_region.csv")).unwrap();

    run_local(&fx.args("main_queries.xml"), &config).await.unwrap();
    let second = fs::read(fx.out().join("population_by_region.csv")).unwrap();

    assert_eq!(first, second);
}

#[cfg(unix)]
#[tokio::test]
async fn test_local_empty_batch_runs_no_queries() {
    let fx = LocalFixture::new();
    let config = fx.config();

    let summary = run_local(&fx.args("empty_queries.xml"), &config).await.unwrap();

    assert_eq!(summary.total(), 0);
    assert_eq!(fx.engine_calls(), 0);
    assert!(file_names(&fx.out()).is_empty());
}

#[tokio::test]
async fn test_local_without_basex_files_fails_fast() {
    let fx = LocalFixture::new();
    fs::remove_file(fx.database_path().join("tbl.basex")).unwrap();
    fs::remove_file(fx.database_path().join("inf.basex")).unwrap();

    let err = run_local(&fx.args("main_queries.xml"), &Config::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GcamError::Connection(_)));
    assert!(err.to_string().contains("basex files missing"));
    assert_eq!(fx.engine_calls(), 0);
    assert!(file_names(&fx.out()).is_empty());
}

#[tokio::test]
async fn test_local_malformed_batch_fails_before_queries() {
    let fx = LocalFixture::new();
    let broken = fx.dir.path().join("broken.xml");
    fs::write(&broken, "<queries>\n  <aQuery>\n    <q title=\"A\">\n</queries>\n").unwrap();

    let mut args = fx.args("main_queries.xml");
    args.batch.query_path = broken;

    let err = run_local(&args, &Config::default()).await.unwrap_err();

    assert!(matches!(err, GcamError::Parse(_)));
    assert!(err.to_string().contains("broken.xml:"));
    assert!(file_names(&fx.out()).is_empty());
}
