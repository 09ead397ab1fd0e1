//! End-to-end tests of the `remote` command against an in-process HTTP stub
//! of the BaseX REST interface.

use super::common::{batch_args, file_names};
use gcamreader::app::run_remote;
use gcamreader::cli::RemoteArgs;
use gcamreader::config::Config;
use gcamreader::error::GcamError;
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// `gcam:s3cret`
const EXPECTED_AUTH: &str = "Basic Z2NhbTpzM2NyZXQ=";
const DATABASE_PATH: &str = "/rest/database_basexdb";

/// Request bodies of every query (non-probe) request the stub received.
#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    fn bodies(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

/// How the stub treats query (non-probe) requests.
#[derive(Clone, Copy)]
enum QueryMode {
    /// Answer with canned CSV keyed by query title.
    Answer,
    /// Close the socket without responding.
    Hangup,
}

struct StubServer {
    port: u16,
    recorded: Recorded,
}

impl StubServer {
    async fn start() -> Self {
        Self::start_with(QueryMode::Answer).await
    }

    async fn start_with(mode: QueryMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let recorded = Recorded::default();

        let shared = recorded.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let recorded = shared.clone();
                tokio::spawn(async move {
                    let _ = handle(socket, recorded, mode).await;
                });
            }
        });

        Self { port, recorded }
    }
}

async fn handle(
    mut socket: TcpStream,
    recorded: Recorded,
    mode: QueryMode,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let mut auth = String::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            if name.eq_ignore_ascii_case("authorization") {
                auth = value.to_string();
            } else if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    let path = request_line.split_whitespace().nth(1).unwrap_or_default();
    let (status, payload) = if auth != EXPECTED_AUTH {
        ("401 Unauthorized", "Access denied: gcam.".to_string())
    } else if path != DATABASE_PATH {
        ("404 Not Found", "Database not found.".to_string())
    } else if !body.contains("<parameter name=\"method\"") {
        ("200 OK", "1".to_string())
    } else {
        recorded.queries.lock().unwrap().push(body.clone());
        if let QueryMode::Hangup = mode {
            return Ok(());
        }
        respond_to_query(&body)
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

fn respond_to_query(body: &str) -> (&'static str, String) {
    if body.contains("title=\"Land Allocation\"") {
        (
            "400 Bad Request",
            "Stopped at line 2: unknown query".to_string(),
        )
    } else if body.contains("title=\"CO2 Emissions\"") {
        (
            "200 OK",
            "scenario,region,Year,value,Units\r\nReference,USA,2020,5012.3,MTCO2\r\n".to_string(),
        )
    } else {
        (
            "200 OK",
            "scenario,region,Year,value,Units\r\nReference,USA,2020,331.5,thous\r\n".to_string(),
        )
    }
}

fn remote_args(port: u16, password: &str, database: &str, out: &Path) -> RemoteArgs {
    RemoteArgs {
        username: Some("gcam".to_string()),
        password: Some(password.to_string()),
        hostname: Some("127.0.0.1".to_string()),
        port: Some(port),
        database_name: database.to_string(),
        batch: batch_args("main_queries.xml", out),
    }
}

fn no_prompt(_: &str) -> std::io::Result<String> {
    panic!("password prompt should not be shown")
}

#[tokio::test]
async fn test_remote_writes_one_file_per_successful_query() {
    let server = StubServer::start().await;
    let out = tempfile::tempdir().unwrap();

    let args = remote_args(server.port, "s3cret", "database_basexdb", out.path());
    let summary = run_remote(&args, &Config::default(), no_prompt)
        .await
        .unwrap();

    assert_eq!(server.recorded.count(), 3);
    assert_eq!(summary.saved.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].title, "Land Allocation");
    assert_eq!(
        file_names(out.path()),
        vec!["co2_emissions.csv", "population_by_region.csv"]
    );
    assert_eq!(
        std::fs::read_to_string(out.path().join("co2_emissions.csv")).unwrap(),
        "scenario|region|Year|value|Units\nReference|USA|2020|5012.3|MTCO2\n"
    );
}

#[tokio::test]
async fn test_remote_sends_filters_in_query() {
    let server = StubServer::start().await;
    let out = tempfile::tempdir().unwrap();

    let mut args = remote_args(server.port, "s3cret", "database_basexdb", out.path());
    args.batch.scenarios = vec!["Reference".to_string()];
    run_remote(&args, &Config::default(), no_prompt)
        .await
        .unwrap();

    let bodies = server.recorded.bodies();
    assert_eq!(bodies.len(), 3);
    assert!(bodies
        .iter()
        .all(|b| b.contains("<query xmlns=\"http://basex.org/rest\">")));
    assert!(bodies[0].contains("(\"Reference\"), ())"));
    assert!(bodies[1].contains("(\"Reference\"), (\"USA\"))"));
}

#[tokio::test]
async fn test_remote_invalid_password_runs_no_queries() {
    let server = StubServer::start().await;
    let out = tempfile::tempdir().unwrap();

    let args = remote_args(server.port, "wrong", "database_basexdb", out.path());
    let err = run_remote(&args, &Config::default(), no_prompt)
        .await
        .unwrap_err();

    assert!(matches!(err, GcamError::Authentication(_)));
    assert_eq!(server.recorded.count(), 0);
    assert!(file_names(out.path()).is_empty());
}

#[tokio::test]
async fn test_remote_unknown_database() {
    let server = StubServer::start().await;
    let out = tempfile::tempdir().unwrap();

    let args = remote_args(server.port, "s3cret", "no_such_db", out.path());
    let err = run_remote(&args, &Config::default(), no_prompt)
        .await
        .unwrap_err();

    assert!(matches!(err, GcamError::Connection(_)));
    assert!(err.to_string().contains("no_such_db"));
    assert_eq!(server.recorded.count(), 0);
}

#[tokio::test]
async fn test_remote_password_from_prompt() {
    let server = StubServer::start().await;
    let out = tempfile::tempdir().unwrap();

    let mut args = remote_args(server.port, "", "database_basexdb", out.path());
    args.password = None;
    let summary = run_remote(&args, &Config::default(), |_| Ok("s3cret".to_string()))
        .await
        .unwrap();

    assert_eq!(summary.saved.len(), 2);
}

#[tokio::test]
async fn test_remote_dropped_connections_fail_each_query() {
    let server = StubServer::start_with(QueryMode::Hangup).await;
    let out = tempfile::tempdir().unwrap();

    let args = remote_args(server.port, "s3cret", "database_basexdb", out.path());
    let summary = run_remote(&args, &Config::default(), no_prompt)
        .await
        .unwrap();

    assert_eq!(server.recorded.count(), 3);
    assert!(summary.saved.is_empty());
    let failed: Vec<&str> = summary.failed.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(
        failed,
        vec!["Population by Region", "CO2 Emissions", "Land Allocation"]
    );
    assert!(summary
        .failed
        .iter()
        .all(|f| f.reason.contains("request failed")));
    assert!(file_names(out.path()).is_empty());
}
