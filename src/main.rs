//! gcamreader - run batch queries against GCAM scenario databases.

use gcamreader::app;
use gcamreader::cli::Cli;
use gcamreader::logging;
use tracing::error;

#[tokio::main]
async fn main() {
    // .env may carry GCAMREADER_PASSWORD, so load it before parsing arguments
    let _ = dotenvy::dotenv();

    logging::init_stderr_logging();

    let cli = Cli::parse_args();
    if let Err(e) = app::run(cli).await {
        error!(category = e.category(), "{}", e);
        std::process::exit(1);
    }
}
