//! Main entry point for the pushshift-crawler CLI

use clap::Parser;
use pushshift_crawler::cli::Cli;
use pushshift_crawler::shutdown::{self, ShutdownCoordinator};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pushshift_crawler=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    // Pages already committed stay committed; the crawl stops between pages
    let shutdown = ShutdownCoordinator::shared();
    shutdown::set_global_shutdown(shutdown.clone());
    shutdown::install_ctrl_c_handler(shutdown.clone());

    let code = match cli.execute(shutdown).await {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("Crawl failed: {}", e);
            e.exit_code()
        }
    };

    std::process::exit(code);
}
