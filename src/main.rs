//! # Disclosure Digest
//!
//! A daily batch job that collects the regulatory disclosures published today
//! by Indian market regulators, exchanges and depositories, keeps a CSV extract
//! per source, appends the rows to a table store, and mails a status digest
//! with the extracts attached.
//!
//! ## Sources
//!
//! - SEBI circulars and press releases
//! - BSE index notices and exchange notices
//! - NSE circulars
//! - NSDL circulars
//! - CDSL communiques
//!
//! ## Usage
//!
//! ```sh
//! disclosure_digest -o ./extracts
//! disclosure_digest --diagnose
//! ```
//!
//! ## Architecture
//!
//! 1. **Extraction**: every source is fetched and filtered to today's rows,
//!    a few at a time; a failing source only marks its own line in the report
//! 2. **Persistence**: non-empty extracts are appended to `{dataset}_{table}`
//! 3. **Notification**: one email with a line per source and the CSV files
//!
//! Missing store or mail credentials skip the matching step; the job still
//! exits successfully.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dates;
mod errors;
mod http;
mod models;
mod notify;
mod outputs;
mod pipeline;
mod report;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::AppConfig;
use http::Fetcher;
use notify::Notifier;
use report::RunReport;
use scrapers::Source;
use store::SqlStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    info!("disclosure_digest starting up");

    // Local runs keep their secrets in .env; scheduled runs use the environment.
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env");
    }

    let args = Cli::parse();
    debug!(output_dir = %args.output_dir, dataset = %args.dataset, "Parsed CLI arguments");
    let config = AppConfig::from_cli(&args);

    if args.diagnose {
        return store::diagnose(&config).await;
    }

    if let Err(e) = ensure_writable_dir(&config.output_dir).await {
        error!(
            path = %config.output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Extract ----
    let fetcher = Fetcher::new(config.http.clone())?;
    let extractions = pipeline::run_extractors(
        &fetcher,
        &Source::ALL,
        config.today,
        &config.output_dir,
        config.workers,
    )
    .await;

    // ---- Persist ----
    let store = match config.store.as_ref() {
        Some(credentials) => match SqlStore::connect(credentials, &config.dataset).await {
            Ok(store) => Some(store),
            Err(e) => {
                error!(error = %e, project = %config.project_label(), "Could not open the store; uploads skipped");
                None
            }
        },
        None => None,
    };
    let uploaded = pipeline::persist(store.as_ref(), &extractions).await;
    info!(rows = uploaded, "Persistence finished");

    // ---- Report ----
    let report = RunReport::from_extractions(config.today, &extractions);
    for line in report.lines() {
        info!("{line}");
    }

    let notifier = match config.mail.clone() {
        Some(mail) => match Notifier::smtp(mail) {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                error!(error = %e, "Could not set up the mail relay; report email skipped");
                None
            }
        },
        None => None,
    };
    let delivery = notify::notify(notifier.as_ref(), report).await;

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        ?delivery,
        "disclosure_digest finished"
    );
    Ok(())
}
