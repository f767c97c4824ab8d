//! Command-line interface definitions for the disclosure digest.
//!
//! Every secret can be passed as a flag but is normally read from the
//! environment (or a `.env` file) by the scheduler that runs the job.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for one run.
///
/// # Examples
///
/// ```sh
/// # Daily run, secrets from the environment
/// disclosure_digest -o ./extracts
///
/// # Re-run for a past day without mailing anyone
/// EMAIL_TO= disclosure_digest --date 2026-10-16
///
/// # Check store credentials only
/// disclosure_digest --diagnose
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory for the per-source CSV extracts
    #[arg(short, long, env = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: String,

    /// Project that owns the dataset (defaults to the credentials' project_id)
    #[arg(long, env = "PROJECT_ID")]
    pub project_id: Option<String>,

    /// Dataset the per-source tables live in
    #[arg(long, env = "DATASET_ID", default_value = "stock_data")]
    pub dataset: String,

    /// Mail account the report is sent from
    #[arg(long, env = "EMAIL_USER")]
    pub email_user: Option<String>,

    /// App password for the mail account
    #[arg(long, env = "EMAIL_PASS", hide_env_values = true)]
    pub email_pass: Option<String>,

    /// Address the report is sent to
    #[arg(long, env = "EMAIL_TO")]
    pub email_to: Option<String>,

    /// Base64-encoded JSON credentials for the table store
    #[arg(long, env = "STORE_CREDENTIALS", hide_env_values = true)]
    pub store_credentials: Option<String>,

    /// SMTP relay used to submit the report
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// How many sources to fetch at once
    #[arg(short, long, env = "WORKERS", default_value_t = 4)]
    pub workers: usize,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Pause after a session warm-up request, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub warmup_delay_ms: u64,

    /// Run date (YYYY-MM-DD); defaults to today in India
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Only check store credentials, dataset, and table creation
    #[arg(long)]
    pub diagnose: bool,
}
