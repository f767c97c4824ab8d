//! Run configuration, built once at startup from the CLI and environment.
//!
//! Secrets stay out of the extractors: only the table store and the notifier
//! receive their slice of [`AppConfig`]. A credential that is missing or
//! cannot be decoded disables the step that depends on it and nothing else.

use crate::cli::Cli;
use crate::dates::today_in_india;
use crate::errors::ConfigError;
use crate::http::HttpSettings;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Service credentials for the table store, shipped as base64-encoded JSON.
///
/// ```json
/// { "type": "service_account", "project_id": "market-data", "database_url": "sqlite:///var/lib/digest.db" }
/// ```
#[derive(Clone, Deserialize)]
pub struct StoreCredentials {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub database_url: String,
}

impl StoreCredentials {
    pub fn decode(blob: &str) -> Result<Self, ConfigError> {
        let bytes = STANDARD.decode(blob.trim())?;
        let json = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("database_url", &"<redacted>")
            .finish()
    }
}

/// Mail submission settings. Present only when every secret was supplied.
#[derive(Clone)]
pub struct MailConfig {
    pub username: String,
    pub password: String,
    pub recipient: String,
    pub smtp_host: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("smtp_host", &self.smtp_host)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Run date; every source is filtered to it.
    pub today: NaiveDate,
    pub output_dir: PathBuf,
    pub project_id: Option<String>,
    pub dataset: String,
    pub store: Option<StoreCredentials>,
    pub mail: Option<MailConfig>,
    pub http: HttpSettings,
    pub workers: usize,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let store = match non_empty(&cli.store_credentials) {
            None => {
                warn!("STORE_CREDENTIALS not set; uploads will be skipped");
                None
            }
            Some(blob) => match StoreCredentials::decode(&blob) {
                Ok(credentials) => Some(credentials),
                Err(e) => {
                    error!(error = %e, "Could not decode store credentials; uploads will be skipped");
                    None
                }
            },
        };

        let mail = match (
            non_empty(&cli.email_user),
            non_empty(&cli.email_pass),
            non_empty(&cli.email_to),
        ) {
            (Some(username), Some(password), Some(recipient)) => Some(MailConfig {
                username,
                password,
                recipient,
                smtp_host: cli.smtp_host.clone(),
            }),
            _ => {
                warn!("Mail credentials incomplete; the report email will be skipped");
                None
            }
        };

        let project_id = non_empty(&cli.project_id)
            .or_else(|| store.as_ref().and_then(|s| s.project_id.clone()));
        if let (Some(flag), Some(blob)) = (
            non_empty(&cli.project_id),
            store.as_ref().and_then(|s| s.project_id.as_ref()),
        ) {
            if &flag != blob {
                warn!(flag = %flag, credentials = %blob, "Project id differs from the credentials' project");
            }
        }

        let config = Self {
            today: cli.date.unwrap_or_else(today_in_india),
            output_dir: PathBuf::from(&cli.output_dir),
            project_id,
            dataset: cli.dataset.clone(),
            store,
            mail,
            http: HttpSettings {
                request_timeout: Duration::from_secs(cli.request_timeout_secs),
                warmup_delay: Duration::from_millis(cli.warmup_delay_ms),
                base_override: None,
            },
            workers: cli.workers.max(1),
        };
        info!(
            today = %config.today,
            dataset = %config.dataset,
            store = config.store.is_some(),
            mail = config.mail.is_some(),
            workers = config.workers,
            "Configuration loaded"
        );
        config
    }

    /// `project.dataset`, for logs.
    pub fn project_label(&self) -> String {
        match &self.project_id {
            Some(project) => format!("{}.{}", project, self.dataset),
            None => self.dataset.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn encode(json: &str) -> String {
        STANDARD.encode(json)
    }

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["disclosure_digest", "--dataset", "stock_data"];
        args.extend_from_slice(extra);
        Cli::parse_from(args)
    }

    #[test]
    fn test_decode_credentials() {
        let blob = encode(
            r#"{"type":"service_account","project_id":"market-data","database_url":"sqlite://digest.db"}"#,
        );
        let credentials = StoreCredentials::decode(&blob).unwrap();
        assert_eq!(credentials.kind.as_deref(), Some("service_account"));
        assert_eq!(credentials.project_id.as_deref(), Some("market-data"));
        assert_eq!(credentials.database_url, "sqlite://digest.db");
    }

    #[test]
    fn test_decode_rejects_bad_blobs() {
        assert!(matches!(
            StoreCredentials::decode("not base64!!"),
            Err(ConfigError::Base64(_))
        ));
        assert!(matches!(
            StoreCredentials::decode(&encode("{\"project_id\": 1")),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mail = MailConfig {
            username: "ops@example.com".into(),
            password: "app-password".into(),
            recipient: "desk@example.com".into(),
            smtp_host: "smtp.gmail.com".into(),
        };
        let rendered = format!("{mail:?}");
        assert!(!rendered.contains("app-password"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_from_cli_builds_optional_sections() {
        let blob = encode(r#"{"project_id":"market-data","database_url":"sqlite://digest.db"}"#);
        let config = AppConfig::from_cli(&cli(&[
            "--store-credentials",
            &blob,
            "--email-user",
            "ops@example.com",
            "--email-pass",
            "secret",
            "--email-to",
            "desk@example.com",
            "--date",
            "2026-10-19",
        ]));
        assert_eq!(config.today, NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(config.store.is_some());
        assert_eq!(config.project_label(), "market-data.stock_data");
        let mail = config.mail.unwrap();
        assert_eq!(mail.recipient, "desk@example.com");
    }

    #[test]
    fn test_incomplete_mail_and_bad_blob_disable_steps() {
        let config = AppConfig::from_cli(&cli(&[
            "--store-credentials",
            "%%%",
            "--email-user",
            "ops@example.com",
            "--email-pass",
            "",
            "--email-to",
            "desk@example.com",
        ]));
        assert!(config.store.is_none());
        assert!(config.mail.is_none());
    }
}
