//! Report email with the day's CSV extracts attached.
//!
//! The message is built with `lettre` and submitted over an authenticated TLS
//! relay. Sending is attempted once; a failure is logged and the run carries
//! on. Without mail credentials nothing is sent at all.

use crate::config::MailConfig;
use crate::errors::NotifyError;
use crate::report::RunReport;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Instant;
use tokio::fs;
use tracing::{error, info, instrument, warn};

/// Something that can submit a finished message.
pub trait MailTransport {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(credentials)
            .build();
        Ok(Self { transport })
    }
}

impl MailTransport for SmtpMailer {
    async fn deliver(&self, message: Message) -> Result<(), NotifyError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

pub struct Notifier<T> {
    config: MailConfig,
    transport: T,
}

impl Notifier<SmtpMailer> {
    pub fn smtp(config: MailConfig) -> Result<Self, NotifyError> {
        let transport = SmtpMailer::new(&config)?;
        Ok(Self { config, transport })
    }
}

impl<T: MailTransport> Notifier<T> {
    #[cfg(test)]
    pub fn new(config: MailConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Build the report message, attaching every extract that can be read.
    pub async fn compose(&self, report: &RunReport) -> Result<Message, NotifyError> {
        let from: Mailbox = self.config.username.parse()?;
        let to: Mailbox = self.config.recipient.parse()?;
        let csv = ContentType::parse("text/csv")?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(report.body()));
        for path in report.files() {
            let bytes = match fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not read extract; leaving it out");
                    continue;
                }
            };
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "extract.csv".to_string());
            parts = parts.singlepart(Attachment::new(name).body(bytes, csv.clone()));
        }

        Ok(Message::builder()
            .from(from)
            .to(to)
            .subject(report.subject())
            .multipart(parts)?)
    }

    /// Compose and submit the report. Consumes it: one report, one email.
    #[instrument(level = "info", skip_all, fields(to = %self.config.recipient))]
    pub async fn send(&self, report: RunReport) -> Result<(), NotifyError> {
        let t0 = Instant::now();
        let message = self.compose(&report).await?;
        self.transport.deliver(message).await?;
        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Report email sent");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
    Failed,
}

/// Send the report if a notifier is configured; never fails the run.
pub async fn notify<T: MailTransport>(notifier: Option<&Notifier<T>>, report: RunReport) -> Delivery {
    let Some(notifier) = notifier else {
        info!("No mail credentials; report email skipped");
        return Delivery::Skipped;
    };
    match notifier.send(report).await {
        Ok(()) => Delivery::Sent,
        Err(e) => {
            error!(error = %e, "Failed to send report email");
            Delivery::Failed
        }
    }
}
