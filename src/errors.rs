//! Error types for every stage of a run.
//!
//! Extractor failures are classified into a [`FailureKind`] so the report can
//! say *why* a source produced nothing. Store, mail and configuration errors
//! never escape their own step; the driver logs them and moves on.

use std::fmt;
use thiserror::Error;

/// Coarse classification of an extractor failure, shown in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Unreachable host, timeout, or a non-success HTTP status.
    Network,
    /// The source refused the request (HTTP 401/403), usually a missing session.
    Auth,
    /// The expected table, field or JSON shape was absent.
    Parse,
    /// The extract could not be written to disk.
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Network => "network",
            FailureKind::Auth => "auth",
            FailureKind::Parse => "parse",
            FailureKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} refused access (HTTP {status})")]
    Auth { url: String, status: u16 },

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("page layout changed: {0}")]
    Layout(String),

    #[error("unexpected JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not encode extract: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not write extract: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    pub fn layout(message: impl Into<String>) -> Self {
        ExtractError::Layout(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::Network(_) | ExtractError::Status { .. } => FailureKind::Network,
            ExtractError::Auth { .. } => FailureKind::Auth,
            ExtractError::Url(_) | ExtractError::Layout(_) | ExtractError::Json(_) => {
                FailureKind::Parse
            }
            ExtractError::Csv(_) | ExtractError::Io(_) => FailureKind::Io,
        }
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("store error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid table for {destination}: {message}")]
    InvalidTable { destination: String, message: String },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    #[error("could not build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("smtp error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("credential blob is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("credential blob is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("credential blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
