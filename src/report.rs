//! Per-run summary: one status line per source plus the files to attach.

use crate::scrapers::{Extraction, Outcome, Source};
use chrono::NaiveDate;
use itertools::Itertools;
use std::path::{Path, PathBuf};

/// The line the report shows for one source.
pub fn status_line(source: Source, outcome: &Outcome) -> String {
    match outcome {
        Outcome::Extracted { records, .. } => format!("✅ {}: {} records.", source, records.len()),
        Outcome::Empty => format!("⚠️ {}: No data found today.", source),
        Outcome::Failed { kind, message } => format!("❌ {}: {} error - {}", source, kind, message),
    }
}

/// Summary handed to the notifier once every source has finished.
///
/// Built once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    date: NaiveDate,
    lines: Vec<String>,
    files: Vec<PathBuf>,
}

impl RunReport {
    /// Lines follow the order of `extractions`.
    pub fn from_extractions(date: NaiveDate, extractions: &[Extraction]) -> Self {
        let lines = extractions
            .iter()
            .map(|e| status_line(e.source, &e.outcome))
            .collect();
        let files = extractions
            .iter()
            .filter_map(|e| match &e.outcome {
                Outcome::Extracted { file, .. } => Some(file.clone()),
                _ => None,
            })
            .collect();
        Self { date, lines, files }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    pub fn subject(&self) -> String {
        format!("Market Disclosures Report - {}", self.date.format("%Y-%m-%d"))
    }

    pub fn body(&self) -> String {
        format!(
            "Market disclosures for {}\n\n{}\n\nExtracts attached: {}\n",
            self.date.format("%Y-%m-%d"),
            self.lines.iter().join("\n"),
            self.files.len()
        )
    }
}
