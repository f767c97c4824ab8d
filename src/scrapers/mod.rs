//! Disclosure scrapers for Indian market regulators and exchanges.
//!
//! Each submodule knows one site's page or API layout. All of them follow the
//! same two-step pattern:
//!
//! 1. **Fetching**: GET the listing page or API endpoint, after a homepage
//!    warm-up for the sites that need a session
//! 2. **Parsing**: a pure `parse_*` function that keeps only the rows dated
//!    today and maps them to the source's record type
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Date cell |
//! |--------|--------|--------|-----------|
//! | SEBI Circulars | [`sebi`] | HTML table `#sample_1` | `Oct 19, 2026` |
//! | SEBI Press Releases | [`sebi`] | HTML table `#sample_1` | `Oct 19, 2026` |
//! | BSE Index | [`bse`] | HTML grid by id | `19-10-2026` |
//! | BSE Notices | [`bse`] | JSON API, warm-up | `19-10-2026` |
//! | NSE Circulars | [`nse`] | JSON API, warm-up | `October 19, 2026` |
//! | NSDL Circulars | [`nsdl`] | HTML, second table | `19 October` |
//! | CDSL Communiques | [`cdsl`] | HTML grid by id | `19 October , 2026` |
//!
//! Failures never leave [`extract`]: they become an [`Outcome::Failed`] with a
//! [`FailureKind`], so one broken site cannot stop the batch.

pub mod bse;
pub mod cdsl;
pub mod nsdl;
pub mod nse;
pub mod sebi;

use crate::dates::{DateFormat, DateMatcher, MatchPolicy};
use crate::errors::{ExtractError, FailureKind};
use crate::http::Fetcher;
use crate::models::RecordSet;
use crate::outputs;
use crate::utils::{normalize_whitespace, resolve_link};
use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Where a source lives and how it must be approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Site origin; relative links resolve against it and warm-ups hit its `/`.
    pub origin: &'static str,
    /// Origin serving the data, when it differs from the site (API hosts).
    pub data_origin: &'static str,
    pub path: &'static str,
    pub warm_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    SebiCirculars,
    SebiPressReleases,
    BseIndex,
    BseNotices,
    NseCirculars,
    NsdlCirculars,
    CdslCommuniques,
}

impl Source {
    /// Every source, in report order.
    pub const ALL: [Source; 7] = [
        Source::SebiCirculars,
        Source::SebiPressReleases,
        Source::BseIndex,
        Source::BseNotices,
        Source::NseCirculars,
        Source::NsdlCirculars,
        Source::CdslCommuniques,
    ];

    pub fn position(self) -> usize {
        Source::ALL.iter().position(|s| *s == self).unwrap_or(usize::MAX)
    }

    pub fn label(self) -> &'static str {
        match self {
            Source::SebiCirculars => "SEBI Circulars",
            Source::SebiPressReleases => "SEBI Press Releases",
            Source::BseIndex => "BSE Index",
            Source::BseNotices => "BSE Notices",
            Source::NseCirculars => "NSE Circulars",
            Source::NsdlCirculars => "NSDL Circulars",
            Source::CdslCommuniques => "CDSL Communiques",
        }
    }

    /// Destination table in the store. Stable across runs.
    pub fn table_name(self) -> &'static str {
        match self {
            Source::SebiCirculars => "sebi_circulars",
            Source::SebiPressReleases => "sebi_press_releases",
            Source::BseIndex => "bse_index_notices",
            Source::BseNotices => "bse_notices",
            Source::NseCirculars => "nse_circulars",
            Source::NsdlCirculars => "nsdl_circulars",
            Source::CdslCommuniques => "cdsl_communiques",
        }
    }

    pub fn endpoint(self) -> Endpoint {
        match self {
            Source::SebiCirculars => sebi::CIRCULARS,
            Source::SebiPressReleases => sebi::PRESS_RELEASES,
            Source::BseIndex => bse::INDEX_NOTICES,
            Source::BseNotices => bse::NOTICES,
            Source::NseCirculars => nse::CIRCULARS,
            Source::NsdlCirculars => nsdl::CIRCULARS,
            Source::CdslCommuniques => cdsl::COMMUNIQUES,
        }
    }

    /// How this source prints dates, and how loosely its cells must be compared.
    ///
    /// NSDL prints day and month only, so its rows match on any year.
    pub fn date_rule(self) -> (DateFormat, MatchPolicy) {
        match self {
            Source::SebiCirculars | Source::SebiPressReleases => {
                (DateFormat::MonDayYear, MatchPolicy::Normalized)
            }
            Source::BseIndex => (DateFormat::DayMonthYearDashed, MatchPolicy::Normalized),
            Source::BseNotices => (DateFormat::DayMonthYearDashed, MatchPolicy::Exact),
            Source::NseCirculars => (DateFormat::MonthDayYear, MatchPolicy::Exact),
            Source::NsdlCirculars => (DateFormat::DayMonth, MatchPolicy::Normalized),
            Source::CdslCommuniques => (DateFormat::DayMonthCommaYear, MatchPolicy::Contains),
        }
    }

    pub fn matcher(self, today: NaiveDate) -> DateMatcher {
        let (format, policy) = self.date_rule();
        DateMatcher::new(format, policy, today)
    }

    /// Parse a fetched body into today's records.
    pub fn parse(self, body: &str, matcher: &DateMatcher) -> Result<RecordSet, ExtractError> {
        let origin = self.endpoint().origin;
        Ok(match self {
            Source::SebiCirculars => {
                RecordSet::SebiCirculars(sebi::parse_circulars(body, matcher, origin)?)
            }
            Source::SebiPressReleases => {
                RecordSet::SebiPressReleases(sebi::parse_press_releases(body, matcher, origin)?)
            }
            Source::BseIndex => {
                RecordSet::BseIndexNotices(bse::parse_index_notices(body, matcher, origin)?)
            }
            Source::BseNotices => RecordSet::BseNotices(bse::parse_notices(body, matcher, origin)?),
            Source::NseCirculars => {
                RecordSet::NseCirculars(nse::parse_circulars(body, matcher, origin)?)
            }
            Source::NsdlCirculars => {
                RecordSet::NsdlCirculars(nsdl::parse_circulars(body, matcher, origin)?)
            }
            Source::CdslCommuniques => {
                RecordSet::CdslCommuniques(cdsl::parse_communiques(body, matcher, origin)?)
            }
        })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal state of one source for one run.
#[derive(Debug)]
pub enum Outcome {
    /// Rows dated today were found and written to `file`.
    Extracted { records: RecordSet, file: PathBuf },
    /// The source answered but listed nothing for today.
    Empty,
    Failed { kind: FailureKind, message: String },
}

#[derive(Debug)]
pub struct Extraction {
    pub source: Source,
    pub outcome: Outcome,
}

/// Run one source end to end and fold every failure into the outcome.
#[instrument(level = "info", skip(fetcher, output_dir), fields(source = %source))]
pub async fn extract(
    source: Source,
    fetcher: &Fetcher,
    today: NaiveDate,
    output_dir: &Path,
) -> Extraction {
    let outcome = match try_extract(source, fetcher, today, output_dir).await {
        Ok(Some((records, file))) => {
            info!(count = records.len(), file = %file.display(), "Extracted records for today");
            Outcome::Extracted { records, file }
        }
        Ok(None) => {
            warn!("No rows dated today");
            Outcome::Empty
        }
        Err(e) => {
            error!(kind = %e.kind(), error = %e, "Extraction failed; skipping source");
            Outcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    };
    Extraction { source, outcome }
}

async fn try_extract(
    source: Source,
    fetcher: &Fetcher,
    today: NaiveDate,
    output_dir: &Path,
) -> Result<Option<(RecordSet, PathBuf)>, ExtractError> {
    let endpoint = source.endpoint();
    if endpoint.warm_up {
        fetcher.warm_up(endpoint.origin).await;
    }
    let body = fetcher.get_text(endpoint.data_origin, endpoint.path).await?;

    let records = source.parse(&body, &source.matcher(today))?;
    if records.is_empty() {
        return Ok(None);
    }
    let file = outputs::csv::write_extract(output_dir, source.label(), today, &records).await?;
    Ok(Some((records, file)))
}

// ---- HTML helpers shared by the table-based scrapers ----

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// The `td` children of every row in `table`; header rows come back empty.
pub(crate) fn data_rows<'a>(table: ElementRef<'a>) -> impl Iterator<Item = Vec<ElementRef<'a>>> {
    table.select(&ROW).map(|row| {
        row.children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| cell.value().name() == "td")
            .collect()
    })
}

/// The raw text of a cell, pieces joined by spaces.
pub(crate) fn raw_text(cell: &ElementRef<'_>) -> String {
    cell.text().join(" ")
}

pub(crate) fn cell_text(cell: &ElementRef<'_>) -> String {
    normalize_whitespace(&raw_text(cell))
}

/// Absolute URL of the first link inside a cell, or an empty string.
pub(crate) fn cell_link(cell: &ElementRef<'_>, origin: &str) -> String {
    cell.select(&LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve_link(origin, href))
        .unwrap_or_default()
}
