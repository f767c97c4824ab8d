//! Run-level orchestration: fan the sources out, then persist what came back.

use crate::http::Fetcher;
use crate::scrapers::{self, Extraction, Outcome, Source};
use crate::store::{self, TableSink};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{error, info, instrument};

/// Extract every source in `sources`, at most `workers` at a time.
///
/// Results come back in the order of [`Source::ALL`] regardless of which
/// source finished first.
#[instrument(level = "info", skip(fetcher, sources, output_dir), fields(sources = sources.len()))]
pub async fn run_extractors(
    fetcher: &Fetcher,
    sources: &[Source],
    today: NaiveDate,
    output_dir: &Path,
    workers: usize,
) -> Vec<Extraction> {
    let mut extractions: Vec<Extraction> = stream::iter(sources.iter().copied())
        .map(|source| scrapers::extract(source, fetcher, today, output_dir))
        .buffer_unordered(workers.max(1))
        .collect()
        .await;
    extractions.sort_by_key(|e| e.source.position());

    let extracted = extractions
        .iter()
        .filter(|e| matches!(e.outcome, Outcome::Extracted { .. }))
        .count();
    let failed = extractions
        .iter()
        .filter(|e| matches!(e.outcome, Outcome::Failed { .. }))
        .count();
    info!(total = extractions.len(), extracted, failed, "All sources finished");
    extractions
}

/// Append each successful extraction to its source's table.
///
/// Upload errors are logged per source and never stop the others. Returns the
/// number of rows written in total.
pub async fn persist<S: TableSink>(sink: Option<&S>, extractions: &[Extraction]) -> u64 {
    let mut written = 0;
    for extraction in extractions {
        let Outcome::Extracted { records, .. } = &extraction.outcome else {
            continue;
        };
        let destination = extraction.source.table_name();
        let table = match records.to_table() {
            Ok(table) => table,
            Err(e) => {
                error!(source = %extraction.source, error = %e, "Could not tabulate records; upload skipped");
                continue;
            }
        };
        match store::upload(sink, destination, &table).await {
            Ok(n) => written += n,
            Err(e) => error!(source = %extraction.source, %destination, error = %e, "Upload failed"),
        }
    }
    written
}
