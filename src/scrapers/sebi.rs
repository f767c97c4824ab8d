//! SEBI circulars and press releases.
//!
//! Both listings are rendered by the same `HomeAction.do` page into a
//! `table#sample_1`, with dates like `Oct 19, 2026` in the first cell. The
//! circulars listing has a type column before the title; press releases go
//! straight to the title.

use super::{Endpoint, cell_link, cell_text, data_rows, raw_text};
use crate::dates::DateMatcher;
use crate::errors::ExtractError;
use crate::models::{SebiCircular, SebiPressRelease};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

const ORIGIN: &str = "https://www.sebi.gov.in";

pub const CIRCULARS: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/sebiweb/home/HomeAction.do?doListing=yes&sid=1&ssid=7&smid=0",
    warm_up: false,
};

pub const PRESS_RELEASES: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/sebiweb/home/HomeAction.do?doListing=yes&sid=6&ssid=23&smid=0",
    warm_up: false,
};

static LISTING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table#sample_1").expect("valid selector"));

/// Rows of the listing table whose first cell is today's date.
fn todays_rows<'a>(
    document: &'a Html,
    matcher: &DateMatcher,
    min_cells: usize,
) -> Result<Vec<Vec<ElementRef<'a>>>, ExtractError> {
    let table = document
        .select(&LISTING)
        .next()
        .ok_or_else(|| ExtractError::layout("SEBI listing table#sample_1 not found"))?;

    Ok(data_rows(table)
        .filter(|cells| cells.len() >= min_cells)
        .filter(|cells| matcher.matches(&raw_text(&cells[0])))
        .collect())
}

pub fn parse_circulars(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<SebiCircular>, ExtractError> {
    let document = Html::parse_document(body);
    let records: Vec<SebiCircular> = todays_rows(&document, matcher, 3)?
        .into_iter()
        .map(|cells| SebiCircular {
            date: cell_text(&cells[0]),
            kind: cell_text(&cells[1]),
            title: cell_text(&cells[2]),
            link: cell_link(&cells[2], origin),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed SEBI circulars");
    Ok(records)
}

pub fn parse_press_releases(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<SebiPressRelease>, ExtractError> {
    let document = Html::parse_document(body);
    let records: Vec<SebiPressRelease> = todays_rows(&document, matcher, 2)?
        .into_iter()
        .map(|cells| SebiPressRelease {
            date: cell_text(&cells[0]),
            title: cell_text(&cells[1]),
            link: cell_link(&cells[1], origin),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed SEBI press releases");
    Ok(records)
}
