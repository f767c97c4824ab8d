//! CDSL communiques.
//!
//! The list is an ASP.NET `GridView1`. The date sits in the last column and
//! is loosely formatted (`19 October , 2026`, sometimes with a weekday or a
//! different case), so it is matched by case-insensitive containment.

use super::{Endpoint, cell_link, cell_text, data_rows, raw_text};
use crate::dates::DateMatcher;
use crate::errors::ExtractError;
use crate::models::CdslCommunique;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

const ORIGIN: &str = "https://www.cdslindia.com";

pub const COMMUNIQUES: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/publications/commu_list.aspx",
    warm_up: false,
};

static GRID: Lazy<Selector> = Lazy::new(|| Selector::parse("table#GridView1").expect("valid selector"));

pub fn parse_communiques(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<CdslCommunique>, ExtractError> {
    let document = Html::parse_document(body);
    let grid = document
        .select(&GRID)
        .next()
        .ok_or_else(|| ExtractError::layout("CDSL table#GridView1 not found"))?;

    let records: Vec<CdslCommunique> = data_rows(grid)
        .filter(|cells| cells.len() >= 3)
        .filter(|cells| matcher.matches(&raw_text(&cells[2])))
        .map(|cells| CdslCommunique {
            date: cell_text(&cells[2]),
            communique_no: cell_text(&cells[0]),
            subject: cell_text(&cells[1]),
            link: cell_link(&cells[1], origin),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed CDSL communiques");
    Ok(records)
}
