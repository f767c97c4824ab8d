//! BSE index notices (HTML) and exchange notices (JSON API).
//!
//! The index notices page is an ASP.NET grid identified by its id. Dates are
//! `DD-MM-YYYY` and the PDF links are site-relative.
//!
//! The notices API lives on `api.bseindia.com` and answers only after the
//! main site has set its session cookies, so the fetcher warms up on
//! `www.bseindia.com` first. Notice bodies arrive as HTML fragments and are
//! stored as plain text.

use super::{Endpoint, cell_link, cell_text, data_rows, raw_text};
use crate::dates::DateMatcher;
use crate::errors::ExtractError;
use crate::models::{BseIndexNotice, BseNotice};
use crate::utils::{normalize_whitespace, strip_markup, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

const ORIGIN: &str = "https://www.bseindia.com";
const API_ORIGIN: &str = "https://api.bseindia.com";

pub const INDEX_NOTICES: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/markets/MarketInfo/IndexNotices.aspx",
    warm_up: false,
};

pub const NOTICES: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: API_ORIGIN,
    path: "/BseIndiaAPI/api/NoticesCirculars/w",
    warm_up: true,
};

/// Page a notice number opens on the main site.
const NOTICE_PAGE: &str = "/markets/MarketInfo/DispNewNoticesCirculars.aspx?page=";

static INDEX_GRID: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("table#ContentPlaceHolder1_grdIndexNotices").expect("valid selector")
});

pub fn parse_index_notices(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<BseIndexNotice>, ExtractError> {
    let document = Html::parse_document(body);
    let grid = document
        .select(&INDEX_GRID)
        .next()
        .ok_or_else(|| ExtractError::layout("BSE index notices grid not found"))?;

    let records: Vec<BseIndexNotice> = data_rows(grid)
        .filter(|cells| cells.len() >= 3)
        .filter(|cells| matcher.matches(&raw_text(&cells[0])))
        .map(|cells| BseIndexNotice {
            date: cell_text(&cells[0]),
            subject: cell_text(&cells[1]),
            pdf: cell_link(&cells[2], origin),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed BSE index notices");
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct NoticesResponse {
    #[serde(rename = "Table")]
    table: Vec<NoticeItem>,
}

/// Any field may be absent or `null` in older rows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct NoticeItem {
    #[serde(default)]
    notice_dt: Option<String>,
    #[serde(default)]
    notice_no: Option<String>,
    #[serde(default)]
    news_sub: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    notice_body: Option<String>,
}

pub fn parse_notices(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<BseNotice>, ExtractError> {
    let response: NoticesResponse = serde_json::from_str(body).inspect_err(|e| {
        warn!(error = %e, body = %truncate_for_log(body, 200), "BSE notices payload did not parse");
    })?;

    let records: Vec<BseNotice> = response
        .table
        .into_iter()
        .filter(|item| matcher.matches(item.notice_dt.as_deref().unwrap_or_default()))
        .map(|item| {
            let notice_no = item.notice_no.unwrap_or_default().trim().to_string();
            let link = if notice_no.is_empty() {
                String::new()
            } else {
                format!("{origin}{NOTICE_PAGE}{notice_no}")
            };
            BseNotice {
                date: item.notice_dt.unwrap_or_default(),
                notice_no,
                subject: normalize_whitespace(&item.news_sub.unwrap_or_default()),
                department: normalize_whitespace(&item.department.unwrap_or_default()),
                summary: strip_markup(&item.notice_body.unwrap_or_default()),
                link,
            }
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed BSE notices");
    Ok(records)
}
