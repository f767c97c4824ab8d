//! NSE circulars via the site's JSON API.
//!
//! `/api/circulars` returns 401 unless the request carries the cookies NSE
//! sets on its homepage, hence the warm-up. Items carry a display date like
//! `October 19, 2026` and an absolute archive link.

use super::Endpoint;
use crate::dates::DateMatcher;
use crate::errors::ExtractError;
use crate::models::NseCircular;
use crate::utils::{normalize_whitespace, resolve_link, truncate_for_log};
use serde::Deserialize;
use tracing::{debug, warn};

const ORIGIN: &str = "https://www.nseindia.com";

pub const CIRCULARS: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/api/circulars",
    warm_up: true,
};

#[derive(Debug, Deserialize)]
struct CircularsResponse {
    data: Vec<CircularItem>,
}

/// Any field may be absent or `null`; NSE leaves links empty on some rows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CircularItem {
    #[serde(default)]
    cir_display_date: Option<String>,
    #[serde(default)]
    circ_number: Option<String>,
    #[serde(default)]
    circ_department: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    circ_filelink: Option<String>,
}

pub fn parse_circulars(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<NseCircular>, ExtractError> {
    let response: CircularsResponse = serde_json::from_str(body).inspect_err(|e| {
        warn!(error = %e, body = %truncate_for_log(body, 200), "NSE circulars payload did not parse");
    })?;

    let records: Vec<NseCircular> = response
        .data
        .into_iter()
        .filter(|item| matcher.matches(item.cir_display_date.as_deref().unwrap_or_default()))
        .map(|item| NseCircular {
            date: item.cir_display_date.unwrap_or_default(),
            circular_no: item.circ_number.unwrap_or_default().trim().to_string(),
            department: normalize_whitespace(&item.circ_department.unwrap_or_default()),
            subject: normalize_whitespace(&item.sub.unwrap_or_default()),
            link: resolve_link(origin, &item.circ_filelink.unwrap_or_default()),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed NSE circulars");
    Ok(records)
}
