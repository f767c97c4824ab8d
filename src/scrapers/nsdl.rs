//! NSDL business circulars.
//!
//! The circular list is the second `table` on the page; the first one is the
//! year/department filter form. Date cells read like `19 October`, with no
//! year and generous whitespace.

use super::{Endpoint, cell_link, cell_text, data_rows, raw_text};
use crate::dates::DateMatcher;
use crate::errors::ExtractError;
use crate::models::NsdlCircular;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

const ORIGIN: &str = "https://nsdl.co.in";

pub const CIRCULARS: Endpoint = Endpoint {
    origin: ORIGIN,
    data_origin: ORIGIN,
    path: "/business/circular.php",
    warm_up: false,
};

/// Position of the circulars table among all tables in the document.
const LIST_TABLE_INDEX: usize = 1;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));

pub fn parse_circulars(
    body: &str,
    matcher: &DateMatcher,
    origin: &str,
) -> Result<Vec<NsdlCircular>, ExtractError> {
    let document = Html::parse_document(body);
    let table = document.select(&TABLE).nth(LIST_TABLE_INDEX).ok_or_else(|| {
        ExtractError::layout(format!("NSDL circular table #{LIST_TABLE_INDEX} not found"))
    })?;

    let records: Vec<NsdlCircular> = data_rows(table)
        .filter(|cells| cells.len() >= 3)
        .filter(|cells| matcher.matches(&raw_text(&cells[0])))
        .map(|cells| NsdlCircular {
            date: cell_text(&cells[0]),
            circular_no: cell_text(&cells[1]),
            subject: cell_text(&cells[2]),
            link: cell_link(&cells[2], origin),
        })
        .collect();
    debug!(count = records.len(), target = matcher.target(), "Parsed NSDL circulars");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::Source;
    use chrono::NaiveDate;

    const PAGE: &str = r#"
<html><body>
<table class="filter"><tr><td><form><select name="year"><option>2026</option></select></form></td></tr></table>
<table class="circular-list">
  <tr><th>Date</th><th>Circular No.</th><th>Subject</th></tr>
  <tr>
    <td>  12
        December </td>
    <td>NSDL/POLICY/2026/0142</td>
    <td><a href="../downloadFile/circular/2026/0142.pdf">Revised   KYC norms for BO accounts</a></td>
  </tr>
  <tr>
    <td>11 December</td>
    <td>NSDL/POLICY/2026/0141</td>
    <td><a href="/downloadFile/circular/2026/0141.pdf">Earlier circular</a></td>
  </tr>
</table>
</body></html>"#;

    fn december_12() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 12, 12).unwrap()
    }

    #[test]
    fn test_parse_circulars_normalizes_date_cell() {
        let matcher = Source::NsdlCirculars.matcher(december_12());
        let records = parse_circulars(PAGE, &matcher, ORIGIN).unwrap();
        assert_eq!(
            records,
            vec![NsdlCircular {
                date: "12 December".into(),
                circular_no: "NSDL/POLICY/2026/0142".into(),
                subject: "Revised KYC norms for BO accounts".into(),
                link: "https://nsdl.co.in/downloadFile/circular/2026/0142.pdf".into(),
            }]
        );
    }

    #[test]
    fn test_day_month_matches_regardless_of_year() {
        let next_year = NaiveDate::from_ymd_opt(2027, 12, 12).unwrap();
        let matcher = Source::NsdlCirculars.matcher(next_year);
        assert_eq!(parse_circulars(PAGE, &matcher, ORIGIN).unwrap().len(), 1);
    }

    #[test]
    fn test_single_table_page_is_layout_error() {
        let matcher = Source::NsdlCirculars.matcher(december_12());
        let err = parse_circulars("<table><tr><td>x</td></tr></table>", &matcher, ORIGIN).unwrap_err();
        assert!(matches!(err, ExtractError::Layout(_)));
    }
}
