//! Typed records for every source, and the generic table they flatten into.
//!
//! Each source produces its own record struct with a fixed set of columns.
//! The serialized field names are the column names used in the CSV extracts
//! and the store. [`RecordSet`] is the tagged union a single extractor
//! returns; [`Table`] is the column/row view handed to the table sink.

use serde::Serialize;
use serde_json::Value;

/// A circular listed on SEBI's legal circulars page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SebiCircular {
    pub date: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub title: String,
    pub link: String,
}

/// A press release listed on SEBI's media page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SebiPressRelease {
    pub date: String,
    pub title: String,
    pub link: String,
}

/// A notice from BSE's index notices grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BseIndexNotice {
    pub date: String,
    pub subject: String,
    #[serde(rename = "PDF")]
    pub pdf: String,
}

/// A notice returned by BSE's notices API.
///
/// `summary` is the notice body with its markup stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BseNotice {
    pub date: String,
    #[serde(rename = "Notice No")]
    pub notice_no: String,
    pub subject: String,
    pub department: String,
    pub summary: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NseCircular {
    pub date: String,
    #[serde(rename = "Circular No")]
    pub circular_no: String,
    pub department: String,
    pub subject: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NsdlCircular {
    pub date: String,
    #[serde(rename = "Circular No")]
    pub circular_no: String,
    pub subject: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CdslCommunique {
    pub date: String,
    #[serde(rename = "Communique No")]
    pub communique_no: String,
    pub subject: String,
    pub link: String,
}

/// The records one extractor found for the run date.
///
/// One variant per source, so a set can never mix column layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSet {
    SebiCirculars(Vec<SebiCircular>),
    SebiPressReleases(Vec<SebiPressRelease>),
    BseIndexNotices(Vec<BseIndexNotice>),
    BseNotices(Vec<BseNotice>),
    NseCirculars(Vec<NseCircular>),
    NsdlCirculars(Vec<NsdlCircular>),
    CdslCommuniques(Vec<CdslCommunique>),
}

/// Run `$body` with `$rows` bound to the inner vector, whatever the variant.
macro_rules! with_rows {
    ($set:expr, $rows:ident => $body:expr) => {
        match $set {
            RecordSet::SebiCirculars($rows) => $body,
            RecordSet::SebiPressReleases($rows) => $body,
            RecordSet::BseIndexNotices($rows) => $body,
            RecordSet::BseNotices($rows) => $body,
            RecordSet::NseCirculars($rows) => $body,
            RecordSet::NsdlCirculars($rows) => $body,
            RecordSet::CdslCommuniques($rows) => $body,
        }
    };
}

impl RecordSet {
    pub fn len(&self) -> usize {
        with_rows!(self, rows => rows.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flatten into a column/row table for the store.
    pub fn to_table(&self) -> Result<Table, serde_json::Error> {
        with_rows!(self, rows => Table::from_records(rows))
    }

    /// Encode as CSV with a header row.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        with_rows!(self, rows => encode_csv(rows))
    }
}

fn encode_csv<T: Serialize>(records: &[T]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Column-oriented view of a record set.
///
/// Cells stay as JSON values so the sink can infer column types from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self, serde_json::Error> {
        let mut table = Table::default();
        for record in records {
            let Value::Object(fields) = serde_json::to_value(record)? else {
                return Err(serde::ser::Error::custom("record did not serialize to an object"));
            };
            if table.columns.is_empty() {
                table.columns = fields.keys().cloned().collect();
            }
            let row = table
                .columns
                .iter()
                .map(|column| fields.get(column).cloned().unwrap_or(Value::Null))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> BseIndexNotice {
        BseIndexNotice {
            date: "19-10-2026".to_string(),
            subject: "Test Notice".to_string(),
            pdf: "https://www.bseindia.com/docs/x.pdf".to_string(),
        }
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(notice()).unwrap();
        assert_eq!(json["Date"], "19-10-2026");
        assert_eq!(json["Subject"], "Test Notice");
        assert_eq!(json["PDF"], "https://www.bseindia.com/docs/x.pdf");
    }

    #[test]
    fn test_table_preserves_field_order() {
        let set = RecordSet::NseCirculars(vec![NseCircular {
            date: "October 19, 2026".into(),
            circular_no: "NSE/CMTR/70011".into(),
            department: "CMTR".into(),
            subject: "Revision in lot size".into(),
            link: "https://nsearchives.nseindia.com/content/circulars/CMTR70011.pdf".into(),
        }]);
        let table = set.to_table().unwrap();
        assert_eq!(
            table.columns,
            vec!["Date", "Circular No", "Department", "Subject", "Link"]
        );
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][1], Value::String("NSE/CMTR/70011".into()));
    }

    #[test]
    fn test_empty_set_gives_empty_table() {
        let table = RecordSet::CdslCommuniques(vec![]).to_table().unwrap();
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn test_csv_has_header_and_quotes_commas() {
        let set = RecordSet::SebiPressReleases(vec![SebiPressRelease {
            date: "Oct 19, 2026".into(),
            title: "SEBI board meeting".into(),
            link: "https://www.sebi.gov.in/media/press-releases/oct-2026/x.html".into(),
        }]);
        let csv = String::from_utf8(set.to_csv().unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Date,Title,Link"));
        assert_eq!(
            lines.next(),
            Some("\"Oct 19, 2026\",SEBI board meeting,https://www.sebi.gov.in/media/press-releases/oct-2026/x.html")
        );
    }

    #[test]
    fn test_csv_is_deterministic() {
        let set = RecordSet::BseIndexNotices(vec![notice(), notice()]);
        assert_eq!(set.to_csv().unwrap(), set.to_csv().unwrap());
        assert_eq!(set.len(), 2);
    }
}
