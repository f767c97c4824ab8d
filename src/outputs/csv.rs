//! CSV extracts attached to the report email.
//!
//! Files are named `{SourceLabel}_{YYYY-MM-DD}.csv`, with spaces in the label
//! replaced by underscores. Re-running on the same day overwrites the file
//! with the same content when the source is unchanged.

use crate::errors::ExtractError;
use crate::models::RecordSet;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of the extract for `label` on `date`.
pub fn file_name(label: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", label.replace(' ', "_"), date.format("%Y-%m-%d"))
}

/// Write `records` to `{output_dir}/{file_name}` and return the path.
#[instrument(level = "info", skip_all, fields(%label, rows = records.len()))]
pub async fn write_extract(
    output_dir: &Path,
    label: &str,
    date: NaiveDate,
    records: &RecordSet,
) -> Result<PathBuf, ExtractError> {
    let bytes = records.to_csv()?;
    let path = output_dir.join(file_name(label, date));
    fs::write(&path, bytes).await?;
    info!(path = %path.display(), "Wrote extract");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BseIndexNotice;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_file_name_pattern() {
        assert_eq!(file_name("BSE Index", day()), "BSE_Index_2026-10-19.csv");
        assert_eq!(
            file_name("SEBI Press Releases", day()),
            "SEBI_Press_Releases_2026-10-19.csv"
        );
    }

    #[tokio::test]
    async fn test_write_extract_roundtrips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let records = RecordSet::BseIndexNotices(vec![BseIndexNotice {
            date: "19-10-2026".into(),
            subject: "Test Notice".into(),
            pdf: "https://www.bseindia.com/docs/x.pdf".into(),
        }]);

        let path = write_extract(dir.path(), "BSE Index", day(), &records)
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("BSE_Index_2026-10-19.csv"));

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, records.to_csv().unwrap());
    }
}
