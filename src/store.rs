//! Append-only table store for extracted records.
//!
//! [`TableSink`] is the seam the driver writes through. [`SqlStore`] is the
//! production sink: a SQLite database reached through `sqlx`, where each
//! destination becomes the table `{dataset}_{destination}`. Tables are
//! created on first write with column types inferred from the values, new
//! columns are added when a source grows a field, and rows are only ever
//! appended.
//!
//! [`diagnose`] is the operator's connectivity check: decode credentials,
//! look for the dataset, and write a throwaway table.

use crate::config::{AppConfig, StoreCredentials};
use crate::errors::SinkError;
use crate::models::Table;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::query::Query;
use sqlx::{Row, Sqlite};
use std::error::Error;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Destination that accepts rows and keeps them.
pub trait TableSink {
    /// Append every row of `table` to `destination`, creating it if absent.
    /// Returns the number of rows written.
    async fn append(&self, destination: &str, table: &Table) -> Result<u64, SinkError>;
}

/// Upload `table` unless there is nothing to do.
///
/// Returns `Ok(0)` without touching the sink when no store client could be
/// initialized or the table has no rows.
#[instrument(level = "info", skip_all, fields(%destination, rows = table.len()))]
pub async fn upload<S: TableSink>(
    sink: Option<&S>,
    destination: &str,
    table: &Table,
) -> Result<u64, SinkError> {
    let Some(sink) = sink else {
        debug!("No store client; skipping upload");
        return Ok(0);
    };
    if table.is_empty() {
        debug!("Empty table; skipping upload");
        return Ok(0);
    }
    let t0 = Instant::now();
    let written = sink.append(destination, table).await?;
    info!(written, elapsed_ms = t0.elapsed().as_millis() as u64, "Uploaded rows");
    Ok(written)
}

/// SQL type for a column, inferred from the cells it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// The narrowest type that fits every non-null value. All-null columns are text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred: Option<ColumnType> = None;
        for value in values {
            let this = match value {
                Value::Null => continue,
                Value::Bool(_) => ColumnType::Integer,
                Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
                Value::Number(_) => ColumnType::Real,
                _ => ColumnType::Text,
            };
            inferred = Some(match (inferred, this) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Integer), ColumnType::Real)
                | (Some(ColumnType::Real), ColumnType::Integer) => ColumnType::Real,
                _ => ColumnType::Text,
            });
        }
        inferred.unwrap_or(ColumnType::Text)
    }

    fn sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlitePool,
    dataset: String,
}

impl SqlStore {
    /// Open the database named in the decoded credentials.
    #[instrument(level = "info", skip(credentials))]
    pub async fn connect(credentials: &StoreCredentials, dataset: &str) -> Result<Self, SinkError> {
        let options =
            SqliteConnectOptions::from_str(&credentials.database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        info!("Connected to table store");
        Ok(Self {
            pool,
            dataset: dataset.to_string(),
        })
    }

    /// Physical table backing `destination`.
    pub fn table_name(&self, destination: &str) -> String {
        format!("{}_{}", self.dataset, destination)
    }

    /// Tables that belong to this store's dataset.
    pub async fn dataset_tables(&self) -> Result<Vec<String>, SinkError> {
        let prefix = format!("{}_", self.dataset);
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        let mut names = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            if name.starts_with(&prefix) {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn existing_columns(&self, table_name: &str) -> Result<Vec<String>, SinkError> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table_name)))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(SinkError::from))
            .collect()
    }

    /// Create the table if missing and add any columns it lacks.
    async fn ensure_schema(&self, table_name: &str, table: &Table) -> Result<(), SinkError> {
        let types: Vec<ColumnType> = (0..table.columns.len())
            .map(|i| ColumnType::infer(table.column_values(i)))
            .collect();

        let existing = self.existing_columns(table_name).await?;
        if existing.is_empty() {
            let columns = table
                .columns
                .iter()
                .zip(&types)
                .map(|(name, ty)| format!("{} {}", quote_ident(name), ty.sql()))
                .collect::<Vec<_>>()
                .join(", ");
            let ddl = format!("CREATE TABLE IF NOT EXISTS {} ({columns})", quote_ident(table_name));
            sqlx::query(&ddl).execute(&self.pool).await?;
            info!(table = %table_name, "Created table");
            return Ok(());
        }

        for (name, ty) in table.columns.iter().zip(&types) {
            if !existing.iter().any(|c| c == name) {
                let ddl = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote_ident(table_name),
                    quote_ident(name),
                    ty.sql()
                );
                sqlx::query(&ddl).execute(&self.pool).await?;
                warn!(table = %table_name, column = %name, "Added column to existing table");
            }
        }
        Ok(())
    }

    async fn insert_rows(&self, table_name: &str, table: &Table) -> Result<u64, SinkError> {
        let columns = table.columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(table_name)
        );

        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for row in &table.rows {
            let mut query = sqlx::query(&sql);
            for value in row {
                query = bind_value(query, value);
            }
            written += query.execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Drop `destination` and write `table` in its place.
    pub async fn replace(&self, destination: &str, table: &Table) -> Result<u64, SinkError> {
        let table_name = self.table_name(destination);
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(&table_name)))
            .execute(&self.pool)
            .await?;
        self.append(destination, table).await
    }
}

impl TableSink for SqlStore {
    #[instrument(level = "info", skip(self, table), fields(rows = table.len()))]
    async fn append(&self, destination: &str, table: &Table) -> Result<u64, SinkError> {
        if table.columns.is_empty() || table.rows.iter().any(|r| r.len() != table.columns.len()) {
            return Err(SinkError::InvalidTable {
                destination: destination.to_string(),
                message: "rows do not line up with columns".to_string(),
            });
        }
        let table_name = self.table_name(destination);
        self.ensure_schema(&table_name, table).await?;
        self.insert_rows(&table_name, table).await
    }
}

/// Three-step store check run by `--diagnose`.
///
/// 1. Decode the credential blob and connect.
/// 2. Look for tables belonging to the dataset. SQLite has no separate
///    datasets, so an empty one only warns: the first upload creates it.
/// 3. Write `test_table_123`, replacing any previous copy.
pub async fn diagnose(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    info!("--- STARTING STORE DIAGNOSTIC ---");

    let Some(credentials) = config.store.as_ref() else {
        error!("❌ Step 1 FAILED: no usable store credentials (set STORE_CREDENTIALS to base64 JSON)");
        return Err("store credentials missing or undecodable".into());
    };
    let store = match SqlStore::connect(credentials, &config.dataset).await {
        Ok(store) => {
            info!(project = %config.project_label(), "✅ Step 1: credentials decoded and store reachable");
            store
        }
        Err(e) => {
            error!(error = %e, "❌ Step 1 FAILED: could not open the store");
            return Err(e.into());
        }
    };

    match store.dataset_tables().await {
        Ok(tables) if tables.is_empty() => warn!(
            dataset = %config.dataset,
            "⚠️ Step 2: dataset not found. Did you create it? Its tables will be created on first upload"
        ),
        Ok(tables) => info!(dataset = %config.dataset, count = tables.len(), "✅ Step 2: dataset found"),
        Err(e) => {
            error!(dataset = %config.dataset, error = %e, "❌ Step 2 FAILED: could not list dataset tables");
            return Err(e.into());
        }
    }

    let probe = Table {
        columns: vec!["id".to_string(), "name".to_string()],
        rows: vec![vec![Value::from(1), Value::from("Test")]],
    };
    info!(table = %store.table_name("test_table_123"), "Attempting to create test table");
    match store.replace("test_table_123", &probe).await {
        Ok(_) => {
            info!("✅ Step 3: SUCCESS! Test table created");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "❌ Step 3 FAILED: could not create test table");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    async fn temp_store(dir: &tempfile::TempDir) -> SqlStore {
        let credentials = StoreCredentials {
            kind: None,
            project_id: Some("test-project".into()),
            database_url: format!("sqlite://{}", dir.path().join("store.db").display()),
        };
        SqlStore::connect(&credentials, "stock_data").await.unwrap()
    }

    fn table(rows: &[(&str, &str)]) -> Table {
        Table {
            columns: vec!["Date".into(), "Subject".into()],
            rows: rows
                .iter()
                .map(|(d, s)| vec![Value::from(*d), Value::from(*s)])
                .collect(),
        }
    }

    async fn count(store: &SqlStore, destination: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) AS n FROM {}", quote_ident(&store.table_name(destination)));
        sqlx::query(&sql)
            .fetch_one(&store.pool)
            .await
            .unwrap()
            .get::<i64, _>("n")
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl TableSink for RecordingSink {
        async fn append(&self, destination: &str, table: &Table) -> Result<u64, SinkError> {
            self.calls.lock().unwrap().push(destination.to_string());
            Ok(table.len() as u64)
        }
    }

    #[test]
    fn test_infer_column_types() {
        let ints = [Value::from(1), Value::Null, Value::from(7)];
        assert_eq!(ColumnType::infer(&ints), ColumnType::Integer);
        let mixed = [Value::from(1), Value::from(2.5)];
        assert_eq!(ColumnType::infer(&mixed), ColumnType::Real);
        let text = [Value::from("a"), Value::from(3)];
        assert_eq!(ColumnType::infer(&text), ColumnType::Text);
        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Text);
    }

    #[tokio::test]
    async fn test_upload_empty_table_never_calls_sink() {
        let sink = RecordingSink::default();
        let written = upload(Some(&sink), "bse_index_notices", &Table::default()).await.unwrap();
        assert_eq!(written, 0);
        assert!(sink.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_client_is_noop() {
        let written = upload::<RecordingSink>(None, "bse_index_notices", &table(&[("19-10-2026", "x")]))
            .await
            .unwrap();
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn test_first_append_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;

        let first = table(&[("18-10-2026", "First")]);
        assert_eq!(store.append("bse_index_notices", &first).await.unwrap(), 1);
        let second = table(&[("19-10-2026", "Second"), ("19-10-2026", "Third")]);
        assert_eq!(store.append("bse_index_notices", &second).await.unwrap(), 2);

        assert_eq!(count(&store, "bse_index_notices").await, 3);
        assert_eq!(
            store.dataset_tables().await.unwrap(),
            vec!["stock_data_bse_index_notices".to_string()]
        );
    }

    #[tokio::test]
    async fn test_new_column_is_added() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.append("nse_circulars", &table(&[("a", "b")])).await.unwrap();

        let wider = Table {
            columns: vec!["Date".into(), "Subject".into(), "Link".into()],
            rows: vec![vec![Value::from("c"), Value::from("d"), Value::from("https://x")]],
        };
        store.append("nse_circulars", &wider).await.unwrap();

        let columns = store
            .existing_columns(&store.table_name("nse_circulars"))
            .await
            .unwrap();
        assert_eq!(columns, vec!["Date", "Subject", "Link"]);
        assert_eq!(count(&store, "nse_circulars").await, 2);
    }

    #[tokio::test]
    async fn test_ragged_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        let ragged = Table {
            columns: vec!["Date".into(), "Subject".into()],
            rows: vec![vec![Value::from("only one")]],
        };
        let err = store.append("cdsl_communiques", &ragged).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidTable { .. }));
    }

    #[tokio::test]
    async fn test_replace_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        store.append("test_table_123", &table(&[("a", "b"), ("c", "d")])).await.unwrap();
        store.replace("test_table_123", &table(&[("e", "f")])).await.unwrap();
        assert_eq!(count(&store, "test_table_123").await, 1);
    }

    fn diagnose_config(store: Option<StoreCredentials>) -> AppConfig {
        AppConfig {
            today: chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            output_dir: std::path::PathBuf::from("."),
            project_id: Some("test-project".into()),
            dataset: "stock_data".into(),
            store,
            mail: None,
            http: crate::http::HttpSettings::default(),
            workers: 1,
        }
    }

    #[tokio::test]
    async fn test_diagnose_empty_dataset_still_creates_test_table() {
        let dir = tempfile::tempdir().unwrap();
        let credentials = StoreCredentials {
            kind: Some("service_account".into()),
            project_id: Some("test-project".into()),
            database_url: format!("sqlite://{}", dir.path().join("diag.db").display()),
        };
        diagnose(&diagnose_config(Some(credentials.clone()))).await.unwrap();

        let store = SqlStore::connect(&credentials, "stock_data").await.unwrap();
        assert_eq!(store.dataset_tables().await.unwrap(), vec!["stock_data_test_table_123".to_string()]);
        assert_eq!(count(&store, "test_table_123").await, 1);
    }

    #[tokio::test]
    async fn test_diagnose_without_credentials_fails() {
        assert!(diagnose(&diagnose_config(None)).await.is_err());
    }
}
