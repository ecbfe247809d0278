//! Shared test fixtures for the ad spend metrics integration tests.
//!
//! Provides `setup_sample_db()` which creates an in-memory DuckDB connection
//! with a small `ads_spend_raw` table loaded from an NDJSON temp file, and
//! `sdk_from_csv()` which builds a full `MetricsSdk` over a CSV written to a
//! temp directory.

#![allow(dead_code)]

use adspend_metrics::{CacheManager, Connection, MetricsSdk};
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const TABLE: &str = "ads_spend_raw";

/// Parse a `YYYY-MM-DD` literal.
pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Create a `Connection` backed by a temporary cache directory with the
/// sample rows loaded into `ads_spend_raw`.
///
/// Returns `(Connection, tempfile::TempDir)`. The caller must keep the `TempDir`
/// alive for the duration of the test so the cache directory is not deleted
/// prematurely.
///
/// Sample data, per date:
///
/// | date       | rows | spend      | conversions |
/// |------------|------|------------|-------------|
/// | 2025-04-30 | 1    | 999        | 9           |
/// | 2025-05-15 | 2    | 600 + 400  | 6 + 4       |
/// | 2025-05-31 | 1    | 200        | 0           |
/// | 2025-06-01 | 1    | 300        | 5           |
/// | 2025-06-05 | 2    | 200 + 300  | 5 + 5       |
/// | 2025-06-10 | 1    | 0          | null        |
/// | 2025-07-02 | 1    | 50         | 1           |
pub fn setup_sample_db() -> (Connection, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let cache = CacheManager::new(
        Some(tmp_dir.path().to_path_buf()),
        None,
        true,
        Duration::from_secs(30),
    )
    .unwrap();
    let conn = Connection::new(cache).unwrap();

    register_ads_spend(&conn);

    (conn, tmp_dir)
}

fn register_ads_spend(conn: &Connection) {
    let rows = vec![
        serde_json::json!({"date": "2025-04-30", "spend": 999, "conversions": 9}),
        serde_json::json!({"date": "2025-05-15", "spend": 600, "conversions": 6}),
        serde_json::json!({"date": "2025-05-15", "spend": 400, "conversions": 4}),
        serde_json::json!({"date": "2025-05-31", "spend": 200, "conversions": 0}),
        serde_json::json!({"date": "2025-06-01", "spend": 300, "conversions": 5}),
        serde_json::json!({"date": "2025-06-05", "spend": 200, "conversions": 5}),
        serde_json::json!({"date": "2025-06-05", "spend": 300, "conversions": 5}),
        serde_json::json!({"date": "2025-06-10", "spend": 0, "conversions": null}),
        serde_json::json!({"date": "2025-07-02", "spend": 50, "conversions": 1}),
    ];
    write_ndjson_and_register(conn, TABLE, &rows);
}

/// Write rows to a temporary NDJSON file and register it as a DuckDB table
/// via `Connection::register_table_from_ndjson`.
fn write_ndjson_and_register(conn: &Connection, table_name: &str, rows: &[serde_json::Value]) {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();

    let path = file.path().to_str().unwrap();
    conn.register_table_from_ndjson(table_name, path).unwrap();
    // DuckDB copied the rows into an in-memory table, so dropping the file is fine
}

/// Write `contents` to `<dir>/<name>` and return the path.
pub fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Build an offline `MetricsSdk` whose source is a CSV holding `contents`.
pub fn sdk_from_csv(contents: &str) -> (MetricsSdk, tempfile::TempDir) {
    let tmp_dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&tmp_dir, "ads_spend.csv", contents);
    let sdk = MetricsSdk::builder()
        .cache_dir(tmp_dir.path().join("cache"))
        .source(csv.to_string_lossy())
        .offline(true)
        .build()
        .unwrap();
    (sdk, tmp_dir)
}
