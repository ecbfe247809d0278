//! Ad spend period metrics for Rust.
//!
//! Compares two date periods of advertising spend and conversions and
//! reports spend, conversions, revenue, CAC (spend per conversion) and ROAS
//! (revenue per unit of spend) for each, plus period-over-period percentage
//! deltas. Undefined ratios (zero denominators) are `None`, never zero.
//!
//! Raw records come from a CSV export (local file or http(s) URL) that is
//! cached locally and queried in-process via DuckDB. The aggregation itself
//! lives in [`aggregator`] and works on any [`RecordSource`].
//!
//! # Quick start
//!
//! ```no_run
//! use adspend_metrics::MetricsSdk;
//! use chrono::NaiveDate;
//!
//! let sdk = MetricsSdk::builder()
//!     .source("data/ads_spend.csv")
//!     .build()
//!     .unwrap();
//!
//! let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
//! let result = sdk
//!     .spend()
//!     .compare_periods(d("2025-06-01"), d("2025-05-01"), d("2025-06-30"))
//!     .unwrap();
//! println!("{}", serde_json::to_string(&result.to_row()).unwrap());
//! ```

pub mod aggregator;
#[cfg(feature = "async")]
pub mod async_client;
pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod nlq;
pub mod queries;
pub mod sql_builder;

pub use aggregator::RecordSource;
#[cfg(feature = "async")]
pub use async_client::AsyncMetricsSdk;
pub use cache::CacheManager;
pub use connection::Connection;
pub use error::{MetricsError, Result};
pub use sql_builder::SqlBuilder;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::info;

// ---------------------------------------------------------------------------
// MetricsSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`MetricsSdk`] instance.
///
/// Use [`MetricsSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](MetricsSdkBuilder::build) to create the SDK.
#[derive(Debug, Clone)]
pub struct MetricsSdkBuilder {
    cache_dir: Option<PathBuf>,
    source: Option<String>,
    table: String,
    revenue_per_conversion: Decimal,
    offline: bool,
    timeout: Duration,
}

impl Default for MetricsSdkBuilder {
    fn default() -> Self {
        Self {
            cache_dir: None,
            source: None,
            table: config::DEFAULT_TABLE.to_string(),
            revenue_per_conversion: config::DEFAULT_REVENUE_PER_CONVERSION,
            offline: false,
            timeout: Duration::from_secs(120),
        }
    }
}

impl MetricsSdkBuilder {
    /// Set a custom cache directory for downloaded exports.
    ///
    /// If not set, the platform-appropriate default cache directory is used
    /// (e.g. `~/.cache/adspend-metrics` on Linux).
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the CSV export to read: a local path or an http(s) URL.
    ///
    /// The file needs a header row with at least `date`, `spend` and
    /// `conversions` columns.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Name of the DuckDB view the export is registered as.
    ///
    /// Defaults to `ads_spend_raw`.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Revenue attributed to each conversion. Defaults to 100.
    pub fn revenue_per_conversion(mut self, value: Decimal) -> Self {
        self.revenue_per_conversion = value;
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, a remote source is never downloaded and only a
    /// previously cached copy is used. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Set the HTTP request timeout for downloads.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the SDK, initializing the cache and DuckDB connection.
    ///
    /// Fails with [`MetricsError::InvalidConfiguration`] for a negative
    /// revenue per conversion. The export is not read until the first query.
    pub fn build(self) -> Result<MetricsSdk> {
        aggregator::validate_revenue_per_conversion(self.revenue_per_conversion)?;
        let cache = CacheManager::new(self.cache_dir, self.source, self.offline, self.timeout)?;
        let conn = Connection::new(cache)?;
        Ok(MetricsSdk {
            conn,
            table: self.table,
            revenue_per_conversion: self.revenue_per_conversion,
        })
    }
}

// ---------------------------------------------------------------------------
// MetricsSdk
// ---------------------------------------------------------------------------

/// The main entry point of the crate.
///
/// Wraps a [`Connection`] (which owns the [`CacheManager`] and DuckDB database)
/// and exposes query interfaces as lightweight borrowing wrappers.
///
/// Created via [`MetricsSdk::builder()`].
pub struct MetricsSdk {
    conn: Connection,
    table: String,
    revenue_per_conversion: Decimal,
}

impl MetricsSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> MetricsSdkBuilder {
        MetricsSdkBuilder::default()
    }

    /// Access the spend query interface (records, comparisons, months).
    pub fn spend(&self) -> queries::spend::SpendQuery<'_> {
        queries::spend::SpendQuery::new(&self.conn, &self.table, self.revenue_per_conversion)
    }

    /// Revenue attributed to each conversion.
    pub fn revenue_per_conversion(&self) -> Decimal {
        self.revenue_per_conversion
    }

    /// Name of the view holding the raw export.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Return the list of currently registered DuckDB view names.
    pub fn views(&self) -> Vec<String> {
        self.conn.views()
    }

    /// Execute a raw SQL query against the DuckDB database.
    ///
    /// # Arguments
    ///
    /// * `query` - SQL string with `?` positional placeholders.
    /// * `params` - Parameter values corresponding to the placeholders.
    pub fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        self.conn.execute(query, params)
    }

    /// Check whether a remote export changed and reset views if so.
    ///
    /// Returns `true` if the cached copy was stale and has been cleared
    /// (the next query downloads it again), `false` otherwise.
    pub fn refresh(&self) -> Result<bool> {
        let stale = self.conn.cache.borrow_mut().is_stale()?;
        if stale {
            self.conn.cache.borrow_mut().clear()?;
            self.conn.reset_views();
            info!("ad spend export was stale; cache cleared and views reset");
        }
        Ok(stale)
    }

    /// Consume the SDK and release all resources.
    pub fn close(self) {
        drop(self);
    }

    /// Return a reference to the underlying [`Connection`] for advanced usage.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for MetricsSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let views = self.conn.views();
        let cache = self.conn.cache.borrow();
        write!(
            f,
            "MetricsSdk(table={}, source={}, cache_dir={}, views=[{}], offline={})",
            self.table,
            cache.source.as_deref().unwrap_or("<none>"),
            cache.cache_dir.display(),
            views.join(", "),
            cache.offline
        )
    }
}
