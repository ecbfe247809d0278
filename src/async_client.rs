//! Async wrapper around [`MetricsSdk`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all SDK operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free.
//! Aggregation is pure CPU work and DuckDB queries are fast, so this keeps
//! request handlers responsive without a dedicated worker.
//!
//! # Example
//!
//! ```no_run
//! use adspend_metrics::AsyncMetricsSdk;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> adspend_metrics::Result<()> {
//! let sdk = AsyncMetricsSdk::builder()
//!     .source("data/ads_spend.csv")
//!     .build()
//!     .await?;
//!
//! let boundary = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
//! let result = sdk
//!     .run(move |s| s.spend().compare_periods(boundary, start, end))
//!     .await?;
//! println!("{:?}", result.to_row());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{MetricsError, Result};
use crate::{MetricsSdk, MetricsSdkBuilder};

// ---------------------------------------------------------------------------
// AsyncMetricsSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncMetricsSdk`] instance.
///
/// Accepts the same options as [`MetricsSdkBuilder`].
#[derive(Debug, Clone, Default)]
pub struct AsyncMetricsSdkBuilder {
    inner: MetricsSdkBuilder,
}

impl AsyncMetricsSdkBuilder {
    /// Set a custom cache directory.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.inner = self.inner.cache_dir(path);
        self
    }

    /// Set the CSV export to read: a local path or an http(s) URL.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.inner = self.inner.source(source);
        self
    }

    /// Name of the DuckDB view the export is registered as.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.inner = self.inner.table(table);
        self
    }

    /// Revenue attributed to each conversion.
    pub fn revenue_per_conversion(mut self, value: Decimal) -> Self {
        self.inner = self.inner.revenue_per_conversion(value);
        self
    }

    /// Enable or disable offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.inner = self.inner.offline(offline);
        self
    }

    /// Set the HTTP request timeout for downloads.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Build the async SDK, initializing the cache and DuckDB connection.
    ///
    /// Initialization runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncMetricsSdk> {
        tokio::task::spawn_blocking(move || {
            let sdk = self.inner.build()?;
            Ok(AsyncMetricsSdk {
                inner: Arc::new(Mutex::new(sdk)),
            })
        })
        .await
        .map_err(|e| MetricsError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncMetricsSdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`MetricsSdk`].
///
/// All operations are dispatched to a blocking thread pool via
/// [`tokio::task::spawn_blocking`]. The underlying [`MetricsSdk`] is
/// protected by a [`Mutex`] since it uses `RefCell` internally.
pub struct AsyncMetricsSdk {
    inner: Arc<Mutex<MetricsSdk>>,
}

impl Clone for AsyncMetricsSdk {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl AsyncMetricsSdk {
    /// Create a new builder for configuring the async SDK.
    pub fn builder() -> AsyncMetricsSdkBuilder {
        AsyncMetricsSdkBuilder::default()
    }

    /// Run a sync SDK operation on the blocking thread pool.
    ///
    /// The closure receives an `&MetricsSdk` reference and should return
    /// a `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&MetricsSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = sdk
                .lock()
                .map_err(|_| MetricsError::InvalidArgument("SDK lock poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| MetricsError::InvalidArgument(format!("Task join error: {e}")))?
    }

    /// Execute a raw SQL query asynchronously.
    pub async fn sql(
        &self,
        query: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let query = query.to_string();
        let params = params.to_vec();
        self.run(move |s| s.sql(&query, &params)).await
    }

    /// Check whether a remote export changed and reset views if so.
    pub async fn refresh(&self) -> Result<bool> {
        self.run(|s| s.refresh()).await
    }

    /// Return the list of currently registered DuckDB view names.
    pub async fn views(&self) -> Result<Vec<String>> {
        self.run(|s| Ok(s.views())).await
    }
}
