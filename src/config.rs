use std::path::PathBuf;

use rust_decimal::Decimal;

/// Table (or view) holding the raw ad spend export.
pub const DEFAULT_TABLE: &str = "ads_spend_raw";

/// File name used for a downloaded source inside the cache directory.
pub const CACHED_SOURCE_FILE: &str = "ads_spend.csv";

/// Name of the file recording the remote validator (ETag / Last-Modified)
/// of the cached download.
pub const VERSION_FILE: &str = "version.txt";

/// Revenue attributed to one conversion when the caller does not override it.
pub const DEFAULT_REVENUE_PER_CONVERSION: Decimal = Decimal::ONE_HUNDRED;

/// Columns the raw table must expose for the aggregator to read it.
pub fn required_columns() -> [&'static str; 3] {
    ["date", "spend", "conversions"]
}

/// True when `source` should be fetched over HTTP rather than read from disk.
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("adspend-metrics")
    } else {
        PathBuf::from(".adspend-metrics-cache")
    }
}
