/// Shared application state available to all route handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// The async metrics SDK. Dispatches blocking DuckDB work to a thread
    /// pool internally.
    pub sdk: adspend_metrics::AsyncMetricsSdk,
}
