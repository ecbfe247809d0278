mod error;
mod routes;
mod state;

use std::str::FromStr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use tower_http::cors::CorsLayer;
use tracing::info;

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut builder = adspend_metrics::AsyncMetricsSdk::builder();
    if let Ok(source) = std::env::var("METRICS_SOURCE") {
        builder = builder.source(source);
    }
    if let Ok(dir) = std::env::var("METRICS_CACHE_DIR") {
        builder = builder.cache_dir(dir);
    }
    if let Ok(flag) = std::env::var("METRICS_OFFLINE") {
        builder = builder.offline(matches!(flag.as_str(), "1" | "true" | "yes"));
    }
    if let Ok(value) = std::env::var("REVENUE_PER_CONVERSION") {
        builder = builder.revenue_per_conversion(Decimal::from_str(&value)?);
    }

    info!("initializing metrics SDK");
    let sdk = builder.build().await?;
    info!("SDK ready");

    let state = Arc::new(AppState { sdk });

    let app = Router::new()
        .route("/", get(routes::meta::root))
        .route("/health", get(routes::meta::health))
        .route("/metrics", get(routes::metrics::compare_windows))
        .route("/metrics/compare", get(routes::metrics::compare_boundary))
        .route(
            "/metadata/months-available",
            get(routes::meta::months_available),
        )
        .route("/nlq/parse", post(routes::nlq::parse))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
