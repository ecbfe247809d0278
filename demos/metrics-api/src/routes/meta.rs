use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "ok": true, "service": "metrics-api" }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /metadata/months-available
///
/// Months present in the export, newest first, with first/last dates and
/// record counts.
pub async fn months_available(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let months = state
        .sdk
        .run(|s| s.spend().months_available(None))
        .await?;

    let total = months.len();
    Ok(Json(json!({
        "available_months": months,
        "total_months": total
    })))
}
