use std::sync::Arc;

use adspend_metrics::models::{ComparisonWindows, DateRange, MetricSelection};
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct WindowParams {
    pub first_start: String,
    pub first_end: String,
    pub second_start: String,
    pub second_end: String,
    pub metrics: Option<String>,
}

#[derive(Deserialize)]
pub struct BoundaryParams {
    pub boundary: String,
    pub range_start: String,
    pub range_end: String,
    pub metrics: Option<String>,
}

/// GET /metrics?first_start=2025-05-01&first_end=2025-05-31&second_start=2025-06-01&second_end=2025-06-30&metrics=CAC,ROAS
///
/// Compare two explicit windows. The first window is the previous period,
/// the second the current one.
pub async fn compare_windows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Value>, AppError> {
    let previous = DateRange::new(
        parse_date("first_start", &params.first_start)?,
        parse_date("first_end", &params.first_end)?,
    )?;
    let current = DateRange::new(
        parse_date("second_start", &params.second_start)?,
        parse_date("second_end", &params.second_end)?,
    )?;
    let windows = ComparisonWindows::new(previous, current)?;
    let selection = parse_selection(params.metrics.as_deref())?;

    let result = state
        .sdk
        .run(move |s| s.spend().compare_windows(&windows))
        .await?;

    Ok(Json(json!({
        "periods": { "first": windows.previous, "second": windows.current },
        "metrics": selection.names(),
        "result": result.to_row().select(&selection)?
    })))
}

/// GET /metrics/compare?boundary=2025-06-01&range_start=2025-05-01&range_end=2025-06-30
///
/// Days before `boundary` form the previous period, days from it on the
/// current one.
pub async fn compare_boundary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BoundaryParams>,
) -> Result<Json<Value>, AppError> {
    let boundary = parse_date("boundary", &params.boundary)?;
    let range_start = parse_date("range_start", &params.range_start)?;
    let range_end = parse_date("range_end", &params.range_end)?;
    let selection = parse_selection(params.metrics.as_deref())?;

    let result = state
        .sdk
        .run(move |s| s.spend().compare_periods(boundary, range_start, range_end))
        .await?;

    Ok(Json(json!({
        "boundary": boundary,
        "range": { "start": range_start, "end": range_end },
        "metrics": selection.names(),
        "result": result.to_row().select(&selection)?
    })))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::bad_request(format!("Invalid date for {field}: {value}. Use YYYY-MM-DD"))
    })
}

fn parse_selection(raw: Option<&str>) -> Result<MetricSelection, AppError> {
    Ok(raw.unwrap_or("all").parse::<MetricSelection>()?)
}
