use std::sync::Arc;

use adspend_metrics::nlq::QuestionParser;
use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NlqRequest {
    pub question: String,
    #[serde(default = "default_execute")]
    pub execute: bool,
}

fn default_execute() -> bool {
    true
}

/// POST /nlq/parse  `{"question": "CAC and ROAS last 30 days vs prior 30 days", "execute": true}`
///
/// Map the question to two comparison windows. Unless `execute` is
/// `false` the comparison is run and its (metric-filtered) row returned too.
pub async fn parse(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NlqRequest>,
) -> Result<Json<Value>, AppError> {
    let parser = QuestionParser::new(chrono::Local::now().date_naive());
    let parsed = parser.parse(&req.question).ok_or_else(|| {
        AppError::bad_request("Could not interpret the time periods in the question")
    })?;
    let suggested_url = parser.suggested_url(&req.question, "/metrics");

    if !req.execute {
        return Ok(Json(json!({
            "metrics": parsed.metrics.names(),
            "time_periods": parsed.time_periods,
            "ranges": parsed.windows,
            "suggested_url": suggested_url
        })));
    }

    let windows = parsed.windows;
    let result = state
        .sdk
        .run(move |s| s.spend().compare_windows(&windows))
        .await?;

    Ok(Json(json!({
        "question": req.question,
        "metrics": parsed.metrics.names(),
        "ranges": parsed.windows,
        "suggested_url": suggested_url,
        "result": result.to_row().select(&parsed.metrics)?
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_defaults_to_true() {
        let req: NlqRequest = serde_json::from_str(r#"{"question": "may vs june"}"#).unwrap();
        assert!(req.execute);

        let req: NlqRequest =
            serde_json::from_str(r#"{"question": "may vs june", "execute": false}"#).unwrap();
        assert!(!req.execute);
    }
}
