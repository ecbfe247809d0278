use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::period::PeriodAggregate;
use crate::error::{MetricsError, Result};

// ---------------------------------------------------------------------------
// MetricDeltas — Percentage change from previous to current
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub spend: Option<Decimal>,
    pub conversions: Option<Decimal>,
    pub revenue: Option<Decimal>,
    #[serde(rename = "CAC")]
    pub cac: Option<Decimal>,
    #[serde(rename = "ROAS")]
    pub roas: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// ComparisonResult — Full-precision outcome of one comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub previous: PeriodAggregate,
    pub current: PeriodAggregate,
    pub deltas_pct: MetricDeltas,
}

impl ComparisonResult {
    /// Render the flat output row. This is the only place values are rounded.
    pub fn to_row(&self) -> ComparisonRow {
        let (prev, last) = (&self.previous, &self.current);
        ComparisonRow {
            spend_last: round2(last.spend),
            spend_prev: round2(prev.spend),
            conv_last: last.conversions,
            conv_prev: prev.conversions,
            revenue_last: round2(last.revenue),
            revenue_prev: round2(prev.revenue),
            cac_last: last.cac.map(round2),
            cac_prev: prev.cac.map(round2),
            roas_last: last.roas.map(round2),
            roas_prev: prev.roas.map(round2),
            spend_delta_pct: self.deltas_pct.spend.map(round2),
            conversions_delta_pct: self.deltas_pct.conversions.map(round2),
            revenue_delta_pct: self.deltas_pct.revenue.map(round2),
            cac_delta_pct: self.deltas_pct.cac.map(round2),
            roas_delta_pct: self.deltas_pct.roas.map(round2),
        }
    }
}

/// Two decimal places, half away from zero (same as the warehouse `ROUND`).
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// ComparisonRow — Flat, rounded row served to API consumers
// ---------------------------------------------------------------------------

/// `last` is the current period, `prev` the previous one. Undefined metrics
/// serialize as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    #[serde(with = "rust_decimal::serde::float")]
    pub spend_last: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub spend_prev: Decimal,
    pub conv_last: i64,
    pub conv_prev: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_last: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue_prev: Decimal,
    #[serde(rename = "CAC_last", with = "rust_decimal::serde::float_option")]
    pub cac_last: Option<Decimal>,
    #[serde(rename = "CAC_prev", with = "rust_decimal::serde::float_option")]
    pub cac_prev: Option<Decimal>,
    #[serde(rename = "ROAS_last", with = "rust_decimal::serde::float_option")]
    pub roas_last: Option<Decimal>,
    #[serde(rename = "ROAS_prev", with = "rust_decimal::serde::float_option")]
    pub roas_prev: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub spend_delta_pct: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub conversions_delta_pct: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub revenue_delta_pct: Option<Decimal>,
    #[serde(rename = "CAC_delta_pct", with = "rust_decimal::serde::float_option")]
    pub cac_delta_pct: Option<Decimal>,
    #[serde(rename = "ROAS_delta_pct", with = "rust_decimal::serde::float_option")]
    pub roas_delta_pct: Option<Decimal>,
}

impl ComparisonRow {
    /// Serialize the row keeping only the fields of the selected metrics.
    pub fn select(
        &self,
        selection: &MetricSelection,
    ) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut map = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(MetricsError::InvalidArgument(format!(
                    "comparison row serialized to a non-object: {other}"
                )))
            }
        };
        if let MetricSelection::Only(metrics) = selection {
            map.retain(|key, _| metrics.iter().any(|m| m.field_names().contains(&key.as_str())));
        }
        Ok(map)
    }
}

// ---------------------------------------------------------------------------
// Metric / MetricSelection — Which metrics a caller asked for
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "spend")]
    Spend,
    #[serde(rename = "conversions")]
    Conversions,
    #[serde(rename = "revenue")]
    Revenue,
    #[serde(rename = "CAC")]
    Cac,
    #[serde(rename = "ROAS")]
    Roas,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Spend,
        Metric::Conversions,
        Metric::Revenue,
        Metric::Cac,
        Metric::Roas,
    ];

    /// Output-row fields carrying this metric: current, previous, delta.
    pub fn field_names(self) -> [&'static str; 3] {
        match self {
            Metric::Spend => ["spend_last", "spend_prev", "spend_delta_pct"],
            Metric::Conversions => ["conv_last", "conv_prev", "conversions_delta_pct"],
            Metric::Revenue => ["revenue_last", "revenue_prev", "revenue_delta_pct"],
            Metric::Cac => ["CAC_last", "CAC_prev", "CAC_delta_pct"],
            Metric::Roas => ["ROAS_last", "ROAS_prev", "ROAS_delta_pct"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Spend => "spend",
            Metric::Conversions => "conversions",
            Metric::Revenue => "revenue",
            Metric::Cac => "CAC",
            Metric::Roas => "ROAS",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spend" => Ok(Metric::Spend),
            "conversions" | "conv" => Ok(Metric::Conversions),
            "revenue" => Ok(Metric::Revenue),
            "cac" => Ok(Metric::Cac),
            "roas" => Ok(Metric::Roas),
            other => Err(MetricsError::InvalidArgument(format!("Unknown metric: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSelection {
    #[default]
    All,
    Only(Vec<Metric>),
}

impl MetricSelection {
    pub fn includes(&self, metric: Metric) -> bool {
        match self {
            MetricSelection::All => true,
            MetricSelection::Only(metrics) => metrics.contains(&metric),
        }
    }

    /// Metric names as the API reports them (`["all"]` for everything).
    pub fn names(&self) -> Vec<String> {
        match self {
            MetricSelection::All => vec!["all".to_string()],
            MetricSelection::Only(metrics) => metrics.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl FromStr for MetricSelection {
    type Err = MetricsError;

    /// Accepts `"all"` or a comma-separated list such as `"CAC,ROAS"`.
    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(MetricSelection::All);
        }
        let mut metrics: Vec<Metric> = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let metric: Metric = part.parse()?;
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        if metrics.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "metric selection is empty".to_string(),
            ));
        }
        Ok(MetricSelection::Only(metrics))
    }
}
