//! Period-over-period aggregation of spend and conversions.
//!
//! The computation runs as four pure stages, each exposed on its own so it can
//! be checked in isolation:
//!
//! 1. [`daily_aggregate`] -- drop records outside the range, sum per date
//! 2. [`period_aggregate`] -- label each day and sum per period
//! 3. [`fill_missing_periods`] -- zero totals for a period with no days
//! 4. [`derive_comparison`] -- revenue, CAC, ROAS and percentage deltas
//!
//! A zero denominator yields `None` (undefined), and an undefined operand
//! makes every delta built on it undefined as well. Sums, products or
//! quotients that leave the `Decimal` / `i64` range fail the whole call with
//! [`MetricsError::InvalidRecord`] instead of panicking or reading as
//! undefined.
//! Values keep full precision here; rounding happens in
//! [`ComparisonResult::to_row`].
//!
//! # Example
//!
//! ```rust
//! use adspend_metrics::aggregator;
//! use adspend_metrics::models::Record;
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
//! let records = vec![Record::new(d("2025-05-15"), Decimal::from(1000), 10)];
//! let result = aggregator::compare(
//!     &records,
//!     d("2025-06-01"),
//!     d("2025-05-01"),
//!     d("2025-06-30"),
//!     Decimal::from(100),
//! )
//! .unwrap();
//! assert_eq!(result.previous.cac, Some(Decimal::from(100)));
//! assert_eq!(result.current.cac, None);
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::models::{
    ComparisonResult, ComparisonWindows, DailyAggregate, DateRange, FilledPeriods, MetricDeltas,
    PeriodAggregate, PeriodLabel, PeriodTotals, Record,
};

// ---------------------------------------------------------------------------
// RecordSource
// ---------------------------------------------------------------------------

/// Anything able to yield raw records for an inclusive date range.
///
/// Implementations may return records outside the range; the aggregator
/// filters again before summing.
pub trait RecordSource {
    fn records_between(&self, range: &DateRange) -> Result<Vec<Record>>;
}

impl RecordSource for [Record] {
    fn records_between(&self, range: &DateRange) -> Result<Vec<Record>> {
        Ok(self
            .iter()
            .filter(|r| range.contains(r.date))
            .cloned()
            .collect())
    }
}

impl RecordSource for Vec<Record> {
    fn records_between(&self, range: &DateRange) -> Result<Vec<Record>> {
        self.as_slice().records_between(range)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Compare the period before `boundary` with the period starting at it,
/// both clipped to `[range_start, range_end]`.
///
/// Fails before any aggregation with [`MetricsError::InvalidRange`] when
/// `range_start > range_end` or `boundary` lies outside the range,
/// [`MetricsError::InvalidConfiguration`] for a negative
/// `revenue_per_conversion`, and [`MetricsError::InvalidRecord`] when any
/// record carries negative spend or conversions.
pub fn compare(
    records: &[Record],
    boundary: NaiveDate,
    range_start: NaiveDate,
    range_end: NaiveDate,
    revenue_per_conversion: Decimal,
) -> Result<ComparisonResult> {
    let range = DateRange::new(range_start, range_end)?;
    if !range.contains(boundary) {
        return Err(MetricsError::InvalidRange(format!(
            "boundary {} outside range {}..={}",
            boundary, range_start, range_end
        )));
    }
    validate_revenue_per_conversion(revenue_per_conversion)?;
    validate_records(records)?;

    let daily = daily_aggregate(records, &range)?;
    let totals = period_aggregate(&daily, |date| Some(classify(date, boundary)))?;
    let filled = fill_missing_periods(&totals);
    debug!(
        records = records.len(),
        days = daily.len(),
        %boundary,
        "compared periods"
    );
    derive_comparison(&filled, revenue_per_conversion)
}

/// Compare two explicit windows. Days in neither window are ignored.
pub fn compare_windows(
    records: &[Record],
    windows: &ComparisonWindows,
    revenue_per_conversion: Decimal,
) -> Result<ComparisonResult> {
    windows.validate()?;
    validate_revenue_per_conversion(revenue_per_conversion)?;
    validate_records(records)?;

    let daily = daily_aggregate(records, &windows.span())?;
    let totals = period_aggregate(&daily, |date| windows.classify(date))?;
    let filled = fill_missing_periods(&totals);
    debug!(
        records = records.len(),
        days = daily.len(),
        "compared windows"
    );
    derive_comparison(&filled, revenue_per_conversion)
}

/// Fetch from `source` and run [`compare`] on the result.
pub fn compare_source<S: RecordSource + ?Sized>(
    source: &S,
    boundary: NaiveDate,
    range_start: NaiveDate,
    range_end: NaiveDate,
    revenue_per_conversion: Decimal,
) -> Result<ComparisonResult> {
    let range = DateRange::new(range_start, range_end)?;
    let records = source.records_between(&range)?;
    compare(
        &records,
        boundary,
        range_start,
        range_end,
        revenue_per_conversion,
    )
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_revenue_per_conversion(value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(MetricsError::InvalidConfiguration(format!(
            "revenue_per_conversion must be >= 0, got {}",
            value
        )));
    }
    Ok(())
}

/// Reject the whole input if any record is negative. Nothing is clamped.
pub fn validate_records(records: &[Record]) -> Result<()> {
    for (idx, record) in records.iter().enumerate() {
        if record.spend < Decimal::ZERO {
            return Err(MetricsError::InvalidRecord(format!(
                "record {} ({}) has negative spend {}",
                idx, record.date, record.spend
            )));
        }
        if record.conversions < 0 {
            return Err(MetricsError::InvalidRecord(format!(
                "record {} ({}) has negative conversions {}",
                idx, record.date, record.conversions
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stage 1: filter & daily aggregate
// ---------------------------------------------------------------------------

/// Sum records per date within `range`, ordered by date. Dates without
/// records are absent.
///
/// Fails with [`MetricsError::InvalidRecord`] when a day's spend or
/// conversions overflow.
pub fn daily_aggregate(records: &[Record], range: &DateRange) -> Result<Vec<DailyAggregate>> {
    let mut by_date: BTreeMap<NaiveDate, PeriodTotals> = BTreeMap::new();
    for record in records.iter().filter(|r| range.contains(r.date)) {
        let entry = by_date.entry(record.date).or_default();
        let row = PeriodTotals {
            spend: record.spend,
            conversions: record.conversions,
        };
        *entry = entry
            .checked_add(row)
            .ok_or_else(|| overflow(format!("daily totals for {}", record.date)))?;
    }
    Ok(by_date
        .into_iter()
        .map(|(date, totals)| DailyAggregate {
            date,
            spend: totals.spend,
            conversions: totals.conversions,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Stage 2: classify & period aggregate
// ---------------------------------------------------------------------------

/// `boundary` is the first day of the current period.
pub fn classify(date: NaiveDate, boundary: NaiveDate) -> PeriodLabel {
    if date < boundary {
        PeriodLabel::Previous
    } else {
        PeriodLabel::Current
    }
}

/// Sum daily aggregates per label. Days the classifier maps to `None` are
/// dropped. Labels with no days are absent from the map.
pub fn period_aggregate<F>(
    daily: &[DailyAggregate],
    classifier: F,
) -> Result<BTreeMap<PeriodLabel, PeriodTotals>>
where
    F: Fn(NaiveDate) -> Option<PeriodLabel>,
{
    let mut totals: BTreeMap<PeriodLabel, PeriodTotals> = BTreeMap::new();
    for day in daily {
        if let Some(label) = classifier(day.date) {
            let entry = totals.entry(label).or_default();
            let row = PeriodTotals {
                spend: day.spend,
                conversions: day.conversions,
            };
            *entry = entry
                .checked_add(row)
                .ok_or_else(|| overflow(format!("{} period totals", label)))?;
        }
    }
    Ok(totals)
}

// ---------------------------------------------------------------------------
// Stage 3: fill missing periods
// ---------------------------------------------------------------------------

pub fn fill_missing_periods(totals: &BTreeMap<PeriodLabel, PeriodTotals>) -> FilledPeriods {
    FilledPeriods {
        previous: totals.get(&PeriodLabel::Previous).copied().unwrap_or_default(),
        current: totals.get(&PeriodLabel::Current).copied().unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Stage 4: derive metrics & deltas
// ---------------------------------------------------------------------------

/// `numerator / denominator`, or `Ok(None)` when the denominator is zero.
///
/// A quotient too large for `Decimal` is an error, never `None`.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Result<Option<Decimal>> {
    if denominator.is_zero() {
        return Ok(None);
    }
    numerator
        .checked_div(denominator)
        .map(Some)
        .ok_or_else(|| overflow(format!("{} / {}", numerator, denominator)))
}

/// `(current - previous) / previous * 100`; undefined if either side is
/// undefined or `previous` is zero.
pub fn delta_pct(current: Option<Decimal>, previous: Option<Decimal>) -> Result<Option<Decimal>> {
    let (current, previous) = match (current, previous) {
        (Some(c), Some(p)) => (c, p),
        _ => return Ok(None),
    };
    let change = current
        .checked_sub(previous)
        .ok_or_else(|| overflow(format!("{} - {}", current, previous)))?;
    match safe_div(change, previous)? {
        None => Ok(None),
        Some(ratio) => ratio
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(Some)
            .ok_or_else(|| overflow(format!("{} percent", ratio))),
    }
}

pub fn derive_metrics(
    period: PeriodLabel,
    totals: PeriodTotals,
    revenue_per_conversion: Decimal,
) -> Result<PeriodAggregate> {
    let conversions = Decimal::from(totals.conversions);
    let revenue = conversions
        .checked_mul(revenue_per_conversion)
        .ok_or_else(|| overflow(format!("{} revenue", period)))?;
    Ok(PeriodAggregate {
        period,
        spend: totals.spend,
        conversions: totals.conversions,
        revenue,
        cac: safe_div(totals.spend, conversions)?,
        roas: safe_div(revenue, totals.spend)?,
    })
}

pub fn derive_comparison(
    filled: &FilledPeriods,
    revenue_per_conversion: Decimal,
) -> Result<ComparisonResult> {
    let previous = derive_metrics(
        PeriodLabel::Previous,
        filled.get(PeriodLabel::Previous),
        revenue_per_conversion,
    )?;
    let current = derive_metrics(
        PeriodLabel::Current,
        filled.get(PeriodLabel::Current),
        revenue_per_conversion,
    )?;

    let deltas_pct = MetricDeltas {
        spend: delta_pct(Some(current.spend), Some(previous.spend))?,
        conversions: delta_pct(
            Some(Decimal::from(current.conversions)),
            Some(Decimal::from(previous.conversions)),
        )?,
        revenue: delta_pct(Some(current.revenue), Some(previous.revenue))?,
        cac: delta_pct(current.cac, previous.cac)?,
        roas: delta_pct(current.roas, previous.roas)?,
    };

    Ok(ComparisonResult {
        previous,
        current,
        deltas_pct,
    })
}

fn overflow(what: String) -> MetricsError {
    MetricsError::InvalidRecord(format!("{} overflows the supported numeric range", what))
}
