use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, Result};

// ---------------------------------------------------------------------------
// Record — One raw row of the ad spend export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub date: NaiveDate,
    pub spend: Decimal,
    pub conversions: i64,
}

impl Record {
    pub fn new(date: NaiveDate, spend: Decimal, conversions: i64) -> Self {
        Self {
            date,
            spend,
            conversions,
        }
    }
}

// ---------------------------------------------------------------------------
// DailyAggregate — All records of one date summed together
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub spend: Decimal,
    pub conversions: i64,
}

// ---------------------------------------------------------------------------
// DateRange — Inclusive [start, end] span of dates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Re-check a range that may have been built field by field (e.g. deserialized).
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(MetricsError::InvalidRange(format!(
                "range start {} is after range end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Smallest range covering both `self` and `other`.
    pub fn span(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

// ---------------------------------------------------------------------------
// MonthSummary — Coverage of the raw table for one calendar month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthSummary {
    pub data_month: NaiveDate,
    pub month_start: NaiveDate,
    pub month_end: NaiveDate,
    pub record_count: i64,
}
