use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::record::DateRange;
use crate::error::{MetricsError, Result};

// ---------------------------------------------------------------------------
// PeriodLabel — Which side of the comparison a date belongs to
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodLabel {
    Previous,
    Current,
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::Previous => f.write_str("previous"),
            PeriodLabel::Current => f.write_str("current"),
        }
    }
}

// ---------------------------------------------------------------------------
// PeriodTotals — Additive sums for one period
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub spend: Decimal,
    pub conversions: i64,
}

impl PeriodTotals {
    /// Field-wise sum, or `None` if either total overflows.
    pub fn checked_add(self, rhs: PeriodTotals) -> Option<PeriodTotals> {
        Some(PeriodTotals {
            spend: self.spend.checked_add(rhs.spend)?,
            conversions: self.conversions.checked_add(rhs.conversions)?,
        })
    }
}

/// Totals for both periods after gap-filling. Always complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledPeriods {
    pub previous: PeriodTotals,
    pub current: PeriodTotals,
}

impl FilledPeriods {
    pub fn get(&self, label: PeriodLabel) -> PeriodTotals {
        match label {
            PeriodLabel::Previous => self.previous,
            PeriodLabel::Current => self.current,
        }
    }
}

// ---------------------------------------------------------------------------
// PeriodAggregate — Totals plus derived metrics (full precision)
// ---------------------------------------------------------------------------

/// `None` in `cac` / `roas` means the metric is undefined (zero denominator),
/// which is distinct from a zero value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub period: PeriodLabel,
    pub spend: Decimal,
    pub conversions: i64,
    pub revenue: Decimal,
    #[serde(rename = "CAC")]
    pub cac: Option<Decimal>,
    #[serde(rename = "ROAS")]
    pub roas: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// ComparisonWindows — Two explicit date windows to compare
// ---------------------------------------------------------------------------

/// Explicit previous/current windows. Unlike the boundary form they need not
/// be adjacent; dates falling in neither window are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonWindows {
    pub previous: DateRange,
    pub current: DateRange,
}

impl ComparisonWindows {
    pub fn new(previous: DateRange, current: DateRange) -> Result<Self> {
        let windows = Self { previous, current };
        windows.validate()?;
        Ok(windows)
    }

    pub fn validate(&self) -> Result<()> {
        self.previous.validate()?;
        self.current.validate()?;
        if self.previous.overlaps(&self.current) {
            return Err(MetricsError::InvalidRange(format!(
                "previous window {}..={} overlaps current window {}..={}",
                self.previous.start, self.previous.end, self.current.start, self.current.end
            )));
        }
        Ok(())
    }

    pub fn classify(&self, date: NaiveDate) -> Option<PeriodLabel> {
        if self.current.contains(date) {
            Some(PeriodLabel::Current)
        } else if self.previous.contains(date) {
            Some(PeriodLabel::Previous)
        } else {
            None
        }
    }

    /// Range covering both windows; used as the record pre-filter.
    pub fn span(&self) -> DateRange {
        self.previous.span(&self.current)
    }
}
