//! Ad spend queries against the raw export view.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::aggregator::{self, RecordSource};
use crate::connection::Connection;
use crate::error::Result;
use crate::models::{ComparisonResult, ComparisonWindows, DailyAggregate, DateRange, MonthSummary, Record};
use crate::sql_builder::SqlBuilder;

// ---------------------------------------------------------------------------
// SpendQuery
// ---------------------------------------------------------------------------

/// Query interface for spend/conversion records and period comparisons.
pub struct SpendQuery<'a> {
    conn: &'a Connection,
    table: &'a str,
    revenue_per_conversion: Decimal,
}

impl<'a> SpendQuery<'a> {
    /// Create a new `SpendQuery` over `table`, valuing each conversion at
    /// `revenue_per_conversion`.
    pub fn new(conn: &'a Connection, table: &'a str, revenue_per_conversion: Decimal) -> Self {
        Self {
            conn,
            table,
            revenue_per_conversion,
        }
    }

    /// Raw records dated within `[range_start, range_end]`, oldest first.
    ///
    /// Missing spend or conversions are read as zero.
    pub fn records(&self, range_start: NaiveDate, range_end: NaiveDate) -> Result<Vec<Record>> {
        let range = DateRange::new(range_start, range_end)?;
        self.fetch(&range)
    }

    /// Per-day totals within `[range_start, range_end]`, oldest first.
    ///
    /// Rows with negative spend or conversions are rejected, as in
    /// [`compare_periods`](Self::compare_periods).
    pub fn daily(&self, range_start: NaiveDate, range_end: NaiveDate) -> Result<Vec<DailyAggregate>> {
        let range = DateRange::new(range_start, range_end)?;
        let records = self.fetch(&range)?;
        aggregator::validate_records(&records)?;
        aggregator::daily_aggregate(&records, &range)
    }

    /// Compare the days before `boundary` with the days from `boundary` on,
    /// within `[range_start, range_end]`.
    pub fn compare_periods(
        &self,
        boundary: NaiveDate,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<ComparisonResult> {
        aggregator::compare_source(
            self,
            boundary,
            range_start,
            range_end,
            self.revenue_per_conversion,
        )
    }

    /// Compare two explicit windows.
    pub fn compare_windows(&self, windows: &ComparisonWindows) -> Result<ComparisonResult> {
        windows.validate()?;
        let records = self.fetch(&windows.span())?;
        aggregator::compare_windows(&records, windows, self.revenue_per_conversion)
    }

    /// Calendar months present in the table with their first/last dates and
    /// row counts, newest first.
    pub fn months_available(&self, limit: Option<usize>) -> Result<Vec<MonthSummary>> {
        self.conn.ensure_views(&[self.table])?;

        let mut qb = SqlBuilder::new(self.table);
        qb.select(&[
            "CAST(CAST(date_trunc('month', CAST(\"date\" AS DATE)) AS DATE) AS VARCHAR) AS data_month",
            "CAST(MIN(CAST(\"date\" AS DATE)) AS VARCHAR) AS month_start",
            "CAST(MAX(CAST(\"date\" AS DATE)) AS VARCHAR) AS month_end",
            "COUNT(*) AS record_count",
        ])
        .where_clause("\"date\" IS NOT NULL", &[])
        .group_by(&["1"])
        .order_by(&["1 DESC"]);
        if let Some(n) = limit {
            qb.limit(n);
        }

        let (sql, params) = qb.build();
        self.conn.execute_into(&sql, &params)
    }

    fn fetch(&self, range: &DateRange) -> Result<Vec<Record>> {
        self.conn.ensure_views(&[self.table])?;

        let start = range.start.to_string();
        let end = range.end.to_string();
        let (sql, params) = SqlBuilder::new(self.table)
            .select(&[
                "CAST(CAST(\"date\" AS DATE) AS VARCHAR) AS \"date\"",
                "CAST(COALESCE(spend, 0) AS VARCHAR) AS spend",
                "CAST(COALESCE(conversions, 0) AS BIGINT) AS conversions",
            ])
            .where_date_between("\"date\"", &start, &end)
            .order_by(&["1 ASC"])
            .build();

        self.conn.execute_into(&sql, &params)
    }
}

impl RecordSource for SpendQuery<'_> {
    fn records_between(&self, range: &DateRange) -> Result<Vec<Record>> {
        self.fetch(range)
    }
}
