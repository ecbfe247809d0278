//! SpendQuery integration tests against the sample DuckDB table.

mod common;

use adspend_metrics::models::{ComparisonWindows, DateRange};
use adspend_metrics::queries::SpendQuery;
use adspend_metrics::{MetricsError, MetricsSdk};
use common::{d, TABLE};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ---------------------------------------------------------------------------
// records / daily
// ---------------------------------------------------------------------------

#[test]
fn records_returns_rows_in_range_oldest_first() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let records = q.records(d("2025-05-01"), d("2025-06-30")).unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(records.first().unwrap().date, d("2025-05-15"));
    assert_eq!(records.last().unwrap().date, d("2025-06-10"));
}

#[test]
fn records_reads_missing_conversions_as_zero() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let records = q.records(d("2025-06-10"), d("2025-06-10")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].conversions, 0);
    assert_eq!(records[0].spend, Decimal::ZERO);
}

#[test]
fn records_rejects_inverted_range() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let err = q.records(d("2025-06-30"), d("2025-05-01")).unwrap_err();
    assert!(matches!(err, MetricsError::InvalidRange(_)));
}

#[test]
fn daily_sums_same_day_rows() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let daily = q.daily(d("2025-05-01"), d("2025-06-30")).unwrap();
    let dates: Vec<_> = daily.iter().map(|a| a.date).collect();
    assert_eq!(
        dates,
        vec![
            d("2025-05-15"),
            d("2025-05-31"),
            d("2025-06-01"),
            d("2025-06-05"),
            d("2025-06-10")
        ]
    );
    assert_eq!(daily[0].spend, dec!(1000));
    assert_eq!(daily[0].conversions, 10);
    assert_eq!(daily[3].spend, dec!(500));
    assert_eq!(daily[3].conversions, 10);
}

// ---------------------------------------------------------------------------
// compare_periods
// ---------------------------------------------------------------------------

#[test]
fn compare_periods_computes_rounded_row() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let result = q
        .compare_periods(d("2025-06-01"), d("2025-05-01"), d("2025-06-30"))
        .unwrap();
    assert_eq!(result.previous.spend, dec!(1200));
    assert_eq!(result.previous.conversions, 10);
    assert_eq!(result.current.spend, dec!(800));
    assert_eq!(result.current.conversions, 15);

    let row = result.to_row();
    assert_eq!(row.spend_last, dec!(800));
    assert_eq!(row.spend_prev, dec!(1200));
    assert_eq!(row.conv_last, 15);
    assert_eq!(row.conv_prev, 10);
    assert_eq!(row.revenue_last, dec!(1500));
    assert_eq!(row.revenue_prev, dec!(1000));
    assert_eq!(row.cac_last, Some(dec!(53.33)));
    assert_eq!(row.cac_prev, Some(dec!(120)));
    assert_eq!(row.roas_last, Some(dec!(1.88)));
    assert_eq!(row.roas_prev, Some(dec!(0.83)));
    assert_eq!(row.spend_delta_pct, Some(dec!(-33.33)));
    assert_eq!(row.conversions_delta_pct, Some(dec!(50)));
    assert_eq!(row.revenue_delta_pct, Some(dec!(50)));
    assert_eq!(row.cac_delta_pct, Some(dec!(-55.56)));
    assert_eq!(row.roas_delta_pct, Some(dec!(125)));
}

#[test]
fn compare_periods_uses_configured_revenue_per_conversion() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(40));

    let result = q
        .compare_periods(d("2025-06-01"), d("2025-05-01"), d("2025-06-30"))
        .unwrap();
    assert_eq!(result.current.revenue, dec!(600));
    assert_eq!(result.current.roas, Some(dec!(0.75)));
}

#[test]
fn compare_periods_with_empty_range_has_undefined_deltas() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let result = q
        .compare_periods(d("2024-01-15"), d("2024-01-01"), d("2024-01-31"))
        .unwrap();
    assert_eq!(result.previous.spend, Decimal::ZERO);
    assert_eq!(result.current.spend, Decimal::ZERO);
    assert_eq!(result.deltas_pct.spend, None);
    assert_eq!(result.deltas_pct.cac, None);
}

// ---------------------------------------------------------------------------
// compare_windows
// ---------------------------------------------------------------------------

#[test]
fn compare_windows_against_empty_previous_window() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));
    let windows = ComparisonWindows::new(
        DateRange::new(d("2025-05-01"), d("2025-05-07")).unwrap(),
        DateRange::new(d("2025-06-01"), d("2025-06-07")).unwrap(),
    )
    .unwrap();

    let result = q.compare_windows(&windows).unwrap();
    assert_eq!(result.previous.spend, Decimal::ZERO);
    assert_eq!(result.current.spend, dec!(800));
    assert_eq!(result.current.conversions, 15);
    assert_eq!(result.deltas_pct.spend, None);
    assert_eq!(result.deltas_pct.roas, None);
}

// ---------------------------------------------------------------------------
// months_available
// ---------------------------------------------------------------------------

#[test]
fn months_available_lists_newest_first() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let months = q.months_available(None).unwrap();
    let starts: Vec<_> = months.iter().map(|m| m.data_month).collect();
    assert_eq!(
        starts,
        vec![
            d("2025-07-01"),
            d("2025-06-01"),
            d("2025-05-01"),
            d("2025-04-01")
        ]
    );

    let june = &months[1];
    assert_eq!(june.month_start, d("2025-06-01"));
    assert_eq!(june.month_end, d("2025-06-10"));
    assert_eq!(june.record_count, 4);
}

#[test]
fn months_available_respects_limit() {
    let (conn, _tmp) = common::setup_sample_db();
    let q = SpendQuery::new(&conn, TABLE, dec!(100));

    let months = q.months_available(Some(2)).unwrap();
    assert_eq!(months.len(), 2);
    assert_eq!(months[0].data_month, d("2025-07-01"));
}

// ---------------------------------------------------------------------------
// MetricsSdk over a CSV export
// ---------------------------------------------------------------------------

const CSV: &str = "\
date,platform,account,campaign,spend,clicks,impressions,conversions
2025-05-15,meta,acct-1,summer,1000.00,120,5000,10
2025-06-05,google,acct-2,brand,200.00,40,900,5
2025-06-05,meta,acct-1,summer,300.00,60,1500,5
";

#[test]
fn sdk_compares_periods_from_csv_source() {
    let (sdk, _tmp) = common::sdk_from_csv(CSV);

    let result = sdk
        .spend()
        .compare_periods(d("2025-06-01"), d("2025-05-01"), d("2025-06-30"))
        .unwrap();
    assert_eq!(result.previous.spend, dec!(1000));
    assert_eq!(result.previous.cac, Some(dec!(100)));
    assert_eq!(result.current.spend, dec!(500));
    assert_eq!(result.current.conversions, 10);
    assert_eq!(result.deltas_pct.spend, Some(dec!(-50)));
    assert!(sdk.views().contains(&"ads_spend_raw".to_string()));
}

#[test]
fn sdk_rejects_negative_spend_in_export() {
    let (sdk, _tmp) = common::sdk_from_csv(
        "date,spend,conversions\n2025-05-15,-5.00,1\n2025-06-02,10.00,1\n",
    );

    let err = sdk
        .spend()
        .compare_periods(d("2025-06-01"), d("2025-05-01"), d("2025-06-30"))
        .unwrap_err();
    assert!(matches!(err, MetricsError::InvalidRecord(_)));
}

#[test]
fn daily_rejects_negative_rows_like_compare() {
    let (sdk, _tmp) = common::sdk_from_csv(
        "date,spend,conversions\n2025-05-15,-5.00,1\n2025-06-02,10.00,1\n",
    );

    let err = sdk
        .spend()
        .daily(d("2025-05-01"), d("2025-06-30"))
        .unwrap_err();
    assert!(matches!(err, MetricsError::InvalidRecord(_)));
}

#[test]
fn sdk_rejects_negative_revenue_per_conversion() {
    let err = MetricsSdk::builder()
        .revenue_per_conversion(dec!(-1))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, MetricsError::InvalidConfiguration(_)));
}

#[test]
fn sdk_refresh_is_noop_for_local_source() {
    let (sdk, _tmp) = common::sdk_from_csv(CSV);
    sdk.spend().months_available(None).unwrap();

    assert!(!sdk.refresh().unwrap());
    assert!(sdk.views().contains(&"ads_spend_raw".to_string()));
}

#[test]
fn sdk_display_names_table_and_source() {
    let (sdk, _tmp) = common::sdk_from_csv(CSV);
    let text = sdk.to_string();
    assert!(text.starts_with("MetricsSdk(table=ads_spend_raw"));
    assert!(text.contains("ads_spend.csv"));
    assert!(text.contains("offline=true"));
}
