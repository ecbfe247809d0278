//! End-to-end smoke test against a real ad spend export.
//!
//! Point `ADSPEND_SMOKE_SOURCE` at a CSV file or http(s) URL with `date`,
//! `spend` and `conversions` columns, then run:
//! ```sh
//! ADSPEND_SMOKE_SOURCE=https://example.com/ads_spend.csv \
//!     cargo test -- --ignored --nocapture
//! ```

use adspend_metrics::models::{ComparisonWindows, DateRange, MetricSelection};
use adspend_metrics::nlq::QuestionParser;
use adspend_metrics::MetricsSdk;
use chrono::Months;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Print a section header to stderr.
fn section(name: &str) {
    eprintln!("\n{}", "=".repeat(60));
    eprintln!("  {}", name);
    eprintln!("{}", "=".repeat(60));
}

/// Counters for pass/fail reporting.
struct Counters {
    pass: usize,
    fail: usize,
}

impl Counters {
    fn new() -> Self {
        Self { pass: 0, fail: 0 }
    }

    fn check(&mut self, label: &str, condition: bool, detail: &str) {
        let status = if condition { "PASS" } else { "FAIL" };
        if condition {
            self.pass += 1;
        } else {
            self.fail += 1;
        }
        if detail.is_empty() {
            eprintln!("  [{}] {}", status, label);
        } else {
            eprintln!("  [{}] {} -- {}", status, label, detail);
        }
    }
}

// ---------------------------------------------------------------------------
// Main smoke test
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn smoke_test() {
    let source = match std::env::var("ADSPEND_SMOKE_SOURCE") {
        Ok(s) => s,
        Err(_) => {
            eprintln!("ADSPEND_SMOKE_SOURCE not set; nothing to check");
            return;
        }
    };
    let cache_dir = tempfile::tempdir().unwrap();
    let sdk = MetricsSdk::builder()
        .source(&source)
        .cache_dir(cache_dir.path())
        .build()
        .unwrap();
    let mut c = Counters::new();

    // ================================================================
    // 1. COVERAGE
    // ================================================================
    section("Months available");

    let months = sdk.spend().months_available(None).unwrap();
    c.check(
        "months_available",
        !months.is_empty(),
        &format!("{} months", months.len()),
    );
    let newest = match months.first() {
        Some(m) => m.clone(),
        None => {
            assert_eq!(c.fail, 0, "export has no dated rows");
            return;
        }
    };
    c.check(
        "months sorted newest first",
        months.windows(2).all(|w| w[0].data_month > w[1].data_month),
        "",
    );

    // ================================================================
    // 2. BOUNDARY COMPARISON
    // ================================================================
    section("compare_periods: newest month vs the one before");

    let range_start = newest
        .data_month
        .checked_sub_months(Months::new(1))
        .unwrap();
    let result = sdk
        .spend()
        .compare_periods(newest.data_month, range_start, newest.month_end)
        .unwrap();
    let row = result.to_row();
    c.check(
        "CAC undefined iff no conversions",
        row.cac_last.is_none() == (row.conv_last == 0),
        &format!("{:?}", row.cac_last),
    );
    c.check(
        "ROAS undefined iff no spend",
        row.roas_last.is_none() == row.spend_last.is_zero(),
        &format!("{:?}", row.roas_last),
    );
    let selected = row.select(&"CAC,ROAS".parse::<MetricSelection>().unwrap()).unwrap();
    c.check("select CAC,ROAS", selected.len() == 6, "");

    // ================================================================
    // 3. WINDOWS / NLQ
    // ================================================================
    section("compare_windows via question parser");

    let parser = QuestionParser::new(newest.month_end);
    let parsed = parser.parse("last 7 days vs prior 7 days").unwrap();
    let windowed = sdk.spend().compare_windows(&parsed.windows).unwrap();
    c.check(
        "parsed windows compare",
        windowed.current.spend >= rust_decimal::Decimal::ZERO,
        &format!("{:?}", parsed.windows),
    );

    let whole = ComparisonWindows::new(
        DateRange::new(range_start, newest.data_month.pred_opt().unwrap()).unwrap(),
        DateRange::new(newest.data_month, newest.month_end).unwrap(),
    )
    .unwrap();
    let via_windows = sdk.spend().compare_windows(&whole).unwrap();
    c.check(
        "windows agree with boundary form",
        via_windows == result,
        "",
    );

    // ================================================================
    // 4. REFRESH / DISPLAY
    // ================================================================
    section("Refresh & Display");

    let stale = sdk.refresh().unwrap();
    c.check("refresh()", true, &format!("stale={}", stale));
    let display = format!("{}", sdk);
    c.check(
        "Display impl",
        display.contains("MetricsSdk"),
        &format!("display={}", display),
    );
    sdk.close();

    // ================================================================
    // SUMMARY
    // ================================================================
    section("SMOKE TEST COMPLETE");

    eprintln!("  Passed:  {}", c.pass);
    eprintln!("  Failed:  {}", c.fail);
    eprintln!();

    assert_eq!(c.fail, 0, "{} smoke test checks failed", c.fail);
}
