//! Map plain-language comparison questions to metric selections and date
//! windows.
//!
//! Recognised phrasings (English, with the common Spanish month names):
//!
//! - "last 30 days vs prior 30 days" (also "previous")
//! - "this month vs last month" ("este mes" / "mes pasado")
//! - "may vs june" (calendar months of the reference year)
//! - "last week vs prior week" (also "previous")
//!
//! The reference date is always supplied by the caller; nothing here reads
//! the system clock.
//!
//! # Example
//!
//! ```rust
//! use adspend_metrics::nlq::QuestionParser;
//! use chrono::NaiveDate;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
//! let parsed = QuestionParser::new(today)
//!     .parse("Compare CAC and ROAS for last 30 days vs prior 30 days")
//!     .unwrap();
//! assert_eq!(parsed.windows.current.end, today);
//! ```

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{ComparisonWindows, DateRange, Metric, MetricSelection};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A time expression found in the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimePeriod {
    LastDays { days: u32 },
    PriorDays { days: u32 },
    CurrentMonth,
    LastMonth,
    Month { month: u32 },
    LastWeek,
    PriorWeek,
}

/// Result of parsing one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuestion {
    pub metrics: MetricSelection,
    pub time_periods: Vec<TimePeriod>,
    pub windows: ComparisonWindows,
}

impl ParsedQuestion {
    /// Query string for the `/metrics` endpoint, e.g.
    /// `first_start=2025-05-01&first_end=...&second_start=...&second_end=...`.
    pub fn query_string(&self) -> String {
        let mut qs = format!(
            "first_start={}&first_end={}&second_start={}&second_end={}",
            self.windows.previous.start,
            self.windows.previous.end,
            self.windows.current.start,
            self.windows.current.end
        );
        if let MetricSelection::Only(_) = self.metrics {
            qs.push_str("&metrics=");
            qs.push_str(&self.metrics.names().join(","));
        }
        qs
    }
}

// ---------------------------------------------------------------------------
// QuestionParser
// ---------------------------------------------------------------------------

pub struct QuestionParser {
    today: NaiveDate,
    last_days: Regex,
    prior_days: Regex,
    this_month: Regex,
    last_month: Regex,
    month_vs_month: Regex,
    last_week: Regex,
    prior_week: Regex,
}

impl QuestionParser {
    /// Create a parser resolving relative expressions against `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            last_days: compile(r"\blast (\d+) days?\b"),
            prior_days: compile(r"\b(?:prior|previous) (\d+) days?\b"),
            this_month: compile(r"\b(?:this month|este mes)\b"),
            last_month: compile(r"\b(?:last month|mes pasado)\b"),
            month_vs_month: compile(r"\b([a-z]+)\s+(?:vs\.?|versus)\s+([a-z]+)\b"),
            last_week: compile(r"\blast week\b"),
            prior_week: compile(r"\b(?:prior|previous) week\b"),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Parse a question. Returns `None` when no supported pair of periods is
    /// found or the resulting dates fall outside the calendar.
    pub fn parse(&self, question: &str) -> Option<ParsedQuestion> {
        let q = question.to_lowercase();
        let time_periods = self.extract_time_periods(&q)?;
        let windows = self.resolve_windows(&time_periods)?;
        Some(ParsedQuestion {
            metrics: extract_metrics(&q),
            time_periods,
            windows,
        })
    }

    /// `{base}?{query_string}` for a parsable question.
    pub fn suggested_url(&self, question: &str, base: &str) -> Option<String> {
        let parsed = self.parse(question)?;
        Some(format!("{}?{}", base, parsed.query_string()))
    }

    fn extract_time_periods(&self, q: &str) -> Option<Vec<TimePeriod>> {
        if let (Some(last), Some(prior)) = (self.last_days.captures(q), self.prior_days.captures(q)) {
            let last: u32 = last[1].parse().ok()?;
            let prior: u32 = prior[1].parse().ok()?;
            if last == prior && last > 0 {
                return Some(vec![
                    TimePeriod::LastDays { days: last },
                    TimePeriod::PriorDays { days: prior },
                ]);
            }
        }

        if self.this_month.is_match(q) && self.last_month.is_match(q) {
            return Some(vec![TimePeriod::CurrentMonth, TimePeriod::LastMonth]);
        }

        for caps in self.month_vs_month.captures_iter(q) {
            if let (Some(first), Some(second)) = (month_number(&caps[1]), month_number(&caps[2])) {
                return Some(vec![
                    TimePeriod::Month { month: first },
                    TimePeriod::Month { month: second },
                ]);
            }
        }

        if self.last_week.is_match(q) && self.prior_week.is_match(q) {
            return Some(vec![TimePeriod::LastWeek, TimePeriod::PriorWeek]);
        }

        None
    }

    fn resolve_windows(&self, periods: &[TimePeriod]) -> Option<ComparisonWindows> {
        let today = self.today;
        let (previous, current) = match periods {
            [TimePeriod::LastDays { days }, TimePeriod::PriorDays { .. }] => {
                let span = u64::from(days.saturating_sub(1));
                let current_start = today.checked_sub_days(Days::new(span))?;
                let previous_end = current_start.pred_opt()?;
                let previous_start = previous_end.checked_sub_days(Days::new(span))?;
                (
                    DateRange::new(previous_start, previous_end).ok()?,
                    DateRange::new(current_start, today).ok()?,
                )
            }
            [TimePeriod::CurrentMonth, TimePeriod::LastMonth] => {
                let current = month_range(today.year(), today.month())?;
                let last = month_range_containing(current.start.pred_opt()?)?;
                (last, DateRange::new(current.start, current.end.min(today)).ok()?)
            }
            [TimePeriod::Month { month: first }, TimePeriod::Month { month: second }] => (
                month_range(today.year(), *first)?,
                month_range(today.year(), *second)?,
            ),
            [TimePeriod::LastWeek, TimePeriod::PriorWeek] => {
                let last_end = today.pred_opt()?;
                let last_start = last_end.checked_sub_days(Days::new(6))?;
                let prior_end = last_start.pred_opt()?;
                let prior_start = prior_end.checked_sub_days(Days::new(6))?;
                (
                    DateRange::new(prior_start, prior_end).ok()?,
                    DateRange::new(last_start, last_end).ok()?,
                )
            }
            _ => return None,
        };
        ComparisonWindows::new(previous, current).ok()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn compile(pattern: &str) -> Regex {
    // Patterns are literals in this module; a failure is a programming error.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern}: {e}"))
}

/// Word-level metric detection. "CAC" together with "ROAS" selects both;
/// otherwise keywords are tried in a fixed priority order (cac, roas,
/// spend, conversions, revenue) regardless of where they appear, and no
/// keyword means all.
fn extract_metrics(q: &str) -> MetricSelection {
    let words: Vec<&str> = q
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |w: &str| words.iter().any(|x| *x == w);

    if has("cac") && has("roas") {
        return MetricSelection::Only(vec![Metric::Cac, Metric::Roas]);
    }
    const PRIORITY: [(&str, Metric); 5] = [
        ("cac", Metric::Cac),
        ("roas", Metric::Roas),
        ("spend", Metric::Spend),
        ("conversions", Metric::Conversions),
        ("revenue", Metric::Revenue),
    ];
    PRIORITY
        .iter()
        .find(|&&(word, _)| has(word))
        .map(|&(_, metric)| MetricSelection::Only(vec![metric]))
        .unwrap_or(MetricSelection::All)
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name {
        "january" | "enero" => 1,
        "february" | "febrero" => 2,
        "march" | "marzo" => 3,
        "april" | "abril" => 4,
        "may" | "mayo" => 5,
        "june" | "junio" => 6,
        "july" | "julio" => 7,
        "august" | "agosto" => 8,
        "september" | "septiembre" | "setiembre" => 9,
        "october" | "octubre" => 10,
        "november" | "noviembre" => 11,
        "december" | "diciembre" => 12,
        _ => return None,
    };
    Some(n)
}

/// Full calendar month `year-month`.
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = start.checked_add_months(Months::new(1))?.pred_opt()?;
    DateRange::new(start, end).ok()
}

fn month_range_containing(date: NaiveDate) -> Option<DateRange> {
    month_range(date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_range_handles_leap_february() {
        let feb = month_range(2024, 2).unwrap();
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn metrics_match_whole_words_only() {
        assert_eq!(extract_metrics("vacaciones spend"), MetricSelection::Only(vec![Metric::Spend]));
        assert_eq!(extract_metrics("how did we do"), MetricSelection::All);
    }

    #[test]
    fn metric_keywords_follow_priority_not_position() {
        assert_eq!(
            extract_metrics("revenue and spend may vs june"),
            MetricSelection::Only(vec![Metric::Spend])
        );
        assert_eq!(
            extract_metrics("conversions then roas"),
            MetricSelection::Only(vec![Metric::Roas])
        );
        assert_eq!(extract_metrics("one conversion"), MetricSelection::All);
    }

    #[test]
    fn spanish_month_names_resolve() {
        assert_eq!(month_number("setiembre"), Some(9));
        assert_eq!(month_number("mayo"), Some(5));
        assert_eq!(month_number("compare"), None);
    }
}
