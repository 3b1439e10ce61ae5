//! Cron expressions for the scheduler, backed by `croner`.
//!
//! 5-field `MIN HOUR DOM MON DOW` plus the `@hourly` / `@daily` / `@weekly` /
//! `@monthly` / `@yearly` nicknames. A seconds field is not accepted.
//! Day-of-week 0 and 7 both mean Sunday. When both DOM and DOW are
//! restricted a day matches if either one does. All times are UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use croner::Cron;

use crate::error::CentralError;

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    cron: Cron,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, CentralError> {
        let invalid = |reason: String| CentralError::InvalidCron {
            expr: expr.to_string(),
            reason,
        };

        let trimmed = expr.trim();
        let normalized = if trimmed.starts_with('@') {
            trimmed.to_ascii_lowercase()
        } else {
            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != 5 {
                return Err(invalid(format!(
                    "need 5 fields (MIN HOUR DOM MON DOW), got {}",
                    fields.len()
                )));
            }
            // `*/1` は `*` と同じ。DOM/DOW の OR 判定でも制限なし扱い
            fields
                .iter()
                .map(|f| if *f == "*/1" { "*" } else { f })
                .collect::<Vec<_>>()
                .join(" ")
        };

        let cron = normalized
            .parse::<Cron>()
            .map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expr: expr.to_string(),
            cron,
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// First matching minute strictly after `after`.
    ///
    /// `None` when the expression can never fire (e.g. `0 0 30 2 *`).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron.find_next_occurrence(&after, false).ok()
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl Eq for CronSchedule {}

impl FromStr for CronSchedule {
    type Err = CentralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[rstest]
    #[case("0 * * * *", at(2026, 2, 22, 10, 30), at(2026, 2, 22, 11, 0))]
    #[case("0 8 * * *", at(2026, 2, 22, 7, 0), at(2026, 2, 22, 8, 0))]
    #[case("0 8 * * *", at(2026, 2, 22, 8, 0), at(2026, 2, 23, 8, 0))]
    #[case("*/15 * * * *", at(2026, 2, 22, 10, 2), at(2026, 2, 22, 10, 15))]
    #[case("10-20/5 * * * *", at(2026, 2, 22, 10, 16), at(2026, 2, 22, 10, 20))]
    #[case("0 9,17 * * *", at(2026, 2, 22, 10, 0), at(2026, 2, 22, 17, 0))]
    #[case("0 0 1 * *", at(2026, 2, 22, 10, 0), at(2026, 3, 1, 0, 0))]
    #[case("0 0 * 6 *", at(2026, 2, 22, 10, 0), at(2026, 6, 1, 0, 0))]
    // 2026-02-22 は日曜。次の月曜
    #[case("30 6 * * 1", at(2026, 2, 22, 10, 0), at(2026, 2, 23, 6, 30))]
    #[case("0 0 * * 7", at(2026, 2, 23, 0, 0), at(2026, 3, 1, 0, 0))]
    #[case("0 0 29 2 *", at(2026, 3, 1, 0, 0), at(2028, 2, 29, 0, 0))]
    fn next_run(
        #[case] expr: &str,
        #[case] after: DateTime<Utc>,
        #[case] expected: DateTime<Utc>,
    ) {
        let schedule = CronSchedule::parse(expr).unwrap();
        assert_eq!(schedule.next_after(after), Some(expected));
    }

    #[test]
    fn dom_and_dow_are_ored_when_both_restricted() {
        // 15 日、または金曜
        let schedule = CronSchedule::parse("0 0 15 * 5").unwrap();
        // 2026-03-01 は日曜、最初の金曜は 3/6
        assert_eq!(
            schedule.next_after(at(2026, 3, 1, 0, 0)),
            Some(at(2026, 3, 6, 0, 0))
        );
        assert_eq!(
            schedule.next_after(at(2026, 3, 14, 0, 0)),
            Some(at(2026, 3, 15, 0, 0))
        );
    }

    #[test]
    fn step_of_one_counts_as_unrestricted_day_of_month() {
        // `*/1` の DOM は `*` と同じ: 月曜だけ
        let schedule = CronSchedule::parse("0 0 */1 * 1").unwrap();
        assert_eq!(
            schedule.next_after(at(2026, 2, 22, 10, 0)),
            Some(at(2026, 2, 23, 0, 0))
        );
        assert_eq!(
            schedule.next_after(at(2026, 2, 23, 0, 0)),
            Some(at(2026, 3, 2, 0, 0))
        );
    }

    #[rstest]
    #[case("@daily", at(2026, 2, 22, 10, 0), at(2026, 2, 23, 0, 0))]
    #[case("@hourly", at(2026, 2, 22, 10, 0), at(2026, 2, 22, 11, 0))]
    #[case("@monthly", at(2026, 2, 22, 10, 0), at(2026, 3, 1, 0, 0))]
    #[case("@yearly", at(2026, 2, 22, 10, 0), at(2027, 1, 1, 0, 0))]
    fn nicknames(
        #[case] expr: &str,
        #[case] after: DateTime<Utc>,
        #[case] expected: DateTime<Utc>,
    ) {
        let schedule = CronSchedule::parse(expr).unwrap();
        assert_eq!(schedule.next_after(after), Some(expected));
        assert_eq!(schedule.to_string(), expr);
    }

    #[test]
    fn seconds_are_ignored() {
        let schedule = CronSchedule::parse("* * * * *").unwrap();
        let after = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 45).unwrap();
        assert_eq!(schedule.next_after(after), Some(at(2026, 1, 1, 0, 1)));
    }

    #[test]
    fn impossible_date_has_no_next_run() {
        let schedule = CronSchedule::parse("0 0 30 2 *").unwrap();
        assert_eq!(schedule.next_after(at(2026, 1, 1, 0, 0)), None);
    }

    #[rstest]
    #[case("bad")]
    #[case("* * * *")]
    #[case("60 * * * *")]
    #[case("* 24 * * *")]
    #[case("* * 0 * *")]
    #[case("* * * 13 *")]
    #[case("* * * * 8")]
    #[case("*/0 * * * *")]
    #[case("20-10 * * * *")]
    #[case("a * * * *")]
    #[case("0 0 0 * * *")]
    #[case("@fortnightly")]
    fn invalid_expressions_are_rejected(#[case] expr: &str) {
        assert!(matches!(
            CronSchedule::parse(expr),
            Err(CentralError::InvalidCron { .. })
        ));
    }

    #[test]
    fn display_keeps_the_source_text() {
        let schedule: CronSchedule = "0 9 * * *".parse().unwrap();
        assert_eq!(schedule.to_string(), "0 9 * * *");
    }
}
