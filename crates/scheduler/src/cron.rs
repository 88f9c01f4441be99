//! Cron expressions on top of the `cron` crate.
//!
//! Jobs carry the standard 5-field format `minute hour day-of-month month day-of-week`,
//! evaluated against local wall-clock time. The crate wants a leading seconds field
//! and numbers weekdays 1-7 from Sunday, so expressions are translated first: seconds
//! are pinned to 0 and the day-of-week field (0-7, both 0 and 7 Sunday, or names) is
//! rewritten as weekday names.
//!
//! The crate ANDs the two day fields. When both are restricted (neither starts with
//! `*`) a date matches if either does, as in Vixie cron, so two schedules are kept.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeZone, Timelike, Utc};
use ::cron::Schedule;
use thiserror::Error;

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("cron expression must have 5 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid {field} field `{value}`: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid cron expression `{expr}`: {reason}")]
    Expression { expr: String, reason: String },
}

/// A parsed cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    /// One schedule, or a day-of-month and a day-of-week schedule to be ORed.
    schedules: Vec<Schedule>,
}

impl CronSchedule {
    /// Parse a 5-field expression.
    ///
    /// # Examples
    ///
    /// - `0 7 * * 1-5`: 07:00 Monday to Friday
    /// - `30 6 * * 0,6`: 06:30 on weekends
    /// - `*/15 8-18 * * *`: every quarter hour during the day
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, day, month, weekday] = parts[..] else {
            return Err(CronError::FieldCount(parts.len()));
        };
        let expr = parts.join(" ");
        for (name, field) in [
            ("minute", minute),
            ("hour", hour),
            ("day-of-month", day),
            ("month", month),
        ] {
            reject_zero_step(name, field)?;
        }
        let names = weekday_names(weekday)?;

        let both_restricted = !day.starts_with('*') && !weekday.starts_with('*');
        let layouts = if both_restricted {
            vec![(day, "*".to_string()), ("*", names)]
        } else {
            vec![(day, names)]
        };

        let schedules = layouts
            .into_iter()
            .map(|(day, weekday)| {
                Schedule::from_str(&format!("0 {minute} {hour} {day} {month} {weekday}")).map_err(
                    |e| CronError::Expression {
                        expr: expr.clone(),
                        reason: e.to_string(),
                    },
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { expr, schedules })
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    pub fn matches(&self, time: &NaiveDateTime) -> bool {
        let Some(minute) = time.with_second(0).and_then(|t| t.with_nanosecond(0)) else {
            return false;
        };
        let minute = Utc.from_utc_datetime(&minute);
        self.schedules.iter().any(|s| s.includes(minute))
    }

    /// First matching minute strictly after `after`.
    pub fn next_after(&self, after: &NaiveDateTime) -> Option<NaiveDateTime> {
        let after = Utc.from_utc_datetime(after);
        self.schedules
            .iter()
            .filter_map(|s| s.after(&after).next())
            .min()
            .map(|next| next.naive_utc())
    }
}

impl PartialEq for CronSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl Eq for CronSchedule {}

impl FromStr for CronSchedule {
    type Err = CronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> CronError {
    CronError::InvalidField {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// A zero step never advances; refuse it before the crate sees it.
fn reject_zero_step(name: &'static str, field: &str) -> Result<(), CronError> {
    let zero = field
        .split(',')
        .filter_map(|part| part.split_once('/'))
        .any(|(_, step)| step.parse::<u32>() == Ok(0));
    if zero {
        return Err(invalid(name, field, "step must be at least 1"));
    }
    Ok(())
}

/// Rewrite a Vixie day-of-week field as a list of weekday names.
fn weekday_names(field: &str) -> Result<String, CronError> {
    const NAME: &str = "day-of-week";
    if field == "*" {
        return Ok(field.to_string());
    }

    let day = |token: &str| -> Result<usize, CronError> {
        if let Some(i) = WEEKDAY_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(token))
        {
            return Ok(i);
        }
        match token.parse::<usize>() {
            Ok(n) if n <= 7 => Ok(n),
            _ => Err(invalid(NAME, field, format!("`{token}` is not a weekday 0-7"))),
        }
    };

    let mut days = [false; 7];
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => match step.parse::<usize>() {
                Ok(step) if step > 0 => (range, Some(step)),
                _ => return Err(invalid(NAME, field, "step must be at least 1")),
            },
            None => (part, None),
        };
        let (start, end) = match range.split_once('-') {
            _ if range == "*" => (0, 6),
            Some((a, b)) => (day(a)?, day(b)?),
            // `a/n` runs to the end of the week.
            None if step.is_some() => (day(range)?, 7),
            None => (day(range)?, day(range)?),
        };
        if start > end {
            return Err(invalid(NAME, field, format!("range `{range}` runs backwards")));
        }
        for d in (start..=end).step_by(step.unwrap_or(1)) {
            days[d % 7] = true;
        }
    }

    Ok(days
        .iter()
        .zip(WEEKDAY_NAMES)
        .filter_map(|(on, name)| on.then_some(name))
        .collect::<Vec<_>>()
        .join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn wildcard_matches_everything() {
        let cron = CronSchedule::parse("* * * * *").unwrap();
        assert!(cron.matches(&at(2026, 10, 19, 13, 37)));
    }

    #[test]
    fn weekday_mornings() {
        let cron = CronSchedule::parse("0 7 * * 1-5").unwrap();
        assert!(cron.matches(&at(2026, 10, 19, 7, 0))); // Monday
        assert!(!cron.matches(&at(2026, 10, 19, 7, 1)));
        assert!(!cron.matches(&at(2026, 10, 24, 7, 0))); // Saturday
    }

    #[test]
    fn seven_is_sunday() {
        let cron = CronSchedule::parse("0 8 * * 7").unwrap();
        assert!(cron.matches(&at(2026, 10, 18, 8, 0)));
        assert!(!cron.matches(&at(2026, 10, 19, 8, 0)));
    }

    #[test]
    fn steps_ranges_and_lists_combine() {
        let cron = CronSchedule::parse("*/15 8-10,14 * * *").unwrap();
        assert!(cron.matches(&at(2026, 1, 1, 9, 45)));
        assert!(cron.matches(&at(2026, 1, 1, 14, 0)));
        assert!(!cron.matches(&at(2026, 1, 1, 11, 0)));
        assert!(!cron.matches(&at(2026, 1, 1, 9, 10)));

        let cron = CronSchedule::parse("5-20/5 * * * *").unwrap();
        assert!(cron.matches(&at(2026, 1, 1, 0, 10)));
        assert!(!cron.matches(&at(2026, 1, 1, 0, 25)));
    }

    #[test]
    fn weekday_names_and_wrapping_ranges() {
        let cron = CronSchedule::parse("0 9 * * mon-wed").unwrap();
        assert!(cron.matches(&at(2026, 10, 21, 9, 0))); // Wednesday
        assert!(!cron.matches(&at(2026, 10, 22, 9, 0)));

        // Friday through Sunday, with 7 closing the range.
        let cron = CronSchedule::parse("0 9 * * 5-7").unwrap();
        assert!(cron.matches(&at(2026, 10, 23, 9, 0)));
        assert!(cron.matches(&at(2026, 10, 25, 9, 0)));
        assert!(!cron.matches(&at(2026, 10, 19, 9, 0)));

        let cron = CronSchedule::parse("0 9 * * */2").unwrap();
        assert!(cron.matches(&at(2026, 10, 18, 9, 0))); // Sunday
        assert!(cron.matches(&at(2026, 10, 20, 9, 0))); // Tuesday
        assert!(!cron.matches(&at(2026, 10, 19, 9, 0)));
    }

    #[test]
    fn seconds_are_ignored_when_matching() {
        let cron = CronSchedule::parse("0 7 * * *").unwrap();
        let late = at(2026, 10, 19, 7, 0) + Duration::seconds(42);
        assert!(cron.matches(&late));
        assert_eq!(cron.next_after(&late), Some(at(2026, 10, 20, 7, 0)));
    }

    #[test]
    fn restricted_day_fields_are_ored() {
        // The 1st of the month or any Monday.
        let cron = CronSchedule::parse("0 6 1 * 1").unwrap();
        assert!(cron.matches(&at(2026, 10, 1, 6, 0))); // Thursday the 1st
        assert!(cron.matches(&at(2026, 10, 19, 6, 0))); // Monday
        assert!(!cron.matches(&at(2026, 10, 20, 6, 0)));

        // Day-of-week starred: plain AND.
        let cron = CronSchedule::parse("0 6 1 * *").unwrap();
        assert!(!cron.matches(&at(2026, 10, 19, 6, 0)));
    }

    #[test]
    fn next_after_skips_to_following_match() {
        let cron = CronSchedule::parse("30 6 * * 1-5").unwrap();
        // Friday evening → Monday morning.
        assert_eq!(
            cron.next_after(&at(2026, 10, 23, 18, 0)),
            Some(at(2026, 10, 26, 6, 30))
        );
        // Same minute is excluded.
        assert_eq!(
            cron.next_after(&at(2026, 10, 26, 6, 30)),
            Some(at(2026, 10, 27, 6, 30))
        );
    }

    #[test]
    fn next_after_takes_the_earlier_day_field() {
        // The 1st or a Monday: from Tuesday 2026-10-27 the 1st of November (Sunday)
        // comes before Monday the 2nd.
        let cron = CronSchedule::parse("0 6 1 * 1").unwrap();
        assert_eq!(
            cron.next_after(&at(2026, 10, 27, 0, 0)),
            Some(at(2026, 11, 1, 6, 0))
        );
        assert_eq!(
            cron.next_after(&at(2026, 11, 1, 6, 0)),
            Some(at(2026, 11, 2, 6, 0))
        );
    }

    #[test]
    fn leap_day_is_found() {
        let cron = CronSchedule::parse("0 0 29 2 *").unwrap();
        assert_eq!(
            cron.next_after(&at(2026, 10, 19, 0, 0)),
            Some(at(2028, 2, 29, 0, 0))
        );
    }

    #[test]
    fn impossible_date_never_fires() {
        let cron = CronSchedule::parse("0 0 31 2 *").unwrap();
        assert_eq!(cron.next_after(&at(2026, 1, 1, 0, 0)), None);
    }

    #[test]
    fn invalid_expressions_are_rejected() {
        for expr in [
            "invalid",
            "* * *",
            "60 * * * *",
            "* 24 * * *",
            "0 0 0 * *",
            "*/0 * * * *",
            "0 0 * * 5-1",
            "0 0 * * */0",
            "0 0 * * MON-XYZ",
            "0 0 * 13 *",
            "0 0 * * 8",
            "a b c d e",
        ] {
            assert!(CronSchedule::parse(expr).is_err(), "{expr} should fail");
        }
        assert_eq!(
            CronSchedule::parse("* *").unwrap_err(),
            CronError::FieldCount(2)
        );
    }

    #[test]
    fn display_normalizes_whitespace() {
        let cron: CronSchedule = "0  7 *\t* 1-5".parse().unwrap();
        assert_eq!(cron.to_string(), "0 7 * * 1-5");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_moment() -> impl Strategy<Value = NaiveDateTime> {
            (0i64..3 * 365 * 24 * 60).prop_map(|minutes| {
                at(2026, 1, 1, 0, 0) + Duration::minutes(minutes)
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            #[test]
            fn next_after_is_the_first_match(
                minute in 0u32..60,
                hour in 0u32..24,
                dow in 0u32..8,
                after in any_moment(),
            ) {
                let cron = CronSchedule::parse(&format!("{minute} {hour} * * {dow}")).unwrap();
                let next = cron.next_after(&after).unwrap();
                prop_assert!(next > after);
                prop_assert!(cron.matches(&next));

                let mut cursor = after + Duration::minutes(1);
                while cursor < next {
                    prop_assert!(!cron.matches(&cursor));
                    cursor += Duration::minutes(1);
                }
            }
        }
    }
}

