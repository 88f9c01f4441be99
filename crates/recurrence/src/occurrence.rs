//! Occurrence enumeration for a parsed rule anchored at a `dtstart`.
//!
//! Occurrences are day-granular: the time of day of `dtstart` is always midnight, so
//! an occurrence "on date D" means D itself is matched by the rule.

use chrono::{Datelike, Days, NaiveDate};

use crate::rule::{ByDay, Frequency, RecurrenceRule, Terminator};

/// Anchor used when a task has no explicit start date.
pub fn far_past() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl RecurrenceRule {
    /// Occurrences of the rule in the closed range `[from, to]`.
    pub fn occurrences_between(
        &self,
        dtstart: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<NaiveDate> {
        let upper = match self.end {
            Some(Terminator::Until(until)) => to.min(until),
            _ => to,
        };
        if upper < dtstart || upper < from {
            return Vec::new();
        }

        let mut out = Vec::new();
        match self.end {
            Some(Terminator::Count(limit)) => {
                // COUNT is relative to dtstart, so earlier matches must be counted too.
                let mut seen = 0u32;
                for day in days_inclusive(dtstart, upper) {
                    if seen >= limit {
                        break;
                    }
                    if self.matches_pattern(dtstart, day) {
                        seen += 1;
                        if day >= from {
                            out.push(day);
                        }
                    }
                }
            }
            _ => {
                for day in days_inclusive(from.max(dtstart), upper) {
                    if self.matches_pattern(dtstart, day) {
                        out.push(day);
                    }
                }
            }
        }
        out
    }

    /// Whether `date` is selected by FREQ/INTERVAL/BYxxx, ignoring COUNT and UNTIL.
    pub fn matches_pattern(&self, dtstart: NaiveDate, date: NaiveDate) -> bool {
        if date < dtstart {
            return false;
        }
        let interval = i64::from(self.interval);

        match self.frequency {
            Frequency::Daily => {
                (date - dtstart).num_days() % interval == 0
                    && self.plain_weekdays_allow(date)
                    && self.month_days_allow(date)
            }
            Frequency::Weekly => {
                let weeks = (week_monday(date) - week_monday(dtstart)).num_days() / 7;
                if weeks % interval != 0 {
                    return false;
                }
                if self.by_day.is_empty() {
                    date.weekday() == dtstart.weekday()
                } else {
                    self.plain_weekdays().any(|w| w == date.weekday())
                }
            }
            Frequency::Monthly => {
                let months = month_index(date) - month_index(dtstart);
                if months % interval != 0 {
                    return false;
                }
                if !self.by_day.is_empty() {
                    self.by_day_matches_in_month(date) && self.month_days_allow(date)
                } else if !self.by_month_day.is_empty() {
                    self.month_days_allow(date)
                } else {
                    date.day() == dtstart.day()
                }
            }
            Frequency::Yearly => {
                let years = i64::from(date.year() - dtstart.year());
                if years % interval != 0 {
                    return false;
                }
                if !self.by_day.is_empty() {
                    self.by_day_matches_in_year(date) && self.month_days_allow(date)
                } else if !self.by_month_day.is_empty() {
                    self.month_days_allow(date)
                } else {
                    date.month() == dtstart.month() && date.day() == dtstart.day()
                }
            }
        }
    }

    fn plain_weekdays_allow(&self, date: NaiveDate) -> bool {
        self.by_day.is_empty() || self.plain_weekdays().any(|w| w == date.weekday())
    }

    fn month_days_allow(&self, date: NaiveDate) -> bool {
        self.by_month_day.is_empty() || self.by_month_day.contains(&(date.day() as u8))
    }

    fn by_day_matches_in_month(&self, date: NaiveDate) -> bool {
        let days_in_month = days_in_month(date);
        self.by_day
            .iter()
            .any(|by| by_day_matches(by, date, date.day(), days_in_month))
    }

    fn by_day_matches_in_year(&self, date: NaiveDate) -> bool {
        let days_in_year = if date.leap_year() { 366 } else { 365 };
        self.by_day
            .iter()
            .any(|by| by_day_matches(by, date, date.ordinal(), days_in_year))
    }
}

/// `position` is the 1-based day inside a period of `period_len` days.
fn by_day_matches(by: &ByDay, date: NaiveDate, position: u32, period_len: u32) -> bool {
    if date.weekday() != by.weekday {
        return false;
    }
    match by.ordinal {
        None => true,
        Some(n) if n > 0 => (position - 1) / 7 + 1 == n as u32,
        Some(n) => (period_len - position) / 7 + 1 == n.unsigned_abs() as u32,
    }
}

fn days_inclusive(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

/// Monday of the week that contains `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule(spec: &str) -> RecurrenceRule {
        RecurrenceRule::parse(spec).unwrap()
    }

    #[test]
    fn daily_interval_counts_from_dtstart() {
        let r = rule("FREQ=DAILY;INTERVAL=3");
        let start = date(2026, 10, 1);
        let got = r.occurrences_between(start, start, date(2026, 10, 10));
        assert_eq!(
            got,
            vec![start, date(2026, 10, 4), date(2026, 10, 7), date(2026, 10, 10)]
        );
    }

    #[test]
    fn biweekly_uses_monday_based_weeks() {
        // dtstart Wednesday 2026-10-07; every other week on Monday and Friday.
        let r = rule("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,FR");
        let got = r.occurrences_between(date(2026, 10, 7), date(2026, 10, 5), date(2026, 10, 25));
        assert_eq!(got, vec![date(2026, 10, 9), date(2026, 10, 19), date(2026, 10, 23)]);
    }

    #[test]
    fn monthly_last_friday() {
        let r = rule("FREQ=MONTHLY;BYDAY=-1FR");
        let got = r.occurrences_between(far_past(), date(2026, 10, 1), date(2026, 11, 30));
        assert_eq!(got, vec![date(2026, 10, 30), date(2026, 11, 27)]);
    }

    #[test]
    fn monthly_second_tuesday() {
        let r = rule("FREQ=MONTHLY;BYDAY=2TU");
        let got = r.occurrences_between(far_past(), date(2026, 10, 1), date(2026, 10, 31));
        assert_eq!(got, vec![date(2026, 10, 13)]);
    }

    #[test]
    fn monthly_by_month_day_skips_short_months() {
        let r = rule("FREQ=MONTHLY;BYMONTHDAY=31");
        let got = r.occurrences_between(far_past(), date(2026, 9, 1), date(2026, 10, 31));
        assert_eq!(got, vec![date(2026, 10, 31)]);
    }

    #[test]
    fn yearly_defaults_to_dtstart_anniversary() {
        let r = rule("FREQ=YEARLY");
        let got = r.occurrences_between(date(2020, 3, 15), date(2026, 1, 1), date(2026, 12, 31));
        assert_eq!(got, vec![date(2026, 3, 15)]);
    }

    #[test]
    fn count_includes_matches_before_window() {
        let r = rule("FREQ=DAILY;COUNT=3");
        let start = date(2026, 10, 1);
        assert_eq!(r.occurrences_between(start, date(2026, 10, 3), date(2026, 10, 3)).len(), 1);
        assert!(r.occurrences_between(start, date(2026, 10, 4), date(2026, 10, 4)).is_empty());
    }

    #[test]
    fn until_is_inclusive() {
        let r = rule("FREQ=DAILY;UNTIL=20261005");
        let start = date(2026, 10, 1);
        assert_eq!(r.occurrences_between(start, date(2026, 10, 5), date(2026, 10, 5)).len(), 1);
        assert!(r.occurrences_between(start, date(2026, 10, 6), date(2026, 10, 6)).is_empty());
    }
}
