//! Parsed form of a recurrence specification.
//!
//! Grammar weekdays are Monday-based (`MO`=0..`SU`=6, see [`grammar_index`]); the
//! civil Sunday-based index only appears through [`civil_index`], which is the single
//! translation point used at the resolver boundary.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::SpecParseError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// One `BYDAY` token, e.g. `TU` or `-1FR`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ByDay {
    /// `Some(n)` selects the n-th (or n-th last when negative) weekday of the period.
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Terminator {
    Count(u32),
    /// Last calendar day (inclusive) on which an occurrence may fall.
    Until(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub by_day: Vec<ByDay>,
    pub by_month_day: Vec<u8>,
    pub end: Option<Terminator>,
}

const WEEKDAY_TOKENS: [(&str, Weekday); 7] = [
    ("MO", Weekday::Mon),
    ("TU", Weekday::Tue),
    ("WE", Weekday::Wed),
    ("TH", Weekday::Thu),
    ("FR", Weekday::Fri),
    ("SA", Weekday::Sat),
    ("SU", Weekday::Sun),
];

/// Grammar convention: 0=Monday..6=Sunday.
pub fn grammar_index(weekday: Weekday) -> u8 {
    weekday.num_days_from_monday() as u8
}

/// Civil convention: 0=Sunday..6=Saturday.
///
/// `{MO→1, TU→2, WE→3, TH→4, FR→5, SA→6, SU→0}`.
pub fn civil_index(weekday: Weekday) -> u8 {
    match weekday {
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
        Weekday::Sun => 0,
    }
}

/// Civil weekday of a calendar date.
pub fn civil_weekday_of(date: NaiveDate) -> u8 {
    civil_index(date.weekday())
}

pub fn weekday_token(weekday: Weekday) -> &'static str {
    WEEKDAY_TOKENS[grammar_index(weekday) as usize].0
}

impl RecurrenceRule {
    /// Parse a `KEY=VALUE;...` rule, with or without a leading `RRULE:`.
    pub fn parse(spec: &str) -> Result<Self, SpecParseError> {
        let trimmed = spec.trim();
        let body = trimmed
            .strip_prefix("RRULE:")
            .or_else(|| trimmed.strip_prefix("rrule:"))
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(SpecParseError::Empty);
        }

        let mut frequency = None;
        let mut interval = None;
        let mut by_day = None;
        let mut by_month_day = None;
        let mut count = None;
        let mut until = None;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| SpecParseError::MalformedPart(part.to_string()))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => set_once(&mut frequency, &key, parse_frequency(value)?)?,
                "INTERVAL" => set_once(&mut interval, &key, parse_interval(value)?)?,
                "BYDAY" => set_once(&mut by_day, &key, parse_by_day(value)?)?,
                "BYMONTHDAY" => set_once(&mut by_month_day, &key, parse_month_days(value)?)?,
                "COUNT" => set_once(&mut count, &key, parse_count(value)?)?,
                "UNTIL" => set_once(&mut until, &key, parse_until(value)?)?,
                _ => return Err(SpecParseError::UnknownKey(key)),
            }
        }

        let frequency = frequency.ok_or(SpecParseError::MissingFrequency)?;
        let end = match (count, until) {
            (Some(_), Some(_)) => return Err(SpecParseError::CountAndUntil),
            (Some(c), None) => Some(Terminator::Count(c)),
            (None, Some(u)) => Some(Terminator::Until(u)),
            (None, None) => None,
        };

        let rule = Self {
            frequency,
            interval: interval.unwrap_or(1),
            by_day: by_day.unwrap_or_default(),
            by_month_day: by_month_day.unwrap_or_default(),
            end,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<(), SpecParseError> {
        let ordinals = self.by_day.iter().filter(|d| d.ordinal.is_some()).count();
        if ordinals > 0 {
            if !matches!(self.frequency, Frequency::Monthly | Frequency::Yearly) {
                return Err(SpecParseError::Unsupported(
                    "ordinal BYDAY is only valid with MONTHLY or YEARLY".to_string(),
                ));
            }
            if self.by_day.len() != 1 {
                return Err(SpecParseError::Unsupported(
                    "an ordinal BYDAY must be the only BYDAY token".to_string(),
                ));
            }
        }
        if self.frequency == Frequency::Weekly && !self.by_month_day.is_empty() {
            return Err(SpecParseError::Unsupported(
                "BYMONTHDAY is not valid with WEEKLY".to_string(),
            ));
        }
        Ok(())
    }

    /// Weekly rule carrying nothing but plain `BYDAY` tokens.
    pub fn is_plain_weekly(&self) -> bool {
        self.frequency == Frequency::Weekly
            && self.interval == 1
            && self.end.is_none()
            && !self.by_day.is_empty()
            && self.by_day.iter().all(|d| d.ordinal.is_none())
    }

    /// Plain (non-ordinal) `BYDAY` weekdays.
    pub fn plain_weekdays(&self) -> impl Iterator<Item = Weekday> + '_ {
        self.by_day
            .iter()
            .filter(|d| d.ordinal.is_none())
            .map(|d| d.weekday)
    }
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<(), SpecParseError> {
    if slot.is_some() {
        return Err(SpecParseError::DuplicateKey(key.to_string()));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_frequency(value: &str) -> Result<Frequency, SpecParseError> {
    match value.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        _ => Err(SpecParseError::UnknownFrequency(value.to_string())),
    }
}

fn parse_interval(value: &str) -> Result<u32, SpecParseError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(SpecParseError::InvalidInterval(value.to_string())),
    }
}

fn parse_count(value: &str) -> Result<u32, SpecParseError> {
    match value.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(SpecParseError::InvalidCount(value.to_string())),
    }
}

fn parse_by_day(value: &str) -> Result<Vec<ByDay>, SpecParseError> {
    let mut days: Vec<ByDay> = Vec::new();
    for token in value.split(',').map(str::trim) {
        let day = parse_by_day_token(token)?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

fn parse_by_day_token(token: &str) -> Result<ByDay, SpecParseError> {
    let invalid = || SpecParseError::InvalidWeekday(token.to_string());
    let upper = token.to_ascii_uppercase();
    if upper.len() < 2 || !upper.is_ascii() {
        return Err(invalid());
    }
    let (prefix, code) = upper.split_at(upper.len() - 2);
    let weekday = WEEKDAY_TOKENS
        .iter()
        .find(|(t, _)| *t == code)
        .map(|(_, w)| *w)
        .ok_or_else(invalid)?;

    let ordinal = if prefix.is_empty() {
        None
    } else {
        let n: i8 = prefix
            .strip_prefix('+')
            .unwrap_or(prefix)
            .parse()
            .map_err(|_| invalid())?;
        if n == 0 || !(-53..=53).contains(&n) {
            return Err(invalid());
        }
        Some(n)
    };
    Ok(ByDay { ordinal, weekday })
}

fn parse_month_days(value: &str) -> Result<Vec<u8>, SpecParseError> {
    let mut days = Vec::new();
    for token in value.split(',').map(str::trim) {
        match token.parse::<u8>() {
            Ok(d) if (1..=31).contains(&d) => {
                if !days.contains(&d) {
                    days.push(d);
                }
            }
            _ => return Err(SpecParseError::InvalidMonthDay(token.to_string())),
        }
    }
    Ok(days)
}

fn parse_until(value: &str) -> Result<NaiveDate, SpecParseError> {
    let invalid = || SpecParseError::InvalidUntil(value.to_string());
    let date_part = match value.split_once('T') {
        Some((date, time)) => {
            let time = time.strip_suffix('Z').unwrap_or(time);
            if time.len() != 6 || !time.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            date
        }
        None => value,
    };
    if date_part.len() != 8 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(date_part, "%Y%m%d").map_err(|_| invalid())
}
