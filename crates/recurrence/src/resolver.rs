//! Public resolver API.
//!
//! All dates are calendar dates: callers holding timestamps must take the date part
//! first, which is equivalent to normalizing both sides to midnight. Every public
//! function uses the civil weekday convention (0=Sunday..6=Saturday).

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::error::SpecParseError;
use crate::occurrence::far_past;
use crate::rule::{Frequency, RecurrenceRule, civil_index, civil_weekday_of, weekday_token};
use crate::weekday_set::WeekdaySet;

/// "Every day" preset.
pub const DAILY_PRESET: &str = "FREQ=DAILY";
/// "Weekdays only" preset.
pub const WEEKDAYS_PRESET: &str = "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR";
/// Priority reported for specifications that do not parse.
pub const UNPARSABLE_PRIORITY: u32 = 100;

/// A specification reduced to its cheapest evaluation strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledSpec {
    EveryDay,
    Weekdays,
    /// Weekly rule with plain `BYDAY` only, matched directly against the weekday.
    WeekdaySet(WeekdaySet),
    General(RecurrenceRule),
}

impl CompiledSpec {
    pub fn compile(spec: &str) -> Result<Self, SpecParseError> {
        match spec.trim() {
            DAILY_PRESET => return Ok(CompiledSpec::EveryDay),
            WEEKDAYS_PRESET => return Ok(CompiledSpec::Weekdays),
            _ => {}
        }
        let rule = RecurrenceRule::parse(spec)?;
        if rule.is_plain_weekly() {
            let set = rule.plain_weekdays().map(civil_index).collect();
            return Ok(CompiledSpec::WeekdaySet(set));
        }
        Ok(CompiledSpec::General(rule))
    }
}

/// Is the specification active on `date`?
///
/// Fails closed: an unparsable specification never occurs.
pub fn occurs_on(spec: &str, date: NaiveDate, start_date: Option<NaiveDate>) -> bool {
    try_occurs_on(spec, date, start_date).unwrap_or_else(|e| {
        debug!(spec, error = %e, "recurrence spec rejected; treating as inactive");
        false
    })
}

pub fn try_occurs_on(
    spec: &str,
    date: NaiveDate,
    start_date: Option<NaiveDate>,
) -> Result<bool, SpecParseError> {
    if start_date.is_some_and(|start| date < start) {
        return Ok(false);
    }
    let civil = civil_weekday_of(date);
    Ok(match CompiledSpec::compile(spec)? {
        CompiledSpec::EveryDay => true,
        CompiledSpec::Weekdays => WeekdaySet::WORKWEEK.contains(civil),
        CompiledSpec::WeekdaySet(set) => set.contains(civil),
        CompiledSpec::General(rule) => {
            let dtstart = start_date.unwrap_or_else(far_past);
            !rule.occurrences_between(dtstart, date, date).is_empty()
        }
    })
}

/// Civil weekdays on which the specification occurs.
///
/// With `week_start`, the answer is specific to the seven days
/// `[week_start, week_start + 6]`; without it, the nominal weekday pattern is returned.
/// Unparsable specifications yield an empty set.
pub fn scheduled_weekdays(
    spec: &str,
    week_start: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
) -> BTreeSet<u8> {
    try_scheduled_weekdays(spec, week_start, start_date).unwrap_or_else(|e| {
        debug!(spec, error = %e, "recurrence spec rejected; no scheduled weekdays");
        BTreeSet::new()
    })
}

pub fn try_scheduled_weekdays(
    spec: &str,
    week_start: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
) -> Result<BTreeSet<u8>, SpecParseError> {
    let compiled = CompiledSpec::compile(spec)?;

    if let (Some(week_start), Some(start)) = (week_start, start_date) {
        if start > week_end(week_start) {
            return Ok(BTreeSet::new());
        }
    }

    let base = match compiled {
        CompiledSpec::EveryDay => WeekdaySet::ALL,
        CompiledSpec::Weekdays => WeekdaySet::WORKWEEK,
        CompiledSpec::WeekdaySet(set) => set,
        CompiledSpec::General(rule) => general_weekdays(&rule, week_start, start_date),
    };

    let days = match (week_start, start_date) {
        (Some(week_start), Some(start)) if start > week_start => base
            .iter()
            .filter(|civil| date_in_week(week_start, *civil) >= start)
            .collect(),
        _ => base,
    };
    Ok(days.to_btree_set())
}

fn general_weekdays(
    rule: &RecurrenceRule,
    week_start: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
) -> WeekdaySet {
    let dtstart = start_date.unwrap_or_else(far_past);
    // A concrete week is always answered by the same enumeration `occurs_on` uses,
    // so BYMONTHDAY, spacing and terminators can never disagree with it.
    if let Some(week_start) = week_start {
        return rule
            .occurrences_between(dtstart, week_start, week_end(week_start))
            .into_iter()
            .map(civil_weekday_of)
            .collect();
    }

    // Nominal pattern. A month-day filter can land on any weekday.
    match rule.frequency {
        Frequency::Daily if rule.by_day.is_empty() => WeekdaySet::ALL,
        Frequency::Daily => rule.plain_weekdays().map(civil_index).collect(),
        Frequency::Monthly | Frequency::Yearly => {
            rule.by_day.iter().map(|by| civil_index(by.weekday)).collect()
        }
        Frequency::Weekly if rule.by_day.is_empty() => {
            [civil_weekday_of(dtstart)].into_iter().collect()
        }
        Frequency::Weekly => rule.plain_weekdays().map(civil_index).collect(),
    }
}

fn week_end(week_start: NaiveDate) -> NaiveDate {
    week_start.checked_add_days(Days::new(6)).unwrap_or(week_start)
}

/// Concrete date of civil weekday `civil` inside the week beginning at `week_start`.
fn date_in_week(week_start: NaiveDate, civil: u8) -> NaiveDate {
    let first = civil_weekday_of(week_start);
    let offset = (u64::from(civil) + 7 - u64::from(first)) % 7;
    week_start
        .checked_add_days(Days::new(offset))
        .unwrap_or(week_start)
}

/// Display ordering key, lower = more frequent. Unparsable specs rank last.
pub fn frequency_priority(spec: &str) -> u32 {
    try_frequency_priority(spec).unwrap_or(UNPARSABLE_PRIORITY)
}

pub fn try_frequency_priority(spec: &str) -> Result<u32, SpecParseError> {
    Ok(match CompiledSpec::compile(spec)? {
        CompiledSpec::EveryDay => 1,
        CompiledSpec::Weekdays => 2,
        CompiledSpec::WeekdaySet(set) => weekly_priority(set),
        CompiledSpec::General(rule) => match rule.frequency {
            Frequency::Daily if rule.interval > 1 => rule.interval.min(9),
            Frequency::Daily => 1,
            Frequency::Weekly => {
                let set: WeekdaySet = rule.plain_weekdays().map(civil_index).collect();
                weekly_priority(if set.is_empty() {
                    WeekdaySet::from_iter([0])
                } else {
                    set
                })
            }
            Frequency::Monthly => 10,
            Frequency::Yearly => 20,
        },
    })
}

fn weekly_priority(set: WeekdaySet) -> u32 {
    match set.len() {
        7 => 1,
        5 if set == WeekdaySet::WORKWEEK => 2,
        k => 9 - k as u32,
    }
}

const CIVIL_ABBREVIATIONS: [&str; 7] = ["dom", "seg", "ter", "qua", "qui", "sex", "sáb"];

/// Short Portuguese label for UI grouping; the raw string when it does not parse.
pub fn describe(spec: &str) -> String {
    let Ok(compiled) = CompiledSpec::compile(spec) else {
        return spec.to_string();
    };
    let list = |set: WeekdaySet| {
        // Monday first, Sunday last, as households read a week.
        let mut days: Vec<u8> = set.iter().filter(|d| *d != 0).collect();
        if set.contains(0) {
            days.push(0);
        }
        days.iter()
            .map(|d| CIVIL_ABBREVIATIONS[*d as usize])
            .collect::<Vec<_>>()
            .join(", ")
    };

    match compiled {
        CompiledSpec::EveryDay => "Todos os dias".to_string(),
        CompiledSpec::Weekdays => "Dias úteis".to_string(),
        CompiledSpec::WeekdaySet(set) if set == WeekdaySet::ALL => "Todos os dias".to_string(),
        CompiledSpec::WeekdaySet(set) if set == WeekdaySet::WORKWEEK => "Dias úteis".to_string(),
        CompiledSpec::WeekdaySet(set) => format!("Semanal: {}", list(set)),
        CompiledSpec::General(rule) => {
            let days: WeekdaySet = rule.plain_weekdays().map(civil_index).collect();
            match rule.frequency {
                Frequency::Daily if rule.interval > 1 => format!("A cada {} dias", rule.interval),
                Frequency::Daily => "Todos os dias".to_string(),
                Frequency::Weekly if rule.interval > 1 && !days.is_empty() => {
                    format!("A cada {} semanas: {}", rule.interval, list(days))
                }
                Frequency::Weekly if rule.interval > 1 => {
                    format!("A cada {} semanas", rule.interval)
                }
                Frequency::Weekly if !days.is_empty() => format!("Semanal: {}", list(days)),
                Frequency::Weekly => "Semanal".to_string(),
                Frequency::Monthly => match (rule.by_day.first(), rule.by_month_day.first()) {
                    (Some(by), _) if by.ordinal.is_some() => format!(
                        "Mensal: {}{}",
                        by.ordinal.unwrap_or_default(),
                        weekday_token(by.weekday)
                    ),
                    (_, Some(day)) => format!("Mensal: dia {day}"),
                    _ => "Mensal".to_string(),
                },
                Frequency::Yearly => "Anual".to_string(),
            }
        }
    }
}
