//! `homeprint-recurrence`
//!
//! **Responsibility:** answer "is this task active on this date?" and "on which
//! weekdays does it occur this week?" for a constrained RRULE subset
//! (`DAILY|WEEKLY|MONTHLY|YEARLY` with `INTERVAL`, `BYDAY`, `BYMONTHDAY`, `COUNT`,
//! `UNTIL`).
//!
//! Everything here is pure: no IO, no clocks, no shared state. Public entry points
//! never fail; they degrade to a documented fallback when a specification does not
//! parse. The `try_*` variants expose the underlying [`SpecParseError`].

pub mod error;
pub mod occurrence;
pub mod resolver;
pub mod rule;
pub mod weekday_set;

pub use error::SpecParseError;
pub use resolver::{
    DAILY_PRESET, UNPARSABLE_PRIORITY, WEEKDAYS_PRESET, CompiledSpec, describe,
    frequency_priority, occurs_on, scheduled_weekdays, try_frequency_priority, try_occurs_on,
    try_scheduled_weekdays,
};
pub use rule::{ByDay, Frequency, RecurrenceRule, Terminator};
pub use weekday_set::WeekdaySet;
