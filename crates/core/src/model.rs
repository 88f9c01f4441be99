//! Household entities as seen by the printing core.
//!
//! These are read from the external store; the core never creates them except in
//! tests and seed snapshots.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{DishId, EmployeeId, TaskId};

/// Anything stored under its own id. Ids are ordered so collections keyed by them
/// iterate deterministically.
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Civil weekday index of a date: 0=Sunday..6=Saturday.
pub fn civil_weekday(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// A recurring household task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Recurrence specification (RRULE subset), e.g. `FREQ=WEEKLY;BYDAY=MO,TH`.
    pub recurrence: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

impl Task {
    pub fn new(title: impl Into<String>, recurrence: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            recurrence: recurrence.into(),
            start_date: None,
            employee_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn assigned_to(mut self, employee_id: EmployeeId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("task title cannot be empty"));
        }
        if self.recurrence.trim().is_empty() {
            return Err(DomainError::validation("task recurrence cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }
}

/// A seasonal or occasional task (deep cleaning, plant care...).
///
/// Shares the recurrence model with [`Task`] but is printed in its own section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub recurrence: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
}

impl SpecialTask {
    pub fn new(title: impl Into<String>, recurrence: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            recurrence: recurrence.into(),
            start_date: None,
            employee_id: None,
        }
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn assigned_to(mut self, employee_id: EmployeeId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("special task title cannot be empty"));
        }
        if self.recurrence.trim().is_empty() {
            return Err(DomainError::validation("special task recurrence cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for SpecialTask {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }
}

/// A task printed exactly once, then marked consumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOffTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub employee_id: Option<EmployeeId>,
    /// Earliest day the task may be printed; `None` means "next print".
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl OneOffTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            employee_id: None,
            due_date: None,
            consumed_at: None,
        }
    }

    pub fn due_on(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn assigned_to(mut self, employee_id: EmployeeId) -> Self {
        self.employee_id = Some(employee_id);
        self
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Pending and due on or before `date`.
    pub fn is_due(&self, date: NaiveDate) -> bool {
        !self.is_consumed() && self.due_date.is_none_or(|due| due <= date)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("one-off task title cannot be empty"));
        }
        Ok(())
    }
}

impl Entity for OneOffTask {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }
}

/// A household employee and the civil weekdays (0=Sunday..6=Saturday) they work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub work_days: BTreeSet<u8>,
}

impl Employee {
    pub fn new(name: impl Into<String>, work_days: impl IntoIterator<Item = u8>) -> Self {
        Self {
            id: EmployeeId::new(),
            name: name.into(),
            work_days: work_days.into_iter().collect(),
        }
    }

    pub fn works_on(&self, date: NaiveDate) -> bool {
        self.work_days.contains(&civil_weekday(date))
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("employee name cannot be empty"));
        }
        if let Some(day) = self.work_days.iter().find(|d| **d > 6) {
            return Err(DomainError::validation(format!(
                "work day {day} out of range 0..=6"
            )));
        }
        Ok(())
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> EmployeeId {
        self.id
    }
}

/// A dish that can be planned for lunch or dinner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    pub id: DishId,
    pub name: String,
}

impl Dish {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DishId::new(),
            name: name.into(),
        }
    }
}

/// Planned meals for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMenu {
    pub date: NaiveDate,
    #[serde(default)]
    pub lunch: Option<Dish>,
    #[serde(default)]
    pub dinner: Option<Dish>,
}

impl DayMenu {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            lunch: None,
            dinner: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lunch.is_none() && self.dinner.is_none()
    }
}

/// Paper/mechanism family of the receipt printer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// 80 mm paper, 48 columns in font A.
    #[default]
    Thermal80mm,
    /// 58 mm paper, 32 columns in font A.
    Thermal58mm,
}

impl DeviceType {
    pub fn line_width(&self) -> usize {
        match self {
            DeviceType::Thermal80mm => 48,
            DeviceType::Thermal58mm => 32,
        }
    }
}

/// Printer configuration kept in the household settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSettings {
    /// Device address: `ip` or `ip:port`.
    pub ip: String,
    #[serde(default)]
    pub device_type: DeviceType,
    pub house_name: String,
}

impl PrinterSettings {
    pub fn new(ip: impl Into<String>, house_name: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            device_type: DeviceType::default(),
            house_name: house_name.into(),
        }
    }
}
