//! Structured print content. Built fresh for every print, never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Heading used for tasks that have no assigned employee.
pub const UNASSIGNED_GROUP: &str = "Geral";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintContent {
    DailyTasks(DailyTasks),
    WeeklyMenu(WeeklyMenu),
    Message(Message),
}

impl PrintContent {
    /// Whether printing this would put nothing useful on paper.
    pub fn is_empty(&self) -> bool {
        match self {
            PrintContent::DailyTasks(daily) => daily.is_empty(),
            PrintContent::WeeklyMenu(menu) => menu.is_empty(),
            PrintContent::Message(message) => message.is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PrintContent::DailyTasks(_) => "DAILY_TASKS",
            PrintContent::WeeklyMenu(_) => "WEEKLY_MENU",
            PrintContent::Message(_) => "MESSAGE",
        }
    }
}

impl From<DailyTasks> for PrintContent {
    fn from(value: DailyTasks) -> Self {
        PrintContent::DailyTasks(value)
    }
}

impl From<WeeklyMenu> for PrintContent {
    fn from(value: WeeklyMenu) -> Self {
        PrintContent::WeeklyMenu(value)
    }
}

impl From<Message> for PrintContent {
    fn from(value: Message) -> Self {
        PrintContent::Message(value)
    }
}

/// Today's checklist, grouped by employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTasks {
    pub date: NaiveDate,
    pub groups: Vec<EmployeeGroup>,
    #[serde(default)]
    pub menu: Option<MenuDay>,
}

impl DailyTasks {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            groups: Vec::new(),
            menu: None,
        }
    }

    pub fn with_group(mut self, group: EmployeeGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn with_menu(mut self, menu: MenuDay) -> Self {
        self.menu = Some(menu);
        self
    }

    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0 && self.menu.as_ref().is_none_or(MenuDay::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeGroup {
    /// `None` collects unassigned tasks under [`UNASSIGNED_GROUP`].
    #[serde(default)]
    pub employee_name: Option<String>,
    pub tasks: Vec<TaskLine>,
}

impl EmployeeGroup {
    pub fn new(employee_name: Option<String>) -> Self {
        Self {
            employee_name,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: TaskLine) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn heading(&self) -> &str {
        self.employee_name.as_deref().unwrap_or(UNASSIGNED_GROUP)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLine {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TaskLine {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Seven consecutive days of planned meals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyMenu {
    pub days: Vec<MenuDay>,
}

impl WeeklyMenu {
    pub fn is_empty(&self) -> bool {
        self.days.iter().all(MenuDay::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub lunch: Option<String>,
    #[serde(default)]
    pub dinner: Option<String>,
}

impl MenuDay {
    pub fn new(date: NaiveDate) -> Self {
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

impl From<&homeprint_core::DayMenu> for MenuDay {
    fn from(menu: &homeprint_core::DayMenu) -> Self {
        Self {
            date: menu.date,
            lunch: menu.lunch.as_ref().map(|d| d.name.clone()),
            dinner: menu.dinner.as_ref().map(|d| d.name.clone()),
        }
    }
}

/// Free-form note; `body` is written in the markdown dialect of [`crate::markdown`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.body.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeprint_core::{DayMenu, Dish};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn total_count_spans_groups() {
        let daily = DailyTasks::new(date(2026, 10, 19))
            .with_group(
                EmployeeGroup::new(Some("Maria".into()))
                    .with_task(TaskLine::new("Varrer"))
                    .with_task(TaskLine::new("Lavar louça")),
            )
            .with_group(EmployeeGroup::new(None).with_task(TaskLine::new("Regar")));
        assert_eq!(daily.total_count(), 3);
        assert_eq!(daily.groups[1].heading(), UNASSIGNED_GROUP);
    }

    #[test]
    fn daily_with_only_a_menu_is_not_empty() {
        let mut menu = MenuDay::new(date(2026, 10, 19));
        assert!(DailyTasks::new(menu.date).with_menu(menu.clone()).is_empty());
        menu.dinner = Some("Sopa".into());
        assert!(!DailyTasks::new(menu.date).with_menu(menu).is_empty());
    }

    #[test]
    fn menu_day_from_store_menu() {
        let stored = DayMenu {
            date: date(2026, 10, 19),
            lunch: Some(Dish::new("Feijoada")),
            dinner: None,
        };
        let day = MenuDay::from(&stored);
        assert_eq!(day.lunch.as_deref(), Some("Feijoada"));
        assert!(day.dinner.is_none());
    }

    #[test]
    fn content_is_tagged_by_type() {
        let content = PrintContent::from(Message::new("Aviso", "texto"));
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["type"], "MESSAGE");
        assert_eq!(content.kind(), "MESSAGE");
    }
}
