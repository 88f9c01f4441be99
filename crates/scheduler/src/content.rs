//! Builds today's printable content for a job from the store.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use homeprint_core::{Employee, EmployeeId, TaskId};
use homeprint_escpos::{DailyTasks, EmployeeGroup, MenuDay, PrintContent, TaskLine, WeeklyMenu};
use homeprint_recurrence::frequency_priority;
use homeprint_recurrence::occurrence::week_monday;

use crate::store::{PrintStore, StoreError};
use crate::types::{JobType, PrintJob};

/// Content for one run plus what must be marked once it has printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPrint {
    pub content: PrintContent,
    pub one_off_ids: Vec<TaskId>,
}

impl PreparedPrint {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

pub fn prepare<S: PrintStore + ?Sized>(
    store: &S,
    job: &PrintJob,
    employee: Option<&Employee>,
    today: NaiveDate,
) -> Result<PreparedPrint, StoreError> {
    match job.job_type {
        JobType::DailyTasks => daily_tasks(store, today, employee),
        JobType::WeeklyMenu => weekly_menu(store, today),
    }
}

/// Sort key inside a group: recurring, then special, then one-off; more frequent first.
type LineKey = (u8, u32, String);

pub fn daily_tasks<S: PrintStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    employee: Option<&Employee>,
) -> Result<PreparedPrint, StoreError> {
    let due = store.load_due_tasks(date, employee.map(|e| e.id))?;

    let mut lines: BTreeMap<Option<EmployeeId>, Vec<(LineKey, TaskLine)>> = BTreeMap::new();
    for task in &due.recurring {
        let key = (0, frequency_priority(&task.recurrence), task.title.to_lowercase());
        lines
            .entry(task.employee_id)
            .or_default()
            .push((key, line(&task.title, task.description.as_deref())));
    }
    for task in &due.special {
        let key = (1, frequency_priority(&task.recurrence), task.title.to_lowercase());
        lines
            .entry(task.employee_id)
            .or_default()
            .push((key, line(&task.title, task.description.as_deref())));
    }
    for task in &due.one_off {
        let key = (2, 0, task.title.to_lowercase());
        lines
            .entry(task.employee_id)
            .or_default()
            .push((key, line(&task.title, task.description.as_deref())));
    }

    let mut named = Vec::new();
    let mut unassigned: Vec<TaskLine> = Vec::new();
    for (owner, mut entries) in lines {
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let tasks: Vec<TaskLine> = entries.into_iter().map(|(_, l)| l).collect();
        match employee_name(store, owner, employee)? {
            Some(name) => named.push(EmployeeGroup {
                employee_name: Some(name),
                tasks,
            }),
            None => unassigned.extend(tasks),
        }
    }
    named.sort_by(|a, b| a.employee_name.cmp(&b.employee_name));
    if !unassigned.is_empty() {
        named.push(EmployeeGroup {
            employee_name: None,
            tasks: unassigned,
        });
    }

    let menu = store.load_day_menu(date)?.map(|m| MenuDay::from(&m));
    let content = DailyTasks {
        date,
        groups: named,
        menu,
    };
    Ok(PreparedPrint {
        content: content.into(),
        one_off_ids: due.one_off.iter().map(|t| t.id).collect(),
    })
}

/// The week (Monday to Sunday) containing `today`.
pub fn weekly_menu<S: PrintStore + ?Sized>(
    store: &S,
    today: NaiveDate,
) -> Result<PreparedPrint, StoreError> {
    let days = store
        .load_week_menu(week_monday(today))?
        .iter()
        .map(MenuDay::from)
        .collect();
    Ok(PreparedPrint {
        content: WeeklyMenu { days }.into(),
        one_off_ids: Vec::new(),
    })
}

fn line(title: &str, description: Option<&str>) -> TaskLine {
    TaskLine {
        title: title.to_string(),
        description: description.map(str::to_string),
    }
}

/// Tasks whose employee no longer exists fall back to the unassigned group.
fn employee_name<S: PrintStore + ?Sized>(
    store: &S,
    owner: Option<EmployeeId>,
    known: Option<&Employee>,
) -> Result<Option<String>, StoreError> {
    let Some(id) = owner else {
        return Ok(None);
    };
    if let Some(employee) = known.filter(|e| e.id == id) {
        return Ok(Some(employee.name.clone()));
    }
    Ok(store.load_employee(id)?.map(|e| e.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPrintStore;
    use homeprint_core::{DayMenu, Dish, OneOffTask, SpecialTask, Task};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn groups(prepared: &PreparedPrint) -> Vec<(String, Vec<String>)> {
        let PrintContent::DailyTasks(daily) = &prepared.content else {
            panic!("expected daily tasks");
        };
        daily
            .groups
            .iter()
            .map(|g| {
                (
                    g.heading().to_string(),
                    g.tasks.iter().map(|t| t.title.clone()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn groups_by_employee_with_unassigned_last() {
        let store = InMemoryPrintStore::new();
        let zeca = Employee::new("Zeca", [1]);
        let ana = Employee::new("Ana", [1]);
        store.insert_employee(zeca.clone());
        store.insert_employee(ana.clone());
        store.insert_task(Task::new("Varrer", "FREQ=DAILY").assigned_to(zeca.id));
        store.insert_task(Task::new("Regar", "FREQ=DAILY"));
        store.insert_task(Task::new("Passar", "FREQ=DAILY").assigned_to(ana.id));

        let prepared = daily_tasks(&store, date(2026, 10, 19), None).unwrap();
        assert_eq!(
            groups(&prepared),
            vec![
                ("Ana".to_string(), vec!["Passar".to_string()]),
                ("Zeca".to_string(), vec!["Varrer".to_string()]),
                ("Geral".to_string(), vec!["Regar".to_string()]),
            ]
        );
    }

    #[test]
    fn lines_order_by_kind_then_frequency_then_title() {
        let store = InMemoryPrintStore::new();
        store.insert_task(Task::new("Cozinha", "FREQ=WEEKLY;BYDAY=MO"));
        store.insert_task(Task::new("banheiro", "FREQ=DAILY"));
        store.insert_task(Task::new("Área", "FREQ=DAILY"));
        store.insert_special_task(SpecialTask::new("Cortinas", "FREQ=DAILY"));
        store.insert_one_off(OneOffTask::new("Lâmpada"));

        let prepared = daily_tasks(&store, date(2026, 10, 19), None).unwrap();
        let (_, titles) = &groups(&prepared)[0];
        assert_eq!(titles, &["banheiro", "Área", "Cozinha", "Cortinas", "Lâmpada"]);
        assert_eq!(prepared.one_off_ids.len(), 1);
    }

    #[test]
    fn menu_only_day_is_not_empty() {
        let store = InMemoryPrintStore::new();
        let mut menu = DayMenu::empty(date(2026, 10, 19));
        assert!(daily_tasks(&store, menu.date, None).unwrap().is_empty());

        menu.dinner = Some(Dish::new("Sopa"));
        store.set_menu(menu.clone());
        assert!(!daily_tasks(&store, menu.date, None).unwrap().is_empty());
    }

    #[test]
    fn weekly_menu_starts_on_monday() {
        let store = InMemoryPrintStore::new();
        // Thursday
        let prepared = weekly_menu(&store, date(2026, 10, 22)).unwrap();
        let PrintContent::WeeklyMenu(menu) = prepared.content else {
            panic!("expected weekly menu");
        };
        assert_eq!(menu.days.len(), 7);
        assert_eq!(menu.days[0].date, date(2026, 10, 19));
        assert!(menu.is_empty());
    }
}
