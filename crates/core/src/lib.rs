//! `homeprint-core`: household building blocks shared by every subsystem.
//!
//! This crate contains **pure data** (ids, entities, validation errors). Storage,
//! scheduling and printing live in their own crates.

pub mod error;
pub mod id;
pub mod model;

pub use error::{DomainError, DomainResult};
pub use id::{DishId, EmployeeId, PrintJobId, TaskId};
pub use model::{
    DayMenu, DeviceType, Dish, Employee, Entity, OneOffTask, PrinterSettings, SpecialTask, Task,
    civil_weekday,
};
