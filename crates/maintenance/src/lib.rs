//! # Boutique Maintenance Crate
//!
//! The storefront's database fix-ups and inspections, written once as
//! functions over a borrowed `DocumentStore` instead of as one-off scripts.
//!
//! - `operations`: list, find, insert and update, plus the named role
//!   operations (`create_default_role`, `fix_default_role`, `update_role_name`).
//! - `runner`: the ordered maintenance task list and the `MigrationRunner`
//!   that records an applied marker per task.
//! - `report`: text and JSON rendering of every result.

pub mod error;
pub mod operations;
pub mod report;
pub mod runner;

pub use error::MaintenanceError;
pub use operations::Outcome;
pub use runner::{MaintenanceTask, MigrationRunner, TaskReport, TaskRunStatus, TaskStatus};
