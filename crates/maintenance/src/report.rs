//! Renders operation results for the operator.
//!
//! Text output is meant for reading, not parsing. JSON output is relaxed
//! extended JSON, so ObjectIds and dates keep a readable form.

use crate::MaintenanceError;
use crate::operations::Outcome;
use crate::runner::{TaskReport, TaskRunStatus, TaskStatus};
use bson::{Bson, DateTime, Document};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use configuration::OutputFormat;
use core_types::{Role, User};
use serde::Serialize;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, MaintenanceError> {
    let json = bson::to_bson(value)?.into_relaxed_extjson();
    Ok(serde_json::to_string_pretty(&json)?)
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn format_time(time: Option<DateTime>) -> String {
    match time {
        Some(time) => time.to_chrono().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}

pub fn render_collections(names: &[String], format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => to_json(names),
        OutputFormat::Text if names.is_empty() => Ok("No collections found.".to_string()),
        OutputFormat::Text => {
            let mut out = format!("{} collection(s):\n", names.len());
            for name in names {
                out.push_str("  - ");
                out.push_str(name);
                out.push('\n');
            }
            Ok(out.trim_end().to_string())
        }
    }
}

/// Raw documents, one pretty JSON object per document in text mode.
pub fn render_documents(docs: &[Document], format: OutputFormat) -> Result<String, MaintenanceError> {
    let values: Vec<serde_json::Value> = docs
        .iter()
        .map(|d| Bson::Document(d.clone()).into_relaxed_extjson())
        .collect();

    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&values)?),
        OutputFormat::Text if values.is_empty() => Ok("No documents found.".to_string()),
        OutputFormat::Text => {
            let rendered = values
                .iter()
                .map(serde_json::to_string_pretty)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rendered.join("\n"))
        }
    }
}

pub fn render_roles(roles: &[Role], collection: &str, format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => to_json(roles),
        OutputFormat::Text if roles.is_empty() => Ok(format!("No roles in {collection}.")),
        OutputFormat::Text => {
            let mut table = new_table(vec!["Name", "Default", "Granted", "Description", "Updated"]);
            for role in roles {
                table.add_row(vec![
                    role.name.clone(),
                    if role.is_default { "yes" } else { "no" }.to_string(),
                    role.permissions.granted().join(", "),
                    role.description.clone(),
                    format_time(role.updated_at),
                ]);
            }
            Ok(format!("{} role(s) in {collection}:\n{table}", roles.len()))
        }
    }
}

pub fn render_role(role: Option<&Role>, collection: &str, format: OutputFormat) -> Result<String, MaintenanceError> {
    match (role, format) {
        (role, OutputFormat::Json) => to_json(&role),
        (None, OutputFormat::Text) => Ok(format!("No default role in {collection}.")),
        (Some(role), OutputFormat::Text) => {
            let mut table = new_table(vec!["Capability", "Granted"]);
            for (capability, granted) in role.permissions.iter() {
                table.add_row(vec![capability.to_string(), granted.to_string()]);
            }
            let id = role.id.map(|id| id.to_hex()).unwrap_or_else(|| "-".to_string());
            Ok(format!(
                "Default role in {collection}: {} ({id})\n{}\nCreated: {}\nUpdated: {}\n{table}",
                role.name,
                role.description,
                format_time(role.created_at),
                format_time(role.updated_at),
            ))
        }
    }
}

pub fn render_users(users: &[User], format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => to_json(users),
        OutputFormat::Text if users.is_empty() => Ok("No users found.".to_string()),
        OutputFormat::Text => {
            let mut table = new_table(vec!["Id", "Email", "Name"]);
            for user in users {
                table.add_row(vec![
                    user.id.map(|id| id.to_hex()).unwrap_or_default(),
                    user.email.clone(),
                    user.name.clone(),
                ]);
            }
            Ok(format!("{} user(s):\n{table}", users.len()))
        }
    }
}

pub fn render_outcome(operation: &str, outcome: &Outcome, format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
            "operation": operation,
            "result": outcome,
        }))?),
        OutputFormat::Text => Ok(format!("{operation}: {outcome}")),
    }
}

pub fn render_task_reports(reports: &[TaskReport], format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(reports)?),
        OutputFormat::Text if reports.is_empty() => Ok("No maintenance tasks defined.".to_string()),
        OutputFormat::Text => {
            let mut table = new_table(vec!["Task", "Result"]);
            for report in reports {
                let result = match &report.status {
                    TaskRunStatus::AlreadyApplied => "already applied".to_string(),
                    TaskRunStatus::Ran(outcome) => outcome.to_string(),
                };
                table.add_row(vec![report.name.clone(), result]);
            }
            Ok(table.to_string())
        }
    }
}

pub fn render_status(status: &[TaskStatus], format: OutputFormat) -> Result<String, MaintenanceError> {
    match format {
        OutputFormat::Json => to_json(status),
        OutputFormat::Text => {
            let mut table = new_table(vec!["Task", "Description", "State", "Applied at"]);
            for task in status {
                let state = if task.applied_at.is_some() { "applied" } else { "pending" };
                table.add_row(vec![
                    task.name.clone(),
                    task.description.clone(),
                    state.to_string(),
                    format_time(task.applied_at),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use bson::oid::ObjectId;
    use core_types::Permissions;

    fn sample_role() -> Role {
        let mut role = Role::new_default("viewer", "Default role", Permissions::default_role());
        role.id = Some(ObjectId::new());
        role
    }

    #[test]
    fn role_table_lists_granted_capabilities() {
        let text = render_roles(&[sample_role()], "userroles", OutputFormat::Text).unwrap();
        assert!(text.starts_with("1 role(s) in userroles:"));
        assert!(text.contains("viewer"));
        assert!(text.contains("viewOrders, viewProducts"));
    }

    #[test]
    fn json_roles_use_relaxed_extended_json() {
        let json = render_roles(&[sample_role()], "userroles", OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["name"], "viewer");
        assert_eq!(value[0]["isDefault"], true);
        assert!(value[0]["_id"]["$oid"].is_string());
        assert!(value[0]["createdAt"]["$date"].is_string());
    }

    #[test]
    fn absent_default_role_is_reported_plainly() {
        let text = render_role(None, "roles", OutputFormat::Text).unwrap();
        assert_eq!(text, "No default role in roles.");
        assert_eq!(render_role(None, "roles", OutputFormat::Json).unwrap(), "null");
    }

    #[test]
    fn documents_render_one_object_each() {
        let docs = vec![doc! { "name": "roles" }, doc! { "name": "users" }];
        let text = render_documents(&docs, OutputFormat::Text).unwrap();
        assert_eq!(text.matches("\"name\"").count(), 2);
    }

    #[test]
    fn status_marks_pending_tasks() {
        let status = vec![
            TaskStatus {
                name: "001_create_default_role".to_string(),
                description: "create".to_string(),
                applied_at: Some(DateTime::now()),
            },
            TaskStatus {
                name: "002_copy_default_role_to_userroles".to_string(),
                description: "copy".to_string(),
                applied_at: None,
            },
        ];
        let text = render_status(&status, OutputFormat::Text).unwrap();
        assert!(text.contains("applied"));
        assert!(text.contains("pending"));
    }

    #[test]
    fn outcome_json_carries_operation_name() {
        let json = render_outcome(
            "rename-role",
            &Outcome::Skipped("nothing to do".to_string()),
            OutputFormat::Json,
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["operation"], "rename-role");
        assert_eq!(value["result"]["outcome"], "skipped");
    }

    #[test]
    fn empty_collections_say_so() {
        assert_eq!(
            render_collections(&[], OutputFormat::Text).unwrap(),
            "No collections found."
        );
    }
}
