use crate::MaintenanceError;
use crate::operations::{self, Outcome};
use async_trait::async_trait;
use bson::DateTime;
use configuration::{DefaultRoleSettings, RenameSettings, Settings};
use database::{DbRepository, DocumentStore};
use serde::Serialize;
use tracing::{error, info};

/// One named, idempotent maintenance step.
#[async_trait]
pub trait MaintenanceTask: Send + Sync {
    /// Stable identifier recorded in the applied marker. Never rename a
    /// shipped task.
    fn name(&self) -> &str;

    fn description(&self) -> String;

    async fn apply(&self, store: &dyn DocumentStore) -> Result<Outcome, MaintenanceError>;
}

pub struct CreateDefaultRole {
    pub collection: String,
    pub role: DefaultRoleSettings,
}

#[async_trait]
impl MaintenanceTask for CreateDefaultRole {
    fn name(&self) -> &str {
        "001_create_default_role"
    }

    fn description(&self) -> String {
        format!("create default role '{}' in {}", self.role.name, self.collection)
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<Outcome, MaintenanceError> {
        operations::create_default_role(store, &self.collection, &self.role).await
    }
}

pub struct CopyDefaultRole {
    pub source: String,
    pub target: String,
}

#[async_trait]
impl MaintenanceTask for CopyDefaultRole {
    fn name(&self) -> &str {
        "002_copy_default_role_to_userroles"
    }

    fn description(&self) -> String {
        format!("copy the default role from {} to {}", self.source, self.target)
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<Outcome, MaintenanceError> {
        operations::fix_default_role(store, &self.source, &self.target).await
    }
}

pub struct RenameRole {
    pub collection: String,
    pub rename: RenameSettings,
}

#[async_trait]
impl MaintenanceTask for RenameRole {
    fn name(&self) -> &str {
        "003_rename_user_role_to_viewer"
    }

    fn description(&self) -> String {
        format!(
            "rename role '{}' to '{}' in {}",
            self.rename.from, self.rename.to, self.collection
        )
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<Outcome, MaintenanceError> {
        operations::update_role_name(store, &self.collection, &self.rename).await
    }
}

/// The storefront's maintenance tasks, in the order they must run.
pub fn standard_tasks(settings: &Settings) -> Vec<Box<dyn MaintenanceTask>> {
    let collections = &settings.collections;
    vec![
        Box::new(CreateDefaultRole {
            collection: collections.roles.clone(),
            role: settings.default_role.clone(),
        }),
        Box::new(CopyDefaultRole {
            source: collections.roles.clone(),
            target: collections.user_roles.clone(),
        }),
        Box::new(RenameRole {
            collection: collections.user_roles.clone(),
            rename: settings.rename.clone(),
        }),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "outcome", rename_all = "snake_case")]
pub enum TaskRunStatus {
    /// The marker was already present; the task was not run.
    AlreadyApplied,
    /// The task ran and its marker was recorded.
    Ran(Outcome),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub status: TaskRunStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub name: String,
    pub description: String,
    pub applied_at: Option<DateTime>,
}

/// Runs an ordered task list, recording an applied marker per task.
pub struct MigrationRunner {
    tasks: Vec<Box<dyn MaintenanceTask>>,
    markers: String,
}

impl MigrationRunner {
    pub fn new(tasks: Vec<Box<dyn MaintenanceTask>>, markers: impl Into<String>) -> Self {
        Self {
            tasks,
            markers: markers.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(standard_tasks(settings), settings.collections.migrations.clone())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Every task, in order, with the time its marker was recorded.
    pub async fn status(&self, store: &dyn DocumentStore) -> Result<Vec<TaskStatus>, MaintenanceError> {
        let records = DbRepository::new(store).get_migration_records(&self.markers).await?;

        Ok(self
            .tasks
            .iter()
            .map(|task| TaskStatus {
                name: task.name().to_string(),
                description: task.description(),
                applied_at: records
                    .iter()
                    .find(|r| r.name == task.name())
                    .map(|r| r.applied_at),
            })
            .collect())
    }

    /// Applies every task without a marker, in order.
    ///
    /// `on_progress` is called after each task. The run stops at the first
    /// failing task; its marker is not recorded, so the next run retries it.
    pub async fn run_pending(
        &self,
        store: &dyn DocumentStore,
        mut on_progress: impl FnMut(&TaskReport),
    ) -> Result<Vec<TaskReport>, MaintenanceError> {
        let repo = DbRepository::new(store);
        let mut reports = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let status = match repo.get_migration_record(&self.markers, task.name()).await? {
                Some(record) => {
                    info!(task = task.name(), applied_at = %record.applied_at, "already applied");
                    TaskRunStatus::AlreadyApplied
                }
                None => {
                    info!(task = task.name(), "applying: {}", task.description());
                    let outcome = task.apply(store).await.map_err(|e| {
                        error!(
                            task = task.name(),
                            error = &e as &(dyn std::error::Error + 'static),
                            "task failed"
                        );
                        MaintenanceError::TaskFailed {
                            task: task.name().to_string(),
                            source: Box::new(e),
                        }
                    })?;
                    repo.save_migration_record(&self.markers, task.name()).await?;
                    info!(task = task.name(), %outcome, "recorded");
                    TaskRunStatus::Ran(outcome)
                }
            };

            let report = TaskReport {
                name: task.name().to_string(),
                status,
            };
            on_progress(&report);
            reports.push(report);
        }

        Ok(reports)
    }
}
