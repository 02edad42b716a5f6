use async_trait::async_trait;
use bson::doc;
use configuration::{RenameSettings, Settings};
use core_types::{Capability, Permissions, Role};
use database::{DocumentStore, MemoryStore, with_session};
use maintenance::operations::{create_default_role, fix_default_role, update_role_name};
use maintenance::{MaintenanceError, MaintenanceTask, MigrationRunner, Outcome, TaskRunStatus};

fn roles_named(store: &MemoryStore, collection: &str, name: &str) -> Vec<Role> {
    store
        .snapshot(collection)
        .into_iter()
        .map(|d| Role::from_document(d).unwrap())
        .filter(|r| r.name == name)
        .collect()
}

#[tokio::test]
async fn create_default_role_twice_leaves_one_default() {
    let store = MemoryStore::new();
    let settings = Settings::default();

    let first = create_default_role(&store, "roles", &settings.default_role).await.unwrap();
    let second = create_default_role(&store, "roles", &settings.default_role).await.unwrap();

    assert!(first.is_applied());
    assert!(!second.is_applied());
    assert_eq!(store.count("roles", doc! { "isDefault": true }).await.unwrap(), 1);
}

#[tokio::test]
async fn copy_inserts_one_matching_role_and_is_then_a_no_op() {
    let store = MemoryStore::new();
    let settings = Settings::default();
    create_default_role(&store, "roles", &settings.default_role).await.unwrap();

    let first = fix_default_role(&store, "roles", "userroles").await.unwrap();
    let second = fix_default_role(&store, "roles", "userroles").await.unwrap();

    assert!(first.is_applied());
    assert!(!second.is_applied());

    let source = roles_named(&store, "roles", "user");
    let copies = roles_named(&store, "userroles", "user");
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].permissions, source[0].permissions);
    assert!(copies[0].is_default);
    assert_ne!(copies[0].id, source[0].id);
}

#[tokio::test]
async fn rename_leaves_one_viewer_and_no_user() {
    let store = MemoryStore::new();
    store.seed(
        "userroles",
        [doc! { "name": "user", "isDefault": true, "permissions": { "viewProducts": true } }],
    );

    let outcome = update_role_name(&store, "userroles", &RenameSettings::default())
        .await
        .unwrap();

    assert!(outcome.is_applied());
    assert_eq!(store.count("userroles", doc! { "name": "viewer" }).await.unwrap(), 1);
    assert_eq!(store.count("userroles", doc! { "name": "user" }).await.unwrap(), 0);
}

#[tokio::test]
async fn session_closes_once_when_an_operation_fails() {
    let store = MemoryStore::new();
    store.reject_writes_to("roles");
    let probe = store.clone();
    let settings = Settings::default();

    let result = with_session(store, async |s: &MemoryStore| {
        create_default_role(s, "roles", &settings.default_role).await
    })
    .await;

    assert!(matches!(result, Err(MaintenanceError::Database(_))));
    assert_eq!(probe.close_count(), 1);
}

#[tokio::test]
async fn empty_database_to_single_viewer_default() {
    let store = MemoryStore::new();
    let probe = store.clone();
    let settings = Settings::default();

    with_session(store, async |s: &MemoryStore| -> Result<(), MaintenanceError> {
        create_default_role(s, &settings.collections.roles, &settings.default_role).await?;
        fix_default_role(s, &settings.collections.roles, &settings.collections.user_roles).await?;
        update_role_name(s, &settings.collections.user_roles, &settings.rename).await?;
        Ok(())
    })
    .await
    .unwrap();

    let userroles = probe.snapshot("userroles");
    assert_eq!(userroles.len(), 1);

    let role = Role::from_document(userroles[0].clone()).unwrap();
    assert_eq!(role.name, "viewer");
    assert!(role.is_default);
    assert_eq!(role.permissions, Permissions::default_role());
    assert_eq!(role.permissions.iter().count(), Capability::ALL.len());
    assert_eq!(probe.close_count(), 1);
}

#[tokio::test]
async fn migrate_twice_records_each_marker_once() {
    let store = MemoryStore::new();
    let settings = Settings::default();
    let runner = MigrationRunner::from_settings(&settings);

    let first = runner.run_pending(&store, |_| {}).await.unwrap();
    assert!(first.iter().all(|r| matches!(r.status, TaskRunStatus::Ran(_))));

    let second = runner.run_pending(&store, |_| {}).await.unwrap();
    assert!(second.iter().all(|r| r.status == TaskRunStatus::AlreadyApplied));

    assert_eq!(store.snapshot("maintenance_migrations").len(), runner.len());
    assert_eq!(roles_named(&store, "userroles", "viewer").len(), 1);

    let status = runner.status(&store).await.unwrap();
    assert!(status.iter().all(|s| s.applied_at.is_some()));
}

#[tokio::test]
async fn migrate_after_manual_fixes_records_markers_without_duplicating() {
    let store = MemoryStore::new();
    let settings = Settings::default();
    create_default_role(&store, "roles", &settings.default_role).await.unwrap();
    fix_default_role(&store, "roles", "userroles").await.unwrap();

    let reports = MigrationRunner::from_settings(&settings)
        .run_pending(&store, |_| {})
        .await
        .unwrap();

    assert!(matches!(&reports[0].status, TaskRunStatus::Ran(Outcome::Skipped(_))));
    assert!(matches!(&reports[1].status, TaskRunStatus::Ran(Outcome::Skipped(_))));
    assert!(matches!(&reports[2].status, TaskRunStatus::Ran(Outcome::Applied(_))));
    assert_eq!(store.snapshot("roles").len(), 1);
    assert_eq!(store.snapshot("userroles").len(), 1);
}

#[tokio::test]
async fn failing_task_stops_the_run_without_a_marker() {
    let store = MemoryStore::new();
    store.reject_writes_to("userroles");
    let settings = Settings::default();
    let runner = MigrationRunner::from_settings(&settings);

    let err = runner.run_pending(&store, |_| {}).await.unwrap_err();
    match err {
        MaintenanceError::TaskFailed { task, .. } => {
            assert_eq!(task, "002_copy_default_role_to_userroles")
        }
        other => panic!("unexpected error: {other}"),
    }

    let markers = store.snapshot("maintenance_migrations");
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].get_str("name").unwrap(), "001_create_default_role");
}

struct AlwaysFails;

#[async_trait]
impl MaintenanceTask for AlwaysFails {
    fn name(&self) -> &str {
        "000_always_fails"
    }

    fn description(&self) -> String {
        "fails on purpose".to_string()
    }

    async fn apply(&self, store: &dyn DocumentStore) -> Result<Outcome, MaintenanceError> {
        store.insert_one("locked", doc! { "x": 1 }).await?;
        Ok(Outcome::Applied("unreachable".to_string()))
    }
}

#[tokio::test]
async fn custom_task_lists_run_in_the_given_order() {
    let store = MemoryStore::new();
    store.reject_writes_to("locked");
    let runner = MigrationRunner::new(vec![Box::new(AlwaysFails)], "markers");

    let mut progressed = 0;
    let result = runner.run_pending(&store, |_| progressed += 1).await;

    assert!(result.is_err());
    assert_eq!(progressed, 0);
    assert!(store.snapshot("markers").is_empty());
}
