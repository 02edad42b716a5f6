use crate::DbError;
use crate::store::{DocumentStore, UpdateOutcome};
use bson::{Bson, DateTime, doc};
use core_types::{MigrationRecord, Role, User};

/// The `DbRepository` provides typed access to the storefront's role, user
/// and migration-marker documents on top of any `DocumentStore`.
///
/// Collection names are always passed in by the caller; nothing here
/// assumes the storefront's default layout.
#[derive(Debug)]
pub struct DbRepository<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> DbRepository<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Fetches every role in `collection`.
    pub async fn get_roles(&self, collection: &str) -> Result<Vec<Role>, DbError> {
        let docs = self.store.find(collection, doc! {}).await?;
        let roles = docs
            .into_iter()
            .map(Role::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roles)
    }

    /// Fetches the first role flagged `isDefault: true`, if any.
    pub async fn get_default_role(&self, collection: &str) -> Result<Option<Role>, DbError> {
        let doc = self.store.find_one(collection, doc! { "isDefault": true }).await?;
        Ok(doc.map(Role::from_document).transpose()?)
    }

    pub async fn get_role_by_name(&self, collection: &str, name: &str) -> Result<Option<Role>, DbError> {
        let doc = self.store.find_one(collection, doc! { "name": name }).await?;
        Ok(doc.map(Role::from_document).transpose()?)
    }

    /// Saves a role and returns the id the store assigned to it.
    pub async fn save_role(&self, collection: &str, role: &Role) -> Result<Bson, DbError> {
        let doc = role.to_document()?;
        self.store.insert_one(collection, doc).await
    }

    /// Renames the first role called `from` and bumps its `updatedAt`.
    pub async fn rename_role(&self, collection: &str, from: &str, to: &str) -> Result<UpdateOutcome, DbError> {
        self.store
            .update_one(
                collection,
                doc! { "name": from },
                doc! { "name": to, "updatedAt": DateTime::now() },
            )
            .await
    }

    /// Fetches every user in `collection`.
    pub async fn get_users(&self, collection: &str) -> Result<Vec<User>, DbError> {
        let docs = self.store.find(collection, doc! {}).await?;
        let users = docs
            .into_iter()
            .map(User::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Fetches every applied-task marker in `collection`.
    pub async fn get_migration_records(&self, collection: &str) -> Result<Vec<MigrationRecord>, DbError> {
        let docs = self.store.find(collection, doc! {}).await?;
        let records = docs
            .into_iter()
            .map(MigrationRecord::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub async fn get_migration_record(&self, collection: &str, name: &str) -> Result<Option<MigrationRecord>, DbError> {
        let doc = self.store.find_one(collection, doc! { "name": name }).await?;
        Ok(doc.map(MigrationRecord::from_document).transpose()?)
    }

    /// Records that the task `name` has been applied.
    pub async fn save_migration_record(&self, collection: &str, name: &str) -> Result<MigrationRecord, DbError> {
        let record = MigrationRecord::now(name);
        let doc = bson::to_document(&record)?;
        self.store.insert_one(collection, doc).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use core_types::Permissions;

    #[tokio::test]
    async fn saved_roles_read_back_with_their_id() {
        let store = MemoryStore::new();
        let repo = DbRepository::new(&store);
        let role = Role::new_default("user", "Default role", Permissions::default_role());

        let id = repo.save_role("roles", &role).await.unwrap();
        let stored = repo.get_default_role("roles").await.unwrap().unwrap();

        assert_eq!(Bson::ObjectId(stored.id.unwrap()), id);
        assert_eq!(stored.permissions, role.permissions);
        assert_eq!(store.count("roles", doc! { "isDefault": true }).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rename_touches_updated_at() {
        let store = MemoryStore::new();
        let repo = DbRepository::new(&store);
        store.seed("userroles", [doc! { "name": "user", "isDefault": true }]);

        let outcome = repo.rename_role("userroles", "user", "viewer").await.unwrap();
        assert_eq!(outcome.modified, 1);

        let renamed = repo.get_role_by_name("userroles", "viewer").await.unwrap().unwrap();
        assert!(renamed.updated_at.is_some());
        assert!(repo.get_role_by_name("userroles", "user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_role_is_a_shape_error() {
        let store = MemoryStore::new();
        store.seed("roles", [doc! { "name": 42 }]);

        let err = DbRepository::new(&store).get_roles("roles").await.unwrap_err();
        assert!(matches!(err, DbError::ShapeError(_)));
    }

    #[tokio::test]
    async fn migration_records_round_trip() {
        let store = MemoryStore::new();
        let repo = DbRepository::new(&store);

        assert!(repo.get_migration_record("maintenance_migrations", "001").await.unwrap().is_none());
        repo.save_migration_record("maintenance_migrations", "001").await.unwrap();

        let records = repo.get_migration_records("maintenance_migrations").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "001");
    }
}
