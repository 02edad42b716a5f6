//! The query and mutation operations behind each subcommand.
//!
//! Every operation borrows the store it runs against and receives its
//! collection names and documents as arguments. Writes report an `Outcome`
//! so callers can tell a no-op from a change. A missing document that an
//! operation depends on is an expected absence: it is logged and reported
//! as `Outcome::Skipped`, never as an error.

use crate::MaintenanceError;
use bson::{Bson, Document};
use configuration::{DefaultRoleSettings, RenameSettings};
use core_types::{Role, User};
use database::{DbRepository, DocumentStore, UpdateOutcome};
use serde::Serialize;
use std::fmt;
use tracing::info;

/// What a mutating operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Applied(String),
    Skipped(String),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied(detail) => write!(f, "applied: {detail}"),
            Outcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

// ==============================================================================
// Generic operations
// ==============================================================================

pub async fn check_connection<S: DocumentStore + ?Sized>(store: &S) -> Result<(), MaintenanceError> {
    store.ping().await?;
    info!("database answered ping");
    Ok(())
}

pub async fn list_collections<S: DocumentStore + ?Sized>(store: &S) -> Result<Vec<String>, MaintenanceError> {
    Ok(store.list_collections().await?)
}

pub async fn find_all<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    filter: Document,
) -> Result<Vec<Document>, MaintenanceError> {
    Ok(store.find(collection, filter).await?)
}

pub async fn find_one<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    filter: Document,
) -> Result<Option<Document>, MaintenanceError> {
    Ok(store.find_one(collection, filter).await?)
}

pub async fn insert_one<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    document: Document,
) -> Result<Bson, MaintenanceError> {
    Ok(store.insert_one(collection, document).await?)
}

pub async fn update_one<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    filter: Document,
    set: Document,
) -> Result<UpdateOutcome, MaintenanceError> {
    Ok(store.update_one(collection, filter, set).await?)
}

// ==============================================================================
// Role and user inspection
// ==============================================================================

pub async fn show_roles<S: DocumentStore + ?Sized>(store: &S, collection: &str) -> Result<Vec<Role>, MaintenanceError> {
    let roles = DbRepository::new(store).get_roles(collection).await?;
    if roles.is_empty() {
        info!(collection, "collection holds no roles");
    }
    Ok(roles)
}

pub async fn show_default_role<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
) -> Result<Option<Role>, MaintenanceError> {
    let role = DbRepository::new(store).get_default_role(collection).await?;
    if role.is_none() {
        info!(collection, "no default role found");
    }
    Ok(role)
}

pub async fn show_users<S: DocumentStore + ?Sized>(store: &S, collection: &str) -> Result<Vec<User>, MaintenanceError> {
    Ok(DbRepository::new(store).get_users(collection).await?)
}

// ==============================================================================
// Role fix-ups
// ==============================================================================

/// Inserts the configured default role into `collection` unless the
/// collection already has one.
pub async fn create_default_role<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    settings: &DefaultRoleSettings,
) -> Result<Outcome, MaintenanceError> {
    let repo = DbRepository::new(store);

    if let Some(existing) = repo.get_default_role(collection).await? {
        info!(collection, role = %existing.name, "default role already exists");
        return Ok(Outcome::Skipped(format!(
            "'{}' is already the default role in {collection}",
            existing.name
        )));
    }

    let role = Role::new_default(&settings.name, &settings.description, settings.permissions());
    let id = repo.save_role(collection, &role).await?;
    info!(collection, role = %role.name, %id, "default role created");

    Ok(Outcome::Applied(format!("created default role '{}' in {collection}", role.name)))
}

/// Copies the default role of `source` into `target` when `target` has no
/// default role yet.
pub async fn fix_default_role<S: DocumentStore + ?Sized>(
    store: &S,
    source: &str,
    target: &str,
) -> Result<Outcome, MaintenanceError> {
    let repo = DbRepository::new(store);

    let Some(role) = repo.get_default_role(source).await? else {
        info!(collection = source, "no default role to copy");
        return Ok(Outcome::Skipped(format!("{source} has no default role")));
    };

    if let Some(existing) = repo.get_default_role(target).await? {
        info!(collection = target, role = %existing.name, "target already has a default role");
        return Ok(Outcome::Skipped(format!(
            "'{}' is already the default role in {target}",
            existing.name
        )));
    }

    let copy = role.duplicate();
    let id = repo.save_role(target, &copy).await?;
    info!(from = source, to = target, role = %copy.name, %id, "default role copied");

    Ok(Outcome::Applied(format!("copied default role '{}' from {source} to {target}", copy.name)))
}

/// Renames the role `rename.from` to `rename.to` in `collection`.
///
/// Does nothing when `rename.from` is absent or `rename.to` already exists,
/// so repeated runs never leave two roles with the new name.
pub async fn update_role_name<S: DocumentStore + ?Sized>(
    store: &S,
    collection: &str,
    rename: &RenameSettings,
) -> Result<Outcome, MaintenanceError> {
    let repo = DbRepository::new(store);

    if repo.get_role_by_name(collection, &rename.to).await?.is_some() {
        info!(collection, role = %rename.to, "role already present");
        return Ok(Outcome::Skipped(format!("{collection} already has a role named '{}'", rename.to)));
    }

    let outcome = repo.rename_role(collection, &rename.from, &rename.to).await?;
    if outcome.matched == 0 {
        info!(collection, role = %rename.from, "no role to rename");
        return Ok(Outcome::Skipped(format!("{collection} has no role named '{}'", rename.from)));
    }

    info!(collection, from = %rename.from, to = %rename.to, "role renamed");
    Ok(Outcome::Applied(format!(
        "renamed role '{}' to '{}' in {collection}",
        rename.from, rename.to
    )))
}
