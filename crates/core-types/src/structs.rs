use crate::enums::Capability;
use crate::error::CoreError;
use bson::oid::ObjectId;
use bson::{DateTime, Document};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A role's capability map, stored as a sub-document of booleans.
///
/// Keys are kept as strings so documents written by the storefront with
/// capabilities unknown to this tool survive a read-modify-write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    /// The six capabilities with the grants a new default role receives.
    pub fn default_role() -> Self {
        Capability::ALL
            .into_iter()
            .map(|c| (c.as_str().to_string(), c.granted_by_default()))
            .collect()
    }

    pub fn set(&mut self, capability: impl Into<String>, granted: bool) {
        self.0.insert(capability.into(), granted);
    }

    pub fn is_granted(&self, capability: Capability) -> bool {
        self.0.get(capability.as_str()).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Names of the granted capabilities, in key order.
    pub fn granted(&self) -> Vec<&str> {
        self.iter().filter(|(_, v)| *v).map(|(k, _)| k).collect()
    }
}

impl FromIterator<(String, bool)> for Permissions {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A role document as stored in both the `roles` and `userroles` collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,
}

impl Role {
    /// Builds a new, not yet inserted, default role stamped with the current time.
    pub fn new_default(name: &str, description: &str, permissions: Permissions) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            name: name.to_string(),
            description: description.to_string(),
            permissions,
            is_default: true,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// A copy of this role ready to be inserted into another collection:
    /// no `_id` and fresh timestamps.
    pub fn duplicate(&self) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            created_at: Some(now),
            updated_at: Some(now),
            ..self.clone()
        }
    }

    pub fn to_document(&self) -> Result<Document, bson::ser::Error> {
        bson::to_document(self)
    }

    pub fn from_document(doc: Document) -> Result<Self, CoreError> {
        Ok(bson::from_document(doc)?)
    }
}

/// A storefront user. Only the fields the maintenance tool reports are mapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl User {
    pub fn from_document(doc: Document) -> Result<Self, CoreError> {
        Ok(bson::from_document(doc)?)
    }
}

/// The marker recorded once a maintenance task has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRecord {
    pub name: String,
    pub applied_at: DateTime,
}

impl MigrationRecord {
    pub fn now(name: &str) -> Self {
        Self {
            name: name.to_string(),
            applied_at: DateTime::now(),
        }
    }

    pub fn from_document(doc: Document) -> Result<Self, CoreError> {
        Ok(bson::from_document(doc)?)
    }
}
