use serde::{Deserialize, Serialize};
use std::fmt;

/// The capabilities the storefront checks against a role's permission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    ViewProducts,
    ViewOrders,
    ManageProducts,
    ManageOrders,
    ManageUsers,
    ManageSettings,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::ViewProducts,
        Capability::ViewOrders,
        Capability::ManageProducts,
        Capability::ManageOrders,
        Capability::ManageUsers,
        Capability::ManageSettings,
    ];

    /// The key used for this capability inside a stored `permissions` map.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewProducts => "viewProducts",
            Capability::ViewOrders => "viewOrders",
            Capability::ManageProducts => "manageProducts",
            Capability::ManageOrders => "manageOrders",
            Capability::ManageUsers => "manageUsers",
            Capability::ManageSettings => "manageSettings",
        }
    }

    /// Whether a freshly created default role is granted this capability.
    pub fn granted_by_default(&self) -> bool {
        matches!(self, Capability::ViewProducts | Capability::ViewOrders)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
