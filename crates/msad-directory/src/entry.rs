//! Directory entry snapshots
//!
//! Read-only values produced by search operations. Nothing here is cached or
//! written back; every read returns a fresh copy.

use serde::{Deserialize, Serialize};

/// Attributes common to every directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Relative name (name).
    pub name: String,
    /// Canonical hyphenated GUID (objectGUID).
    pub guid: String,
    /// Distinguished name.
    pub distinguished_name: String,
}

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntry {
    #[serde(flatten)]
    pub entry: DirectoryEntry,
    /// Canonical SID string (objectSid).
    pub security_id: String,
    /// Logon name (sAMAccountName).
    pub account_name: String,
    /// Raw msNPAllowDialin value; `None` when the attribute is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialin_enabled: Option<String>,
}

impl UserEntry {
    /// Distinguished name of the user.
    pub fn dn(&self) -> &str {
        &self.entry.distinguished_name
    }

    /// True when msNPAllowDialin is "TRUE" (any case).
    pub fn is_dialin_enabled(&self) -> bool {
        self.dialin_enabled
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("TRUE"))
    }
}

/// A security or distribution group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEntry {
    #[serde(flatten)]
    pub entry: DirectoryEntry,
    pub security_id: String,
    pub account_name: String,
    pub description: String,
    /// Free-text annotation (info).
    pub info: String,
}

impl GroupEntry {
    pub fn dn(&self) -> &str {
        &self.entry.distinguished_name
    }
}

/// An organizational unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnitEntry {
    #[serde(flatten)]
    pub entry: DirectoryEntry,
    pub description: String,
    pub street: String,
}

impl OrganizationalUnitEntry {
    pub fn dn(&self) -> &str {
        &self.entry.distinguished_name
    }
}

/// Input for creating a user. Consumed once by the create operation.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreationRequest {
    /// Display name, used as the CN.
    pub name: String,
    /// Logon name.
    pub account: String,
    /// Initial password.
    pub password: String,
    /// DN of the direct manager.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_dn: Option<String>,
    /// DN of the organizational unit to create the user in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ou_dn: Option<String>,
}

impl UserCreationRequest {
    pub fn new(
        name: impl Into<String>,
        account: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            account: account.into(),
            password: password.into(),
            manager_dn: None,
            parent_ou_dn: None,
        }
    }

    #[must_use]
    pub fn with_manager(mut self, manager_dn: impl Into<String>) -> Self {
        self.manager_dn = Some(manager_dn.into());
        self
    }

    #[must_use]
    pub fn with_parent_ou(mut self, parent_ou_dn: impl Into<String>) -> Self {
        self.parent_ou_dn = Some(parent_ou_dn.into());
        self
    }
}

impl std::fmt::Debug for UserCreationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCreationRequest")
            .field("name", &self.name)
            .field("account", &self.account)
            .field("password", &"***REDACTED***")
            .field("manager_dn", &self.manager_dn)
            .field("parent_ou_dn", &self.parent_ou_dn)
            .finish()
    }
}
