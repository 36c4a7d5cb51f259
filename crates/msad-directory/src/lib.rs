//! # Directory core
//!
//! Core abstractions for managing users, groups and organizational units in
//! an Active Directory domain.
//!
//! The crate is transport-agnostic. A backend implements [`SessionFactory`]
//! and [`DirectorySession`]; the LDAP backend lives in
//! `msad-directory-ldap`.
//!
//! ## Crate Organization
//!
//! - [`error`] - Error types with classified `AlreadyExists` / `NotFound` variants
//! - [`entry`] - Entry snapshots (`UserEntry`, `GroupEntry`, ...)
//! - [`operation`] - Search criteria, raw records, attribute sets and modifications
//! - [`traits`] - Session seam traits
//! - [`config`] - Connection and TLS settings
//!
//! [`SessionFactory`]: traits::SessionFactory
//! [`DirectorySession`]: traits::DirectorySession

pub mod config;
pub mod entry;
pub mod error;
pub mod operation;
pub mod traits;

/// Prelude module for convenient imports.
///
/// ```
/// use msad_directory::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConnectionSettings, TlsConfig};
    pub use crate::entry::{
        DirectoryEntry, GroupEntry, OrganizationalUnitEntry, UserCreationRequest, UserEntry,
    };
    pub use crate::error::{DirectoryError, DirectoryResult};
    pub use crate::operation::{
        AttributeSet, DirectoryRecord, Modification, SearchCriteria, SearchScope,
    };
    pub use crate::traits::{DirectorySession, SessionFactory};
}

// Re-export async_trait for session implementors
pub use async_trait::async_trait;
