//! Session traits
//!
//! The seam between the Active Directory logic and the wire protocol. A
//! [`SessionFactory`] hands out fresh connections; a [`DirectorySession`] is
//! one connection, used for a single public operation and then released.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::operation::{AttributeSet, DirectoryRecord, Modification, SearchScope};

/// One connection to the directory server.
#[async_trait]
pub trait DirectorySession: Send {
    /// Authenticate the connection as `dn` with `password`.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()>;

    /// Search below `base_dn`.
    ///
    /// Zero matches is `Ok(vec![])`; callers decide whether that is an error.
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryRecord>>;

    /// Create an entry. Fails with `AlreadyExists` when the DN is taken.
    async fn add(&mut self, dn: &str, attributes: AttributeSet) -> DirectoryResult<()>;

    /// Apply changes to an entry.
    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()>;

    /// Delete an entry.
    async fn delete(&mut self, dn: &str) -> DirectoryResult<()>;

    /// Close the connection.
    async fn unbind(&mut self) -> DirectoryResult<()>;
}

/// Opens unauthenticated connections to the directory server.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>>;
}
