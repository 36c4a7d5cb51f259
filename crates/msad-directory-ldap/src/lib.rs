//! # Active Directory over LDAP
//!
//! Manage organizational units, users and groups in an Active Directory
//! domain, and authenticate users against it.
//!
//! ## Features
//!
//! - LDAP v3 via `ldap3`, LDAPS when the port is 636
//! - One session per operation, released on every exit path
//! - Filter construction with escaping of untrusted values
//! - objectSid / objectGUID decoding
//! - unicodePwd password provisioning
//! - userAccountControl and dial-in flag management
//!
//! ## Example
//!
//! ```ignore
//! use msad_directory::entry::UserCreationRequest;
//! use msad_directory_ldap::{ActiveDirectory, AdConfig};
//!
//! let config = AdConfig::new(
//!     "dc01.example.com",
//!     "DC=example,DC=com",
//!     "CN=svc-msad,CN=Users,DC=example,DC=com",
//! )
//! .with_password("secret")
//! .with_ssl();
//!
//! let directory = ActiveDirectory::new(config)?;
//! directory
//!     .create_user(
//!         UserCreationRequest::new("Jane", "jane", "P@ss1234")
//!             .with_parent_ou("OU=Test,DC=example,DC=com"),
//!     )
//!     .await?;
//! let user = directory.login("EXAMPLE\\jane", "P@ss1234").await?;
//! ```

pub mod ad;
pub mod config;
pub mod filter;
pub mod session;

// Re-exports
pub use ad::{AccountControlFlags, ActiveDirectory, UserAccountControl};
pub use config::AdConfig;
pub use filter::{build_filter, escape_filter_value};
pub use session::{LdapSession, LdapSessionFactory};
