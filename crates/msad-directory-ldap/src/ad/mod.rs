//! Active Directory specific modules
//!
//! - objectSid / objectGUID decoding
//! - unicodePwd password encoding
//! - userAccountControl bitfield handling
//! - The [`ActiveDirectory`] facade with OU, user and group repositories,
//!   membership management and authentication

pub mod attributes;
mod auth;
pub mod directory;
mod groups;
mod membership;
mod organizational_unit;
pub mod password;
pub mod user_account_control;
mod users;

// Re-export key types
pub use attributes::{decode_guid, decode_security_id, encode_guid};
pub use directory::{
    dn_name, dn_parent, escape_rdn_value, to_sam_account, ActiveDirectory, DirectoryObject,
};
pub use password::encode_ad_password;
pub use user_account_control::{AccountControlFlags, UserAccountControl};
