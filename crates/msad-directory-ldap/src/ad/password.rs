//! AD password operations using unicodePwd attribute encoding.
//!
//! Active Directory only accepts passwords through the `unicodePwd`
//! attribute, as the double-quoted password encoded in UTF-16LE with no
//! byte-order mark. Most domains refuse the write over plain LDAP.

use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::Modification;
use tracing::instrument;

/// Attribute holding the encoded password.
pub const UNICODE_PWD: &str = "unicodePwd";

/// Encode a plaintext password for AD's unicodePwd attribute.
///
/// # Errors
/// Returns an error if the password is empty.
#[instrument(skip(password))]
pub fn encode_ad_password(password: &str) -> DirectoryResult<Vec<u8>> {
    if password.is_empty() {
        return Err(DirectoryError::invalid_input("password cannot be empty"));
    }

    let quoted = format!("\"{password}\"");
    Ok(quoted.encode_utf16().flat_map(u16::to_le_bytes).collect())
}

/// Modification that resets the password to `password`.
pub fn password_replace(password: &str) -> DirectoryResult<Modification> {
    Ok(Modification::replace(
        UNICODE_PWD,
        [encode_ad_password(password)?],
    ))
}

/// Map the result of a password write.
///
/// The directory answers unwillingToPerform when the password breaks the
/// domain's complexity or history policy.
pub(crate) fn classify_password_error(err: DirectoryError) -> DirectoryError {
    if err.result_code() == Some(msad_directory::error::RESULT_UNWILLING_TO_PERFORM) {
        DirectoryError::WeakPassword
    } else {
        err
    }
}
