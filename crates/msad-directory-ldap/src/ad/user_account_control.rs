//! userAccountControl bitfield handling.

use msad_directory::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};

/// Raw userAccountControl value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UserAccountControl {
    pub value: u32,
}

impl UserAccountControl {
    pub const SCRIPT: u32 = 0x0001;
    pub const ACCOUNTDISABLE: u32 = 0x0002;
    pub const HOMEDIR_REQUIRED: u32 = 0x0008;
    pub const LOCKOUT: u32 = 0x0010;
    pub const PASSWD_NOTREQD: u32 = 0x0020;
    pub const PASSWD_CANT_CHANGE: u32 = 0x0040;
    pub const ENCRYPTED_TEXT_PWD_ALLOWED: u32 = 0x0080;
    pub const NORMAL_ACCOUNT: u32 = 0x0200;
    pub const INTERDOMAIN_TRUST_ACCOUNT: u32 = 0x0800;
    pub const WORKSTATION_TRUST_ACCOUNT: u32 = 0x1000;
    pub const SERVER_TRUST_ACCOUNT: u32 = 0x2000;
    pub const DONT_EXPIRE_PASSWORD: u32 = 0x0001_0000;
    pub const SMARTCARD_REQUIRED: u32 = 0x0004_0000;
    pub const TRUSTED_FOR_DELEGATION: u32 = 0x0008_0000;
    pub const NOT_DELEGATED: u32 = 0x0010_0000;
    pub const PASSWORD_EXPIRED: u32 = 0x0080_0000;

    #[must_use]
    pub fn from_value(value: u32) -> Self {
        Self { value }
    }

    /// Parse the decimal string form stored in the directory.
    pub fn parse(raw: &str) -> DirectoryResult<Self> {
        raw.trim()
            .parse::<u32>()
            .map(Self::from_value)
            .map_err(|_| DirectoryError::InvalidData {
                message: format!("userAccountControl is not a number: {raw:?}"),
            })
    }

    pub fn has(&self, flag: u32) -> bool {
        self.value & flag == flag
    }

    #[must_use]
    pub fn with(self, flag: u32, set: bool) -> Self {
        if set {
            Self::from_value(self.value | flag)
        } else {
            Self::from_value(self.value & !flag)
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.has(Self::ACCOUNTDISABLE)
    }

    pub fn is_active(&self) -> bool {
        !self.is_disabled()
    }

    pub fn password_never_expires(&self) -> bool {
        self.has(Self::DONT_EXPIRE_PASSWORD)
    }
}

impl std::fmt::Display for UserAccountControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// The two account-control bits this crate manages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountControlFlags {
    pub disabled: bool,
    pub password_never_expires: bool,
}

impl AccountControlFlags {
    /// Read the managed bits from a raw userAccountControl string.
    pub fn decode(raw: &str) -> DirectoryResult<Self> {
        let uac = UserAccountControl::parse(raw)?;
        Ok(Self {
            disabled: uac.is_disabled(),
            password_never_expires: uac.password_never_expires(),
        })
    }

    /// Apply the managed bits to `raw`, leaving every other bit untouched.
    pub fn encode(&self, raw: &str) -> DirectoryResult<String> {
        let uac = UserAccountControl::parse(raw)?
            .with(UserAccountControl::ACCOUNTDISABLE, self.disabled)
            .with(
                UserAccountControl::DONT_EXPIRE_PASSWORD,
                self.password_never_expires,
            );
        Ok(uac.to_string())
    }
}
