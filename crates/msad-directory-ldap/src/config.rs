//! Active Directory configuration
//!
//! Connection and account settings for an Active Directory domain. Loading
//! these from a file is left to the caller; the type only needs serde.

use msad_directory::config::{ConnectionSettings, TlsConfig};
use msad_directory::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};

/// Port on which the directory speaks LDAP over TLS.
pub const LDAPS_PORT: u16 = 636;

/// Configuration for an Active Directory domain.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdConfig {
    /// Domain controller hostname or IP address.
    pub host: String,

    /// LDAP port. 636 selects LDAPS, anything else plain LDAP.
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Base DN of the domain (e.g., "DC=example,DC=com").
    pub base_dn: String,

    /// DN of the service account used for every authenticated session.
    pub bind_dn: String,

    /// Service account password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connection settings (timeouts).
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// TLS configuration, only used on the LDAPS port.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Container for users created without an explicit OU, relative to `base_dn`.
    #[serde(default = "default_users_container")]
    pub users_container: String,

    /// Account name of the administrators group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_group: Option<String>,
}

impl std::fmt::Debug for AdConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection", &self.connection)
            .field("tls", &self.tls)
            .field("users_container", &self.users_container)
            .field("admin_group", &self.admin_group)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_users_container() -> String {
    "CN=Users".to_string()
}

impl AdConfig {
    /// Create a new config with required fields.
    pub fn new(
        host: impl Into<String>,
        base_dn: impl Into<String>,
        bind_dn: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            base_dn: base_dn.into(),
            bind_dn: bind_dn.into(),
            bind_password: None,
            connection: ConnectionSettings::default(),
            tls: TlsConfig::default(),
            users_container: default_users_container(),
            admin_group: None,
        }
    }

    /// Set the service account password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.bind_password = Some(password.into());
        self
    }

    /// Switch to LDAPS on the standard port.
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.port = LDAPS_PORT;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_users_container(mut self, container: impl Into<String>) -> Self {
        self.users_container = container.into();
        self
    }

    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// True when sessions use LDAPS.
    pub fn use_ssl(&self) -> bool {
        self.port == LDAPS_PORT
    }

    /// Get the LDAP URL.
    #[must_use]
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl() { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Full DN of the default users container.
    #[must_use]
    pub fn default_users_dn(&self) -> String {
        if self.users_container.is_empty() {
            return self.base_dn.clone();
        }
        format!("{},{}", self.users_container, self.base_dn)
    }

    /// Check that every required field is set.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }

        if self.port == 0 {
            return Err(DirectoryError::InvalidConfiguration {
                message: "port must be non-zero".to_string(),
            });
        }

        if self.base_dn.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "base_dn is required".to_string(),
            });
        }

        if self.bind_dn.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "bind_dn is required".to_string(),
            });
        }

        Ok(())
    }

    /// Copy of the config safe to log or serialize.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.bind_password.is_some() {
            config.bind_password = Some("***REDACTED***".to_string());
        }
        config
    }
}
