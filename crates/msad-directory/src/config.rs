//! Shared configuration types
//!
//! Connection and TLS settings common to every directory backend.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Common connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Per-operation timeout in seconds. `None` keeps the transport default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_secs: Option<u64>,
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            operation_timeout_secs: None,
        }
    }
}

impl ConnectionSettings {
    /// Create new connection settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout_secs = secs;
        self
    }

    /// Set the per-operation timeout.
    #[must_use]
    pub fn with_operation_timeout(mut self, secs: u64) -> Self {
        self.operation_timeout_secs = Some(secs);
        self
    }

    /// Get connection timeout as Duration.
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Get the operation timeout as Duration, if one is configured.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

/// SSL/TLS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Whether to verify the server certificate.
    #[serde(default = "default_true")]
    pub verify_certificate: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify_certificate: true,
        }
    }
}

impl TlsConfig {
    /// TLS configuration that accepts any server certificate.
    ///
    /// Domain controllers commonly present certificates from an internal CA;
    /// only use this when that CA cannot be installed on the client.
    pub fn insecure() -> Self {
        Self {
            verify_certificate: false,
        }
    }

    /// Log a security warning when certificate verification is disabled.
    pub fn validate_security(&self) {
        if !self.verify_certificate {
            tracing::warn!(
                target: "security",
                "TLS certificate verification is DISABLED for the directory connection. \
                 The connection is vulnerable to man-in-the-middle attacks."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_settings_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.connection_timeout_secs, 30);
        assert_eq!(settings.connection_timeout(), Duration::from_secs(30));
        assert!(settings.operation_timeout().is_none());
    }

    #[test]
    fn test_connection_settings_builder() {
        let settings = ConnectionSettings::new()
            .with_connection_timeout(5)
            .with_operation_timeout(10);
        assert_eq!(settings.connection_timeout(), Duration::from_secs(5));
        assert_eq!(settings.operation_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_connection_settings_deserialize_defaults() {
        let settings: ConnectionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, ConnectionSettings::default());

        let settings: ConnectionSettings =
            serde_json::from_str(r#"{"operation_timeout_secs": 15}"#).unwrap();
        assert_eq!(settings.operation_timeout_secs, Some(15));
        assert_eq!(settings.connection_timeout_secs, 30);
    }

    #[test]
    fn test_tls_config_defaults_to_verify() {
        let tls: TlsConfig = serde_json::from_str("{}").unwrap();
        assert!(tls.verify_certificate);
        assert!(!TlsConfig::insecure().verify_certificate);
    }
}
