//! LDAP session implementation
//!
//! Implements the session seam on top of the async `ldap3` client. Every
//! session is a dedicated connection with its own driver task.

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{
    AttributeSet, DirectoryRecord, Modification, SearchScope,
};
use msad_directory::traits::{DirectorySession, SessionFactory};

use crate::config::AdConfig;

/// Opens `ldap3` connections from an [`AdConfig`].
#[derive(Debug, Clone)]
pub struct LdapSessionFactory {
    config: AdConfig,
}

impl LdapSessionFactory {
    pub fn new(config: AdConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for LdapSessionFactory {
    #[instrument(skip(self), fields(host = %self.config.host, port = self.config.port))]
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        let url = self.config.url();

        debug!(url = %url, "Connecting to directory server");

        let mut settings = LdapConnSettings::new()
            .set_conn_timeout(self.config.connection.connection_timeout());
        if self.config.use_ssl() {
            self.config.tls.validate_security();
            settings = settings.set_no_tls_verify(!self.config.tls.verify_certificate);
        }

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("failed to connect to directory server at {url}"),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        Ok(Box::new(LdapSession {
            ldap,
            operation_timeout: self.config.connection.operation_timeout(),
        }))
    }
}

/// One `ldap3` connection.
pub struct LdapSession {
    ldap: Ldap,
    operation_timeout: Option<Duration>,
}

impl LdapSession {
    /// Handle for the next request, with the operation timeout applied.
    fn handle(&mut self) -> &mut Ldap {
        if let Some(timeout) = self.operation_timeout {
            self.ldap.with_timeout(timeout);
        }
        &mut self.ldap
    }
}

impl std::fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapSession")
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DirectorySession for LdapSession {
    #[instrument(skip(self, password))]
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        let result = self
            .handle()
            .simple_bind(dn, password)
            .await
            .map_err(|e| map_ldap_error("bind", e))?;
        check_result(result, dn)
    }

    #[instrument(skip(self, attributes))]
    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        let ldap3::SearchResult(entries, result) = self
            .handle()
            .search(base_dn, ldap_scope(scope), filter, attributes.to_vec())
            .await
            .map_err(|e| map_ldap_error("search", e))?;
        check_result(result, base_dn)?;

        let records: Vec<DirectoryRecord> = entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(record_from_entry)
            .collect();

        debug!(count = records.len(), "Search completed");
        Ok(records)
    }

    #[instrument(skip(self, attributes))]
    async fn add(&mut self, dn: &str, attributes: AttributeSet) -> DirectoryResult<()> {
        let result = self
            .handle()
            .add(dn, ldap_attributes(attributes))
            .await
            .map_err(|e| map_ldap_error("add", e))?;
        check_result(result, dn)
    }

    #[instrument(skip(self, changes))]
    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()> {
        let result = self
            .handle()
            .modify(dn, ldap_mods(changes))
            .await
            .map_err(|e| map_ldap_error("modify", e))?;
        check_result(result, dn)
    }

    #[instrument(skip(self))]
    async fn delete(&mut self, dn: &str) -> DirectoryResult<()> {
        let result = self
            .handle()
            .delete(dn)
            .await
            .map_err(|e| map_ldap_error("delete", e))?;
        check_result(result, dn)
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| map_ldap_error("unbind", e))
    }
}

/// Map a non-zero result code to a classified error.
fn check_result(result: LdapResult, identifier: &str) -> DirectoryResult<()> {
    if result.rc == 0 {
        return Ok(());
    }
    Err(DirectoryError::from_result_code(
        result.rc,
        result.text,
        identifier,
    ))
}

fn map_ldap_error(operation: &str, err: LdapError) -> DirectoryError {
    match err {
        LdapError::Timeout { .. } => DirectoryError::Timeout {
            operation: operation.to_string(),
        },
        other => DirectoryError::operation_failed_with_source(
            format!("LDAP {operation} failed"),
            other,
        ),
    }
}

fn ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

/// Convert an `ldap3` search entry to a record.
pub(crate) fn record_from_entry(entry: SearchEntry) -> DirectoryRecord {
    DirectoryRecord {
        dn: entry.dn,
        attrs: entry.attrs,
        bin_attrs: entry.bin_attrs,
    }
}

fn ldap_attributes(attributes: AttributeSet) -> Vec<(Vec<u8>, HashSet<Vec<u8>>)> {
    attributes
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| (name.into_bytes(), values.into_iter().collect()))
        .collect()
}

pub(crate) fn ldap_mods(changes: Vec<Modification>) -> Vec<Mod<Vec<u8>>> {
    changes
        .into_iter()
        .map(|change| match change {
            Modification::Add { attribute, values } => {
                Mod::Add(attribute.into_bytes(), values.into_iter().collect())
            }
            Modification::Delete { attribute, values } => {
                Mod::Delete(attribute.into_bytes(), values.into_iter().collect())
            }
            Modification::Replace { attribute, values } => {
                Mod::Replace(attribute.into_bytes(), values.into_iter().collect())
            }
        })
        .collect()
}
