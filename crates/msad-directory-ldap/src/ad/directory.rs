//! Active Directory facade
//!
//! [`ActiveDirectory`] owns the configuration and a session factory. Every
//! public operation opens its own session, runs one or more round-trips on
//! it and releases it before returning, whatever the outcome.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use msad_directory::entry::{DirectoryEntry, GroupEntry, OrganizationalUnitEntry, UserEntry};
use msad_directory::error::{DirectoryError, DirectoryResult};
use msad_directory::operation::{DirectoryRecord, SearchCriteria, SearchScope};
use msad_directory::traits::{DirectorySession, SessionFactory};

use super::attributes::{decode_guid, decode_security_id};
use crate::config::AdConfig;
use crate::filter::build_filter;
use crate::session::LdapSessionFactory;

pub const CLASS_ORGANIZATIONAL_UNIT: &str = "organizationalUnit";
pub const CLASS_GROUP: &str = "group";
pub const CLASS_USER: &str = "user";

/// An entry type that can be read from a search record.
pub trait DirectoryObject: Sized {
    /// objectClass the entries are filtered on.
    const OBJECT_CLASS: &'static str;
    /// Attributes requested from the server.
    const ATTRIBUTES: &'static [&'static str];

    fn from_record(record: &DirectoryRecord) -> Self;
}

const ENTRY_ATTRIBUTES: &[&str] = &["name", "objectGUID", "distinguishedName"];

impl DirectoryObject for DirectoryEntry {
    const OBJECT_CLASS: &'static str = "";
    const ATTRIBUTES: &'static [&'static str] = ENTRY_ATTRIBUTES;

    fn from_record(record: &DirectoryRecord) -> Self {
        let distinguished_name = if record.dn.is_empty() {
            record.value("distinguishedName").to_string()
        } else {
            record.dn.clone()
        };
        DirectoryEntry {
            name: record.value("name").to_string(),
            guid: decode_guid(record.raw_value("objectGUID")),
            distinguished_name,
        }
    }
}

impl DirectoryObject for UserEntry {
    const OBJECT_CLASS: &'static str = CLASS_USER;
    const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "objectGUID",
        "distinguishedName",
        "objectSid",
        "sAMAccountName",
        "msNPAllowDialin",
    ];

    fn from_record(record: &DirectoryRecord) -> Self {
        UserEntry {
            entry: DirectoryEntry::from_record(record),
            security_id: decode_security_id(record.raw_value("objectSid")),
            account_name: record.value("sAMAccountName").to_string(),
            dialin_enabled: record.optional_value("msNPAllowDialin").map(str::to_string),
        }
    }
}

impl DirectoryObject for GroupEntry {
    const OBJECT_CLASS: &'static str = CLASS_GROUP;
    const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "objectGUID",
        "distinguishedName",
        "objectSid",
        "sAMAccountName",
        "description",
        "info",
    ];

    fn from_record(record: &DirectoryRecord) -> Self {
        GroupEntry {
            entry: DirectoryEntry::from_record(record),
            security_id: decode_security_id(record.raw_value("objectSid")),
            account_name: record.value("sAMAccountName").to_string(),
            description: record.value("description").to_string(),
            info: record.value("info").to_string(),
        }
    }
}

impl DirectoryObject for OrganizationalUnitEntry {
    const OBJECT_CLASS: &'static str = CLASS_ORGANIZATIONAL_UNIT;
    const ATTRIBUTES: &'static [&'static str] = &[
        "name",
        "objectGUID",
        "distinguishedName",
        "description",
        "street",
    ];

    fn from_record(record: &DirectoryRecord) -> Self {
        OrganizationalUnitEntry {
            entry: DirectoryEntry::from_record(record),
            description: record.value("description").to_string(),
            street: record.value("street").to_string(),
        }
    }
}

/// Client for one Active Directory domain.
pub struct ActiveDirectory {
    config: AdConfig,
    sessions: Arc<dyn SessionFactory>,
}

impl ActiveDirectory {
    /// Create a client that talks LDAP to the configured domain controller.
    pub fn new(config: AdConfig) -> DirectoryResult<Self> {
        let sessions = Arc::new(LdapSessionFactory::new(config.clone()));
        Self::with_session_factory(config, sessions)
    }

    /// Create a client on top of a custom session factory.
    pub fn with_session_factory(
        config: AdConfig,
        sessions: Arc<dyn SessionFactory>,
    ) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self { config, sessions })
    }

    pub fn config(&self) -> &AdConfig {
        &self.config
    }

    /// Open a session, bound as the service account when `bind` is set.
    pub(crate) async fn open(&self, bind: bool) -> DirectoryResult<Box<dyn DirectorySession>> {
        let mut session = self.sessions.connect().await?;
        if bind {
            let password = self.config.bind_password.as_deref().unwrap_or_default();
            if let Err(e) = session.simple_bind(&self.config.bind_dn, password).await {
                release(session).await;
                return Err(e);
            }
        }
        Ok(session)
    }

    /// Look up a single entry of any object class.
    #[instrument(skip(self))]
    pub async fn get_entry(
        &self,
        criteria: &SearchCriteria,
        object_class: &str,
    ) -> DirectoryResult<DirectoryEntry> {
        let mut session = self.open(true).await?;
        let result = self
            .search_one(session.as_mut(), &self.config.base_dn, object_class, criteria)
            .await
            .map(|record| DirectoryEntry::from_record(&record));
        release(session).await;
        result
    }

    /// Search for every `T` under `base_dn` matching `criteria`.
    pub(crate) async fn find<T: DirectoryObject>(
        &self,
        session: &mut dyn DirectorySession,
        base_dn: &str,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<Vec<T>> {
        let filter = build_filter(T::OBJECT_CLASS, criteria);
        debug!(base_dn = %base_dn, filter = %filter, "Searching directory");
        let records = session
            .search(base_dn, SearchScope::Subtree, &filter, T::ATTRIBUTES)
            .await?;
        Ok(records.iter().map(T::from_record).collect())
    }

    /// Search for exactly one `T`; the first match wins.
    pub(crate) async fn find_one<T: DirectoryObject>(
        &self,
        session: &mut dyn DirectorySession,
        base_dn: &str,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<T> {
        let filter = build_filter(T::OBJECT_CLASS, criteria);
        let records = session
            .search(base_dn, SearchScope::Subtree, &filter, T::ATTRIBUTES)
            .await?;
        first_match(&records, &filter, criteria).map(T::from_record)
    }

    /// Search for one raw record with a caller-chosen attribute list.
    pub(crate) async fn search_one(
        &self,
        session: &mut dyn DirectorySession,
        base_dn: &str,
        object_class: &str,
        criteria: &SearchCriteria,
    ) -> DirectoryResult<DirectoryRecord> {
        self.search_one_with(session, base_dn, object_class, criteria, ENTRY_ATTRIBUTES)
            .await
    }

    pub(crate) async fn search_one_with(
        &self,
        session: &mut dyn DirectorySession,
        base_dn: &str,
        object_class: &str,
        criteria: &SearchCriteria,
        attributes: &[&str],
    ) -> DirectoryResult<DirectoryRecord> {
        let filter = build_filter(object_class, criteria);
        let mut records = session
            .search(base_dn, SearchScope::Subtree, &filter, attributes)
            .await?;
        first_match(&records, &filter, criteria)?;
        Ok(records.swap_remove(0))
    }
}

impl std::fmt::Debug for ActiveDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveDirectory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn first_match<'a>(
    records: &'a [DirectoryRecord],
    filter: &str,
    criteria: &SearchCriteria,
) -> DirectoryResult<&'a DirectoryRecord> {
    let Some(first) = records.first() else {
        return Err(DirectoryError::not_found(describe(criteria)));
    };
    if records.len() > 1 {
        warn!(
            filter = %filter,
            matches = records.len(),
            dn = %first.dn,
            "Lookup matched more than one entry, using the first"
        );
    }
    Ok(first)
}

/// Human-readable name of what a lookup was looking for.
pub(crate) fn describe(criteria: &SearchCriteria) -> String {
    let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(account) = non_empty(&criteria.account) {
        return format!("account ({account})");
    }
    if let Some(dn) = criteria.distinguished_names.iter().find(|dn| !dn.is_empty()) {
        return format!("object ({dn})");
    }
    if let Some(sid) = non_empty(&criteria.security_id) {
        return format!("object ({sid})");
    }
    if let Some(guid) = non_empty(&criteria.guid) {
        return format!("object ({guid})");
    }
    "entry".to_string()
}

/// Close a session, logging instead of failing.
pub(crate) async fn release(mut session: Box<dyn DirectorySession>) {
    if let Err(e) = session.unbind().await {
        warn!(error = %e, "Failed to close directory session");
    }
}

/// Value of the first RDN: `CN=Jane,OU=Test,...` gives `Jane`.
#[must_use]
pub fn dn_name(dn: &str) -> String {
    let rdn = &dn[..first_separator(dn).unwrap_or(dn.len())];
    match rdn.split_once('=') {
        Some((_, value)) => value.to_string(),
        None => String::new(),
    }
}

/// Everything after the first RDN, or an empty string for a single RDN.
#[must_use]
pub fn dn_parent(dn: &str) -> String {
    match first_separator(dn) {
        Some(index) => dn[index + 1..].to_string(),
        None => String::new(),
    }
}

/// Escape a value for use as an RDN value (RFC 4514).
///
/// `,` `+` `"` `\` `<` `>` `;` `=` are prefixed with a backslash, as are a
/// leading `#` or space and a trailing space.
#[must_use]
pub fn escape_rdn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len());
    for (index, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (index == 0 && matches!(c, '#' | ' '))
            || (index == last && c == ' ');
        if special {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Byte offset of the first comma not escaped with a backslash.
fn first_separator(dn: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in dn.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            ',' => return Some(index),
            _ => {}
        }
    }
    None
}

/// Reduce `DOMAIN\jane` or `jane@example.com` to the logon name `jane`.
#[must_use]
pub fn to_sam_account(account: &str) -> String {
    let without_domain = account.rsplit('\\').next().unwrap_or(account);
    let without_suffix = without_domain.split('@').next().unwrap_or(without_domain);
    without_suffix.trim().to_string()
}
