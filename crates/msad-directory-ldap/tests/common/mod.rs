//! Test helpers for msad-directory-ldap.
//!
//! Provides an in-memory directory that implements the session seam, so the
//! Active Directory operations can be exercised without a domain controller.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::TestDirectory;
//!
//! #[tokio::test]
//! async fn my_test() {
//!     let ctx = TestDirectory::new();
//!     ctx.directory.add_organizational_unit("OU=Test,DC=example,DC=com", "", "").await?;
//! }
//! ```

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use msad_directory::error::{DirectoryError, DirectoryResult, RESULT_UNWILLING_TO_PERFORM};
use msad_directory::operation::{AttributeSet, DirectoryRecord, Modification, SearchScope};
use msad_directory::traits::{DirectorySession, SessionFactory};
use msad_directory_ldap::ad::{decode_guid, decode_security_id, dn_name, dn_parent};
use msad_directory_ldap::{ActiveDirectory, AdConfig};
use uuid::Uuid;

pub const BASE_DN: &str = "DC=example,DC=com";
pub const USERS_DN: &str = "CN=Users,DC=example,DC=com";
pub const SERVICE_DN: &str = "CN=svc-msad,CN=Users,DC=example,DC=com";
pub const SERVICE_PASSWORD: &str = "Svc-Passw0rd";
pub const ADMIN_GROUP: &str = "Domain Admins";
pub const ADMIN_GROUP_DN: &str = "CN=Domain Admins,CN=Users,DC=example,DC=com";

/// Passwords shorter than this are rejected with unwillingToPerform.
pub const MIN_PASSWORD_LEN: usize = 8;

const RESULT_OPERATIONS_ERROR: u32 = 1;
const RESULT_NO_SUCH_ATTRIBUTE: u32 = 16;
const RESULT_NO_SUCH_OBJECT: u32 = 32;
const RESULT_INVALID_CREDENTIALS: u32 = 49;
const RESULT_ENTRY_ALREADY_EXISTS: u32 = 68;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

/// Configuration pointing at the in-memory domain.
pub fn test_config() -> AdConfig {
    AdConfig::new("dc01.example.com", BASE_DN, SERVICE_DN)
        .with_password(SERVICE_PASSWORD)
        .with_admin_group(ADMIN_GROUP)
}

/// A client wired to a fresh in-memory domain.
pub struct TestDirectory {
    pub directory: ActiveDirectory,
    pub server: MemoryDirectory,
}

impl TestDirectory {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AdConfig) -> Self {
        init_test_logging();
        let server = MemoryDirectory::new();
        let directory = ActiveDirectory::with_session_factory(config, Arc::new(server.clone()))
            .expect("test config is valid");
        Self { directory, server }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    dn: String,
    /// Keyed by lowercase attribute name.
    attrs: BTreeMap<String, Vec<Vec<u8>>>,
}

impl StoredEntry {
    fn new(dn: &str) -> Self {
        let mut entry = Self {
            dn: dn.to_string(),
            attrs: BTreeMap::new(),
        };
        entry.set("distinguishedName", vec![dn.as_bytes().to_vec()]);
        entry.set("name", vec![dn_name(dn).into_bytes()]);
        entry
    }

    fn set(&mut self, name: &str, values: Vec<Vec<u8>>) {
        if values.is_empty() {
            self.attrs.remove(&name.to_ascii_lowercase());
        } else {
            self.attrs.insert(name.to_ascii_lowercase(), values);
        }
    }

    fn get(&self, name: &str) -> Option<&Vec<Vec<u8>>> {
        self.attrs.get(&name.to_ascii_lowercase())
    }

    fn text(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|v| v.first())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    fn to_record(&self, requested: &[&str]) -> DirectoryRecord {
        let mut record = DirectoryRecord::new(self.dn.clone());
        let wanted: Vec<String> = if requested.is_empty() || requested.contains(&"*") {
            self.attrs.keys().cloned().collect()
        } else {
            requested.iter().map(|s| s.to_string()).collect()
        };

        for name in wanted {
            let Some(values) = self.get(&name) else {
                continue;
            };
            let binary = matches!(name.to_ascii_lowercase().as_str(), "objectguid" | "objectsid");
            let texts: Option<Vec<String>> = values
                .iter()
                .map(|v| String::from_utf8(v.clone()).ok())
                .collect();
            match texts {
                Some(texts) if !binary => {
                    record.attrs.insert(name, texts);
                }
                _ => {
                    record.bin_attrs.insert(name, values.clone());
                }
            }
        }
        record
    }
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by lowercase DN.
    entries: BTreeMap<String, StoredEntry>,
    /// Plaintext passwords, keyed by lowercase DN.
    passwords: BTreeMap<String, String>,
    next_rid: u32,
    connects: usize,
    binds: usize,
    unbinds: usize,
    searches: usize,
    writes: usize,
    /// Result code returned to every bind other than the service account's.
    user_bind_failure: Option<u32>,
}

/// In-memory Active Directory domain.
///
/// Understands the filter subset the client generates: `&`, `|`, `!`,
/// equality and presence. objectSid and objectGUID assertions compare
/// against the decoded string forms.
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let mut state = State {
            next_rid: 1100,
            ..State::default()
        };

        for dn in [BASE_DN, USERS_DN] {
            state.entries.insert(dn.to_ascii_lowercase(), StoredEntry::new(dn));
        }
        let directory = Self {
            state: Arc::new(Mutex::new(state)),
        };
        directory.seed(
            SERVICE_DN,
            &[
                ("objectClass", "user"),
                ("sAMAccountName", "svc-msad"),
                ("userAccountControl", "66048"),
            ],
        );
        directory.seed_password(SERVICE_DN, SERVICE_PASSWORD);
        directory.seed(
            ADMIN_GROUP_DN,
            &[("objectClass", "group"), ("sAMAccountName", ADMIN_GROUP)],
        );
        directory
    }

    /// Insert an entry directly, bypassing every check.
    pub fn seed(&self, dn: &str, attrs: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        let mut entry = StoredEntry::new(dn);
        for (name, value) in attrs {
            let mut values = entry.get(name).cloned().unwrap_or_default();
            values.push(value.as_bytes().to_vec());
            entry.set(name, values);
        }
        assign_identity(&mut state, &mut entry);
        state.entries.insert(dn.to_ascii_lowercase(), entry);
    }

    /// Set a password directly.
    pub fn seed_password(&self, dn: &str, password: &str) {
        self.state
            .lock()
            .unwrap()
            .passwords
            .insert(dn.to_ascii_lowercase(), password.to_string());
    }

    pub fn has_entry(&self, dn: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .entries
            .contains_key(&dn.to_ascii_lowercase())
    }

    /// First value of an attribute as text.
    pub fn attribute(&self, dn: &str, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .entries
            .get(&dn.to_ascii_lowercase())
            .and_then(|e| e.text(name))
    }

    /// All values of an attribute as text.
    pub fn attribute_values(&self, dn: &str, name: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .entries
            .get(&dn.to_ascii_lowercase())
            .and_then(|e| e.get(name).cloned())
            .unwrap_or_default()
            .into_iter()
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .collect()
    }

    pub fn set_attribute(&self, dn: &str, name: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(entry) = state.entries.get_mut(&dn.to_ascii_lowercase()) {
            entry.set(name, vec![value.as_bytes().to_vec()]);
        }
    }

    pub fn password(&self, dn: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .passwords
            .get(&dn.to_ascii_lowercase())
            .cloned()
    }

    pub fn binds(&self) -> usize {
        self.state.lock().unwrap().binds
    }

    pub fn searches(&self) -> usize {
        self.state.lock().unwrap().searches
    }

    /// Adds, modifies and deletes that reached the directory.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    /// Sessions opened and not yet unbound.
    pub fn open_sessions(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.connects - state.unbinds
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Make every non-service bind fail with `code`.
    pub fn fail_user_binds(&self, code: u32) {
        self.state.lock().unwrap().user_bind_failure = Some(code);
    }
}

#[async_trait]
impl SessionFactory for MemoryDirectory {
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        self.state.lock().unwrap().connects += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            bound: false,
        }))
    }
}

struct MemorySession {
    state: Arc<Mutex<State>>,
    bound: bool,
}

impl MemorySession {
    fn require_bind(&self) -> DirectoryResult<()> {
        if self.bound {
            Ok(())
        } else {
            Err(error(RESULT_OPERATIONS_ERROR, "bind required", ""))
        }
    }
}

#[async_trait]
impl DirectorySession for MemorySession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().unwrap();
        state.binds += 1;

        if let Some(code) = state.user_bind_failure {
            if !dn.eq_ignore_ascii_case(SERVICE_DN) {
                return Err(error(code, "busy", dn));
            }
        }

        let stored = state.passwords.get(&dn.to_ascii_lowercase());
        if password.is_empty() || stored.map(String::as_str) != Some(password) {
            return Err(error(RESULT_INVALID_CREDENTIALS, "invalidCredentials", dn));
        }
        self.bound = true;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryRecord>> {
        self.require_bind()?;
        let filter = Filter::parse(filter)
            .ok_or_else(|| DirectoryError::Protocol {
                code: 87,
                message: format!("filterError: {filter}"),
            })?;

        let mut state = self.state.lock().unwrap();
        state.searches += 1;
        let base = base_dn.to_ascii_lowercase();
        if !state.entries.contains_key(&base) {
            return Err(error(RESULT_NO_SUCH_OBJECT, "noSuchObject", base_dn));
        }

        Ok(state
            .entries
            .iter()
            .filter(|(key, _)| in_scope(key, &base, scope))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.to_record(attributes))
            .collect())
    }

    async fn add(&mut self, dn: &str, attributes: AttributeSet) -> DirectoryResult<()> {
        self.require_bind()?;
        let mut state = self.state.lock().unwrap();
        let key = dn.to_ascii_lowercase();

        if state.entries.contains_key(&key) {
            return Err(error(RESULT_ENTRY_ALREADY_EXISTS, "entryAlreadyExists", dn));
        }
        if !state.entries.contains_key(&dn_parent(dn).to_ascii_lowercase()) {
            return Err(error(RESULT_NO_SUCH_OBJECT, "noSuchObject", dn));
        }

        let mut entry = StoredEntry::new(dn);
        for (name, values) in attributes {
            entry.set(&name, values);
        }
        assign_identity(&mut state, &mut entry);
        state.writes += 1;
        state.entries.insert(key, entry);
        Ok(())
    }

    async fn modify(&mut self, dn: &str, changes: Vec<Modification>) -> DirectoryResult<()> {
        self.require_bind()?;
        let mut state = self.state.lock().unwrap();
        let key = dn.to_ascii_lowercase();

        let Some(mut entry) = state.entries.get(&key).cloned() else {
            return Err(error(RESULT_NO_SUCH_OBJECT, "noSuchObject", dn));
        };
        let mut new_password = None;

        for change in changes {
            if change.attribute().eq_ignore_ascii_case("unicodePwd") {
                let password = decode_unicode_pwd(change.values().first().map_or(&[][..], Vec::as_slice))
                    .ok_or_else(|| error(RESULT_UNWILLING_TO_PERFORM, "malformed unicodePwd", dn))?;
                if password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(error(
                        RESULT_UNWILLING_TO_PERFORM,
                        "0000052D: Constraint violation",
                        dn,
                    ));
                }
                new_password = Some(password);
                continue;
            }

            match change {
                Modification::Replace { attribute, values } => entry.set(&attribute, values),
                Modification::Add { attribute, values } => {
                    let mut current = entry.get(&attribute).cloned().unwrap_or_default();
                    current.extend(values);
                    entry.set(&attribute, current);
                }
                Modification::Delete { attribute, values } => {
                    let Some(current) = entry.get(&attribute).cloned() else {
                        return Err(error(RESULT_NO_SUCH_ATTRIBUTE, "noSuchAttribute", dn));
                    };
                    let remaining = if values.is_empty() {
                        Vec::new()
                    } else {
                        current.into_iter().filter(|v| !values.contains(v)).collect()
                    };
                    entry.set(&attribute, remaining);
                }
            }
        }

        if let Some(password) = new_password {
            state.passwords.insert(key.clone(), password);
        }
        state.writes += 1;
        state.entries.insert(key, entry);
        Ok(())
    }

    async fn delete(&mut self, dn: &str) -> DirectoryResult<()> {
        self.require_bind()?;
        let mut state = self.state.lock().unwrap();
        let key = dn.to_ascii_lowercase();
        if state.entries.remove(&key).is_none() {
            return Err(error(RESULT_NO_SUCH_OBJECT, "noSuchObject", dn));
        }
        state.passwords.remove(&key);
        state.writes += 1;
        Ok(())
    }

    async fn unbind(&mut self) -> DirectoryResult<()> {
        self.state.lock().unwrap().unbinds += 1;
        self.bound = false;
        Ok(())
    }
}

fn error(code: u32, message: &str, identifier: &str) -> DirectoryError {
    DirectoryError::from_result_code(code, message, identifier)
}

/// Give an entry the server-generated attributes Active Directory assigns.
fn assign_identity(state: &mut State, entry: &mut StoredEntry) {
    if entry.get("objectGUID").is_none() {
        entry.set(
            "objectGUID",
            vec![Uuid::new_v4().to_bytes_le().to_vec()],
        );
    }

    let classes: Vec<String> = entry
        .get("objectClass")
        .map(|values| {
            values
                .iter()
                .map(|v| String::from_utf8_lossy(v).to_ascii_lowercase())
                .collect()
        })
        .unwrap_or_default();
    let is_user = classes.iter().any(|c| c == "user");
    let is_group = classes.iter().any(|c| c == "group");

    if (is_user || is_group) && entry.get("objectSid").is_none() {
        state.next_rid += 1;
        entry.set("objectSid", vec![domain_sid(state.next_rid)]);
    }
    if is_user {
        if entry.get("objectCategory").is_none() {
            entry.set("objectCategory", vec![b"Person".to_vec()]);
        }
        if entry.get("userAccountControl").is_none() {
            // NORMAL_ACCOUNT | ACCOUNTDISABLE, as AD creates users without a password.
            entry.set("userAccountControl", vec![b"514".to_vec()]);
        }
    }
}

/// Binary SID `S-1-5-21-1-2-3-<rid>`.
pub fn domain_sid(rid: u32) -> Vec<u8> {
    let mut bytes = vec![1u8, 5, 0, 0, 0, 0, 0, 5];
    for sub in [21u32, 1, 2, 3, rid] {
        bytes.extend_from_slice(&sub.to_le_bytes());
    }
    bytes
}

fn decode_unicode_pwd(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let quoted = String::from_utf16(&units).ok()?;
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::to_string)
}

fn in_scope(key: &str, base: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::Base => key == base,
        SearchScope::OneLevel => dn_parent(key) == base,
        SearchScope::Subtree => key == base || key.ends_with(&format!(",{base}")),
    }
}

/// Parsed search filter.
#[derive(Debug)]
enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equal(String, String),
}

impl Filter {
    fn parse(input: &str) -> Option<Filter> {
        let (filter, rest) = Self::parse_one(input)?;
        rest.is_empty().then_some(filter)
    }

    fn parse_one(input: &str) -> Option<(Filter, &str)> {
        let body = input.strip_prefix('(')?;
        match body.chars().next()? {
            '&' => {
                let (filters, rest) = Self::parse_list(&body[1..])?;
                Some((Filter::And(filters), rest))
            }
            '|' => {
                let (filters, rest) = Self::parse_list(&body[1..])?;
                Some((Filter::Or(filters), rest))
            }
            '!' => {
                let (inner, rest) = Self::parse_one(&body[1..])?;
                Some((Filter::Not(Box::new(inner)), rest.strip_prefix(')')?))
            }
            _ => {
                let end = body.find(')')?;
                let (attribute, value) = body[..end].split_once('=')?;
                let filter = if value == "*" {
                    Filter::Present(attribute.to_ascii_lowercase())
                } else {
                    Filter::Equal(attribute.to_ascii_lowercase(), unescape(value)?)
                };
                Some((filter, &body[end + 1..]))
            }
        }
    }

    fn parse_list(mut input: &str) -> Option<(Vec<Filter>, &str)> {
        let mut filters = Vec::new();
        loop {
            if let Some(rest) = input.strip_prefix(')') {
                return Some((filters, rest));
            }
            let (filter, rest) = Self::parse_one(input)?;
            filters.push(filter);
            input = rest;
        }
    }

    fn matches(&self, entry: &StoredEntry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(inner) => !inner.matches(entry),
            Filter::Present(attribute) => entry.get(attribute).is_some(),
            Filter::Equal(attribute, value) => match attribute.as_str() {
                "distinguishedname" => entry.dn.eq_ignore_ascii_case(value),
                "msds-parentdistname" => dn_parent(&entry.dn).eq_ignore_ascii_case(value),
                "objectsid" => entry
                    .get(attribute)
                    .and_then(|v| v.first())
                    .is_some_and(|v| decode_security_id(v) == *value),
                "objectguid" => entry
                    .get(attribute)
                    .and_then(|v| v.first())
                    .is_some_and(|v| decode_guid(v).eq_ignore_ascii_case(value)),
                _ => entry.get(attribute).is_some_and(|values| {
                    values
                        .iter()
                        .any(|v| String::from_utf8_lossy(v).eq_ignore_ascii_case(value))
                }),
            },
        }
    }
}

/// Resolve `\xx` escapes in an assertion value.
fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
