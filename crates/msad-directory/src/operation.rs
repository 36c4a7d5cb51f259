//! Directory operation types
//!
//! Types passed across the session seam: search criteria, raw search
//! records, attribute sets for add and modifications for modify.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Structured search filter descriptor.
///
/// Every field is optional. Populated fields are AND-combined when rendered;
/// an empty criteria matches every entry of the requested object class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Logon name (sAMAccountName).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    /// Canonical GUID string (objectGUID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// Canonical SID string (objectSid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_id: Option<String>,

    /// Distinguished names, OR-combined when more than one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distinguished_names: Vec<String>,

    /// Parent container DN (msDS-parentdistname).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_ou_dn: Option<String>,

    /// Manager DN (manager).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_dn: Option<String>,

    /// Dial-in flag value (msNPAllowDialin).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialin_flag: Option<String>,
}

impl SearchCriteria {
    /// Empty criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Criteria matching a single distinguished name.
    pub fn by_dn(dn: impl Into<String>) -> Self {
        Self::new().with_dn(dn)
    }

    /// Criteria matching any of the given distinguished names.
    pub fn by_dns<I, S>(dns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            distinguished_names: dns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Criteria matching a logon name.
    pub fn by_account(account: impl Into<String>) -> Self {
        Self::new().with_account(account)
    }

    /// Criteria matching entries directly below a container.
    pub fn by_parent(parent_ou_dn: impl Into<String>) -> Self {
        Self::new().with_parent_ou(parent_ou_dn)
    }

    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    #[must_use]
    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    #[must_use]
    pub fn with_security_id(mut self, sid: impl Into<String>) -> Self {
        self.security_id = Some(sid.into());
        self
    }

    #[must_use]
    pub fn with_dn(mut self, dn: impl Into<String>) -> Self {
        self.distinguished_names.push(dn.into());
        self
    }

    #[must_use]
    pub fn with_parent_ou(mut self, parent_ou_dn: impl Into<String>) -> Self {
        self.parent_ou_dn = Some(parent_ou_dn.into());
        self
    }

    #[must_use]
    pub fn with_manager(mut self, manager_dn: impl Into<String>) -> Self {
        self.manager_dn = Some(manager_dn.into());
        self
    }

    #[must_use]
    pub fn with_dialin_flag(mut self, flag: impl Into<String>) -> Self {
        self.dialin_flag = Some(flag.into());
        self
    }

    /// True when no field would contribute a clause.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        blank(&self.account)
            && blank(&self.guid)
            && blank(&self.security_id)
            && blank(&self.parent_ou_dn)
            && blank(&self.manager_dn)
            && blank(&self.dialin_flag)
            && self.distinguished_names.iter().all(String::is_empty)
    }
}

/// Search scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry.
    Base,
    /// Immediate children of the base entry.
    OneLevel,
    /// The base entry and its whole subtree.
    #[default]
    Subtree,
}

/// A raw entry returned by a directory search.
///
/// Values that are valid UTF-8 land in `attrs`; anything else lands in
/// `bin_attrs`. Binary attributes such as objectGUID can end up in either map
/// depending on their content, so use [`DirectoryRecord::raw_value`] for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryRecord {
    /// Create an empty record for a DN.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Add textual values (builder style).
    #[must_use]
    pub fn with_values<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Add a single textual value (builder style).
    #[must_use]
    pub fn with_value(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_values(name, [value.into()])
    }

    /// Add a single binary value (builder style).
    #[must_use]
    pub fn with_binary(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.bin_attrs.insert(name.into(), vec![value.into()]);
        self
    }

    /// All textual values of an attribute. Attribute names are case-insensitive.
    pub fn values(&self, name: &str) -> &[String] {
        lookup(&self.attrs, name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First textual value of an attribute, or `""` when absent.
    pub fn value(&self, name: &str) -> &str {
        self.values(name).first().map_or("", String::as_str)
    }

    /// First textual value of an attribute, `None` when absent.
    pub fn optional_value(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// First raw value of an attribute, whichever map it landed in.
    pub fn raw_value(&self, name: &str) -> &[u8] {
        if let Some(first) = lookup(&self.bin_attrs, name).and_then(|v| v.first()) {
            return first;
        }
        self.value(name).as_bytes()
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

/// Attributes for a new directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    attributes: BTreeMap<String, Vec<Vec<u8>>>,
}

impl AttributeSet {
    /// Create an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all values of an attribute.
    pub fn set<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
    }

    /// Set a single value (builder style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.set(name, [value.into()]);
        self
    }

    /// Get the values of an attribute.
    pub fn get(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// Get the first value of an attribute as a string.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|v| v.first())
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Check if an attribute is set.
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when no attribute is set.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Vec<u8>>)> {
        self.attributes.iter()
    }
}

impl IntoIterator for AttributeSet {
    type Item = (String, Vec<Vec<u8>>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<Vec<u8>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.into_iter()
    }
}

/// A single change in a modify request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    /// Add values to an attribute.
    Add {
        attribute: String,
        values: Vec<Vec<u8>>,
    },
    /// Delete values from an attribute; no values deletes the attribute.
    Delete {
        attribute: String,
        values: Vec<Vec<u8>>,
    },
    /// Replace all values of an attribute; no values deletes the attribute.
    Replace {
        attribute: String,
        values: Vec<Vec<u8>>,
    },
}

impl Modification {
    pub fn add<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Modification::Add {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn delete<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Modification::Delete {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn replace<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Modification::Replace {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Name of the attribute this change touches.
    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add { attribute, .. }
            | Modification::Delete { attribute, .. }
            | Modification::Replace { attribute, .. } => attribute,
        }
    }

    /// Values carried by this change.
    pub fn values(&self) -> &[Vec<u8>] {
        match self {
            Modification::Add { values, .. }
            | Modification::Delete { values, .. }
            | Modification::Replace { values, .. } => values,
        }
    }
}
