//! Search filter construction
//!
//! Renders a [`SearchCriteria`] into an RFC 4515 filter string. Clauses are
//! emitted in a fixed order so the same criteria always produce the same
//! filter.

use msad_directory::operation::SearchCriteria;

/// Build the filter for entries of `object_class` matching `criteria`.
///
/// An empty `object_class` drops the class clause. Every value is escaped
/// except the SID and GUID strings, which are passed through as-is.
#[must_use]
pub fn build_filter(object_class: &str, criteria: &SearchCriteria) -> String {
    let mut filter = String::from("(&");

    if !object_class.is_empty() {
        push_clause(&mut filter, "objectClass", object_class);
    }

    let scalars = [
        ("msDS-parentdistname", &criteria.parent_ou_dn, true),
        ("manager", &criteria.manager_dn, true),
        ("msNPAllowDialin", &criteria.dialin_flag, true),
        ("objectSid", &criteria.security_id, false),
        ("objectGUID", &criteria.guid, false),
    ];
    for (attribute, value, escape) in scalars {
        let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        if escape {
            push_clause(&mut filter, attribute, &escape_filter_value(value));
        } else {
            push_clause(&mut filter, attribute, value);
        }
    }

    let dns: Vec<&str> = criteria
        .distinguished_names
        .iter()
        .map(String::as_str)
        .filter(|dn| !dn.is_empty())
        .collect();
    match dns.as_slice() {
        [] => {}
        [dn] => push_clause(&mut filter, "distinguishedName", &escape_filter_value(dn)),
        many => {
            filter.push_str("(|");
            for dn in many {
                push_clause(&mut filter, "distinguishedName", &escape_filter_value(dn));
            }
            filter.push(')');
        }
    }

    if let Some(account) = criteria.account.as_deref().filter(|v| !v.is_empty()) {
        push_clause(&mut filter, "sAMAccountName", &escape_filter_value(account));
    }

    filter.push(')');
    filter
}

fn push_clause(filter: &mut String, attribute: &str, value: &str) {
    filter.push('(');
    filter.push_str(attribute);
    filter.push('=');
    filter.push_str(value);
    filter.push(')');
}

/// Escape a value for use inside a filter assertion.
///
/// `*`, `(`, `)`, `\` and NUL become their `\xx` hex forms. The literal text
/// `NUL` becomes `\00`.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(c) = rest.chars().next() {
        if rest.starts_with("NUL") {
            escaped.push_str("\\00");
            rest = &rest[3..];
            continue;
        }
        match c {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    escaped
}
