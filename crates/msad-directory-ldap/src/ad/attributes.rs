//! Binary attribute decoding for objectSid and objectGUID.

use uuid::Uuid;

/// Smallest objectSid value this decoder accepts: revision, count, 48-bit
/// authority and five sub-authorities, the shape of every domain account SID.
pub const MIN_SID_LEN: usize = 28;

const SID_HEADER_LEN: usize = 8;

/// Render a binary objectSid as `S-<rev>-<authority>-<sub1>-...`.
///
/// The authority is rendered in hexadecimal, sub-authorities in decimal.
/// Returns an empty string when the input is too short.
#[must_use]
pub fn decode_security_id(bytes: &[u8]) -> String {
    if bytes.len() < MIN_SID_LEN {
        return String::new();
    }

    let revision = bytes[0];
    let count = usize::from(bytes[1]);
    if bytes.len() < SID_HEADER_LEN + count * 4 {
        return String::new();
    }

    let authority = bytes[2..SID_HEADER_LEN]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    let mut sid = format!("S-{revision}-{authority:x}");
    for chunk in bytes[SID_HEADER_LEN..].chunks_exact(4).take(count) {
        let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        sid.push('-');
        sid.push_str(&sub.to_string());
    }
    sid
}

/// Render a binary objectGUID in canonical hyphenated form.
///
/// The first three groups are stored little-endian on the wire. Returns an
/// empty string for fewer than 16 bytes.
#[must_use]
pub fn decode_guid(bytes: &[u8]) -> String {
    let Some(raw) = bytes.get(..16) else {
        return String::new();
    };
    let mut le = [0u8; 16];
    le.copy_from_slice(raw);
    Uuid::from_bytes_le(le).hyphenated().to_string()
}

/// Inverse of [`decode_guid`]: the on-the-wire bytes for a canonical GUID.
pub fn encode_guid(guid: &str) -> Option<[u8; 16]> {
    Uuid::parse_str(guid).ok().map(|u| u.to_bytes_le())
}
