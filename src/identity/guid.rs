use uuid::Uuid;

/// A fresh random identity in canonical form.
pub fn new_guid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Canonical lowercase hyphenated form of a stored GUID.
///
/// Accepts the hyphenated, braced, URN and 32-digit simple spellings in any
/// case. The nil UUID is rejected since it cannot identify anything.
pub fn normalize_guid(raw: &str) -> Option<String> {
    let uuid = Uuid::parse_str(raw.trim()).ok()?;
    if uuid.is_nil() {
        return None;
    }
    Some(uuid.hyphenated().to_string())
}

pub fn is_canonical_guid(value: &str) -> bool {
    normalize_guid(value).as_deref() == Some(value)
}

/// Lowercase form of a stored 32-hex-digit checksum.
pub fn normalize_checksum(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() == 32 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(raw.to_ascii_lowercase())
    } else {
        None
    }
}
