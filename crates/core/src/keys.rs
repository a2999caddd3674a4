//! Key escaping for stored documents
//!
//! Document stores treat `.` in a field name as a path separator, so map
//! keys containing dots cannot be stored verbatim. Before a map is written
//! every `.` in its keys is replaced by [`DOT_SENTINEL`]; on read the
//! substitution is reversed.
//!
//! Both directions are shallow: one mapping level per call. The codec
//! applies them at every level as it walks a value.
//!
//! # Limitation
//!
//! `decode(encode(m)) == m` does not hold for every key. A key fails to
//! round trip when its escaped form contains sentinel text that did not
//! come from a dot: the sentinel itself, or a dot next to a sentinel
//! fragment. `":a5b8afc131."` escapes to `":a5b8afc131:a5b8afc131:"`, whose
//! first sentinel match straddles the original text and decodes to
//! `".a5b8afc131:"`. [`round_trips`] detects such keys; the codec refuses
//! to store them.

use serde_json::{Map, Value as StoredValue};
use std::borrow::Cow;

/// Replacement token for `.` in stored keys
pub const DOT_SENTINEL: &str = ":a5b8afc131:";

/// Escape a single key
pub fn escape_key(key: &str) -> Cow<'_, str> {
    if key.contains('.') {
        Cow::Owned(key.replace('.', DOT_SENTINEL))
    } else {
        Cow::Borrowed(key)
    }
}

/// Reverse [`escape_key`]
pub fn unescape_key(key: &str) -> Cow<'_, str> {
    if key.contains(DOT_SENTINEL) {
        Cow::Owned(key.replace(DOT_SENTINEL, "."))
    } else {
        Cow::Borrowed(key)
    }
}

/// True if `key` comes back unchanged from [`escape_key`] then [`unescape_key`]
pub fn round_trips(key: &str) -> bool {
    !key.contains(':') || unescape_key(&escape_key(key)) == key
}

/// Escape the keys of one mapping level
pub fn encode(map: Map<String, StoredValue>) -> Map<String, StoredValue> {
    map.into_iter()
        .map(|(k, v)| (escape_key(&k).into_owned(), v))
        .collect()
}

/// Unescape the keys of one mapping level
pub fn decode(map: Map<String, StoredValue>) -> Map<String, StoredValue> {
    map.into_iter()
        .map(|(k, v)| (unescape_key(&k).into_owned(), v))
        .collect()
}
