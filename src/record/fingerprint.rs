//! Credential fingerprints used to key merge decisions.
//!
//! A fingerprint is the MD5 of `{"password": <p>, "username": <u>}` encoded
//! the way Python's `json.dumps(obj, sort_keys=True)` encodes it: keys in
//! lexicographic order, `", "` and `": "` separators, and every character
//! outside printable ASCII escaped as `\uXXXX`. Existing decision caches keyed
//! with that encoding stay valid.

use std::collections::BTreeMap;

use digest::Digest;
use md5::Md5;

use super::{Credential, Record};

/// Fingerprint of a record's credential.
///
/// Depends on username and secret only. URIs, name, id and every other
/// field are excluded, so merging URIs into a record keeps its fingerprint.
pub fn fingerprint(record: &Record) -> String {
    credential_fingerprint(record.credential())
}

/// Fingerprint of a bare credential.
pub fn credential_fingerprint(credential: &Credential) -> String {
    let mut fields = BTreeMap::new();
    fields.insert("password", credential.secret.as_str());
    fields.insert("username", credential.username.as_str());

    let canonical = encode_sorted_object(&fields);
    format!("{:x}", Md5::digest(canonical.as_bytes()))
}

fn encode_sorted_object(fields: &BTreeMap<&str, &str>) -> String {
    let mut out = String::from("{");
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        encode_ascii_string(&mut out, key);
        out.push_str(": ");
        encode_ascii_string(&mut out, value);
    }
    out.push('}');
    out
}

fn encode_ascii_string(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}
