//! Content Hashing
//!
//! Digests `(entity-type, data, metadata)` for idempotent appends.
//!
//! ## Canonical Encoding
//! Every JSON value is written with a one-byte type tag, and every
//! variable-length piece is prefixed with its length, so two different inputs
//! can never produce the same byte stream:
//! ```text
//! null    'n'
//! bool    't' | 'f'
//! number  '#' [len u32 BE][decimal text]
//! string  's' [len u32 BE][utf-8 bytes]
//! array   'a' [count u32 BE] item...
//! object  'o' [count u32 BE] ([len u32 BE][key] value)...   keys in byte order
//! ```
//! The three top-level inputs are encoded in a fixed order after a domain
//! prefix that versions the encoding itself.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::record::{ContentHash, Metadata};

/// Domain separator; bump if the encoding ever changes
const DOMAIN: &[u8] = b"atlasledger/content/v1";

/// Compute the content hash of an append
pub fn content_hash(entity_type: &str, data: &Value, metadata: &Metadata) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(canonical_bytes(entity_type, data, metadata));
    ContentHash::new(format!("{:x}", hasher.finalize()))
}

/// The exact byte stream fed to the digest
pub fn canonical_bytes(entity_type: &str, data: &Value, metadata: &Metadata) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    write_len_prefixed(&mut buf, DOMAIN);
    write_str(&mut buf, entity_type);
    write_value(&mut buf, data);
    write_object(&mut buf, metadata.as_map().iter());
    buf
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(b'n'),
        Value::Bool(true) => buf.push(b't'),
        Value::Bool(false) => buf.push(b'f'),
        Value::Number(n) => {
            buf.push(b'#');
            write_len_prefixed(buf, n.to_string().as_bytes());
        }
        Value::String(s) => write_str(buf, s),
        Value::Array(items) => {
            buf.push(b'a');
            buf.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                write_value(buf, item);
            }
        }
        Value::Object(map) => write_object(buf, map.iter()),
    }
}

fn write_object<'a>(buf: &mut Vec<u8>, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    // Map iteration order depends on serde_json features; sort explicitly
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push(b'o');
    buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (key, value) in entries {
        write_len_prefixed(buf, key.as_bytes());
        write_value(buf, value);
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(b's');
    write_len_prefixed(buf, s.as_bytes());
}

fn write_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}
