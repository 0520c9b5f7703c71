// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical Encoding and Digests
//!
//! Every hash in the core (entry hashes, checkpoint state hashes, output
//! fingerprints) is computed over the canonical encoding defined here.
//!
//! # Encoding
//! - JSON text, no whitespace (`,` and `:` separators)
//! - Object keys sorted bytewise at every depth
//! - Strings and numbers use serde_json's formatter
//!
//! # Guarantee
//! Same value → same bytes → same digest, independent of map insertion
//! order or of how `serde_json::Map` is backed.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::DigestAlgorithm;
use crate::types::Payload;

pub type Hash32 = [u8; 32];

/// Encode a JSON value canonically.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    write_canonical(value, &mut out);
    out
}

/// Encode a payload map canonically (as a JSON object).
pub fn canonical_payload(payload: &Payload) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);
    write_object(payload, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        // Display on a string value yields its escaped JSON form.
        Value::String(_) => out.extend_from_slice(value.to_string().as_bytes()),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => write_object(map, out),
    }
}

fn write_object(map: &Payload, out: &mut Vec<u8>) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push(b'{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_canonical(&Value::String(key.clone()), out);
        out.push(b':');
        if let Some(v) = map.get(key) {
            write_canonical(v, out);
        }
    }
    out.push(b'}');
}

/// Raw 32-byte digest of `bytes`.
pub fn digest(algorithm: DigestAlgorithm, bytes: &[u8]) -> Hash32 {
    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut h = Sha256::new();
            h.update(bytes);
            h.finalize().into()
        }
        DigestAlgorithm::Blake3 => *blake3::hash(bytes).as_bytes(),
    }
}

/// Lowercase hex digest of `bytes`.
pub fn digest_hex(algorithm: DigestAlgorithm, bytes: &[u8]) -> String {
    hex::encode(digest(algorithm, bytes))
}

/// Lowercase hex digest of the canonical encoding of `value`.
pub fn hash_value(algorithm: DigestAlgorithm, value: &Value) -> String {
    digest_hex(algorithm, &canonical_bytes(value))
}

/// Lowercase hex digest of the canonical encoding of `payload`.
pub fn hash_payload(algorithm: DigestAlgorithm, payload: &Payload) -> String {
    digest_hex(algorithm, &canonical_payload(payload))
}
