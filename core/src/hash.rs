//! Stable, non-cryptographic hashing for sticky weighted routing, and a
//! non-reversible fingerprint for decision-event metadata.
//!
//! Two distinct hashes for two distinct jobs:
//! - [`stable_hash`] (FNV-1a) picks the weighted-routing bucket. It must be
//!   fast and, per the spec, frozen forever — changing it reshuffles every
//!   sticky assignment across every ruleset.
//! - [`fingerprint_ctx_key`] (SHA-256, via the teacher's existing `sha2`
//!   dependency, see `orchestrator/checkpoint.rs`'s `config_hash`) turns a
//!   raw PII-bearing value (a `pix_key`, an `api_user_id`) into something
//!   safe to put on a decision event.

use fnv::FnvHasher;
use sha2::{Digest, Sha256};
use std::hash::Hasher;

/// Hash `value` with a fixed 64-bit domain separator. Deterministic across
/// processes and Rust versions (unlike `DefaultHasher`, which is not
/// specified to be stable) — this is exactly the property sticky routing
/// depends on: the same `(domain, value)` always lands in the same bucket.
pub fn stable_hash(domain: u64, value: &str) -> u64 {
    let mut hasher = FnvHasher::with_key(domain);
    hasher.write(value.as_bytes());
    hasher.finish()
}

/// SHA-256 of `value`, hex-encoded. Used to fingerprint context fields
/// (`pix_key`, `api_user_id`) that must never appear in a decision event
/// verbatim. One-way: the fingerprint cannot be inverted back to the raw
/// value.
pub fn fingerprint_ctx_key(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    to_hex(&digest)
}

fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}
