//! Cache key derivation
//!
//! A key is the first [`KEY_LEN`] lowercase hex characters of
//! `SHA-256(len(scope) scope ":" query)`, where `len(scope)` is the scope's
//! UTF-8 byte length as a big-endian `u64`. The length prefix keeps
//! `("a:b", "c")` and `("a", "b:c")` apart. The deriver does not trim;
//! callers normalize the query text before deriving.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a derived key in hex characters (128 bits of the digest)
pub const KEY_LEN: usize = 32;

/// Separator between scope and query text in the hashed input
const SEPARATOR: &[u8] = b":";

/// Opaque, fixed-length cache key
///
/// Keys are never parsed back into their components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the cache key for a query under a requester scope.
///
/// Pure and deterministic across processes: no salt, no clock.
pub fn derive_key(query: &str, scope: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update((scope.len() as u64).to_be_bytes());
    hasher.update(scope.as_bytes());
    hasher.update(SEPARATOR);
    hasher.update(query.as_bytes());

    let mut hex = hex::encode(hasher.finalize());
    hex.truncate(KEY_LEN);
    CacheKey(hex)
}
