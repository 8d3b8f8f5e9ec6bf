//! Item identity
//!
//! `item_id` is derived from title, author and patron name only. Two physical
//! copies (or editions) sharing title and author under one patron get the same
//! id and are tracked as one item. This is a known limitation of the identity
//! scheme and is intentionally left as is.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 11;

/// Deterministic id for `(title, author, patron_name)`.
///
/// Case-insensitive: the joined text is lowercased before hashing.
pub fn item_fingerprint(title: &str, author: &str, patron_name: &str) -> String {
    let text = format!("{}-{}-{}", title, author, patron_name).to_lowercase();
    let mut hex = format!("{:x}", Sha256::digest(text.as_bytes()));
    hex.truncate(FINGERPRINT_LEN);
    hex
}
