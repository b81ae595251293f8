//! # Vault Key Derivation
//!
//! Maps one or two email identities to the stable key that addresses the
//! shared remote document. The derivation is deterministic and symmetric in
//! its two inputs, so both partners compute the same key regardless of who
//! is "owner" and who is "partner".
//!
//! This is a lookup key, not an access-control mechanism: the hash is a
//! plain 32-bit rolling hash with no cryptographic properties. Anyone who
//! knows both emails can derive the key.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::canonical_email;

/// Application namespace prefix for all vault keys.
const KEY_PREFIX: &str = "hb_v2_vault";

/// Deterministic identifier for a vault, derived from its participants.
///
/// Rendered as `hb_v2_vault_{p|s}_{hash}` where the mode tag is `s` for a
/// shared (two-party) vault and `p` for a private one, and the hash is
/// base-36. Output is alphanumeric plus underscores, safe to embed in a URL
/// path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VaultKey(String);

impl VaultKey {
    /// Derive the key for the given identities.
    ///
    /// Inputs are canonicalized (lower-cased, trimmed) and, for a shared
    /// vault, sorted lexicographically before hashing; `derive(a, Some(b))`
    /// and `derive(b, Some(a))` always agree.
    pub fn derive(email: &str, partner_email: Option<&str>) -> Self {
        let own = canonical_email(email);
        let (base, mode) = match partner_email {
            Some(partner) => {
                let partner = canonical_email(partner);
                let mut pair = [own, partner];
                pair.sort();
                (pair.join("_"), 's')
            }
            None => (own, 'p'),
        };
        VaultKey(format!("{}_{}_{}", KEY_PREFIX, mode, to_base36(rolling_hash(&base))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32-bit rolling hash over UTF-16 code units, wrapping like the original
/// client so derived keys keep addressing existing remote documents.
fn rolling_hash(input: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in input.encode_utf16() {
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(unit as i32);
    }
    hash.unsigned_abs()
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}
