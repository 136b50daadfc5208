//! SHA-256 password-to-key derivation.
//!
//! The key is a plain SHA-256 digest of the UTF-8 password: no salt and no
//! iteration count, so equal passwords always give equal keys. Trees already
//! encrypted depend on this, so it must not change silently.

use crate::config::KEY_LENGTH;
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit AES key derived from a password.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey([u8; KEY_LENGTH]);

impl DerivedKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Derive the AES key for `password`.
///
/// Total and deterministic; the empty password is accepted.
pub fn derive_key(password: &str) -> DerivedKey {
    let digest = Sha256::digest(password.as_bytes());
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(&digest);
    DerivedKey(key)
}
