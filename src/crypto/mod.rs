//! Cryptographic operations for directory encryption.
//!
//! This module provides:
//! - SHA-256 password-based key derivation
//! - AES-256-CBC encryption of whole buffers

mod cipher;
mod kdf;

pub use cipher::{decrypt_bytes, decrypt_text, encrypt_bytes, encrypt_text, Cipher};
pub use kdf::{derive_key, DerivedKey};
