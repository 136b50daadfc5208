//! Encodings applied around the cipher.
//!
//! This module handles:
//! - Obfuscating file and directory names
//! - Tagging stored files as encrypted or passed through
//! - Classifying plaintext content before encryption

mod format;
mod name;

pub use format::{plan, Content, Plan, StoredFile};
pub use name::{decode_name, decode_name_or_literal, encode_name};
