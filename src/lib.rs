//! dircrypt
//!
//! Password-based, in-place encryption of whole directory trees.
//!
//! Every regular file below a directory is replaced by its AES-256-CBC
//! encryption under a key derived from a password. File and directory
//! names can optionally be obfuscated with a reversible numeric encoding.
//! Each directory level is transformed inside a transaction, so a failure
//! anywhere restores the tree to its state before the call.
//!
//! # Architecture
//!
//! ```text
//! password → SHA-256 → key
//! file → classify → AES-256-CBC (random IV) → tag + raw/base64 → file
//! directory → relocate → transform entries → commit | rollback
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let summary = dircrypt::encrypt_directory("secret", Path::new("./notes")).unwrap();
//! println!("{} files encrypted", summary.files_transformed);
//!
//! dircrypt::decrypt_directory("secret", Path::new("./notes")).unwrap();
//! ```

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod storage;
pub mod tree;

pub use config::CryptConfig;
pub use error::{Error, Result};
pub use tree::{
    Direction, FileOutcome, LogReporter, Reporter, TransformEvent, TransformSummary,
    TreeTransformer,
};

use std::path::Path;

/// Encrypt every file below `path` with the default configuration.
///
/// On failure the directory is restored to its state before the call.
pub fn encrypt_directory(password: &str, path: &Path) -> Result<TransformSummary> {
    encrypt_directory_with(password, path, &CryptConfig::default(), &mut LogReporter)
}

/// Decrypt every file below `path` with the default configuration.
///
/// A wrong password yields `Error::WrongPassword` and leaves the directory
/// unchanged.
pub fn decrypt_directory(password: &str, path: &Path) -> Result<TransformSummary> {
    decrypt_directory_with(password, path, &CryptConfig::default(), &mut LogReporter)
}

/// Encrypt with an explicit configuration and reporter.
pub fn encrypt_directory_with(
    password: &str,
    path: &Path,
    config: &CryptConfig,
    reporter: &mut dyn Reporter,
) -> Result<TransformSummary> {
    TreeTransformer::new(config.clone()).encrypt(password, path, reporter)
}

/// Decrypt with an explicit configuration and reporter.
pub fn decrypt_directory_with(
    password: &str,
    path: &Path,
    config: &CryptConfig,
    reporter: &mut dyn Reporter,
) -> Result<TransformSummary> {
    TreeTransformer::new(config.clone()).decrypt(password, path, reporter)
}
