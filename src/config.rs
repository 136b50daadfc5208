//! Configuration constants and types for directory encryption.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// AES block size in bytes; also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Length of the derived AES-256 key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Default suffix for sibling temporary directories.
pub const DEFAULT_TEMP_SUFFIX: &str = "_temp";

/// Prefix for temporary directories in the system temp area.
pub const SYSTEM_TEMP_PREFIX: &str = "dircrypt";

/// Stored-file format tags.
pub mod format_tags {
    /// Width of every format tag in bytes.
    pub const TAG_LENGTH: usize = 2;

    /// Content stored verbatim ("not encrypted").
    pub const PASS_THROUGH: &[u8; TAG_LENGTH] = b"nE";

    /// Raw `IV || ciphertext`.
    pub const ENCRYPTED_RAW: &[u8; TAG_LENGTH] = b"eR";

    /// Base64 text of `IV || ciphertext`.
    pub const ENCRYPTED_BASE64: &[u8; TAG_LENGTH] = b"eB";
}

/// File name codec parameters.
pub mod name_params {
    /// Decimal digits per encoded character.
    pub const FIELD_WIDTH: usize = 3;

    /// Largest code point that fits in one field.
    pub const MAX_CODE_POINT: u32 = 999;
}

/// How encrypted blobs are written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlobEncoding {
    /// `IV || ciphertext` as raw bytes.
    Raw,
    /// `IV || ciphertext` as base64 text.
    #[default]
    Base64,
}

/// How file content is classified before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    /// Every file is encrypted as raw bytes.
    #[default]
    Bytes,
    /// Only UTF-8 text is encrypted; anything else is passed through.
    Text,
}

/// What to do with zero-length files when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyFilePolicy {
    /// Encrypt to a single padding block.
    #[default]
    Encrypt,
    /// Store with the pass-through tag and nothing else.
    PassThrough,
    /// Abort the transformation with `Error::EmptyFile`.
    Reject,
}

/// Where a directory's contents are held while it is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempLocation {
    /// Next to the directory: `<parent>/<name><suffix>`.
    #[default]
    Sibling,
    /// In the system temp area: `<tmp>/dircrypt-<pid>-<depth>-<name>`.
    SystemTemp,
}

/// Configuration for a tree transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptConfig {
    /// Obfuscate file and directory names with the name codec.
    pub obfuscate_names: bool,

    /// On-disk form of encrypted content.
    pub blob_encoding: BlobEncoding,

    /// Content classification mode.
    pub content_mode: ContentMode,

    /// Handling of empty files during encryption.
    pub empty_files: EmptyFilePolicy,

    /// Temporary location strategy.
    pub temp_location: TempLocation,

    /// Suffix for sibling temporary directories.
    pub temp_suffix: String,
}

impl Default for CryptConfig {
    fn default() -> Self {
        Self {
            obfuscate_names: false,
            blob_encoding: BlobEncoding::default(),
            content_mode: ContentMode::default(),
            empty_files: EmptyFilePolicy::default(),
            temp_location: TempLocation::default(),
            temp_suffix: DEFAULT_TEMP_SUFFIX.to_string(),
        }
    }
}

impl CryptConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: CryptConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Enable or disable name obfuscation.
    pub fn with_obfuscated_names(mut self, obfuscate: bool) -> Self {
        self.obfuscate_names = obfuscate;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.temp_suffix.is_empty() {
            return Err(Error::InvalidConfig(
                "Temporary suffix must not be empty".to_string(),
            ));
        }
        if self.temp_suffix.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
            return Err(Error::InvalidConfig(format!(
                "Temporary suffix must not contain path separators: {:?}",
                self.temp_suffix
            )));
        }
        Ok(())
    }
}
