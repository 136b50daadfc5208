//! Stored file format and content classification.
//!
//! Every file written by encryption starts with a two-byte tag:
//!
//! ```text
//! nE <original bytes>            pass-through, never encrypted
//! eR <IV || ciphertext>          encrypted, raw
//! eB <base64(IV || ciphertext)>  encrypted, base64 text
//! ```
//!
//! Untagged text is read as a legacy bare base64 blob; untagged bytes that
//! are not UTF-8 were never encrypted and are restored as they are.

use crate::config::format_tags::{ENCRYPTED_BASE64, ENCRYPTED_RAW, PASS_THROUGH, TAG_LENGTH};
use crate::config::{ContentMode, EmptyFilePolicy};
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

/// File content classified by whether it survives a text round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Valid UTF-8.
    Text(Vec<u8>),
    /// Anything else.
    Binary(Vec<u8>),
}

impl Content {
    /// Classify raw file content.
    pub fn classify(data: Vec<u8>) -> Self {
        if std::str::from_utf8(&data).is_ok() {
            Content::Text(data)
        } else {
            Content::Binary(data)
        }
    }

    /// The underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(data) | Content::Binary(data) => data,
        }
    }
}

/// What encryption will do with one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Encrypt these bytes.
    Encrypt(Vec<u8>),
    /// Store these bytes verbatim behind the pass-through tag.
    PassThrough(Vec<u8>),
}

/// Decide how to store a file's content.
///
/// `path` is only used for error reporting.
pub fn plan(
    data: Vec<u8>,
    mode: ContentMode,
    empty_files: EmptyFilePolicy,
    path: &Path,
) -> Result<Plan> {
    if data.is_empty() {
        return match empty_files {
            EmptyFilePolicy::Encrypt => Ok(Plan::Encrypt(data)),
            EmptyFilePolicy::PassThrough => Ok(Plan::PassThrough(data)),
            EmptyFilePolicy::Reject => Err(Error::EmptyFile(path.to_path_buf())),
        };
    }

    Ok(match (mode, Content::classify(data)) {
        (ContentMode::Bytes, content) => Plan::Encrypt(content.into_bytes()),
        (ContentMode::Text, Content::Text(data)) => Plan::Encrypt(data),
        (ContentMode::Text, Content::Binary(data)) => Plan::PassThrough(data),
    })
}

/// A file as stored on disk, split into its format and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredFile {
    /// `eR`: raw `IV || ciphertext`.
    Raw(Vec<u8>),
    /// `eB`: base64 text of `IV || ciphertext`.
    Base64(Vec<u8>),
    /// `nE`: original content that was never encrypted.
    PassThrough(Vec<u8>),
    /// Untagged base64 text written by older versions.
    Legacy(Vec<u8>),
}

impl StoredFile {
    /// Serialize for writing to disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (tag, body): (&[u8], &[u8]) = match self {
            StoredFile::Raw(blob) => (ENCRYPTED_RAW, blob),
            StoredFile::Base64(text) => (ENCRYPTED_BASE64, text),
            StoredFile::PassThrough(data) => (PASS_THROUGH, data),
            StoredFile::Legacy(text) => (&[], text),
        };
        let mut out = Vec::with_capacity(tag.len() + body.len());
        out.extend_from_slice(tag);
        out.extend_from_slice(body);
        out
    }

    /// Whether the body has to go through the cipher.
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, StoredFile::PassThrough(_))
    }

    /// Parse stored bytes. `path` is only used for error reporting.
    ///
    /// Untagged content that is not UTF-8 was never encrypted and comes back
    /// as `PassThrough`. Untagged text must be a legacy base64 blob.
    pub fn parse(data: &[u8], path: &Path) -> Result<Self> {
        if data.len() >= TAG_LENGTH {
            let (tag, body) = data.split_at(TAG_LENGTH);
            if tag == PASS_THROUGH {
                return Ok(StoredFile::PassThrough(body.to_vec()));
            }
            if tag == ENCRYPTED_RAW {
                return Ok(StoredFile::Raw(body.to_vec()));
            }
            if tag == ENCRYPTED_BASE64 {
                return Ok(StoredFile::Base64(body.to_vec()));
            }
        }

        if std::str::from_utf8(data).is_err() {
            return Ok(StoredFile::PassThrough(data.to_vec()));
        }
        StoredFile::legacy(data).ok_or_else(|| Error::UnrecognizedFormat(path.to_path_buf()))
    }

    /// Read the whole of `data` as a legacy blob, tag bytes included.
    ///
    /// Legacy base64 text can itself start with `eR` or `eB`; callers retry
    /// with this when the tagged reading fails.
    pub fn legacy(data: &[u8]) -> Option<Self> {
        match STANDARD.decode(data.trim_ascii_end()) {
            Ok(blob) if !blob.is_empty() => Some(StoredFile::Legacy(data.to_vec())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> &'static Path {
        Path::new("file")
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            Content::classify(b"plain".to_vec()),
            Content::Text(b"plain".to_vec())
        );
        assert_eq!(
            Content::classify(vec![0xff, 0xfe, 0x00]),
            Content::Binary(vec![0xff, 0xfe, 0x00])
        );
        // NUL and control bytes are still valid UTF-8.
        assert!(matches!(Content::classify(vec![0, 1, 2]), Content::Text(_)));
    }

    #[test]
    fn test_plan_bytes_mode_encrypts_everything() {
        let planned = plan(
            vec![0xff, 0x00],
            ContentMode::Bytes,
            EmptyFilePolicy::Encrypt,
            path(),
        )
        .unwrap();
        assert_eq!(planned, Plan::Encrypt(vec![0xff, 0x00]));
    }

    #[test]
    fn test_plan_text_mode_passes_binary_through() {
        let binary = plan(
            vec![0xff, 0x00],
            ContentMode::Text,
            EmptyFilePolicy::Encrypt,
            path(),
        )
        .unwrap();
        assert_eq!(binary, Plan::PassThrough(vec![0xff, 0x00]));

        let text = plan(
            b"text".to_vec(),
            ContentMode::Text,
            EmptyFilePolicy::Encrypt,
            path(),
        )
        .unwrap();
        assert_eq!(text, Plan::Encrypt(b"text".to_vec()));
    }

    #[test]
    fn test_plan_empty_policies() {
        let encrypt = plan(vec![], ContentMode::Text, EmptyFilePolicy::Encrypt, path());
        assert_eq!(encrypt.unwrap(), Plan::Encrypt(vec![]));

        let pass = plan(vec![], ContentMode::Bytes, EmptyFilePolicy::PassThrough, path());
        assert_eq!(pass.unwrap(), Plan::PassThrough(vec![]));

        let reject = plan(vec![], ContentMode::Bytes, EmptyFilePolicy::Reject, path());
        assert!(matches!(reject, Err(Error::EmptyFile(_))));
    }

    #[test]
    fn test_pass_through_layout() {
        let stored = StoredFile::PassThrough(vec![0xff, b'n', b'E']);
        let bytes = stored.to_bytes();

        assert_eq!(bytes, b"nE\xffnE");
        assert_eq!(StoredFile::parse(&bytes, path()).unwrap(), stored);
        assert!(!stored.is_encrypted());
    }

    #[test]
    fn test_pass_through_strips_exactly_one_tag() {
        let parsed = StoredFile::parse(b"nEnEnE", path()).unwrap();
        assert_eq!(parsed, StoredFile::PassThrough(b"nEnE".to_vec()));
    }

    #[test]
    fn test_encrypted_layouts() {
        let raw = StoredFile::Raw((0u8..32).collect());
        let bytes = raw.to_bytes();
        assert_eq!(&bytes[..2], b"eR");
        assert_eq!(bytes.len(), 34);
        assert_eq!(StoredFile::parse(&bytes, path()).unwrap(), raw);

        let text = StoredFile::Base64(STANDARD.encode([1u8; 32]).into_bytes());
        let bytes = text.to_bytes();
        assert_eq!(&bytes[..2], b"eB");
        assert!(bytes.is_ascii());
        assert_eq!(StoredFile::parse(&bytes, path()).unwrap(), text);
    }

    #[test]
    fn test_legacy_untagged_blob() {
        let legacy = STANDARD.encode(vec![7u8; 32]);

        assert_eq!(
            StoredFile::parse(legacy.as_bytes(), path()).unwrap(),
            StoredFile::Legacy(legacy.clone().into_bytes())
        );
        let stored = StoredFile::Legacy(legacy.clone().into_bytes());
        assert_eq!(stored.to_bytes(), legacy.as_bytes());
    }

    #[test]
    fn test_legacy_text_starting_with_a_tag() {
        // 0x79 0x10 encodes to "eR..." and 0x78 0x10 to "eB...".
        for (first, tag) in [(0x79u8, b"eR"), (0x78u8, b"eB")] {
            let mut blob = vec![0u8; 48];
            blob[0] = first;
            blob[1] = 0x10;
            let text = STANDARD.encode(&blob);
            assert!(text.as_bytes().starts_with(tag));

            let tagged = StoredFile::parse(text.as_bytes(), path()).unwrap();
            assert!(!matches!(tagged, StoredFile::Legacy(_)));
            assert_eq!(
                StoredFile::legacy(text.as_bytes()),
                Some(StoredFile::Legacy(text.into_bytes()))
            );
        }
    }

    #[test]
    fn test_tagged_files_are_never_legacy() {
        let text = StoredFile::Base64(STANDARD.encode([3u8; 48]).into_bytes()).to_bytes();
        assert_eq!(StoredFile::legacy(&text), None);
    }

    #[test]
    fn test_untagged_binary_passes_through() {
        let parsed = StoredFile::parse(&[0x00, 0xff, 0xfe], path()).unwrap();
        assert_eq!(parsed, StoredFile::PassThrough(vec![0x00, 0xff, 0xfe]));
    }

    #[test]
    fn test_unrecognized_content() {
        let result = StoredFile::parse(b"just some notes", path());
        assert!(matches!(result, Err(Error::UnrecognizedFormat(_))));

        assert!(matches!(
            StoredFile::parse(b"", path()),
            Err(Error::UnrecognizedFormat(_))
        ));
    }
}
