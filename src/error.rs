//! Error types for directory encryption.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dircrypt operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while transforming a directory tree.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The target path is missing or not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Invalid path format.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Stored content is too short (or misaligned) to hold an IV and ciphertext.
    #[error("Malformed encrypted blob ({length} bytes)")]
    MalformedBlob { length: usize },

    /// Decrypted padding is structurally invalid.
    #[error("Invalid padding")]
    InvalidPadding,

    /// Padding validation failed while decrypting a tree.
    #[error("Invalid password for {}", .path.display())]
    WrongPassword {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// An empty file was found while empty files are rejected.
    #[error("Empty file: {}", .0.display())]
    EmptyFile(PathBuf),

    /// A name contains a character the name codec cannot represent.
    #[error("Cannot encode name {name:?}: code point {code_point} exceeds 999")]
    UnencodableName { name: String, code_point: u32 },

    /// A string is not a valid encoded name.
    #[error("Invalid encoded name: {0}")]
    InvalidEncodedName(String),

    /// A file name is not valid UTF-8 and cannot be obfuscated.
    #[error("File name is not valid UTF-8: {}", .0.display())]
    InvalidFileName(PathBuf),

    /// Stored content carries no known format tag and is not a legacy blob.
    #[error("Unrecognized stored format: {}", .0.display())]
    UnrecognizedFormat(PathBuf),

    /// Entry is neither a regular file nor a directory.
    #[error("Unsupported entry (not a regular file or directory): {}", .0.display())]
    UnsupportedEntry(PathBuf),

    /// The temporary location of a nested transaction is already in use.
    #[error("Temporary location already exists: {}", .0.display())]
    TempPathOccupied(PathBuf),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Restoring the original tree failed after another error.
    ///
    /// The directory at `path` may be partially restored; whatever could not
    /// be moved back is left at `temp`.
    #[error(
        "Rollback of {} failed ({rollback}), original contents left in {}; after: {cause}",
        .path.display(),
        .temp.display()
    )]
    RollbackFailed {
        path: PathBuf,
        temp: PathBuf,
        #[source]
        cause: Box<Error>,
        rollback: std::io::Error,
    },
}

impl Error {
    /// Whether this error means the password did not match the stored data.
    pub fn is_wrong_password(&self) -> bool {
        match self {
            Error::WrongPassword { .. } => true,
            Error::RollbackFailed { cause, .. } => cause.is_wrong_password(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrong_password_detected_through_rollback_failure() {
        let err = Error::RollbackFailed {
            path: PathBuf::from("/data"),
            temp: PathBuf::from("/data_temp"),
            cause: Box::new(Error::WrongPassword {
                path: PathBuf::from("/data/a.txt"),
                source: Box::new(Error::InvalidPadding),
            }),
            rollback: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };

        assert!(err.is_wrong_password());
        assert!(!Error::InvalidPadding.is_wrong_password());
    }

    #[test]
    fn test_display_messages() {
        let err = Error::UnencodableName {
            name: "€uro".to_string(),
            code_point: 8364,
        };
        assert!(err.to_string().contains("8364"));

        let err = Error::MalformedBlob { length: 3 };
        assert_eq!(err.to_string(), "Malformed encrypted blob (3 bytes)");
    }

    #[test]
    fn test_wrong_password_wraps_padding_failure() {
        let err = Error::WrongPassword {
            path: PathBuf::from("/data/a.txt"),
            source: Box::new(Error::InvalidPadding),
        };

        let source = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("Invalid padding"));
        assert_eq!(err.to_string(), "Invalid password for /data/a.txt");
    }
}
