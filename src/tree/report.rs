//! Progress reporting for tree transformations.

use std::fmt;
use std::path::PathBuf;

/// Direction of a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => f.write_str("encrypt"),
            Direction::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// What happened to a single regular file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Content was encrypted.
    Encrypted,
    /// Content was decrypted.
    Decrypted,
    /// Content could not be encrypted and was stored verbatim.
    PassedThrough,
    /// A pass-through file was restored verbatim.
    Restored,
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Encrypted => f.write_str("encrypted"),
            FileOutcome::Decrypted => f.write_str("decrypted"),
            FileOutcome::PassedThrough => f.write_str("failed"),
            FileOutcome::Restored => f.write_str("not encrypted"),
        }
    }
}

/// A step of a transformation, reported as it happens.
///
/// File paths name the entry under the original directory, using the
/// plaintext name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformEvent {
    /// A directory's contents were relocated and its transformation started.
    DirectoryEntered { path: PathBuf },
    /// A regular file was written.
    File { path: PathBuf, outcome: FileOutcome },
    /// Processing a file failed; the transformation is being rolled back.
    FileFailed { path: PathBuf, error: String },
    /// A directory was fully transformed and its temporary copy removed.
    DirectoryCommitted { path: PathBuf },
    /// A directory was restored from its temporary copy.
    RolledBack { path: PathBuf },
}

/// Sink for transformation events.
pub trait Reporter {
    /// Called once per event, in order.
    fn report(&mut self, event: &TransformEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&mut self, event: &TransformEvent) {
        match event {
            TransformEvent::DirectoryEntered { path } => {
                tracing::debug!("entering {}", path.display())
            }
            TransformEvent::File { path, outcome } => {
                tracing::info!("{}: {}", outcome, path.display())
            }
            TransformEvent::FileFailed { path, error } => {
                tracing::warn!("{} failed: {}", path.display(), error)
            }
            TransformEvent::DirectoryCommitted { path } => {
                tracing::debug!("committed {}", path.display())
            }
            TransformEvent::RolledBack { path } => {
                tracing::warn!("failsafe, restored {}", path.display())
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&mut self, _event: &TransformEvent) {}
}

impl Reporter for Vec<TransformEvent> {
    fn report(&mut self, event: &TransformEvent) {
        self.push(event.clone());
    }
}

/// Counts for a finished transformation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformSummary {
    /// Files encrypted or decrypted.
    pub files_transformed: usize,
    /// Files stored or restored verbatim.
    pub files_passed_through: usize,
    /// Directories committed, including the root.
    pub directories: usize,
}

impl TransformSummary {
    pub(crate) fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Encrypted | FileOutcome::Decrypted => self.files_transformed += 1,
            FileOutcome::PassedThrough | FileOutcome::Restored => self.files_passed_through += 1,
        }
    }
}
