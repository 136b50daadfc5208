//! Pre-flight checks run before anything on disk is moved.

use crate::encoding::encode_name;
use crate::error::{Error, Result};
use crate::storage::fs::walk_error;
use std::path::Path;
use walkdir::WalkDir;

/// Counts gathered by a pre-flight scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Regular files below the root.
    pub files: usize,
    /// Directories below the root, excluding the root.
    pub directories: usize,
}

/// Walk `root` and fail on anything the transformer cannot handle.
///
/// Rejects symlinks and special files, and with `check_names` also rejects
/// names the name codec cannot encode.
pub fn scan(root: &Path, check_names: bool) -> Result<ScanReport> {
    let mut report = ScanReport::default();

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(walk_error)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            report.directories += 1;
        } else if file_type.is_file() {
            report.files += 1;
        } else {
            return Err(Error::UnsupportedEntry(entry.path().to_path_buf()));
        }

        if check_names {
            let name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| Error::InvalidFileName(entry.path().to_path_buf()))?;
            encode_name(name)?;
        }
    }

    Ok(report)
}
