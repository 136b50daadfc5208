//! Crash-safe relocation of a directory's contents.
//!
//! `begin` moves the whole tree at the original path to a temporary
//! location and recreates an empty directory in its place. The caller then
//! writes the transformed tree into the original path and finishes with
//! exactly one of `commit` (drop the temporary copy) or `rollback` (put the
//! temporary copy back).
//!
//! Rollback is not itself transactional: if moving the copy back fails, the
//! tree is left partially restored and the error says where the copy is.

use crate::config::{CryptConfig, TempLocation, SYSTEM_TEMP_PREFIX};
use crate::error::{Error, Result};
use crate::storage::fs::{exists, move_tree, remove_any};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// An in-progress relocation of one directory.
#[derive(Debug)]
pub struct DirectoryTransaction {
    /// Directory being transformed.
    original: PathBuf,
    /// Where its previous contents are held.
    temp: PathBuf,
    /// Whether `original` has been recreated as an empty directory.
    recreated: bool,
    /// Set once committed or rolled back.
    finished: bool,
}

impl DirectoryTransaction {
    /// Relocate `original` to its temporary location.
    ///
    /// `depth` is the nesting level (0 for the directory the caller named).
    /// A leftover at the temporary location is destroyed at depth 0; at
    /// deeper levels it is refused with `Error::TempPathOccupied`, since
    /// there it can only be output already written by this run.
    pub fn begin(original: &Path, config: &CryptConfig, depth: usize) -> Result<Self> {
        let metadata = fs::metadata(original)
            .map_err(|_| Error::NotADirectory(original.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(original.to_path_buf()));
        }

        let temp = temp_path(original, config, depth)?;
        if exists(&temp) {
            if depth > 0 {
                return Err(Error::TempPathOccupied(temp));
            }
            tracing::warn!("Removing stale temporary location {}", temp.display());
            remove_any(&temp)?;
        }

        move_tree(original, &temp)?;
        if let Err(e) = fs::create_dir(original) {
            tracing::warn!("Failed to recreate {}: {}", original.display(), e);
            // Put the tree back; nothing has been written yet.
            if let Err(restore) = move_tree(&temp, original) {
                return Err(Error::RollbackFailed {
                    path: original.to_path_buf(),
                    temp,
                    cause: Box::new(e.into()),
                    rollback: into_io(restore),
                });
            }
            return Err(e.into());
        }

        tracing::info!("Relocated {} to {}", original.display(), temp.display());

        Ok(Self {
            original: original.to_path_buf(),
            temp,
            recreated: true,
            finished: false,
        })
    }

    /// The directory being transformed.
    pub fn original(&self) -> &Path {
        &self.original
    }

    /// Where the pre-transformation contents are held.
    pub fn temp(&self) -> &Path {
        &self.temp
    }

    /// Delete the temporary copy; the transformed tree stays.
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        fs::remove_dir_all(&self.temp)?;
        tracing::info!("Committed {}", self.original.display());
        Ok(())
    }

    /// Put the temporary copy back over the original path.
    ///
    /// Any partial output at the original path is deleted first.
    pub fn rollback(mut self) -> io::Result<()> {
        self.finished = true;
        self.restore()
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.recreated && exists(&self.original) {
            remove_any(&self.original)?;
            self.recreated = false;
        }
        move_tree(&self.temp, &self.original).map_err(into_io)?;
        if exists(&self.temp) {
            remove_any(&self.temp)?;
        }
        tracing::warn!("Rolled back {}", self.original.display());
        Ok(())
    }
}

impl Drop for DirectoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            // Unwinding out of a transformation: best effort restore.
            if let Err(e) = self.restore() {
                tracing::error!(
                    "Failed to restore {} from {}: {}",
                    self.original.display(),
                    self.temp.display(),
                    e
                );
            }
        }
    }
}

fn into_io(err: Error) -> io::Error {
    match err {
        Error::Io(io) => io,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

/// Choose the temporary location for `original`.
pub fn temp_path(original: &Path, config: &CryptConfig, depth: usize) -> Result<PathBuf> {
    let name = original
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} has no name", original.display())))?;

    match config.temp_location {
        TempLocation::Sibling => {
            let parent = original.parent().ok_or_else(|| {
                Error::InvalidPath(format!("{} has no parent", original.display()))
            })?;
            let mut temp_name = name.to_os_string();
            temp_name.push(&config.temp_suffix);
            Ok(parent.join(temp_name))
        }
        TempLocation::SystemTemp => {
            let mut temp_name = OsString::from(format!(
                "{}-{}-{}-",
                SYSTEM_TEMP_PREFIX,
                std::process::id(),
                depth
            ));
            temp_name.push(name);
            Ok(std::env::temp_dir().join(temp_name))
        }
    }
}
