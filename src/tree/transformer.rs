//! In-place encryption and decryption of a directory tree.
//!
//! Every directory level runs inside its own [`DirectoryTransaction`]: its
//! contents are relocated, each entry of the relocated copy is transformed
//! and written back under the original path, and the level either commits or
//! rolls back. Sub-directories are copied out of the parent's relocated copy
//! and then opened as a new level.
//!
//! Levels are kept on an explicit stack rather than the call stack, so tree
//! depth is bounded by memory only. An error anywhere rolls back every open
//! level, innermost first, and is then returned to the caller.

use crate::config::{BlobEncoding, CryptConfig};
use crate::crypto::{derive_key, Cipher};
use crate::encoding::{decode_name_or_literal, encode_name, plan, Plan, StoredFile};
use crate::error::{Error, Result};
use crate::storage::{copy_tree, write_new_file, DirectoryTransaction};
use crate::tree::report::{Direction, FileOutcome, Reporter, TransformEvent, TransformSummary};
use crate::tree::scan::scan;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Encrypts or decrypts directory trees in place.
#[derive(Debug, Clone, Default)]
pub struct TreeTransformer {
    config: CryptConfig,
}

impl TreeTransformer {
    /// Create a transformer with the given configuration.
    pub fn new(config: CryptConfig) -> Self {
        Self { config }
    }

    /// Encrypt every file below `path`.
    pub fn encrypt(
        &self,
        password: &str,
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<TransformSummary> {
        self.transform(Direction::Encrypt, password, path, reporter)
    }

    /// Decrypt every file below `path`.
    ///
    /// A padding failure is reported as `Error::WrongPassword`.
    pub fn decrypt(
        &self,
        password: &str,
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<TransformSummary> {
        self.transform(Direction::Decrypt, password, path, reporter)
    }

    /// Transform the tree at `path` in the given direction.
    ///
    /// On error the tree is restored to its state before the call, unless
    /// the restore itself fails (`Error::RollbackFailed`).
    pub fn transform(
        &self,
        direction: Direction,
        password: &str,
        path: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<TransformSummary> {
        self.config.validate()?;
        let root = resolve_root(path)?;

        let check_names = direction == Direction::Encrypt && self.config.obfuscate_names;
        let scanned = scan(&root, check_names)?;
        tracing::info!(
            "Starting {} of {} ({} files, {} directories)",
            direction,
            root.display(),
            scanned.files,
            scanned.directories
        );

        let run = Run {
            config: &self.config,
            direction,
            cipher: Cipher::new(&derive_key(password)),
            reporter,
            summary: TransformSummary::default(),
            stack: Vec::new(),
        };
        let summary = run.execute(&root)?;

        tracing::info!(
            "Finished {} of {}: {} transformed, {} passed through",
            direction,
            root.display(),
            summary.files_transformed,
            summary.files_passed_through
        );
        Ok(summary)
    }
}

/// Canonicalize the root; this also drops trailing separators.
fn resolve_root(path: &Path) -> Result<PathBuf> {
    let root = fs::canonicalize(path).map_err(|_| Error::NotADirectory(path.to_path_buf()))?;
    if !root.is_dir() {
        return Err(Error::NotADirectory(path.to_path_buf()));
    }
    Ok(root)
}

/// A directory entry of a relocated copy.
struct Listed {
    name: OsString,
    file_type: fs::FileType,
}

/// One open directory level.
struct Frame {
    txn: DirectoryTransaction,
    /// The level's path as the user knows it (decoded names).
    plain: PathBuf,
    entries: std::vec::IntoIter<Listed>,
}

/// An entry taken off the top frame, ready to process.
struct Visit {
    source: PathBuf,
    name: OsString,
    file_type: fs::FileType,
    out_dir: PathBuf,
    plain_dir: PathBuf,
}

/// State of one transformation call.
struct Run<'a> {
    config: &'a CryptConfig,
    direction: Direction,
    cipher: Cipher,
    reporter: &'a mut dyn Reporter,
    summary: TransformSummary,
    stack: Vec<Frame>,
}

impl Run<'_> {
    fn execute(mut self, root: &Path) -> Result<TransformSummary> {
        if let Err(e) = self.open(root, root.to_path_buf()) {
            return Err(self.unwind(e));
        }

        loop {
            let next = match self.stack.last_mut() {
                None => break,
                Some(frame) => frame.entries.next().map(|entry| Visit {
                    source: frame.txn.temp().join(&entry.name),
                    name: entry.name,
                    file_type: entry.file_type,
                    out_dir: frame.txn.original().to_path_buf(),
                    plain_dir: frame.plain.clone(),
                }),
            };

            let step = match next {
                Some(visit) => self.visit(visit),
                None => self.close(),
            };
            if let Err(e) = step {
                return Err(self.unwind(e));
            }
        }

        Ok(self.summary)
    }

    /// Begin a transaction on `original` and push it as the current level.
    fn open(&mut self, original: &Path, plain: PathBuf) -> Result<()> {
        let txn = DirectoryTransaction::begin(original, self.config, self.stack.len())?;
        let temp = txn.temp().to_path_buf();
        self.stack.push(Frame {
            txn,
            plain: plain.clone(),
            entries: Vec::new().into_iter(),
        });
        self.reporter
            .report(&TransformEvent::DirectoryEntered { path: plain });

        let entries = list_entries(&temp)?;
        if let Some(frame) = self.stack.last_mut() {
            frame.entries = entries.into_iter();
        }
        Ok(())
    }

    /// Commit the current level once all its entries are done.
    fn close(&mut self) -> Result<()> {
        if let Some(frame) = self.stack.pop() {
            let temp = frame.txn.temp().to_path_buf();
            if let Err(e) = frame.txn.commit() {
                if self.stack.is_empty() {
                    tracing::warn!(
                        "{} is fully {}ed but its temporary copy {} could not be removed: {}",
                        frame.plain.display(),
                        self.direction,
                        temp.display(),
                        e
                    );
                }
                return Err(e);
            }
            self.summary.directories += 1;
            self.reporter
                .report(&TransformEvent::DirectoryCommitted { path: frame.plain });
        }
        Ok(())
    }

    fn visit(&mut self, visit: Visit) -> Result<()> {
        let (out_name, plain_name) = self.names(&visit)?;
        let output = visit.out_dir.join(&out_name);
        let plain = visit.plain_dir.join(&plain_name);

        if visit.file_type.is_file() {
            match self.transform_file(&visit.source, &output, &plain) {
                Ok(outcome) => {
                    self.summary.record(outcome);
                    self.reporter
                        .report(&TransformEvent::File { path: plain, outcome });
                    Ok(())
                }
                Err(e) => {
                    self.reporter.report(&TransformEvent::FileFailed {
                        path: plain,
                        error: e.to_string(),
                    });
                    Err(e)
                }
            }
        } else if visit.file_type.is_dir() {
            copy_tree(&visit.source, &output)?;
            self.open(&output, plain)
        } else {
            Err(Error::UnsupportedEntry(visit.source))
        }
    }

    /// Output name and plaintext name for an entry.
    fn names(&self, visit: &Visit) -> Result<(OsString, OsString)> {
        if !self.config.obfuscate_names {
            return Ok((visit.name.clone(), visit.name.clone()));
        }

        match self.direction {
            Direction::Encrypt => {
                let name = visit
                    .name
                    .to_str()
                    .ok_or_else(|| Error::InvalidFileName(visit.source.clone()))?;
                Ok((encode_name(name)?.into(), visit.name.clone()))
            }
            Direction::Decrypt => {
                let decoded = match visit.name.to_str() {
                    Some(name) => OsString::from(decode_name_or_literal(name)),
                    None => visit.name.clone(),
                };
                Ok((decoded.clone(), decoded))
            }
        }
    }

    fn transform_file(&self, source: &Path, output: &Path, plain: &Path) -> Result<FileOutcome> {
        let data = fs::read(source)?;

        let (contents, outcome) = match self.direction {
            Direction::Encrypt => self.seal(data, plain)?,
            Direction::Decrypt => self.open_file(&data, plain)?,
        };

        write_new_file(output, &contents)?;
        tracing::debug!("{} -> {}", source.display(), output.display());
        Ok(outcome)
    }

    /// Encrypted (or passed-through) bytes to store for `data`.
    fn seal(&self, data: Vec<u8>, plain: &Path) -> Result<(Vec<u8>, FileOutcome)> {
        match plan(data, self.config.content_mode, self.config.empty_files, plain)? {
            Plan::Encrypt(plaintext) => {
                let stored = match self.config.blob_encoding {
                    BlobEncoding::Raw => StoredFile::Raw(self.cipher.encrypt(&plaintext)),
                    BlobEncoding::Base64 => {
                        StoredFile::Base64(self.cipher.encrypt_text(&plaintext).into_bytes())
                    }
                };
                Ok((stored.to_bytes(), FileOutcome::Encrypted))
            }
            Plan::PassThrough(content) => Ok((
                StoredFile::PassThrough(content).to_bytes(),
                FileOutcome::PassedThrough,
            )),
        }
    }

    /// Original bytes for stored `data`.
    ///
    /// A tagged reading that fails is retried as a legacy blob before its
    /// error is returned.
    fn open_file(&self, data: &[u8], plain: &Path) -> Result<(Vec<u8>, FileOutcome)> {
        let stored = StoredFile::parse(data, plain)?;
        let retry_legacy = matches!(stored, StoredFile::Raw(_) | StoredFile::Base64(_));

        let opened = match self.open_stored(stored) {
            Err(e) if retry_legacy => match StoredFile::legacy(data) {
                Some(legacy) => self.open_stored(legacy).map_err(|_| e),
                None => Err(e),
            },
            other => other,
        };

        opened.map_err(|e| match e {
            Error::InvalidPadding => Error::WrongPassword {
                path: plain.to_path_buf(),
                source: Box::new(e),
            },
            other => other,
        })
    }

    fn open_stored(&self, stored: StoredFile) -> Result<(Vec<u8>, FileOutcome)> {
        match stored {
            StoredFile::PassThrough(content) => Ok((content, FileOutcome::Restored)),
            StoredFile::Raw(blob) => Ok((self.cipher.decrypt(&blob)?, FileOutcome::Decrypted)),
            StoredFile::Base64(text) | StoredFile::Legacy(text) => {
                Ok((self.cipher.decrypt_text(&text)?, FileOutcome::Decrypted))
            }
        }
    }

    /// Roll back every open level, innermost first.
    ///
    /// Only a failed rollback of the root level changes the returned error:
    /// the root restore replaces everything below it.
    fn unwind(&mut self, cause: Error) -> Error {
        tracing::warn!("Rolling back after error: {}", cause);

        let mut root_failure = None;
        while let Some(frame) = self.stack.pop() {
            let is_root = self.stack.is_empty();
            let original = frame.txn.original().to_path_buf();
            let temp = frame.txn.temp().to_path_buf();

            match frame.txn.rollback() {
                Ok(()) => self
                    .reporter
                    .report(&TransformEvent::RolledBack { path: frame.plain }),
                Err(e) if is_root => root_failure = Some((original, temp, e)),
                Err(e) => tracing::warn!(
                    "Rollback of nested {} failed: {} (copy left in {})",
                    original.display(),
                    e,
                    temp.display()
                ),
            }
        }

        match root_failure {
            Some((path, temp, rollback)) => Error::RollbackFailed {
                path,
                temp,
                cause: Box::new(cause),
                rollback,
            },
            None => cause,
        }
    }
}

/// List a directory, sorted by name for a stable processing order.
fn list_entries(dir: &Path) -> Result<Vec<Listed>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push(Listed {
            name: entry.file_name(),
            file_type: entry.file_type()?,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
