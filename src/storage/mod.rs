//! Storage layer for in-place tree transformation.
//!
//! This module handles:
//! - Relocating a directory to a temporary location and back
//! - Copying and moving trees, including across devices
//! - Exclusive creation of output files

pub(crate) mod fs;
mod transaction;

pub use fs::{copy_tree, move_tree, write_new_file};
pub use transaction::{temp_path, DirectoryTransaction};
