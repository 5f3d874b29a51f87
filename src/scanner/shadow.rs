//! Shadow cloning: copy a package's shape with zero-byte placeholder files.
//!
//! A shadow clone lets an operator rehearse `rectify` against a local copy of
//! a very large package without touching the original. Zero-byte `.tif`
//! placeholders are later turned into zero-byte `.jp2` placeholders instead of
//! being converted.

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{PkgError, Result};
use crate::core::paths::{is_within, resolve_root};
use crate::scanner::patterns::JunkPatternRegistry;
use crate::scanner::walker::{EntryKind, TreeScanner};

/// Outcome of one clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloneReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub directories: usize,
    pub files: usize,
    /// Symlinks are not reproduced.
    pub skipped_symlinks: Vec<PathBuf>,
}

/// Clone `source` into `destination`, creating `destination` when absent.
///
/// Every directory is recreated and every regular file becomes an empty file
/// of the same name. A file already present in `destination` keeps its
/// content. Junk files are cloned as well so the clone exercises the
/// same rectification steps as the original.
pub fn shadow_clone(source: &Path, destination: &Path) -> Result<CloneReport> {
    let source = resolve_root(source);
    let destination = resolve_root(destination);

    if destination.exists() && !destination.is_dir() {
        return Err(PkgError::NotADirectory { path: destination });
    }
    if is_within(&destination, &source) {
        return Err(PkgError::InvalidConfig {
            details: format!(
                "clone destination {} must not be inside {}",
                destination.display(),
                source.display()
            ),
        });
    }

    // Source is walked in full before anything is written.
    let entries = TreeScanner::new(&source, JunkPatternRegistry::default()).scan()?;
    fs::create_dir_all(&destination).map_err(|err| PkgError::io(&destination, err))?;

    let mut report = CloneReport {
        source: source.clone(),
        destination: destination.clone(),
        directories: 0,
        files: 0,
        skipped_symlinks: Vec::new(),
    };
    for entry in entries {
        let target = destination.join(&entry.relative);
        match entry.kind {
            EntryKind::Directory => {
                fs::create_dir_all(&target).map_err(|err| PkgError::io(&target, err))?;
                report.directories += 1;
            }
            EntryKind::File => {
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&target)
                    .map_err(|err| PkgError::io(&target, err))?;
                report.files += 1;
            }
            EntryKind::Symlink => report.skipped_symlinks.push(entry.relative),
        }
    }
    Ok(report)
}
