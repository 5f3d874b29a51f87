//! Deterministic pre-order tree walker for package roots.
//!
//! The walker is the "eyes" of the analyzer and the rectifier: it lists every
//! entry beneath a package root exactly once, in a stable order, and tags
//! platform junk as it goes. Symlinks are reported but never followed, so a
//! looping link cannot trap the walk.

#![allow(missing_docs)]

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::errors::{PkgError, Result};
use crate::scanner::patterns::JunkPatternRegistry;

/// Filesystem kind of one entry, from `symlink_metadata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

/// A single entry discovered during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub path: PathBuf,
    /// Path relative to the walked root.
    pub relative: PathBuf,
    pub kind: EntryKind,
    pub size_bytes: u64,
    /// 1 for direct children of the root.
    pub depth: usize,
    pub is_junk: bool,
}

impl ScanEntry {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// Final path component, lossily converted.
    #[must_use]
    pub fn name(&self) -> String {
        crate::core::paths::file_name_lossy(&self.path)
    }
}

/// Single-threaded walker over one package root.
#[derive(Debug, Clone)]
pub struct TreeScanner {
    root: PathBuf,
    junk: JunkPatternRegistry,
}

impl TreeScanner {
    pub fn new(root: impl Into<PathBuf>, junk: JunkPatternRegistry) -> Self {
        Self {
            root: root.into(),
            junk,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a lazy walk. The root is checked eagerly so callers see
    /// `RootMissing`/`NotADirectory` before any entry.
    pub fn walk(&self) -> Result<TreeWalk<'_>> {
        let meta = match fs::metadata(&self.root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PkgError::RootMissing {
                    path: self.root.clone(),
                });
            }
            Err(err) => return Err(PkgError::io(&self.root, err)),
        };
        if !meta.is_dir() {
            return Err(PkgError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let first = sorted_children(&self.root)?;
        Ok(TreeWalk {
            scanner: self,
            stack: vec![Frame {
                children: first.into_iter(),
                depth: 1,
            }],
        })
    }

    /// Collect the full walk, failing on the first unreadable directory.
    pub fn scan(&self) -> Result<Vec<ScanEntry>> {
        self.walk()?.collect()
    }

    fn entry_for(&self, path: PathBuf, depth: usize) -> Result<ScanEntry> {
        let meta = fs::symlink_metadata(&path).map_err(|err| PkgError::io(&path, err))?;
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| PkgError::Runtime {
                details: format!(
                    "{} is outside scan root {}",
                    path.display(),
                    self.root.display()
                ),
            })?
            .to_path_buf();
        let is_junk = kind == EntryKind::File && self.junk.is_junk(&path);
        Ok(ScanEntry {
            size_bytes: if kind == EntryKind::File { meta.len() } else { 0 },
            path,
            relative,
            kind,
            depth,
            is_junk,
        })
    }
}

struct Frame {
    children: std::vec::IntoIter<PathBuf>,
    depth: usize,
}

/// Lazy pre-order iterator returned by [`TreeScanner::walk`].
pub struct TreeWalk<'a> {
    scanner: &'a TreeScanner,
    stack: Vec<Frame>,
}

impl Iterator for TreeWalk<'_> {
    type Item = Result<ScanEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some(path) = frame.children.next() else {
                self.stack.pop();
                continue;
            };
            let depth = frame.depth;

            let entry = match self.scanner.entry_for(path, depth) {
                Ok(entry) => entry,
                Err(err) => {
                    self.stack.clear();
                    return Some(Err(err));
                }
            };
            if entry.is_dir() {
                match sorted_children(&entry.path) {
                    Ok(children) => self.stack.push(Frame {
                        children: children.into_iter(),
                        depth: depth + 1,
                    }),
                    Err(err) => {
                        self.stack.clear();
                        return Some(Err(err));
                    }
                }
            }
            return Some(Ok(entry));
        }
    }
}

/// Children of `dir`, sorted by name bytes.
fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| PkgError::io(dir, err))?;
    let mut children = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PkgError::io(dir, err))?;
        children.push(entry.path());
    }
    children.sort_by(|a, b| {
        a.file_name()
            .map(std::ffi::OsStr::as_encoded_bytes)
            .cmp(&b.file_name().map(std::ffi::OsStr::as_encoded_bytes))
    });
    Ok(children)
}
