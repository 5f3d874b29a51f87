//! The individual rectification steps.
//!
//! Each step re-reads the tree it works on, so it sees the effects of the
//! steps before it. Directory listings are sorted by name so runs are
//! reproducible.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{RectifyFailure, Step, Transformation};
use crate::converter::Converter;
use crate::core::errors::{PkgError, Result};
use crate::core::paths::file_name_lossy;
use crate::package::naming::MediaRole;
use crate::package::{JP2_DIR, METADATA_DIR, SOURCE_DIR};
use crate::scanner::patterns::JunkPatternRegistry;
use crate::scanner::walker::TreeScanner;

/// Top-level names that are never bib units.
const RESERVED: [&str; 4] = [SOURCE_DIR, "access", "preservation", METADATA_DIR];

/// Working state for one step of one run.
pub(super) struct StepRun<'a> {
    root: &'a Path,
    junk: &'a JunkPatternRegistry,
    converter: &'a dyn Converter,
    step: Step,
    applied: Vec<Transformation>,
    failures: Vec<RectifyFailure>,
}

impl<'a> StepRun<'a> {
    pub(super) fn new(
        root: &'a Path,
        junk: &'a JunkPatternRegistry,
        converter: &'a dyn Converter,
    ) -> Self {
        Self {
            root,
            junk,
            converter,
            step: Step::DeleteJunk,
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Run `step`. An error ends the whole rectify run.
    pub(super) fn execute(&mut self, step: Step) -> Result<()> {
        self.step = step;
        match step {
            Step::DeleteJunk => self.delete_junk(),
            Step::RelocateNestedMasters => self.relocate_nested_masters(),
            Step::RelocateMetadata => self.relocate_metadata(),
            Step::RemoveLegacyContainers => self.remove_legacy_containers(),
            Step::FlattenJp2Folders => self.flatten_jp2_folders(),
            Step::ConvertAccessTiffs => self.convert_access_tiffs(),
        }
    }

    pub(super) fn finish(self) -> (Vec<Transformation>, Vec<RectifyFailure>) {
        (self.applied, self.failures)
    }

    fn fail(&mut self, path: &Path, reason: impl Into<String>) {
        self.failures.push(RectifyFailure {
            step: self.step,
            path: path.to_path_buf(),
            reason: reason.into(),
        });
    }

    fn delete_junk(&mut self) -> Result<()> {
        let entries = TreeScanner::new(self.root, self.junk.clone()).scan()?;
        for entry in entries.iter().filter(|entry| entry.is_junk) {
            match fs::remove_file(&entry.path) {
                Ok(()) => self.applied.push(Transformation::DeleteFile {
                    path: entry.path.clone(),
                }),
                Err(err) => self.fail(&entry.path, err.to_string()),
            }
        }
        Ok(())
    }

    /// `<role>/<role>Masters/<name>` becomes `<name>/<role>`.
    fn relocate_nested_masters(&mut self) -> Result<()> {
        for role in MediaRole::ALL {
            let legacy = self
                .root
                .join(role.container_name())
                .join(role.legacy_masters_name());
            if !is_dir(&legacy) {
                continue;
            }
            for folder in sorted_children(&legacy)?.into_iter().filter(|p| is_dir(p)) {
                let unit = self.root.join(file_name_lossy(&folder));
                self.ensure_dir(&unit)?;
                let target = unit.join(role.container_name());
                if exists(&target) {
                    self.merge_into(&folder, &target)?;
                } else {
                    self.move_entry(&folder, &target)?;
                }
            }
        }
        Ok(())
    }

    /// Move every child of `from` into the existing `into`, then drop `from`.
    fn merge_into(&mut self, from: &Path, into: &Path) -> Result<()> {
        if !is_dir(into) {
            return Err(PkgError::RectifyConflict {
                path: from.to_path_buf(),
                destination: into.to_path_buf(),
            });
        }
        for child in sorted_children(from)? {
            let destination = into.join(file_name_lossy(&child));
            self.move_entry(&child, &destination)?;
        }
        self.remove_empty_dir(from);
        Ok(())
    }

    /// Every `*.xml` inside a unit moves to `<unit>/metadata/`.
    fn relocate_metadata(&mut self) -> Result<()> {
        let entries = TreeScanner::new(self.root, self.junk.clone()).scan()?;
        for entry in entries.iter().filter(|entry| entry.is_file()) {
            let Some(unit) = entry
                .relative
                .components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
            else {
                continue;
            };
            if RESERVED.contains(&unit.as_str()) || entry.depth < 2 || !is_xml(&entry.path) {
                continue;
            }
            let inside_metadata = entry
                .relative
                .components()
                .skip(1)
                .any(|c| c.as_os_str() == METADATA_DIR);
            if inside_metadata {
                continue;
            }
            let metadata = self.root.join(&unit).join(METADATA_DIR);
            self.ensure_dir(&metadata)?;
            self.move_entry(&entry.path, &metadata.join(entry.name()))?;
        }
        Ok(())
    }

    /// Drop the emptied nested-profile containers.
    fn remove_legacy_containers(&mut self) -> Result<()> {
        for role in MediaRole::ALL {
            let container = self.root.join(role.container_name());
            let masters = container.join(role.legacy_masters_name());
            for dir in [masters, container] {
                if is_dir(&dir) {
                    self.remove_empty_dir(&dir);
                }
            }
        }
        Ok(())
    }

    /// `<unit>/access/jp2/*` moves up into `<unit>/access`.
    fn flatten_jp2_folders(&mut self) -> Result<()> {
        for unit in self.unit_dirs()? {
            let jp2 = unit.join(MediaRole::Access.container_name()).join(JP2_DIR);
            if !is_dir(&jp2) {
                continue;
            }
            let access = unit.join(MediaRole::Access.container_name());
            for child in sorted_children(&jp2)? {
                let destination = access.join(file_name_lossy(&child));
                self.move_entry(&child, &destination)?;
            }
            self.remove_empty_dir(&jp2);
        }
        Ok(())
    }

    /// `<unit>/access/*.tif` becomes `<unit>/access/*.jp2`.
    fn convert_access_tiffs(&mut self) -> Result<()> {
        for unit in self.unit_dirs()? {
            let access = unit.join(MediaRole::Access.container_name());
            if !is_dir(&access) {
                continue;
            }
            let tiffs = sorted_children(&access)?.into_iter().filter(|path| {
                path.extension().is_some_and(|ext| ext == "tif")
                    && fs::symlink_metadata(path).is_ok_and(|meta| meta.is_file())
            });
            for tif in tiffs {
                self.convert_one(&tif)?;
            }
        }
        Ok(())
    }

    fn convert_one(&mut self, tif: &Path) -> Result<()> {
        let jp2 = tif.with_extension("jp2");
        let size = fs::metadata(tif).map_err(|source| PkgError::io(tif, source))?.len();

        if size == 0 {
            // Shadow-clone placeholder. Never truncates an existing jp2.
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&jp2)
                .map_err(|source| PkgError::io(&jp2, source))?;
            self.applied.push(Transformation::Placeholder { path: jp2 });
            fs::remove_file(tif).map_err(|source| PkgError::io(tif, source))?;
            self.applied.push(Transformation::DeletePlaceholder {
                path: tif.to_path_buf(),
            });
            return Ok(());
        }

        if fs::metadata(&jp2).is_ok_and(|meta| meta.len() > 0) {
            self.fail(tif, format!("{} already exists", jp2.display()));
            return Ok(());
        }
        match self.converter.convert(tif, &jp2) {
            Ok(()) => {
                self.applied.push(Transformation::Convert {
                    from: tif.to_path_buf(),
                    to: jp2,
                });
                match fs::remove_file(tif) {
                    Ok(()) => self.applied.push(Transformation::DeleteFile {
                        path: tif.to_path_buf(),
                    }),
                    Err(err) => self.fail(tif, err.to_string()),
                }
            }
            Err(err) => self.fail(tif, err.to_string()),
        }
        Ok(())
    }

    /// Top-level unit folders, sorted.
    fn unit_dirs(&self) -> Result<Vec<PathBuf>> {
        Ok(sorted_children(self.root)?
            .into_iter()
            .filter(|path| is_dir(path))
            .filter(|path| !RESERVED.contains(&file_name_lossy(path).as_str()))
            .collect())
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<()> {
        if is_dir(dir) {
            return Ok(());
        }
        if exists(dir) {
            return Err(PkgError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        fs::create_dir_all(dir).map_err(|source| PkgError::io(dir, source))?;
        self.applied.push(Transformation::CreateDir {
            path: dir.to_path_buf(),
        });
        Ok(())
    }

    /// Rename without ever replacing an existing entry.
    fn move_entry(&mut self, from: &Path, to: &Path) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if exists(to) {
            return Err(PkgError::RectifyConflict {
                path: from.to_path_buf(),
                destination: to.to_path_buf(),
            });
        }
        fs::rename(from, to).map_err(|source| PkgError::io(from, source))?;
        self.applied.push(Transformation::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }

    /// Non-empty directories are a non-fatal failure.
    fn remove_empty_dir(&mut self, dir: &Path) {
        match fs::remove_dir(dir) {
            Ok(()) => self.applied.push(Transformation::RemoveDir {
                path: dir.to_path_buf(),
            }),
            Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => {
                self.fail(dir, "directory not empty");
            }
            Err(err) => self.fail(dir, err.to_string()),
        }
    }
}

fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut children = fs::read_dir(dir)
        .map_err(|source| PkgError::io(dir, source))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|source| PkgError::io(dir, source))?;
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

/// Directory test that does not follow symlinks.
fn is_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}
