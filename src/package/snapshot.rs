//! Read-only model of one package scan.
//!
//! A snapshot is built once per validation run from the walker's entries. It
//! indexes entries by their root-relative path and groups them into
//! [`BibUnit`]s according to the active profile, so rules never touch the
//! filesystem themselves.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::errors::Result;
use crate::package::naming::{BibId, MasterName, MediaRole, NameDefect, parse_master_name};
use crate::package::profile::Profile;
use crate::package::{METADATA_DIR, SOURCE_DIR};
use crate::scanner::patterns::JunkPatternRegistry;
use crate::scanner::walker::{ScanEntry, TreeScanner};

/// A well-formed master file inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterFile {
    pub bib_id: BibId,
    pub suffix: crate::package::naming::PageSuffix,
    pub role: MediaRole,
    pub path: PathBuf,
}

/// A file in a master container whose name failed the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub path: PathBuf,
    pub defect: NameDefect,
}

/// One of a unit's access / preservation / metadata folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Absolute location, whether or not it exists.
    pub path: PathBuf,
    pub present: bool,
    /// Non-junk regular files directly inside the container.
    pub files: Vec<PathBuf>,
    pub masters: Vec<MasterFile>,
    pub rejects: Vec<RejectedFile>,
}

impl Container {
    fn absent(path: PathBuf) -> Self {
        Self {
            path,
            present: false,
            files: Vec::new(),
            masters: Vec::new(),
            rejects: Vec::new(),
        }
    }

    #[must_use]
    pub fn has_masters(&self) -> bool {
        !self.masters.is_empty()
    }
}

/// One archival object keyed by its folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibUnit {
    pub key: String,
    pub bib_id: Option<BibId>,
    /// Folders carrying this key: `<root>/<key>` for unit-rooted profiles,
    /// the per-role master folders for `nested`.
    pub locations: Vec<PathBuf>,
    pub access: Container,
    pub preservation: Container,
    /// Absent for `nested`, which has no per-unit metadata folder.
    pub metadata: Option<Container>,
}

impl BibUnit {
    #[must_use]
    pub fn container(&self, role: MediaRole) -> &Container {
        match role {
            MediaRole::Access => &self.access,
            MediaRole::Preservation => &self.preservation,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bib_id.is_some()
    }

    /// At least one master of each role and, when `record` is given, a
    /// metadata file whose name it accepts.
    #[must_use]
    pub fn is_well_formed(&self, record: Option<&regex::Regex>) -> bool {
        let has_record = record.is_none_or(|pattern| {
            self.metadata.as_ref().is_some_and(|metadata| {
                metadata
                    .files
                    .iter()
                    .any(|file| pattern.is_match(&crate::core::paths::file_name_lossy(file)))
            })
        });
        self.access.has_masters() && self.preservation.has_masters() && has_record
    }
}

/// Indexed, profile-aware view of one scan.
#[derive(Debug, Clone)]
pub struct PackageSnapshot {
    root: PathBuf,
    profile: Profile,
    entries: Vec<ScanEntry>,
    by_relative: BTreeMap<PathBuf, usize>,
    children: BTreeMap<PathBuf, Vec<usize>>,
    units: Vec<BibUnit>,
}

impl PackageSnapshot {
    /// Walk `root` and build a snapshot.
    pub fn capture(root: &Path, profile: Profile, junk: &JunkPatternRegistry) -> Result<Self> {
        let entries = TreeScanner::new(root, junk.clone()).scan()?;
        Ok(Self::from_entries(root, profile, entries))
    }

    /// Build a snapshot from entries already produced by a walk of `root`.
    #[must_use]
    pub fn from_entries(root: &Path, profile: Profile, entries: Vec<ScanEntry>) -> Self {
        let mut by_relative = BTreeMap::new();
        let mut children: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_relative.insert(entry.relative.clone(), idx);
            let parent = entry
                .relative
                .parent()
                .map_or_else(PathBuf::new, Path::to_path_buf);
            children.entry(parent).or_default().push(idx);
        }

        let mut snapshot = Self {
            root: root.to_path_buf(),
            profile,
            entries,
            by_relative,
            children,
            units: Vec::new(),
        };
        snapshot.units = if profile.is_unit_rooted() {
            snapshot.rooted_units()
        } else {
            snapshot.nested_units()
        };
        snapshot
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Every entry in walk order.
    #[must_use]
    pub fn entries(&self) -> &[ScanEntry] {
        &self.entries
    }

    #[must_use]
    pub fn entry(&self, relative: &Path) -> Option<&ScanEntry> {
        self.by_relative.get(relative).map(|&idx| &self.entries[idx])
    }

    #[must_use]
    pub fn is_dir(&self, relative: &Path) -> bool {
        self.entry(relative).is_some_and(ScanEntry::is_dir)
    }

    /// Direct children of `relative` (`""` for the root), sorted by name.
    pub fn children<'a>(&'a self, relative: &Path) -> impl Iterator<Item = &'a ScanEntry> + use<'a> {
        self.children
            .get(relative)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    /// All units, valid or not, sorted by key.
    #[must_use]
    pub fn units(&self) -> &[BibUnit] {
        &self.units
    }

    /// Units whose key begins with a bib ID.
    pub fn valid_units(&self) -> impl Iterator<Item = &BibUnit> {
        self.units.iter().filter(|unit| unit.is_valid())
    }

    /// True when the entry sits inside the top-level `source` folder.
    #[must_use]
    pub fn in_source(entry: &ScanEntry) -> bool {
        entry
            .relative
            .components()
            .next()
            .is_some_and(|first| first.as_os_str() == SOURCE_DIR)
    }

    fn rooted_units(&self) -> Vec<BibUnit> {
        let reserved = [
            SOURCE_DIR,
            MediaRole::Access.container_name(),
            MediaRole::Preservation.container_name(),
            METADATA_DIR,
        ];
        self.children(Path::new(""))
            .filter(|entry| entry.is_dir())
            .filter(|entry| !reserved.contains(&entry.name().as_str()))
            .map(|entry| {
                let key = entry.name();
                let unit_rel = entry.relative.clone();
                BibUnit {
                    bib_id: BibId::from_folder_name(&key),
                    locations: vec![entry.path.clone()],
                    access: self.container(&unit_rel.join("access"), Some(MediaRole::Access)),
                    preservation: self.container(
                        &unit_rel.join("preservation"),
                        Some(MediaRole::Preservation),
                    ),
                    metadata: Some(self.container(&unit_rel.join(METADATA_DIR), None)),
                    key,
                }
            })
            .collect()
    }

    fn nested_units(&self) -> Vec<BibUnit> {
        let masters_root = |role: MediaRole| {
            PathBuf::from(role.container_name()).join(role.legacy_masters_name())
        };
        let mut keys = BTreeSet::new();
        for role in MediaRole::ALL {
            keys.extend(
                self.children(&masters_root(role))
                    .filter(|entry| entry.is_dir())
                    .map(ScanEntry::name),
            );
        }

        keys.into_iter()
            .map(|key| {
                let access = self.container(
                    &masters_root(MediaRole::Access).join(&key),
                    Some(MediaRole::Access),
                );
                let preservation = self.container(
                    &masters_root(MediaRole::Preservation).join(&key),
                    Some(MediaRole::Preservation),
                );
                let locations = [&access, &preservation]
                    .into_iter()
                    .filter(|container| container.present)
                    .map(|container| container.path.clone())
                    .collect();
                BibUnit {
                    bib_id: BibId::from_folder_name(&key),
                    locations,
                    access,
                    preservation,
                    metadata: None,
                    key,
                }
            })
            .collect()
    }

    fn container(&self, relative: &Path, role: Option<MediaRole>) -> Container {
        let path = self.root.join(relative);
        if !self.is_dir(relative) {
            return Container::absent(path);
        }

        let mut container = Container {
            path,
            present: true,
            files: Vec::new(),
            masters: Vec::new(),
            rejects: Vec::new(),
        };
        for entry in self.children(relative) {
            if entry.is_dir() || entry.is_junk {
                continue;
            }
            container.files.push(entry.path.clone());
            let Some(role) = role else {
                continue;
            };
            match parse_master_name(&entry.name(), role) {
                Ok(MasterName { bib_id, suffix }) => container.masters.push(MasterFile {
                    bib_id,
                    suffix,
                    role,
                    path: entry.path.clone(),
                }),
                Err(defect) => container.rejects.push(RejectedFile {
                    path: entry.path.clone(),
                    defect,
                }),
            }
        }
        container
    }
}
