//! Folder-shape rules: allowed entries, bib ID folder names, required folders.

#![allow(missing_docs)]

use std::path::{Component, Path};

use crate::package::naming::{BibId, MediaRole};
use crate::package::profile::Profile;
use crate::package::snapshot::PackageSnapshot;
use crate::package::METADATA_DIR;
use crate::rules::{Issue, IssueCategory, Rule};
use crate::scanner::walker::ScanEntry;

const UNIT_FOLDERS: [&str; 3] = ["access", "preservation", METADATA_DIR];

/// What an entry's position says about it.
enum Placement {
    Allowed,
    ExtraneousFolder,
    ExtraneousFile,
    /// Inside something already reported, or outside any rule's reach.
    Ignored,
}

/// Entries that have no place in the profile's layout, plus junk anywhere
/// outside `source`.
#[derive(Debug, Clone, Copy)]
pub struct TopLevelShapeRule;

impl Rule for TopLevelShapeRule {
    fn name(&self) -> &'static str {
        "top-level-shape"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();
        for entry in snapshot.entries() {
            if PackageSnapshot::in_source(entry) {
                continue;
            }
            let placement = if entry.is_junk {
                Placement::ExtraneousFile
            } else {
                let names = names(&entry.relative);
                match snapshot.profile() {
                    Profile::Nested => nested_placement(entry, &names),
                    Profile::Flat | Profile::Current => rooted_placement(entry, &names),
                }
            };
            match placement {
                Placement::ExtraneousFolder => issues.push(Issue::extraneous_folder(&entry.path)),
                Placement::ExtraneousFile => issues.push(Issue::extraneous_file(&entry.path)),
                Placement::Allowed | Placement::Ignored => {}
            }
        }
        issues
    }
}

fn names(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn misplaced(entry: &ScanEntry) -> Placement {
    if entry.is_dir() {
        Placement::ExtraneousFolder
    } else {
        Placement::ExtraneousFile
    }
}

fn rooted_placement(entry: &ScanEntry, names: &[String]) -> Placement {
    match names {
        [top] => {
            if entry.is_dir() && !UNIT_FOLDERS.contains(&top.as_str()) {
                Placement::Allowed
            } else {
                misplaced(entry)
            }
        }
        [unit, ..] if UNIT_FOLDERS.contains(&unit.as_str()) => Placement::Ignored,
        [unit, ..] if BibId::from_folder_name(unit).is_none() => Placement::Ignored,
        [_, child] => {
            if entry.is_dir() && UNIT_FOLDERS.contains(&child.as_str()) {
                Placement::Allowed
            } else {
                misplaced(entry)
            }
        }
        [_, container, _] if MediaRole::ALL
            .iter()
            .any(|role| role.container_name() == container) =>
        {
            if entry.is_dir() {
                Placement::ExtraneousFolder
            } else {
                Placement::Allowed
            }
        }
        _ => Placement::Ignored,
    }
}

fn nested_placement(entry: &ScanEntry, names: &[String]) -> Placement {
    let masters_of = |container: &str| {
        MediaRole::ALL
            .into_iter()
            .find(|role| role.container_name() == container)
            .map(MediaRole::legacy_masters_name)
    };
    match names {
        [top] => {
            if entry.is_dir() && UNIT_FOLDERS.contains(&top.as_str()) {
                Placement::Allowed
            } else {
                misplaced(entry)
            }
        }
        [top, ..] if masters_of(top.as_str()).is_none() => Placement::Ignored,
        [top, child] => {
            if entry.is_dir() && masters_of(top.as_str()) == Some(child.as_str()) {
                Placement::Allowed
            } else {
                misplaced(entry)
            }
        }
        [top, masters, ..] if masters_of(top.as_str()) != Some(masters.as_str()) => {
            Placement::Ignored
        }
        [_, _, _] => {
            if entry.is_dir() {
                Placement::Allowed
            } else {
                Placement::ExtraneousFile
            }
        }
        [_, _, unit, _] if BibId::from_folder_name(unit).is_some() => {
            if entry.is_dir() {
                Placement::ExtraneousFolder
            } else {
                Placement::Allowed
            }
        }
        _ => Placement::Ignored,
    }
}

/// Unit folders must begin with a seven-digit bib ID.
#[derive(Debug, Clone, Copy)]
pub struct BibIdRule;

impl Rule for BibIdRule {
    fn name(&self) -> &'static str {
        "bib-id"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        snapshot
            .units()
            .iter()
            .filter(|unit| !unit.is_valid())
            .flat_map(|unit| unit.locations.iter())
            .map(|location| {
                Issue::new(
                    IssueCategory::InvalidBibId,
                    location,
                    format!("{} does not begin with a valid bib ID.", location.display()),
                )
            })
            .collect()
    }
}

/// Containers the profile requires.
#[derive(Debug, Clone, Copy)]
pub struct RequiredFoldersRule;

impl Rule for RequiredFoldersRule {
    fn name(&self) -> &'static str {
        "required-folders"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();
        if snapshot.profile() == Profile::Nested {
            for role in MediaRole::ALL {
                let container = Path::new(role.container_name());
                let masters = container.join(role.legacy_masters_name());
                if !snapshot.is_dir(container) {
                    issues.push(Issue::missing_folder(&snapshot.root().join(container)));
                } else if !snapshot.is_dir(&masters) {
                    issues.push(Issue::missing_folder(&snapshot.root().join(masters)));
                }
            }
            return issues;
        }

        for unit in snapshot.valid_units() {
            let required = [Some(&unit.access), Some(&unit.preservation)]
                .into_iter()
                .chain([unit.metadata.as_ref().filter(|_| snapshot.profile().requires_metadata())])
                .flatten();
            for container in required {
                if !container.present {
                    issues.push(Issue::missing_folder(&container.path));
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;
    use tempfile::TempDir;

    #[test]
    fn stray_top_level_entries_are_extraneous() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "notes.txt");
        mkdir(tmp.path(), "access");
        touch(tmp.path(), "source/anything/goes.txt");

        let issues = TopLevelShapeRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert_eq!(
            messages(&issues),
            vec![
                format!("Extraneous folder: {}", tmp.path().join("access").display()),
                format!("Extraneous file: {}", tmp.path().join("notes.txt").display()),
            ]
        );
    }

    #[test]
    fn unit_interiors_are_checked() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "0123456/readme.txt");
        mkdir(tmp.path(), "0123456/scans");
        touch(tmp.path(), "0123456/access/jp2/0123456_003.jp2");

        let issues = TopLevelShapeRule.evaluate(&snapshot(tmp.path(), Profile::Flat));
        let unit = tmp.path().join("0123456");
        assert_eq!(
            messages(&issues),
            vec![
                format!("Extraneous folder: {}", unit.join("access/jp2").display()),
                format!("Extraneous file: {}", unit.join("readme.txt").display()),
                format!("Extraneous folder: {}", unit.join("scans").display()),
            ]
        );
    }

    #[test]
    fn junk_is_reported_everywhere_but_source() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "0123456/access/Thumbs.db");
        touch(tmp.path(), ".DS_Store");
        touch(tmp.path(), "source/Thumbs.db");

        let issues = TopLevelShapeRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.message.starts_with("Extraneous file: ")));
    }

    #[test]
    fn invalid_units_are_not_inspected() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "atlas/loose.txt");
        mkdir(tmp.path(), "atlas/odd");
        let issues = TopLevelShapeRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert!(issues.is_empty());
    }

    #[test]
    fn nested_layout_is_checked() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "access/accessMasters/0123456/0123456_001.jp2");
        mkdir(tmp.path(), "access/accessMasters/0123456/jp2");
        touch(tmp.path(), "access/stray.jp2");
        touch(tmp.path(), "access/accessMasters/loose.jp2");
        touch(
            tmp.path(),
            "preservation/preservationMasters/0123456/0123456_001.tif",
        );
        mkdir(tmp.path(), "preservation/other");
        touch(tmp.path(), "metadata/item_0123456.xml");

        let issues = TopLevelShapeRule.evaluate(&snapshot(tmp.path(), Profile::Nested));
        let root = tmp.path();
        assert_eq!(
            messages(&issues),
            vec![
                format!(
                    "Extraneous folder: {}",
                    root.join("access/accessMasters/0123456/jp2").display()
                ),
                format!(
                    "Extraneous file: {}",
                    root.join("access/accessMasters/loose.jp2").display()
                ),
                format!("Extraneous file: {}", root.join("access/stray.jp2").display()),
                format!("Extraneous folder: {}", root.join("preservation/other").display()),
            ]
        );
    }

    #[test]
    fn bib_id_rule_reports_each_bad_folder_once() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        mkdir(tmp.path(), "atlas/access");
        mkdir(tmp.path(), "012345/access");

        let issues = BibIdRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert_eq!(
            messages(&issues),
            vec![
                format!(
                    "{} does not begin with a valid bib ID.",
                    tmp.path().join("012345").display()
                ),
                format!(
                    "{} does not begin with a valid bib ID.",
                    tmp.path().join("atlas").display()
                ),
            ]
        );
        assert!(issues.iter().all(|i| i.category == IssueCategory::InvalidBibId));
    }

    #[test]
    fn nested_bib_id_reports_both_master_folders() {
        let tmp = TempDir::new().unwrap();
        mkdir(tmp.path(), "access/accessMasters/atlas");
        mkdir(tmp.path(), "preservation/preservationMasters/atlas");
        let issues = BibIdRule.evaluate(&snapshot(tmp.path(), Profile::Nested));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn one_missing_preservation_is_one_issue() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        conformant_unit(tmp.path(), "7654321");
        std::fs::remove_dir_all(tmp.path().join("7654321/preservation")).unwrap();

        let issues = RequiredFoldersRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].category, IssueCategory::MissingFolder);
        assert_eq!(
            issues[0].message,
            format!(
                "Missing {}",
                tmp.path().join("7654321/preservation").display()
            )
        );
    }

    #[test]
    fn metadata_is_only_required_by_current() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "0123456/access/0123456_001.jp2");
        touch(tmp.path(), "0123456/preservation/0123456_001.tif");
        assert!(
            RequiredFoldersRule
                .evaluate(&snapshot(tmp.path(), Profile::Flat))
                .is_empty()
        );
        let issues = RequiredFoldersRule.evaluate(&snapshot(tmp.path(), Profile::Current));
        assert_eq!(
            messages(&issues),
            vec![format!("Missing {}", tmp.path().join("0123456/metadata").display())]
        );
    }

    #[test]
    fn nested_requires_containers_then_master_roots() {
        let tmp = TempDir::new().unwrap();
        mkdir(tmp.path(), "access");
        let issues = RequiredFoldersRule.evaluate(&snapshot(tmp.path(), Profile::Nested));
        assert_eq!(
            messages(&issues),
            vec![
                format!("Missing {}", tmp.path().join("access/accessMasters").display()),
                format!("Missing {}", tmp.path().join("preservation").display()),
            ]
        );
    }
}
