//! Master file rules: filename grammar, access/preservation agreement, and
//! non-empty master sets.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use crate::package::naming::{MediaRole, NameDefect};
use crate::package::snapshot::{BibUnit, PackageSnapshot};
use crate::rules::{Issue, IssueCategory, Rule};

/// Every file in a master container must be named `<bib>_<suffix>.<ext>`.
#[derive(Debug, Clone, Copy)]
pub struct FilenameConventionRule;

impl Rule for FilenameConventionRule {
    fn name(&self) -> &'static str {
        "filename-convention"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();
        for unit in snapshot.valid_units() {
            for role in MediaRole::ALL {
                for reject in &unit.container(role).rejects {
                    let path = reject.path.display();
                    issues.push(match reject.defect {
                        NameDefect::Format => Issue::new(
                            IssueCategory::InvalidFilenameFormat,
                            &reject.path,
                            format!("{path} has an incorrect filename format."),
                        ),
                        NameDefect::Extension { expected } => Issue::new(
                            IssueCategory::InvalidExtension,
                            &reject.path,
                            format!("{path} has an incorrect extension (expected .{expected})."),
                        ),
                    });
                }
            }
        }
        issues
    }
}

/// Keys holding access masters must hold preservation masters, and the
/// reverse. For unit-rooted profiles a missing counterpart folder is left to
/// the required-folders rule.
#[derive(Debug, Clone, Copy)]
pub struct CrossSetRule;

impl Rule for CrossSetRule {
    fn name(&self) -> &'static str {
        "cross-set"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let access = holding(snapshot, MediaRole::Access);
        let preservation = holding(snapshot, MediaRole::Preservation);

        let mut issues: Vec<Issue> = access
            .iter()
            .filter(|(key, _)| !preservation.contains_key(*key))
            .filter(|(_, unit)| compared(snapshot, unit, MediaRole::Preservation))
            .map(|(key, unit)| {
                Issue::new(
                    IssueCategory::CrossSetMismatch,
                    &unit.access.path,
                    format!("Access master(s) not present in preservation masters: {key}"),
                )
            })
            .collect();
        issues.extend(
            preservation
                .iter()
                .filter(|(key, _)| !access.contains_key(*key))
                .filter(|(_, unit)| compared(snapshot, unit, MediaRole::Access))
                .map(|(key, unit)| {
                    Issue::new(
                        IssueCategory::CrossSetMismatch,
                        &unit.preservation.path,
                        format!("Preservation master(s) not present in access masters: {key}"),
                    )
                }),
        );
        issues
    }
}

/// Whether a unit's `counterpart` container takes part in the comparison.
fn compared(snapshot: &PackageSnapshot, unit: &BibUnit, counterpart: MediaRole) -> bool {
    !snapshot.profile().is_unit_rooted() || unit.container(counterpart).present
}

/// Valid units holding at least one master of `role`, by key.
fn holding(snapshot: &PackageSnapshot, role: MediaRole) -> BTreeMap<&str, &BibUnit> {
    snapshot
        .valid_units()
        .filter(|unit| unit.container(role).has_masters())
        .map(|unit| (unit.key.as_str(), unit))
        .collect()
}

/// A present access or preservation container must hold a valid master.
#[derive(Debug, Clone, Copy)]
pub struct MasterSetsRule;

impl Rule for MasterSetsRule {
    fn name(&self) -> &'static str {
        "master-sets"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();
        for unit in snapshot.valid_units() {
            for role in MediaRole::ALL {
                let container = unit.container(role);
                if container.present && !container.has_masters() {
                    issues.push(Issue::new(
                        IssueCategory::MissingMasterSet,
                        &container.path,
                        format!("No {role} master(s): {}", unit.key),
                    ));
                }
            }
        }
        issues
    }
}
