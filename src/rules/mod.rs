//! Declarative, ordered structural rules.
//!
//! Every rule is a pure function of a [`PackageSnapshot`]. A profile selects
//! which rules run and in what order; the validator concatenates their issues
//! in that order, so two runs over the same tree render identically.

pub mod issue;
pub mod layout;
pub mod masters;
pub mod metadata;

use std::fmt;

use regex::Regex;

use crate::package::profile::Profile;
use crate::package::snapshot::PackageSnapshot;
pub use issue::{Issue, IssueCategory};

/// One named structural check.
pub trait Rule {
    /// Stable kebab-case name used in listings and JSON output.
    fn name(&self) -> &'static str;

    /// Findings for the snapshot, in a deterministic order.
    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue>;
}

/// Knobs shared by the built-in rules.
#[derive(Debug, Clone)]
pub struct RuleOptions {
    /// File names accepted as metadata records.
    pub metadata_record_pattern: Regex,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            metadata_record_pattern: metadata::default_record_pattern(),
        }
    }
}

/// Ordered rules for one profile.
pub struct RuleSet {
    profile: Profile,
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    /// Built-in rules for `profile`, in evaluation order.
    #[must_use]
    pub fn for_profile(profile: Profile, options: &RuleOptions) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = vec![
            Box::new(layout::TopLevelShapeRule),
            Box::new(layout::BibIdRule),
            Box::new(layout::RequiredFoldersRule),
            Box::new(masters::FilenameConventionRule),
            Box::new(masters::CrossSetRule),
        ];
        if profile.is_unit_rooted() {
            rules.push(Box::new(masters::MasterSetsRule));
        }
        if profile.requires_metadata() {
            rules.push(Box::new(metadata::MetadataRecordsRule::new(
                options.metadata_record_pattern.clone(),
            )));
        }
        Self { profile, rules }
    }

    /// Append a rule after the built-ins.
    #[must_use]
    pub fn with_rule(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Profile this set was built for.
    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    /// Rule names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|rule| rule.name())
    }

    /// Evaluate every rule and concatenate the issues in rule order.
    #[must_use]
    pub fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        self.rules
            .iter()
            .flat_map(|rule| rule.evaluate(snapshot))
            .collect()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("profile", &self.profile)
            .field("rules", &self.names().collect::<Vec<_>>())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rule_order_per_profile() {
        let options = RuleOptions::default();
        let nested: Vec<_> = RuleSet::for_profile(Profile::Nested, &options).names().collect();
        assert_eq!(
            nested,
            vec![
                "top-level-shape",
                "bib-id",
                "required-folders",
                "filename-convention",
                "cross-set"
            ]
        );
        let current: Vec<_> = RuleSet::for_profile(Profile::Current, &options)
            .names()
            .collect();
        assert_eq!(current.len(), 7);
        assert_eq!(current[5], "master-sets");
        assert_eq!(current[6], "metadata-records");
        assert_eq!(
            RuleSet::for_profile(Profile::Flat, &options).names().count(),
            6
        );
    }

    #[test]
    fn conformant_tree_has_no_issues_under_every_rule() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        conformant_unit(tmp.path(), "7654321");
        mkdir(tmp.path(), "source/scans");
        let rules = RuleSet::for_profile(Profile::Current, &RuleOptions::default());
        assert!(rules.evaluate(&snapshot(tmp.path(), Profile::Current)).is_empty());
    }

    struct Always;

    impl Rule for Always {
        fn name(&self) -> &'static str {
            "always"
        }

        fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
            vec![Issue::extraneous_folder(snapshot.root())]
        }
    }

    #[test]
    fn extra_rules_run_last() {
        let tmp = TempDir::new().unwrap();
        let rules = RuleSet::for_profile(Profile::Flat, &RuleOptions::default())
            .with_rule(Box::new(Always));
        assert_eq!(rules.names().last(), Some("always"));
        let issues = rules.evaluate(&snapshot(tmp.path(), Profile::Flat));
        assert_eq!(issues.len(), 1);
        assert!(format!("{rules:?}").contains("always"));
    }
}
