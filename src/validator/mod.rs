//! Validator: runs a profile's rule set over a package snapshot.

#![allow(missing_docs)]

pub mod report;

use std::path::Path;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::paths::resolve_root;
use crate::package::profile::Profile;
use crate::package::snapshot::PackageSnapshot;
use crate::rules::metadata::MetadataSchemaRule;
use crate::rules::{RuleOptions, RuleSet};
use crate::scanner::patterns::JunkPatternRegistry;
pub use report::{EVERYTHING_OK, Report};

/// Scans a package and evaluates the rule set against it.
#[derive(Debug)]
pub struct Validator {
    rules: RuleSet,
    junk: JunkPatternRegistry,
}

impl Validator {
    #[must_use]
    pub const fn new(rules: RuleSet, junk: JunkPatternRegistry) -> Self {
        Self { rules, junk }
    }

    /// Built-in rules for `profile` with default options.
    #[must_use]
    pub fn for_profile(profile: Profile) -> Self {
        Self::new(
            RuleSet::for_profile(profile, &RuleOptions::default()),
            JunkPatternRegistry::default(),
        )
    }

    /// Rules, junk names and (for `current`) schema validation from config.
    ///
    /// A schema that cannot be fetched, or a missing `xmllint`, only skips
    /// the schema rule with a warning on stderr.
    pub fn from_config(config: &Config, profile: Profile) -> Result<Self> {
        let options = RuleOptions {
            metadata_record_pattern: config.metadata_record_regex()?,
        };
        let mut rules = RuleSet::for_profile(profile, &options);
        if profile.requires_metadata()
            && let Some(validator) = crate::schema::load_document_validator(&config.schema)
        {
            rules = rules.with_rule(Box::new(MetadataSchemaRule::new(Box::new(validator))));
        }
        let junk = JunkPatternRegistry::default().with_custom(&config.package.extra_junk_names);
        Ok(Self::new(rules, junk))
    }

    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.rules.profile()
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub const fn junk(&self) -> &JunkPatternRegistry {
        &self.junk
    }

    /// Scan `root` and evaluate. Scan failures are fatal; no partial report.
    pub fn validate(&self, root: &Path) -> Result<Report> {
        let root = resolve_root(root);
        let snapshot = PackageSnapshot::capture(&root, self.profile(), &self.junk)?;
        Ok(self.evaluate(&snapshot))
    }

    /// Evaluate an existing snapshot.
    #[must_use]
    pub fn evaluate(&self, snapshot: &PackageSnapshot) -> Report {
        Report::new(
            self.profile(),
            snapshot.root().to_path_buf(),
            self.rules.evaluate(snapshot),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::*;
    use tempfile::TempDir;

    #[test]
    fn conformant_fixture_is_everything_ok() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        let report = Validator::for_profile(Profile::Current)
            .validate(tmp.path())
            .unwrap();
        assert!(report.conformant(), "{:?}", report.issues);
        assert_eq!(report.render_lines(), vec![EVERYTHING_OK]);
    }

    #[test]
    fn deleting_preservation_yields_one_issue() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        std::fs::remove_dir_all(tmp.path().join("0123456/preservation")).unwrap();

        let report = Validator::for_profile(Profile::Current)
            .validate(tmp.path())
            .unwrap();
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.contains("preservation"));
    }

    #[test]
    fn issues_follow_rule_order() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "0123456/access/0123456_bogus.jp2");
        mkdir(tmp.path(), "bogus0123456");
        touch(tmp.path(), "Thumbs.db");

        let report = Validator::for_profile(Profile::Current)
            .validate(tmp.path())
            .unwrap();
        let messages = messages(&report.issues);
        assert!(messages[0].starts_with("Extraneous file: "));
        assert!(messages[1].ends_with("does not begin with a valid bib ID."));
        assert!(messages[2].ends_with("has an incorrect filename format."));
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "0000001/access/0000001_001.jp2");
        mkdir(tmp.path(), "0123456/scans");
        let validator = Validator::for_profile(Profile::Current);
        let first = validator.validate(tmp.path()).unwrap();
        let second = validator.validate(tmp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render_human(), second.render_human());
    }

    #[test]
    fn missing_root_is_fatal() {
        let err = Validator::for_profile(Profile::Current)
            .validate(Path::new("/bogus/bogus/bogus"))
            .unwrap_err();
        assert_eq!(err.code(), "MPT-2001");
    }

    #[test]
    fn relative_root_is_reported_absolute() {
        let err = Validator::for_profile(Profile::Current)
            .validate(Path::new("bogus_mpt_relative_root"))
            .unwrap_err();
        let path = err.path().unwrap();
        assert!(path.is_absolute(), "{}", path.display());
        assert!(path.ends_with("bogus_mpt_relative_root"));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn config_supplies_junk_names_and_pattern() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "0123456/access/0123456_001.jp2");
        touch(tmp.path(), "0123456/preservation/0123456_001.tif");
        touch(tmp.path(), "0123456/metadata/mods.xml");
        touch(tmp.path(), "0123456/access/SyncToy.dat");

        let mut config = Config::default();
        config.package.metadata_record_pattern = r"^mods\.xml$".to_string();
        config.package.extra_junk_names = vec!["synctoy.dat".to_string()];
        let validator = Validator::from_config(&config, Profile::Current).unwrap();
        let report = validator.validate(tmp.path()).unwrap();
        // The configured junk file is reported as extraneous, not as a bad master name.
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].message.starts_with("Extraneous file: "));
    }
}
