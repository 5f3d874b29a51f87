//! Validation report: ordered issues for one run.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::package::profile::Profile;
use crate::rules::{Issue, IssueCategory};

/// Line printed for a conformant package.
pub const EVERYTHING_OK: &str = "Everything OK";

/// Issues from one validation run, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub profile: Profile,
    pub root: PathBuf,
    pub issues: Vec<Issue>,
}

impl Report {
    #[must_use]
    pub fn new(profile: Profile, root: PathBuf, issues: Vec<Issue>) -> Self {
        Self {
            profile,
            root,
            issues,
        }
    }

    /// The package is at the fixed point.
    #[must_use]
    pub fn conformant(&self) -> bool {
        self.issues.is_empty()
    }

    #[must_use]
    pub fn counts_by_category(&self) -> BTreeMap<IssueCategory, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.category).or_insert(0) += 1;
        }
        counts
    }

    /// One line per issue, or exactly `Everything OK`.
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        if self.conformant() {
            return vec![EVERYTHING_OK.to_string()];
        }
        self.issues.iter().map(ToString::to_string).collect()
    }

    #[must_use]
    pub fn render_human(&self) -> String {
        let mut out = self.render_lines().join("\n");
        out.push('\n');
        out
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let counts: BTreeMap<&'static str, usize> = self
            .counts_by_category()
            .into_iter()
            .map(|(category, count)| (category.as_str(), count))
            .collect();
        let mut state = serializer.serialize_struct("Report", 5)?;
        state.serialize_field("profile", &self.profile)?;
        state.serialize_field("root", &self.root)?;
        state.serialize_field("conformant", &self.conformant())?;
        state.serialize_field("counts", &counts)?;
        state.serialize_field("issues", &self.issues)?;
        state.end()
    }
}
