//! Validate/rectify loop toward the fixed point.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::{RectifyReport, Rectifier};
use crate::core::errors::{PkgError, Result};
use crate::validator::{Report, Validator};

/// How a convergence loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceOutcome {
    /// The package validates clean.
    Converged,
    /// A rectify run changed nothing; the remaining issues need a person.
    Stalled,
    /// The iteration bound was reached with issues left.
    Exhausted,
    /// A rectify run stopped on a conflict.
    Aborted,
}

impl fmt::Display for ConvergenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "converged",
            Self::Stalled => "stalled",
            Self::Exhausted => "exhausted",
            Self::Aborted => "aborted",
        })
    }
}

/// Everything a convergence loop did.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceReport {
    /// Why the loop stopped.
    pub outcome: ConvergenceOutcome,
    /// Number of rectify runs.
    pub iterations: usize,
    /// One report per rectify run, in order.
    pub rectifications: Vec<RectifyReport>,
    /// Validation of the tree as it was left.
    pub final_report: Report,
}

/// Alternate `validate → rectify` until the package converges, stalls, aborts
/// or `max_iterations` rectify runs have been made.
pub fn converge(
    validator: &Validator,
    rectifier: &mut Rectifier,
    root: &Path,
    max_iterations: usize,
) -> Result<ConvergenceReport> {
    if max_iterations == 0 {
        return Err(PkgError::InvalidConfig {
            details: "converge.max_iterations must be at least 1".to_string(),
        });
    }

    let mut rectifications = Vec::new();
    let mut report = validator.validate(root)?;
    let outcome = loop {
        if report.conformant() {
            break ConvergenceOutcome::Converged;
        }
        if rectifications.len() >= max_iterations {
            break ConvergenceOutcome::Exhausted;
        }
        let run = rectifier.rectify(root, validator.profile())?;
        let aborted = run.aborted.is_some();
        let changed = !run.applied.is_empty();
        rectifications.push(run);
        report = validator.validate(root)?;
        if aborted {
            break ConvergenceOutcome::Aborted;
        }
        if !changed && !report.conformant() {
            break ConvergenceOutcome::Stalled;
        }
    };

    Ok(ConvergenceReport {
        outcome,
        iterations: rectifications.len(),
        rectifications,
        final_report: report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::NullConverter;
    use crate::package::profile::Profile;
    use crate::rules::test_support::{conformant_unit, touch};
    use crate::scanner::patterns::JunkPatternRegistry;
    use tempfile::TempDir;

    fn rectifier() -> Rectifier {
        Rectifier::new(Box::new(NullConverter), JunkPatternRegistry::default())
    }

    #[test]
    fn conformant_package_converges_without_rectifying() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        let result = converge(
            &Validator::for_profile(Profile::Current),
            &mut rectifier(),
            tmp.path(),
            5,
        )
        .unwrap();
        assert_eq!(result.outcome, ConvergenceOutcome::Converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn legacy_tree_converges() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "access/accessMasters/0123456/0123456_001.jp2");
        touch(tmp.path(), "access/accessMasters/0123456/Thumbs.db");
        touch(tmp.path(), "preservation/preservationMasters/0123456/0123456_001.tif");
        touch(tmp.path(), "preservation/preservationMasters/0123456/item_0123456.xml");

        let result = converge(
            &Validator::for_profile(Profile::Current),
            &mut rectifier(),
            tmp.path(),
            5,
        )
        .unwrap();
        assert_eq!(result.outcome, ConvergenceOutcome::Converged);
        assert_eq!(result.iterations, 1);
        assert!(result.final_report.conformant());
    }

    #[test]
    fn invalid_bib_id_stalls() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "bogus/access/bogus_001.jp2");

        let result = converge(
            &Validator::for_profile(Profile::Current),
            &mut rectifier(),
            tmp.path(),
            5,
        )
        .unwrap();
        assert_eq!(result.outcome, ConvergenceOutcome::Stalled);
        assert_eq!(result.iterations, 1);
        assert!(!result.final_report.conformant());
    }

    #[test]
    fn zero_bound_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = converge(
            &Validator::for_profile(Profile::Flat),
            &mut rectifier(),
            tmp.path(),
            0,
        )
        .unwrap_err();
        assert_eq!(err.code(), "MPT-1001");
    }

    #[test]
    fn flatten_conflict_reports_aborted() {
        let tmp = TempDir::new().unwrap();
        conformant_unit(tmp.path(), "0123456");
        touch(tmp.path(), "0123456/access/jp2/0123456_001.jp2");

        let result = converge(
            &Validator::for_profile(Profile::Current),
            &mut rectifier(),
            tmp.path(),
            5,
        )
        .unwrap();
        assert_eq!(result.outcome, ConvergenceOutcome::Aborted);
        assert_eq!(result.iterations, 1);
    }
}
