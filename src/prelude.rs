//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use medusa_package_tools::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{PkgError, Result};

// Package model
pub use crate::package::naming::{BibId, MediaRole, parse_master_name};
pub use crate::package::profile::Profile;
pub use crate::package::snapshot::PackageSnapshot;

// Scanner
pub use crate::scanner::patterns::JunkPatternRegistry;
pub use crate::scanner::shadow::{CloneReport, shadow_clone};
pub use crate::scanner::walker::{ScanEntry, TreeScanner};

// Validation
pub use crate::rules::{Issue, IssueCategory, Rule, RuleSet};
pub use crate::validator::{Report, Validator};

// Rectification
pub use crate::converter::{Converter, ConverterBackend};
pub use crate::rectifier::{
    ConvergenceOutcome, RectifyReport, Rectifier, Transformation, converge,
};
