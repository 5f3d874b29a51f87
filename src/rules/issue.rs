//! Structural findings produced by rules.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// What kind of non-conformance an [`Issue`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    MissingFolder,
    ExtraneousFolder,
    InvalidBibId,
    InvalidFilenameFormat,
    InvalidExtension,
    CrossSetMismatch,
    MissingMasterSet,
    MissingMetadata,
    SchemaInvalid,
}

impl IssueCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingFolder => "missing-folder",
            Self::ExtraneousFolder => "extraneous-folder",
            Self::InvalidBibId => "invalid-bib-id",
            Self::InvalidFilenameFormat => "invalid-filename-format",
            Self::InvalidExtension => "invalid-extension",
            Self::CrossSetMismatch => "cross-set-mismatch",
            Self::MissingMasterSet => "missing-master-set",
            Self::MissingMetadata => "missing-metadata",
            Self::SchemaInvalid => "schema-invalid",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub category: IssueCategory,
    pub path: PathBuf,
    pub message: String,
}

impl Issue {
    #[must_use]
    pub fn new(category: IssueCategory, path: impl Into<PathBuf>, message: String) -> Self {
        Self {
            category,
            path: path.into(),
            message,
        }
    }

    #[must_use]
    pub fn missing_folder(path: &Path) -> Self {
        Self::new(
            IssueCategory::MissingFolder,
            path,
            format!("Missing {}", path.display()),
        )
    }

    #[must_use]
    pub fn extraneous_folder(path: &Path) -> Self {
        Self::new(
            IssueCategory::ExtraneousFolder,
            path,
            format!("Extraneous folder: {}", path.display()),
        )
    }

    #[must_use]
    pub fn extraneous_file(path: &Path) -> Self {
        Self::new(
            IssueCategory::ExtraneousFolder,
            path,
            format!("Extraneous file: {}", path.display()),
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
