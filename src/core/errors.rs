//! MPT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, PkgError>;

/// Top-level error type for the package tools.
#[derive(Debug, Error)]
pub enum PkgError {
    #[error("[MPT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MPT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MPT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MPT-2001] {} does not exist.", path.display())]
    RootMissing { path: PathBuf },

    #[error("[MPT-2002] {} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("[MPT-2101] converter {backend} unavailable: {details}")]
    ConverterUnavailable {
        backend: &'static str,
        details: String,
    },

    #[error("[MPT-2201] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MPT-3001] destination already exists: {}", destination.display())]
    RectifyConflict { path: PathBuf, destination: PathBuf },

    #[error("[MPT-3002] IO failure at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MPT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl PkgError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MPT-1001",
            Self::MissingConfig { .. } => "MPT-1002",
            Self::ConfigParse { .. } => "MPT-1003",
            Self::RootMissing { .. } => "MPT-2001",
            Self::NotADirectory { .. } => "MPT-2002",
            Self::ConverterUnavailable { .. } => "MPT-2101",
            Self::Serialization { .. } => "MPT-2201",
            Self::RectifyConflict { .. } => "MPT-3001",
            Self::Io { .. } => "MPT-3002",
            Self::Runtime { .. } => "MPT-3900",
        }
    }

    /// Environment failures are raised before any mutation and abort the run.
    #[must_use]
    pub const fn is_environmental(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::RootMissing { .. }
                | Self::NotADirectory { .. }
                | Self::ConverterUnavailable { .. }
        )
    }

    /// The path this error is about, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::MissingConfig { path }
            | Self::RootMissing { path }
            | Self::NotADirectory { path }
            | Self::Io { path, .. }
            | Self::RectifyConflict { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for PkgError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<PkgError> {
        vec![
            PkgError::InvalidConfig {
                details: String::new(),
            },
            PkgError::MissingConfig {
                path: PathBuf::new(),
            },
            PkgError::ConfigParse {
                context: "",
                details: String::new(),
            },
            PkgError::RootMissing {
                path: PathBuf::new(),
            },
            PkgError::NotADirectory {
                path: PathBuf::new(),
            },
            PkgError::ConverterUnavailable {
                backend: "",
                details: String::new(),
            },
            PkgError::Serialization {
                context: "",
                details: String::new(),
            },
            PkgError::RectifyConflict {
                path: PathBuf::new(),
                destination: PathBuf::new(),
            },
            PkgError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            PkgError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(PkgError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_mpt_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("MPT-"),
                "code {} must start with MPT-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        for err in &all_variants() {
            let msg = err.to_string();
            assert!(
                msg.contains(err.code()),
                "display should contain error code: {msg}"
            );
        }
    }

    #[test]
    fn root_missing_reads_like_the_operator_message() {
        let err = PkgError::RootMissing {
            path: PathBuf::from("/bogus/bogus"),
        };
        assert!(err.to_string().ends_with("/bogus/bogus does not exist."));
    }

    #[test]
    fn environmental_errors_are_classified() {
        assert!(
            PkgError::RootMissing {
                path: PathBuf::new()
            }
            .is_environmental()
        );
        assert!(
            PkgError::ConverterUnavailable {
                backend: "imagemagick",
                details: String::new()
            }
            .is_environmental()
        );
        assert!(
            !PkgError::RectifyConflict {
                path: PathBuf::new(),
                destination: PathBuf::new()
            }
            .is_environmental()
        );
        assert!(!PkgError::io("/tmp/x", std::io::Error::other("x")).is_environmental());
    }

    #[test]
    fn conflict_reports_source_path() {
        let err = PkgError::RectifyConflict {
            path: PathBuf::from("/pkg/0123456/access/jp2/a.jp2"),
            destination: PathBuf::from("/pkg/0123456/access/a.jp2"),
        };
        assert_eq!(
            err.path(),
            Some(Path::new("/pkg/0123456/access/jp2/a.jp2"))
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = PkgError::io(
            "/tmp/test.txt",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "MPT-3002");
        assert!(err.to_string().contains("/tmp/test.txt"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: PkgError = json_err.into();
        assert_eq!(err.code(), "MPT-2201");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: PkgError = toml_err.into();
        assert_eq!(err.code(), "MPT-1003");
    }
}
