//! Raster conversion boundary: TIFF access masters to JPEG2000.
//!
//! Conversion is delegated to an external binary. Backends differ only in
//! how they are probed and invoked; success always means exit status 0 and
//! an existing destination file.

#![allow(missing_docs)]

pub mod imagemagick;
pub mod kakadu;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::ConverterConfig;
use crate::core::errors::{PkgError, Result};
pub use imagemagick::ImageMagickConverter;
pub use kakadu::KakaduConverter;

/// Which conversion backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterBackend {
    ImageMagick,
    Kakadu,
    None,
}

impl ConverterBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImageMagick => "imagemagick",
            Self::Kakadu => "kakadu",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ConverterBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConverterBackend {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "imagemagick" | "convert" => Ok(Self::ImageMagick),
            "kakadu" | "kdu_compress" => Ok(Self::Kakadu),
            "none" | "off" => Ok(Self::None),
            other => Err(format!(
                "unknown converter {other:?} (expected imagemagick, kakadu or none)"
            )),
        }
    }
}

/// Why one conversion failed. Never fatal for a rectify run.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("{binary} could not be started: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} exited with {status}: {stderr}")]
    Failed {
        binary: String,
        status: String,
        stderr: String,
    },

    #[error("{binary} reported success but {} was not written", destination.display())]
    MissingOutput { binary: String, destination: PathBuf },

    #[error("conversion disabled (backend none)")]
    Disabled,
}

/// A capability that turns one raster file into a JPEG2000 file.
pub trait Converter {
    fn name(&self) -> &'static str;

    /// Fatal check made before a rectify run mutates anything.
    fn ensure_available(&self) -> Result<()>;

    fn convert(&self, source: &Path, destination: &Path) -> std::result::Result<(), ConversionError>;
}

/// Backend that converts nothing. Zero-byte placeholders still work.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConverter;

impl Converter for NullConverter {
    fn name(&self) -> &'static str {
        ConverterBackend::None.as_str()
    }

    fn ensure_available(&self) -> Result<()> {
        Ok(())
    }

    fn convert(&self, _source: &Path, _destination: &Path) -> std::result::Result<(), ConversionError> {
        Err(ConversionError::Disabled)
    }
}

/// Build the configured backend.
#[must_use]
pub fn from_config(config: &ConverterConfig) -> Box<dyn Converter> {
    match config.backend {
        ConverterBackend::ImageMagick => Box::new(ImageMagickConverter::new(
            config.imagemagick_convert.clone(),
            config.imagemagick_identify.clone(),
        )),
        ConverterBackend::Kakadu => Box::new(KakaduConverter::new(
            config.kakadu_binary.clone(),
            config.kakadu.clone(),
        )),
        ConverterBackend::None => Box::new(NullConverter),
    }
}

/// Run a prepared conversion command and check its outcome.
pub(crate) fn run_conversion(
    command: &mut Command,
    binary: &str,
    destination: &Path,
) -> std::result::Result<(), ConversionError> {
    let output = command.output().map_err(|source| ConversionError::Spawn {
        binary: binary.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(ConversionError::Failed {
            binary: binary.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    if !destination.exists() {
        return Err(ConversionError::MissingOutput {
            binary: binary.to_string(),
            destination: destination.to_path_buf(),
        });
    }
    Ok(())
}

pub(crate) fn unavailable(backend: &'static str, details: impl Into<String>) -> PkgError {
    PkgError::ConverterUnavailable {
        backend,
        details: details.into(),
    }
}
