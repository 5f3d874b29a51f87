//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::converter::ConverterBackend;
use crate::core::errors::{PkgError, Result};
use crate::package::profile::Profile;

/// Full tool configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub package: PackageConfig,
    pub converter: ConverterConfig,
    pub schema: SchemaConfig,
    pub converge: ConvergeConfig,
    pub paths: PathsConfig,
}

/// Profile selection and structural knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackageConfig {
    pub profile: Profile,
    /// Metadata record filenames the completeness rule accepts.
    pub metadata_record_pattern: String,
    /// Exact file names treated as junk on top of the built-in list.
    pub extra_junk_names: Vec<String>,
}

/// Raster conversion backend and its binaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConverterConfig {
    pub backend: ConverterBackend,
    pub imagemagick_convert: String,
    pub imagemagick_identify: String,
    pub kakadu_binary: String,
    pub kakadu: KakaduConfig,
}

/// Fixed JPEG2000 encoding parameters handed to `kdu_compress`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KakaduConfig {
    pub layers: u32,
    pub levels: u32,
    pub precincts: String,
    pub progression_order: String,
    pub code_block: String,
    pub reversible: bool,
}

/// Optional deep metadata validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaConfig {
    pub enabled: bool,
    pub version: String,
    pub base_url: String,
    /// Every document is fetched so relative includes resolve.
    pub documents: Vec<String>,
    /// The document records are validated against.
    pub primary: String,
    pub fetch_timeout_secs: u64,
    pub curl_binary: String,
    pub xmllint_binary: String,
}

/// Bounds for the validate → rectify loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConvergeConfig {
    pub max_iterations: usize,
}

/// Filesystem paths used by mpt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// Activity journal for rectifier runs; disabled when unset.
    pub journal_file: Option<PathBuf>,
    pub journal_fallback_file: Option<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Current,
            metadata_record_pattern: r"^item_.+\.xml$".to_string(),
            extra_junk_names: Vec::new(),
        }
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            backend: ConverterBackend::ImageMagick,
            imagemagick_convert: "convert".to_string(),
            imagemagick_identify: "identify".to_string(),
            kakadu_binary: "kdu_compress".to_string(),
            kakadu: KakaduConfig::default(),
        }
    }
}

impl Default for KakaduConfig {
    fn default() -> Self {
        Self {
            layers: 8,
            levels: 7,
            precincts: "{256,256},{256,256},{128,128}".to_string(),
            progression_order: "RPCL".to_string(),
            code_block: "{64,64}".to_string(),
            reversible: true,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            version: "2".to_string(),
            base_url: "https://raw.githubusercontent.com/medusa-project/PearTree/develop/public/schema"
                .to_string(),
            documents: vec!["object.xsd".to_string(), "entity.xsd".to_string()],
            primary: "object.xsd".to_string(),
            fetch_timeout_secs: 30,
            curl_binary: "curl".to_string(),
            xmllint_binary: "xmllint".to_string(),
        }
    }
}

impl Default for ConvergeConfig {
    fn default() -> Self {
        Self { max_iterations: 5 }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[MPT-CONFIG] WARNING: HOME not set, falling back to /tmp for config paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir.join(".config").join("mpt").join("config.toml"),
            journal_file: None,
            journal_fallback_file: None,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| PkgError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(PkgError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Compiled metadata record pattern. `validate` guarantees it compiles.
    pub fn metadata_record_regex(&self) -> Result<Regex> {
        Regex::new(&self.package.metadata_record_pattern).map_err(|err| PkgError::InvalidConfig {
            details: format!(
                "package.metadata_record_pattern {:?}: {err}",
                self.package.metadata_record_pattern
            ),
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MPT_PROFILE") {
            self.package.profile = raw.parse().map_err(|details| PkgError::ConfigParse {
                context: "env",
                details: format!("MPT_PROFILE={raw:?}: {details}"),
            })?;
        }
        if let Some(raw) = lookup("MPT_CONVERTER_BACKEND") {
            self.converter.backend = raw.parse().map_err(|details| PkgError::ConfigParse {
                context: "env",
                details: format!("MPT_CONVERTER_BACKEND={raw:?}: {details}"),
            })?;
        }
        if let Some(raw) = lookup("MPT_SCHEMA_ENABLED") {
            self.schema.enabled = parse_env_bool("MPT_SCHEMA_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("MPT_SCHEMA_VERSION") {
            self.schema.version = raw;
        }
        if let Some(raw) = lookup("MPT_SCHEMA_BASE_URL") {
            self.schema.base_url = raw;
        }
        if let Some(raw) = lookup("MPT_CONVERGE_MAX_ITERATIONS") {
            self.converge.max_iterations = parse_env_usize("MPT_CONVERGE_MAX_ITERATIONS", &raw)?;
        }
        if let Some(raw) = lookup("MPT_JOURNAL_FILE") {
            self.paths.journal_file = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let trimmed = self.schema.base_url.trim_end_matches('/').len();
        self.schema.base_url.truncate(trimmed);
        for name in &mut self.package.extra_junk_names {
            *name = name.trim().to_lowercase();
        }
        self.package.extra_junk_names.retain(|name| !name.is_empty());
    }

    fn validate(&self) -> Result<()> {
        if self.converge.max_iterations == 0 {
            return Err(PkgError::InvalidConfig {
                details: "converge.max_iterations must be >= 1".to_string(),
            });
        }
        self.metadata_record_regex()?;

        for (name, value) in [
            ("converter.imagemagick_convert", &self.converter.imagemagick_convert),
            (
                "converter.imagemagick_identify",
                &self.converter.imagemagick_identify,
            ),
            ("converter.kakadu_binary", &self.converter.kakadu_binary),
            ("schema.curl_binary", &self.schema.curl_binary),
            ("schema.xmllint_binary", &self.schema.xmllint_binary),
        ] {
            if value.trim().is_empty() {
                return Err(PkgError::InvalidConfig {
                    details: format!("{name} must not be empty"),
                });
            }
        }

        if self.converter.kakadu.layers == 0 || self.converter.kakadu.levels == 0 {
            return Err(PkgError::InvalidConfig {
                details: "converter.kakadu.layers and converter.kakadu.levels must be >= 1"
                    .to_string(),
            });
        }

        if self.schema.enabled {
            if self.schema.version.trim().is_empty() {
                return Err(PkgError::InvalidConfig {
                    details: "schema.version must be set when schema.enabled=true".to_string(),
                });
            }
            if !self.schema.documents.contains(&self.schema.primary) {
                return Err(PkgError::InvalidConfig {
                    details: format!(
                        "schema.primary {:?} must be listed in schema.documents",
                        self.schema.primary
                    ),
                });
            }
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>().map_err(|error| PkgError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| PkgError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
