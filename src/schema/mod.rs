//! Versioned metadata schemas: fetching and bundling.
//!
//! Schemas live at `<base_url>/<version>/<name>`. Every configured document
//! is fetched into one scratch directory so `xs:include`/`xs:import` between
//! them resolve locally. A failed fetch is never fatal: deep metadata
//! validation is simply skipped with a warning.

#![allow(missing_docs)]

pub mod xmllint;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::core::config::SchemaConfig;
pub use xmllint::{DocumentValidator, DocumentVerdict, XmllintValidator};

/// Result of fetching one schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaFetch {
    Found(String),
    Unavailable(String),
}

/// Source of schema documents.
pub trait SchemaFetcher {
    fn fetch(&self, version: &str, name: &str) -> SchemaFetch;
}

/// Fetches schema documents over HTTP with `curl`.
#[derive(Debug, Clone)]
pub struct CurlSchemaFetcher {
    binary: String,
    base_url: String,
    timeout_secs: u64,
}

impl CurlSchemaFetcher {
    #[must_use]
    pub fn new(binary: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            base_url: base_url.into(),
            timeout_secs,
        }
    }

    #[must_use]
    pub fn from_config(config: &SchemaConfig) -> Self {
        Self::new(
            config.curl_binary.clone(),
            config.base_url.clone(),
            config.fetch_timeout_secs,
        )
    }

    #[must_use]
    pub fn url_for(&self, version: &str, name: &str) -> String {
        format!("{}/{version}/{name}", self.base_url.trim_end_matches('/'))
    }
}

impl SchemaFetcher for CurlSchemaFetcher {
    fn fetch(&self, version: &str, name: &str) -> SchemaFetch {
        let url = self.url_for(version, name);
        // -f turns HTTP >= 400 into a non-zero exit.
        let output = match Command::new(&self.binary)
            .args(["-fsSL", "--max-time", &self.timeout_secs.to_string()])
            .arg(&url)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                return SchemaFetch::Unavailable(format!("{} not runnable: {err}", self.binary));
            }
        };
        if !output.status.success() {
            return SchemaFetch::Unavailable(format!("{url}: fetch failed ({})", output.status));
        }
        match String::from_utf8(output.stdout) {
            Ok(body) if !body.trim().is_empty() => SchemaFetch::Found(body),
            Ok(_) => SchemaFetch::Unavailable(format!("{url}: empty response")),
            Err(_) => SchemaFetch::Unavailable(format!("{url}: response is not UTF-8")),
        }
    }
}

/// Fetched schema documents in a scratch directory, removed on drop.
#[derive(Debug)]
pub struct SchemaBundle {
    dir: TempDir,
    version: String,
    primary: PathBuf,
}

impl SchemaBundle {
    /// Fetch every document. The error is the first unavailability reason.
    pub fn fetch(
        fetcher: &dyn SchemaFetcher,
        version: &str,
        documents: &[String],
        primary: &str,
    ) -> Result<Self, String> {
        if !documents.iter().any(|name| name == primary) {
            return Err(format!("primary schema {primary} is not among the fetched documents"));
        }
        let dir = tempfile::Builder::new()
            .prefix("mpt-schema-")
            .tempdir()
            .map_err(|err| format!("cannot create schema scratch directory: {err}"))?;

        for name in documents {
            let body = match fetcher.fetch(version, name) {
                SchemaFetch::Found(body) => body,
                SchemaFetch::Unavailable(reason) => return Err(reason),
            };
            let target = dir.path().join(name);
            fs::write(&target, body)
                .map_err(|err| format!("cannot write {}: {err}", target.display()))?;
        }

        let primary = dir.path().join(primary);
        Ok(Self {
            dir,
            version: version.to_string(),
            primary,
        })
    }

    #[must_use]
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Build the document validator for deep metadata checks, or explain on
/// stderr why it is skipped.
#[must_use]
pub fn load_document_validator(config: &SchemaConfig) -> Option<XmllintValidator> {
    load_with(config, &CurlSchemaFetcher::from_config(config))
}

fn load_with(config: &SchemaConfig, fetcher: &dyn SchemaFetcher) -> Option<XmllintValidator> {
    if !config.enabled {
        return None;
    }
    if !XmllintValidator::probe(&config.xmllint_binary) {
        eprintln!(
            "[MPT-SCHEMA] WARNING: {} not available; skipping metadata schema validation",
            config.xmllint_binary
        );
        return None;
    }
    match SchemaBundle::fetch(fetcher, &config.version, &config.documents, &config.primary) {
        Ok(bundle) => Some(XmllintValidator::new(config.xmllint_binary.clone(), bundle)),
        Err(reason) => {
            eprintln!(
                "[MPT-SCHEMA] WARNING: schema version {} unavailable ({reason}); skipping metadata schema validation",
                config.version
            );
            None
        }
    }
}
