//! Document validation against a fetched schema bundle via `xmllint`.

#![allow(missing_docs)]

use std::path::Path;
use std::process::{Command, Stdio};

use super::SchemaBundle;

/// Outcome of validating one metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentVerdict {
    Valid,
    Invalid(String),
}

/// Validates metadata documents against a schema.
pub trait DocumentValidator {
    fn name(&self) -> &'static str;
    fn validate(&self, document: &Path) -> DocumentVerdict;
}

/// Runs `xmllint --noout --schema <primary> <document>`.
#[derive(Debug)]
pub struct XmllintValidator {
    binary: String,
    bundle: SchemaBundle,
}

impl XmllintValidator {
    #[must_use]
    pub fn new(binary: impl Into<String>, bundle: SchemaBundle) -> Self {
        Self {
            binary: binary.into(),
            bundle,
        }
    }

    /// True when `binary --version` runs successfully.
    #[must_use]
    pub fn probe(binary: &str) -> bool {
        Command::new(binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    #[must_use]
    pub fn bundle(&self) -> &SchemaBundle {
        &self.bundle
    }
}

impl DocumentValidator for XmllintValidator {
    fn name(&self) -> &'static str {
        "xmllint"
    }

    fn validate(&self, document: &Path) -> DocumentVerdict {
        let output = match Command::new(&self.binary)
            .arg("--noout")
            .arg("--schema")
            .arg(self.bundle.primary())
            .arg(document)
            .output()
        {
            Ok(output) => output,
            Err(err) => return DocumentVerdict::Invalid(format!("{}: {err}", self.binary)),
        };
        if output.status.success() {
            return DocumentVerdict::Valid;
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        DocumentVerdict::Invalid(summarize_diagnostics(&stderr, output.status.code()))
    }
}

/// Keep the diagnostic lines, dropping xmllint's trailing verdict line.
fn summarize_diagnostics(stderr: &str, code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.ends_with("fails to validate"))
        .collect();
    if lines.is_empty() {
        code.map_or_else(
            || "validator terminated by signal".to_string(),
            |code| format!("validator exited with status {code}"),
        )
    } else {
        lines.join("; ")
    }
}
