//! Metadata rules: record presence and optional schema validation.

#![allow(missing_docs)]

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;

use crate::package::snapshot::PackageSnapshot;
use crate::rules::{Issue, IssueCategory, Rule};
use crate::schema::{DocumentValidator, DocumentVerdict};

/// Built-in record name pattern, `item_<anything>.xml`.
#[must_use]
pub fn default_record_pattern() -> Regex {
    Regex::new(r"^item_.+\.xml$").expect("record pattern regex is valid")
}

/// A present metadata folder must hold at least one record.
#[derive(Debug, Clone)]
pub struct MetadataRecordsRule {
    pattern: Regex,
}

impl MetadataRecordsRule {
    #[must_use]
    pub const fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl Rule for MetadataRecordsRule {
    fn name(&self) -> &'static str {
        "metadata-records"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        snapshot
            .valid_units()
            .filter_map(|unit| {
                let metadata = unit.metadata.as_ref().filter(|m| m.present)?;
                let has_record = metadata.files.iter().any(|file| {
                    self.pattern
                        .is_match(&crate::core::paths::file_name_lossy(file))
                });
                (!has_record).then(|| {
                    Issue::new(
                        IssueCategory::MissingMetadata,
                        &metadata.path,
                        format!("No metadata record(s): {}", unit.key),
                    )
                })
            })
            .collect()
    }
}

/// Every `.xml` in a metadata folder must be well-formed and valid against
/// the fetched schema.
pub struct MetadataSchemaRule {
    validator: Box<dyn DocumentValidator>,
}

impl MetadataSchemaRule {
    #[must_use]
    pub fn new(validator: Box<dyn DocumentValidator>) -> Self {
        Self { validator }
    }
}

impl Rule for MetadataSchemaRule {
    fn name(&self) -> &'static str {
        "metadata-schema"
    }

    fn evaluate(&self, snapshot: &PackageSnapshot) -> Vec<Issue> {
        let mut issues = Vec::new();
        for unit in snapshot.valid_units() {
            let Some(metadata) = unit.metadata.as_ref().filter(|m| m.present) else {
                continue;
            };
            for document in metadata.files.iter().filter(|file| is_xml(file)) {
                let verdict = match check_well_formed(document) {
                    Ok(()) => self.validator.validate(document),
                    Err(reason) => DocumentVerdict::Invalid(reason),
                };
                if let DocumentVerdict::Invalid(reason) = verdict {
                    issues.push(Issue::new(
                        IssueCategory::SchemaInvalid,
                        document,
                        format!("Invalid: {} ({reason})", document.display()),
                    ));
                }
            }
        }
        issues
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

/// Parse the whole document, requiring one closed root element.
pub fn check_well_formed(path: &Path) -> Result<(), String> {
    let text = std::fs::read_to_string(path).map_err(|err| format!("unreadable: {err}"))?;
    let mut reader = Reader::from_str(&text);
    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Empty(_)) if depth == 0 => roots += 1,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "not well-formed at byte {}: {err}",
                    reader.error_position()
                ));
            }
        }
    }
    match (roots, depth) {
        (0, _) => Err("no root element".to_string()),
        (_, open) if open > 0 => Err(format!("{open} unclosed element(s)")),
        (1, _) => Ok(()),
        (_, _) => Err("more than one root element".to_string()),
    }
}
