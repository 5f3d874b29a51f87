//! Activity journal: append-only JSONL with graceful degradation.

pub mod jsonl;

use crate::core::config::PathsConfig;
use jsonl::{JsonlConfig, JsonlWriter};

/// Open the configured journal, or `None` when journaling is disabled.
#[must_use]
pub fn open_journal(paths: &PathsConfig) -> Option<JsonlWriter> {
    let path = paths.journal_file.clone()?;
    Some(JsonlWriter::open(JsonlConfig::new(
        path,
        paths.journal_fallback_file.clone(),
    )))
}
