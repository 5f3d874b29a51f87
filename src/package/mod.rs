//! Package model: profiles, naming grammar and the scan snapshot.

pub mod naming;
pub mod profile;
pub mod snapshot;

/// Top-level folder that is always allowed and never examined.
pub const SOURCE_DIR: &str = "source";
/// Per-unit folder holding metadata records.
pub const METADATA_DIR: &str = "metadata";
/// Stray folder of access masters that the rectifier flattens.
pub const JP2_DIR: &str = "jp2";
