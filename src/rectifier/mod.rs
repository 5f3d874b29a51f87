//! Rectifier: brings a package tree toward its profile's layout.
//!
//! A run is a fixed sequence of steps; the profile selects which of them
//! apply. Every filesystem change is recorded as a [`Transformation`] and,
//! when a journal is configured, appended to it as it happens. Nothing is
//! rolled back: an abort leaves the changes of earlier steps in place, and
//! running again continues from there.

#![allow(missing_docs)]

pub mod converge;
mod steps;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::converter::Converter;
use crate::core::errors::{PkgError, Result};
use crate::core::paths::resolve_root;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::package::profile::Profile;
use crate::scanner::patterns::JunkPatternRegistry;
use crate::scanner::walker::TreeScanner;
pub use converge::{ConvergenceOutcome, ConvergenceReport, converge};

/// One rectification step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    DeleteJunk,
    RelocateNestedMasters,
    RelocateMetadata,
    RemoveLegacyContainers,
    FlattenJp2Folders,
    ConvertAccessTiffs,
}

impl Step {
    pub const ALL: [Self; 6] = [
        Self::DeleteJunk,
        Self::RelocateNestedMasters,
        Self::RelocateMetadata,
        Self::RemoveLegacyContainers,
        Self::FlattenJp2Folders,
        Self::ConvertAccessTiffs,
    ];

    /// Steps that run for `profile`. Nested packages only lose their junk.
    #[must_use]
    pub fn sequence_for(profile: Profile) -> &'static [Self] {
        match profile {
            Profile::Nested => &Self::ALL[..1],
            Profile::Flat | Profile::Current => &Self::ALL,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteJunk => "delete-junk",
            Self::RelocateNestedMasters => "relocate-nested-masters",
            Self::RelocateMetadata => "relocate-metadata",
            Self::RemoveLegacyContainers => "remove-legacy-containers",
            Self::FlattenJp2Folders => "flatten-jp2-folders",
            Self::ConvertAccessTiffs => "convert-access-tiffs",
        }
    }

    const fn failure_verb(self) -> &'static str {
        match self {
            Self::DeleteJunk => "delete",
            Self::RelocateNestedMasters | Self::RelocateMetadata => "move",
            Self::RemoveLegacyContainers | Self::FlattenJp2Folders => "remove",
            Self::ConvertAccessTiffs => "convert",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filesystem change that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transformation {
    DeleteFile { path: PathBuf },
    CreateDir { path: PathBuf },
    Move { from: PathBuf, to: PathBuf },
    RemoveDir { path: PathBuf },
    Convert { from: PathBuf, to: PathBuf },
    /// Zero-byte `.jp2` standing in for a zero-byte `.tif` of a shadow clone.
    Placeholder { path: PathBuf },
    DeletePlaceholder { path: PathBuf },
}

impl Transformation {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::DeleteFile { path }
            | Self::CreateDir { path }
            | Self::RemoveDir { path }
            | Self::Placeholder { path }
            | Self::DeletePlaceholder { path } => path,
            Self::Move { from, .. } | Self::Convert { from, .. } => from,
        }
    }

    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        match self {
            Self::Move { to, .. } | Self::Convert { to, .. } => Some(to),
            _ => None,
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteFile { path } | Self::RemoveDir { path } => {
                write!(f, "Deleting {}", path.display())
            }
            Self::CreateDir { path } => write!(f, "Creating {}", path.display()),
            Self::Move { from, to } => write!(f, "Moving {} to {}", from.display(), to.display()),
            Self::Convert { from, to } => {
                write!(f, "Converting {} to {}", from.display(), to.display())
            }
            Self::Placeholder { path } => write!(f, "Creating fake jp2: {}", path.display()),
            Self::DeletePlaceholder { path } => write!(f, "Deleting fake tif: {}", path.display()),
        }
    }
}

/// A non-fatal failure; the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RectifyFailure {
    pub step: Step,
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for RectifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unable to {} {}: {}",
            self.step.failure_verb(),
            self.path.display(),
            self.reason
        )
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RectifyAbort {
    pub step: Step,
    pub path: Option<PathBuf>,
    pub code: &'static str,
    pub reason: String,
}

impl RectifyAbort {
    fn from_error(step: Step, err: &PkgError) -> Self {
        Self {
            step,
            path: err.path().map(Path::to_path_buf),
            code: err.code(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for RectifyAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.step, self.code) {
            (Some(path), Step::FlattenJp2Folders, "MPT-3001") => {
                write!(f, "Unable to move up one level: {}", path.display())
            }
            _ => write!(f, "Aborted during {}: {}", self.step, self.reason),
        }
    }
}

/// Outcome of one rectify run.
#[derive(Debug, Clone)]
pub struct RectifyReport {
    pub profile: Profile,
    pub root: PathBuf,
    pub applied: Vec<Transformation>,
    pub failures: Vec<RectifyFailure>,
    pub aborted: Option<RectifyAbort>,
    pub duration: Duration,
}

impl RectifyReport {
    /// Nothing was changed and nothing went wrong.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty() && self.is_complete()
    }

    /// Every step ran and none reported a failure.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }

    /// Applied transformations, then failures, then the abort line.
    #[must_use]
    pub fn render_lines(&self) -> Vec<String> {
        self.applied
            .iter()
            .map(ToString::to_string)
            .chain(self.failures.iter().map(ToString::to_string))
            .chain(self.aborted.iter().map(ToString::to_string))
            .collect()
    }
}

impl Serialize for RectifyReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RectifyReport", 6)?;
        state.serialize_field("profile", &self.profile)?;
        state.serialize_field("root", &self.root)?;
        state.serialize_field("applied", &self.applied)?;
        state.serialize_field("failures", &self.failures)?;
        state.serialize_field("aborted", &self.aborted)?;
        state.serialize_field(
            "duration_ms",
            &u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
        )?;
        state.end()
    }
}

/// Applies the profile's transformation sequence to a package tree.
pub struct Rectifier {
    converter: Box<dyn Converter>,
    junk: JunkPatternRegistry,
    journal: Option<JsonlWriter>,
}

impl fmt::Debug for Rectifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rectifier")
            .field("converter", &self.converter.name())
            .field("junk", &self.junk)
            .field("journal", &self.journal.is_some())
            .finish()
    }
}

impl Rectifier {
    #[must_use]
    pub fn new(converter: Box<dyn Converter>, junk: JunkPatternRegistry) -> Self {
        Self {
            converter,
            junk,
            journal: None,
        }
    }

    #[must_use]
    pub fn with_journal(mut self, journal: JsonlWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    #[must_use]
    pub fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    /// Run every step for `profile` against `root`.
    ///
    /// Errors are environmental and raised before any mutation. Conflicts
    /// found later end the run and are reported in
    /// [`RectifyReport::aborted`].
    pub fn rectify(&mut self, root: &Path, profile: Profile) -> Result<RectifyReport> {
        let started = Instant::now();
        let root = resolve_root(root);
        // Fails on a missing or non-directory root.
        TreeScanner::new(&root, self.junk.clone()).walk()?;
        self.converter.ensure_available()?;

        let mut report = RectifyReport {
            profile,
            root: root.clone(),
            applied: Vec::new(),
            failures: Vec::new(),
            aborted: None,
            duration: Duration::ZERO,
        };
        self.record(
            LogEntry::new(EventType::RectifyStart, Severity::Info)
                .with_path(&root)
                .with_details(format!("converter {}", self.converter.name())),
            profile,
        );

        for &step in Step::sequence_for(profile) {
            let mut run = steps::StepRun::new(&root, &self.junk, self.converter.as_ref());
            let outcome = run.execute(step);
            let (applied, failures) = run.finish();
            for transformation in &applied {
                self.journal_transformation(step, transformation, profile);
            }
            for failure in &failures {
                self.journal_failure(failure, profile);
            }
            report.applied.extend(applied);
            report.failures.extend(failures);

            if let Err(err) = outcome {
                let abort = RectifyAbort::from_error(step, &err);
                let mut entry = LogEntry::new(EventType::RectifyAborted, Severity::Critical)
                    .with_step(step.as_str())
                    .with_details(abort.to_string());
                entry.path = abort.path.as_ref().map(|p| p.display().to_string());
                entry.error_code = Some(abort.code.to_string());
                entry.error_message = Some(abort.reason.clone());
                self.record(entry, profile);
                report.aborted = Some(abort);
                break;
            }
        }

        report.duration = started.elapsed();
        let mut done = LogEntry::new(EventType::RectifyComplete, Severity::Info).with_path(&root);
        done.ok = Some(report.is_complete());
        done.duration_ms = Some(u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX));
        done.details = Some(format!(
            "{} applied, {} failed",
            report.applied.len(),
            report.failures.len()
        ));
        self.record(done, profile);
        if let Some(journal) = self.journal.as_mut() {
            journal.flush();
        }
        Ok(report)
    }

    fn record(&mut self, mut entry: LogEntry, profile: Profile) {
        if let Some(journal) = self.journal.as_mut() {
            entry.profile = Some(profile.as_str().to_string());
            journal.write_entry(&entry);
        }
    }

    fn journal_transformation(&mut self, step: Step, transformation: &Transformation, profile: Profile) {
        if self.journal.is_none() {
            return;
        }
        let mut entry = LogEntry::new(EventType::Transformation, Severity::Info)
            .with_step(step.as_str())
            .with_path(transformation.path())
            .with_details(transformation.to_string());
        if let Some(destination) = transformation.destination() {
            entry = entry.with_destination(destination);
        }
        entry.ok = Some(true);
        self.record(entry, profile);
    }

    fn journal_failure(&mut self, failure: &RectifyFailure, profile: Profile) {
        if self.journal.is_none() {
            return;
        }
        let event = if failure.step == Step::ConvertAccessTiffs {
            EventType::ConversionFailed
        } else {
            EventType::StepFailed
        };
        let mut entry = LogEntry::new(event, Severity::Warning)
            .with_step(failure.step.as_str())
            .with_path(&failure.path)
            .with_details(failure.to_string());
        entry.ok = Some(false);
        entry.error_message = Some(failure.reason.clone());
        self.record(entry, profile);
    }
}
