#![forbid(unsafe_code)]

//! Medusa Package Tools (mpt): validation and rectification of digital
//! preservation packages.
//!
//! A package is a directory tree of bib-ID units holding access (`.jp2`) and
//! preservation (`.tif`) masters plus metadata records. Three versioned
//! profiles describe the expected layout:
//! 1. **nested**: masters under `access/accessMasters/<bib>` and
//!    `preservation/preservationMasters/<bib>`
//! 2. **flat**: one `<bib>/` folder per unit with `access` and `preservation`
//! 3. **current**: flat plus a required `<bib>/metadata` record
//!
//! The [`validator`] reports every deviation; the [`rectifier`] applies the
//! transformations that bring older layouts forward.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use medusa_package_tools::prelude::*;
//!
//! let report = Validator::for_profile(Profile::Current)
//!     .validate(std::path::Path::new("/archive/package"))?;
//! for line in report.render_lines() {
//!     println!("{line}");
//! }
//! # Ok::<(), PkgError>(())
//! ```

pub mod prelude;

pub mod converter;
pub mod core;
pub mod logger;
pub mod package;
pub mod rectifier;
pub mod rules;
pub mod scanner;
pub mod schema;
pub mod validator;
