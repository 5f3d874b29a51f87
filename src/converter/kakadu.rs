//! Kakadu backend: `kdu_compress` with fixed JPEG2000 coding parameters.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use super::{ConversionError, Converter, run_conversion, unavailable};
use crate::core::config::KakaduConfig;
use crate::core::errors::Result;

/// Converts with Kakadu's `kdu_compress`.
#[derive(Debug, Clone)]
pub struct KakaduConverter {
    binary: String,
    params: KakaduConfig,
}

impl KakaduConverter {
    /// Use `binary` as `kdu_compress` with the given encoding parameters.
    #[must_use]
    pub fn new(binary: impl Into<String>, params: KakaduConfig) -> Self {
        Self {
            binary: binary.into(),
            params,
        }
    }

    fn arguments(&self, source: &Path, destination: &Path) -> Vec<OsString> {
        let p = &self.params;
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            source.as_os_str().into(),
            "-o".into(),
            destination.as_os_str().into(),
        ];
        args.extend(
            [
                format!("Clayers={}", p.layers),
                format!("Clevels={}", p.levels),
                format!("Cprecincts={}", p.precincts),
                format!("Corder={}", p.progression_order),
                format!("Cblk={}", p.code_block),
                format!("Creversible={}", if p.reversible { "yes" } else { "no" }),
            ]
            .into_iter()
            .map(OsString::from),
        );
        args
    }
}

impl Converter for KakaduConverter {
    fn name(&self) -> &'static str {
        "kakadu"
    }

    fn ensure_available(&self) -> Result<()> {
        // kdu_compress -v prints its version; its exit status varies by release.
        Command::new(&self.binary)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|err| unavailable("kakadu", format!("{}: {err}", self.binary)))
    }

    fn convert(&self, source: &Path, destination: &Path) -> std::result::Result<(), ConversionError> {
        let mut command = Command::new(&self.binary);
        command.args(self.arguments(source, destination));
        run_conversion(&mut command, &self.binary, destination)
    }
}
