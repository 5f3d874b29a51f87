//! ImageMagick backend: `convert <src>[0] <dest>`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use super::{ConversionError, Converter, run_conversion, unavailable};
use crate::core::errors::Result;

/// Converts with ImageMagick's JPEG2000 delegate.
#[derive(Debug, Clone)]
pub struct ImageMagickConverter {
    convert: String,
    identify: String,
}

impl ImageMagickConverter {
    /// Use the given `convert` and `identify` binaries.
    #[must_use]
    pub fn new(convert: impl Into<String>, identify: impl Into<String>) -> Self {
        Self {
            convert: convert.into(),
            identify: identify.into(),
        }
    }

    /// `[0]` selects the first embedded image of multi-page TIFFs.
    fn source_argument(source: &Path) -> OsString {
        let mut arg = source.as_os_str().to_os_string();
        arg.push("[0]");
        arg
    }
}

/// Whether `identify -list format` output advertises JPEG2000 support.
fn lists_jp2_delegate(listing: &str) -> bool {
    listing.lines().any(|line| line.contains("JP2* JP2"))
}

impl Converter for ImageMagickConverter {
    fn name(&self) -> &'static str {
        "imagemagick"
    }

    fn ensure_available(&self) -> Result<()> {
        let output = Command::new(&self.identify)
            .args(["-list", "format"])
            .output()
            .map_err(|err| unavailable("imagemagick", format!("{}: {err}", self.identify)))?;
        let listing = String::from_utf8_lossy(&output.stdout);
        if output.status.success() && lists_jp2_delegate(&listing) {
            Ok(())
        } else {
            Err(unavailable(
                "imagemagick",
                "This tool requires the ImageMagick JPEG2000 delegate.",
            ))
        }
    }

    fn convert(&self, source: &Path, destination: &Path) -> std::result::Result<(), ConversionError> {
        let mut command = Command::new(&self.convert);
        command.arg(Self::source_argument(source)).arg(destination);
        run_conversion(&mut command, &self.convert, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegate_detection() {
        let listing = "   Format  Mode  Description\n\
                       ------------------------------\n\
                          JP2* JP2       rw-   JPEG-2000 File Format Syntax (2.5.0)\n\
                         TIFF* TIFF      rw+   Tagged Image File Format (4.5.1)\n";
        assert!(lists_jp2_delegate(listing));
        assert!(!lists_jp2_delegate("  TIFF* TIFF rw+ Tagged Image File Format\n"));
    }

    #[test]
    fn first_frame_is_selected() {
        let arg = ImageMagickConverter::source_argument(Path::new("/pkg/0123456/access/a.tif"));
        assert_eq!(arg, OsString::from("/pkg/0123456/access/a.tif[0]"));
    }

    #[test]
    fn missing_identify_is_unavailable() {
        let converter = ImageMagickConverter::new("convert", "/nonexistent/mpt-identify");
        let err = converter.ensure_available().unwrap_err();
        assert_eq!(err.code(), "MPT-2101");
        assert!(err.is_environmental());
    }
}
