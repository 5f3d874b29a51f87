//! Versioned package profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Structural profile a package is checked and rectified against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// v1: `access/accessMasters/<bib>` and `preservation/preservationMasters/<bib>`.
    Nested,
    /// v2: `<bib>/access` and `<bib>/preservation`; metadata optional.
    Flat,
    /// v3: like `flat`, plus a required `<bib>/metadata` holding a record.
    #[default]
    Current,
}

impl Profile {
    /// Every profile, oldest first.
    pub const ALL: [Self; 3] = [Self::Nested, Self::Flat, Self::Current];

    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nested => "nested",
            Self::Flat => "flat",
            Self::Current => "current",
        }
    }

    /// Units are `<root>/<bib>` folders rather than folders under master roots.
    #[must_use]
    pub const fn is_unit_rooted(self) -> bool {
        !matches!(self, Self::Nested)
    }

    /// Each unit must carry a `metadata` folder with a record.
    #[must_use]
    pub const fn requires_metadata(self) -> bool {
        matches!(self, Self::Current)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nested" | "v1" | "1" => Ok(Self::Nested),
            "flat" | "v2" | "2" => Ok(Self::Flat),
            "current" | "v3" | "3" => Ok(Self::Current),
            other => Err(format!(
                "unknown profile {other:?} (expected nested, flat or current)"
            )),
        }
    }
}
