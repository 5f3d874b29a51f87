//! Bib ID and master filename grammar.
//!
//! A master is named `<bib>_<suffix>.<ext>`: exactly one underscore, a
//! seven-digit bib ID, a page suffix (`001`..`999`, `key` or `title`) and the
//! role's extension, compared case-sensitively.

#![allow(missing_docs)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static BIB_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}").expect("bib prefix regex is valid"));
static BIB_EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}$").expect("bib id regex is valid"));
static PAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}$").expect("page suffix regex is valid"));

/// Seven-digit bibliographic identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BibId(String);

impl BibId {
    /// Parse a string that must be exactly seven ASCII digits.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        BIB_EXACT.is_match(raw).then(|| Self(raw.to_string()))
    }

    /// The bib ID a unit folder name begins with. `0123456 (atlas)` is
    /// accepted; `atlas` and `012345` are not.
    #[must_use]
    pub fn from_folder_name(name: &str) -> Option<Self> {
        BIB_PREFIX
            .find(name)
            .map(|found| Self(found.as_str().to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BibId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Page designator of a master file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSuffix {
    Page(u16),
    Key,
    Title,
}

impl fmt::Display for PageSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(number) => write!(f, "{number:03}"),
            Self::Key => f.write_str("key"),
            Self::Title => f.write_str("title"),
        }
    }
}

/// Whether a master is a delivery derivative or the archival original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaRole {
    Access,
    Preservation,
}

impl MediaRole {
    pub const ALL: [Self; 2] = [Self::Access, Self::Preservation];

    /// Required extension, without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Access => "jp2",
            Self::Preservation => "tif",
        }
    }

    /// Container folder name inside a unit (and legacy top-level name).
    #[must_use]
    pub const fn container_name(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Preservation => "preservation",
        }
    }

    /// Master root inside the legacy top-level container.
    #[must_use]
    pub const fn legacy_masters_name(self) -> &'static str {
        match self {
            Self::Access => "accessMasters",
            Self::Preservation => "preservationMasters",
        }
    }
}

impl fmt::Display for MediaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.container_name())
    }
}

/// Why a file name is not a valid master name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "defect")]
pub enum NameDefect {
    /// Underscore count, bib ID part or page suffix is wrong.
    Format,
    /// Structure is valid but the extension is not the role's.
    Extension { expected: &'static str },
}

/// The parsed parts of a valid master name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterName {
    pub bib_id: BibId,
    pub suffix: PageSuffix,
}

/// Parse a master file name for the given role.
pub fn parse_master_name(file_name: &str, role: MediaRole) -> Result<MasterName, NameDefect> {
    let mut parts = file_name.split('_');
    let (Some(head), Some(tail), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(NameDefect::Format);
    };
    let bib_id = BibId::parse(head).ok_or(NameDefect::Format)?;

    let raw_suffix = tail.split('.').next().unwrap_or_default();
    let suffix = match raw_suffix {
        "key" => PageSuffix::Key,
        "title" => PageSuffix::Title,
        digits if PAGE.is_match(digits) => {
            PageSuffix::Page(digits.parse().map_err(|_| NameDefect::Format)?)
        }
        _ => return Err(NameDefect::Format),
    };

    let extension = tail.rsplit_once('.').map(|(_, ext)| ext);
    if extension != Some(role.extension()) {
        return Err(NameDefect::Extension {
            expected: role.extension(),
        });
    }
    Ok(MasterName { bib_id, suffix })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_names_parse() {
        let name = parse_master_name("0123456_001.jp2", MediaRole::Access).unwrap();
        assert_eq!(name.bib_id.as_str(), "0123456");
        assert_eq!(name.suffix, PageSuffix::Page(1));

        let key = parse_master_name("0123456_key.tif", MediaRole::Preservation).unwrap();
        assert_eq!(key.suffix, PageSuffix::Key);
        let title = parse_master_name("0123456_title.jp2", MediaRole::Access).unwrap();
        assert_eq!(title.suffix.to_string(), "title");
    }

    #[test]
    fn structural_defects_are_format_errors() {
        for name in [
            "0123456.jp2",
            "0123456_001_002.jp2",
            "012345_001.jp2",
            "01234567_001.jp2",
            "abcdefg_001.jp2",
            "0123456_01.jp2",
            "0123456_0001.jp2",
            "0123456_cover.jp2",
            "0123456_KEY.jp2",
            "_001.jp2",
            "0123456_.jp2",
        ] {
            assert_eq!(
                parse_master_name(name, MediaRole::Access),
                Err(NameDefect::Format),
                "{name}"
            );
        }
    }

    #[test]
    fn wrong_extension_is_its_own_defect() {
        for name in ["0123456_001.tif", "0123456_001.JP2", "0123456_001"] {
            assert_eq!(
                parse_master_name(name, MediaRole::Access),
                Err(NameDefect::Extension { expected: "jp2" }),
                "{name}"
            );
        }
        assert_eq!(
            parse_master_name("0123456_001.jp2", MediaRole::Preservation),
            Err(NameDefect::Extension { expected: "tif" })
        );
    }

    #[test]
    fn folder_names_need_a_bib_prefix() {
        assert_eq!(
            BibId::from_folder_name("0123456 (atlas)").map(|b| b.to_string()),
            Some("0123456".to_string())
        );
        assert!(BibId::from_folder_name("atlas").is_none());
        assert!(BibId::from_folder_name("012345x").is_none());
        assert!(BibId::parse("0123456 ").is_none());
    }

    #[test]
    fn role_names() {
        assert_eq!(MediaRole::Access.legacy_masters_name(), "accessMasters");
        assert_eq!(MediaRole::Preservation.container_name(), "preservation");
        assert_eq!(PageSuffix::Page(7).to_string(), "007");
    }

    proptest! {
        #[test]
        fn well_formed_names_always_parse(
            bib in "[0-9]{7}",
            page in prop_oneof![
                "[0-9]{3}",
                Just("key".to_string()),
                Just("title".to_string()),
            ],
            access in any::<bool>(),
        ) {
            let role = if access { MediaRole::Access } else { MediaRole::Preservation };
            let name = format!("{bib}_{page}.{}", role.extension());
            let parsed = parse_master_name(&name, role).unwrap();
            prop_assert_eq!(parsed.bib_id.as_str(), bib.as_str());
            prop_assert_eq!(parsed.suffix.to_string(), page);
        }

        #[test]
        fn names_with_extra_underscores_never_parse(
            bib in "[0-9]{7}",
            extra in "[a-z0-9]{0,5}",
        ) {
            let name = format!("{bib}_001_{extra}.jp2");
            prop_assert_eq!(parse_master_name(&name, MediaRole::Access), Err(NameDefect::Format));
        }

        #[test]
        fn arbitrary_names_never_panic(name in "\\PC{0,40}") {
            let _ = parse_master_name(&name, MediaRole::Access);
        }
    }
}
