//! Junk pattern registry: platform artifacts that never belong in a package.

#![allow(missing_docs)]

use std::path::Path;
use std::sync::LazyLock;

/// Which kind of platform produced a junk file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JunkOrigin {
    WindowsThumbnailCache,
    WindowsFolderSettings,
    MacFinderMetadata,
    MacResourceFork,
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact(&'static str),
    Prefix(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct JunkPattern {
    kind: MatchKind,
    origin: JunkOrigin,
}

/// Registry of built-in and configured junk names.
///
/// All matching is case-insensitive over the final path component.
#[derive(Debug, Clone)]
pub struct JunkPatternRegistry {
    builtins: &'static [JunkPattern],
    custom: Vec<String>,
}

const BUILTIN_PATTERNS: &[JunkPattern] = &[
    JunkPattern {
        kind: MatchKind::Exact("thumbs.db"),
        origin: JunkOrigin::WindowsThumbnailCache,
    },
    JunkPattern {
        kind: MatchKind::Exact("ehthumbs.db"),
        origin: JunkOrigin::WindowsThumbnailCache,
    },
    JunkPattern {
        kind: MatchKind::Exact("desktop.ini"),
        origin: JunkOrigin::WindowsFolderSettings,
    },
    JunkPattern {
        kind: MatchKind::Exact(".ds_store"),
        origin: JunkOrigin::MacFinderMetadata,
    },
    JunkPattern {
        kind: MatchKind::Prefix("._"),
        origin: JunkOrigin::MacResourceFork,
    },
];

static BUILTIN_REGISTRY: LazyLock<JunkPatternRegistry> = LazyLock::new(JunkPatternRegistry::default);

impl Default for JunkPatternRegistry {
    fn default() -> Self {
        Self {
            builtins: BUILTIN_PATTERNS,
            custom: Vec::new(),
        }
    }
}

impl JunkPatternRegistry {
    /// Add exact names (e.g. from `package.extra_junk_names`).
    #[must_use]
    pub fn with_custom<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.custom.extend(
            names
                .into_iter()
                .map(|name| name.as_ref().trim().to_lowercase())
                .filter(|name| !name.is_empty()),
        );
        self
    }

    /// Classify one path by its file name.
    #[must_use]
    pub fn classify(&self, path: &Path) -> Option<JunkOrigin> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        for pattern in self.builtins {
            let hit = match pattern.kind {
                MatchKind::Exact(needle) => name == needle,
                // A bare "._" is not an AppleDouble companion.
                MatchKind::Prefix(needle) => name.len() > needle.len() && name.starts_with(needle),
            };
            if hit {
                return Some(pattern.origin);
            }
        }
        self.custom
            .iter()
            .any(|custom| *custom == name)
            .then_some(JunkOrigin::Configured)
    }

    #[must_use]
    pub fn is_junk(&self, path: &Path) -> bool {
        self.classify(path).is_some()
    }
}

/// Junk predicate over the built-in registry.
#[must_use]
pub fn is_junk(path: &Path) -> bool {
    BUILTIN_REGISTRY.is_junk(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_junk_in_any_case() {
        for name in [
            "Thumbs.db",
            "THUMBS.DB",
            "ehthumbs.db",
            ".DS_Store",
            ".ds_store",
            "Desktop.ini",
            "._0123456_001.tif",
        ] {
            assert!(is_junk(Path::new(name)), "{name} should be junk");
        }
    }

    #[test]
    fn masters_and_records_are_not_junk() {
        for name in [
            "0123456_001.jp2",
            "0123456_key.tif",
            "item_0123456.xml",
            "thumbs.db.bak",
            "_",
            "._",
        ] {
            assert!(!is_junk(Path::new(name)), "{name} should not be junk");
        }
    }

    #[test]
    fn classification_names_the_origin() {
        let registry = JunkPatternRegistry::default();
        assert_eq!(
            registry.classify(Path::new("/pkg/0123456/access/Thumbs.db")),
            Some(JunkOrigin::WindowsThumbnailCache)
        );
        assert_eq!(
            registry.classify(Path::new("/pkg/._item.xml")),
            Some(JunkOrigin::MacResourceFork)
        );
        assert_eq!(registry.classify(Path::new("/pkg/0123456")), None);
    }

    #[test]
    fn only_the_file_name_is_matched() {
        assert!(!is_junk(Path::new("/pkg/thumbs.db/0123456_001.jp2")));
        assert!(!is_junk(Path::new("/")));
    }

    #[test]
    fn custom_names_extend_the_registry() {
        let registry = JunkPatternRegistry::default().with_custom(["Icon\r", "  ", "SyncToy.dat"]);
        assert_eq!(
            registry.classify(Path::new("/pkg/synctoy.DAT")),
            Some(JunkOrigin::Configured)
        );
        assert!(registry.is_junk(Path::new("/pkg/icon\r")));
        assert!(!registry.is_junk(Path::new("/pkg/0123456")));
        assert!(!is_junk(Path::new("/pkg/SyncToy.dat")));
    }
}
