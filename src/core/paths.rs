//! Path helpers shared by the scanner, the shadow cloner and the CLI.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a package root to an absolute, normalized path.
///
/// Existing paths are canonicalized. Paths that do not exist (yet) are joined
/// onto the working directory and `.`/`..` are folded syntactically, so a
/// missing root still reports a readable location.
pub fn resolve_root(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    if let Ok(canonical) = std::fs::canonicalize(&absolute) {
        return canonical;
    }
    fold_components(&absolute)
}

/// True when `candidate` equals `ancestor` or lies beneath it.
///
/// Both paths are resolved first; used to refuse cloning a package into itself.
pub fn is_within(candidate: &Path, ancestor: &Path) -> bool {
    resolve_root(candidate).starts_with(resolve_root(ancestor))
}

/// File name of `path` as UTF-8, lossily converted. Empty for `/` or `..`.
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn fold_components(path: &Path) -> PathBuf {
    let mut kept: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(kept.last(), Some(Component::Normal(_))) {
                    kept.pop();
                }
            }
            other => kept.push(other),
        }
    }
    kept.into_iter().collect()
}
