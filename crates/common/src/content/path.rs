use std::path::{Component, Path, PathBuf};

use super::{ContentError, NAME_FILE};

/// Reduce a client-supplied file name to the basename stored on disk.
///
/// Both `/` and `\` count as separators. Any `..` component is a traversal
/// attempt and fails with [`ContentError::PathEscape`]; names that leave no
/// usable basename, or would shadow the sidecar, fail with
/// [`ContentError::InvalidFileName`].
pub fn storage_file_name(file_name: &str) -> Result<String, ContentError> {
    let mut base = "";
    for part in file_name.split(['/', '\\']) {
        if part == ".." {
            return Err(ContentError::PathEscape(file_name.to_string()));
        }
        base = part;
    }

    if base.is_empty() || base == "." || base == NAME_FILE || base.contains('\0') {
        return Err(ContentError::InvalidFileName(file_name.to_string()));
    }
    Ok(base.to_string())
}

/// Lexically clean `path`: drop `.` components and fold `..` into its
/// parent. `..` never climbs above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

/// Return the cleaned `path` if it lies strictly below `root`.
///
/// Comparison is component-wise, so `/data/uploads-evil` is not inside
/// `/data/uploads`.
pub fn ensure_descendant(root: &Path, path: &Path) -> Result<PathBuf, ContentError> {
    let cleaned = normalize(path);
    if cleaned != root && cleaned.starts_with(root) {
        Ok(cleaned)
    } else {
        Err(ContentError::PathEscape(path.display().to_string()))
    }
}
