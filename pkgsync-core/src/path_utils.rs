//! Shared path utilities for package discovery and destination computation.

use std::path::{Component, Path, PathBuf};

/// Finds `file_name` in `start` or the nearest ancestor that contains it.
///
/// Returns `None` when the filesystem root is reached without a match.
pub async fn find_upwards(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let candidate = dir.join(file_name);
        if let Ok(metadata) = tokio::fs::metadata(&candidate).await {
            if metadata.is_file() {
                return Some(candidate);
            }
        }
        current = dir.parent();
    }

    None
}

/// Joins `path` onto `base` unless it is already absolute, then normalizes.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexically removes `.` and `..` components without touching the filesystem.
///
/// Leading `..` components of a relative path are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Computes `path` relative to `base`, both taken lexically.
///
/// Walks up with `..` where `path` is not below `base`. If the two paths share
/// no root (e.g. different drive prefixes), `path` is returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path = normalize(path);
    let base = normalize(base);

    if path.has_root() != base.has_root() {
        return path;
    }

    let path_parts: Vec<Component<'_>> = path.components().filter(is_real).collect();
    let base_parts: Vec<Component<'_>> = base.components().filter(is_real).collect();

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (path_parts.first(), base_parts.first())
    {
        if a != b {
            return path;
        }
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

fn is_real(component: &Component<'_>) -> bool {
    !matches!(component, Component::CurDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_dots() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_to_walks_up() {
        assert_eq!(
            relative_to(Path::new("/repo/LICENSE"), Path::new("/repo")),
            PathBuf::from("LICENSE")
        );
        assert_eq!(
            relative_to(Path::new("/repo/LICENSE"), Path::new("/repo/docs")),
            PathBuf::from("../LICENSE")
        );
        assert_eq!(
            relative_to(Path::new("/repo"), Path::new("/repo")),
            PathBuf::from(".")
        );
    }
}
