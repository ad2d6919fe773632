use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use pkgsync_core::error::Error;
use pkgsync_core::glob::{expand_dirs, expand_files, EntryKind, GlobPattern};

fn setup_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for dir in [
        "packages/a",
        "packages/b",
        "packages/internal-c",
        "packages/a/node_modules/dep",
        "tools/cli",
        "docs/guides",
    ] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    for file in [
        "LICENSE",
        "README.md",
        "docs/intro.md",
        "docs/guides/setup.md",
        "packages/a/node_modules/dep/README.md",
    ] {
        fs::write(root.join(file), "x").unwrap();
    }
    temp_dir
}

fn relative(temp_dir: &TempDir, paths: Vec<PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| {
            p.strip_prefix(temp_dir.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn test_expand_literal_file() {
    let temp_dir = setup_tree();
    let files = expand_files("LICENSE", temp_dir.path()).unwrap();
    assert_eq!(relative(&temp_dir, files), vec!["LICENSE"]);

    assert!(expand_files("MISSING", temp_dir.path()).unwrap().is_empty());
}

#[test]
fn test_literal_pattern_respects_entry_kind() {
    let temp_dir = setup_tree();
    assert!(expand_files("docs", temp_dir.path()).unwrap().is_empty());

    let glob = GlobPattern::new("docs").unwrap();
    assert_eq!(glob.expand(temp_dir.path(), EntryKind::Directory).len(), 1);
}

#[test]
fn test_globstar_skips_node_modules() {
    let temp_dir = setup_tree();
    let files = expand_files("**/*.md", temp_dir.path()).unwrap();
    assert_eq!(
        relative(&temp_dir, files),
        vec!["README.md", "docs/guides/setup.md", "docs/intro.md"]
    );
}

#[test]
fn test_brace_alternatives() {
    let temp_dir = setup_tree();
    let files = expand_files("{LICENSE,README.md}", temp_dir.path()).unwrap();
    assert_eq!(relative(&temp_dir, files), vec!["LICENSE", "README.md"]);
}

#[test]
fn test_expand_dirs_with_negation() {
    let temp_dir = setup_tree();
    let dirs = expand_dirs(
        &["packages/*", "tools/*", "!packages/internal-*"],
        temp_dir.path(),
    )
    .unwrap();
    assert_eq!(
        relative(&temp_dir, dirs),
        vec!["packages/a", "packages/b", "tools/cli"]
    );
}

#[test]
fn test_expand_dirs_dedupes_overlapping_patterns() {
    let temp_dir = setup_tree();
    let dirs = expand_dirs(&["packages/*", "packages/a", "./packages/b/"], temp_dir.path()).unwrap();
    assert_eq!(
        relative(&temp_dir, dirs),
        vec!["packages/a", "packages/b", "packages/internal-c"]
    );
}

#[test]
fn test_absolute_pattern() {
    let temp_dir = setup_tree();
    let pattern = format!("{}/packages/*", temp_dir.path().display());
    let dirs = expand_dirs(&[pattern], Path::new("/nowhere")).unwrap();
    assert_eq!(dirs.len(), 3);
    assert!(dirs.iter().all(|d| d.starts_with(temp_dir.path())));
}

#[test]
fn test_invalid_pattern() {
    let err = expand_files("{a,b", Path::new(".")).unwrap_err();
    assert!(matches!(err, Error::InvalidGlob { .. }));
}

#[test]
fn test_wildcards_do_not_match_dot_entries() {
    let temp_dir = setup_tree();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("packages/.cache")).unwrap();
    fs::create_dir_all(root.join(".github")).unwrap();
    fs::write(root.join(".github/notes.md"), "x").unwrap();
    fs::write(root.join(".npmrc"), "x").unwrap();

    let dirs = expand_dirs(&["packages/*"], root).unwrap();
    assert_eq!(
        relative(&temp_dir, dirs),
        vec!["packages/a", "packages/b", "packages/internal-c"]
    );

    let files = expand_files("**/*.md", root).unwrap();
    assert!(!relative(&temp_dir, files).contains(&".github/notes.md".to_string()));
    assert!(expand_files("*rc", root).unwrap().is_empty());

    let dotted = expand_files(".github/*.md", root).unwrap();
    assert_eq!(relative(&temp_dir, dotted), vec![".github/notes.md"]);
    assert_eq!(expand_files(".npmrc", root).unwrap().len(), 1);
}
