use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use pkgsync_core::copy::{
    destination_path, overwrite_reason, same_file_reason, CopyOptions, CopyResult, FileSync,
};
use pkgsync_core::error::{Error, Result};
use pkgsync_core::locator::LocatedPackages;
use pkgsync_core::summary::{summarize_copies, CopyTally, Summary};

fn setup_repo(packages: &[&str]) -> (TempDir, LocatedPackages) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::write(root.join("LICENSE"), "MIT License\n").unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(root.join("docs/GUIDE.md"), "# Guide\n").unwrap();

    let dirs = packages
        .iter()
        .map(|name| {
            let dir = root.join("packages").join(name);
            fs::create_dir_all(&dir).unwrap();
            dir
        })
        .collect();

    let located = LocatedPackages {
        base: root.to_path_buf(),
        dirs,
    };
    (temp_dir, located)
}

fn file_sync(root: &Path, force: bool, dry_run: bool) -> FileSync {
    FileSync::new(CopyOptions {
        force,
        dry_run,
        invocation_dir: root.to_path_buf(),
    })
}

async fn run(sync: &FileSync, patterns: &[&str], located: &LocatedPackages) -> Vec<CopyResult> {
    let mut stream = sync.sync_files(patterns, located).unwrap();
    let mut results = Vec::new();
    while let Some(item) = stream.recv().await {
        results.push(item.unwrap());
    }
    results
}

#[tokio::test]
async fn test_copy_to_every_package() {
    let (temp_dir, located) = setup_repo(&["a", "b", "c"]);
    let sync = file_sync(temp_dir.path(), false, false);

    let results = run(&sync, &["LICENSE"], &located).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(CopyResult::is_success));
    let packages: Vec<&Path> = results.iter().map(CopyResult::package).collect();
    assert_eq!(packages, located.dirs.iter().map(PathBuf::as_path).collect::<Vec<_>>());

    for name in ["a", "b", "c"] {
        let copied = temp_dir.path().join("packages").join(name).join("LICENSE");
        assert_eq!(fs::read_to_string(copied).unwrap(), "MIT License\n");
    }

    let mut tally = CopyTally::new();
    results.iter().for_each(|result| tally.record(result));
    assert_eq!(
        tally.finish(),
        vec![Summary::Success("Copied 1 file(s) to 3 package(s)".to_string())]
    );
}

#[tokio::test]
async fn test_nested_source_keeps_relative_position() {
    let (temp_dir, located) = setup_repo(&["a"]);
    let sync = file_sync(temp_dir.path(), false, false);

    let results = run(&sync, &["docs/*.md"], &located).await;
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].to(),
        temp_dir.path().join("packages/a/docs/GUIDE.md")
    );
    assert!(temp_dir.path().join("packages/a/docs/GUIDE.md").is_file());
}

#[tokio::test]
async fn test_existing_file_is_not_overwritten() {
    let (temp_dir, located) = setup_repo(&["a", "b"]);
    let existing = temp_dir.path().join("packages/a/LICENSE");
    fs::write(&existing, "custom\n").unwrap();

    let sync = file_sync(temp_dir.path(), false, false);
    let results = run(&sync, &["LICENSE"], &located).await;

    let failed: Vec<&CopyResult> = results.iter().filter(|r| !r.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].to(), existing.as_path());
    assert_eq!(
        failed[0].failure_reason(),
        Some(overwrite_reason(&existing).as_str())
    );
    assert!(failed[0]
        .failure_reason()
        .unwrap()
        .ends_with("; force required"));

    assert_eq!(fs::read_to_string(&existing).unwrap(), "custom\n");
    assert!(temp_dir.path().join("packages/b/LICENSE").is_file());
}

#[tokio::test]
async fn test_force_overwrites() {
    let (temp_dir, located) = setup_repo(&["a"]);
    let existing = temp_dir.path().join("packages/a/LICENSE");
    fs::write(&existing, "custom\n").unwrap();

    let sync = file_sync(temp_dir.path(), true, false);
    let results = run(&sync, &["LICENSE"], &located).await;

    assert!(results[0].is_success());
    assert_eq!(fs::read_to_string(&existing).unwrap(), "MIT License\n");
}

#[tokio::test]
async fn test_root_listed_as_package_keeps_source_intact() {
    let (temp_dir, mut located) = setup_repo(&["a"]);
    let root = temp_dir.path().to_path_buf();
    located.dirs.insert(0, root.clone());

    for (force, dry_run) in [(true, false), (false, false), (true, true)] {
        let sync = file_sync(&root, force, dry_run);
        let results = run(&sync, &["LICENSE"], &located).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].to(), root.join("LICENSE"));
        assert!(!results[0].is_success());
        assert_eq!(
            results[0].failure_reason(),
            Some(same_file_reason(&root.join("LICENSE")).as_str())
        );
        assert_eq!(fs::read_to_string(root.join("LICENSE")).unwrap(), "MIT License\n");
    }

    assert_eq!(
        fs::read_to_string(root.join("packages/a/LICENSE")).unwrap(),
        "MIT License\n"
    );
}

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let (temp_dir, located) = setup_repo(&["a", "b"]);
    let existing = temp_dir.path().join("packages/a/LICENSE");
    fs::write(&existing, "custom\n").unwrap();

    let sync = file_sync(temp_dir.path(), false, true);
    let results = run(&sync, &["LICENSE"], &located).await;

    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);
    assert_eq!(results.iter().filter(|r| !r.is_success()).count(), 1);
    assert_eq!(fs::read_to_string(&existing).unwrap(), "custom\n");
    assert!(!temp_dir.path().join("packages/b/LICENSE").exists());

    let forced = file_sync(temp_dir.path(), true, true);
    let results = run(&forced, &["LICENSE"], &located).await;
    assert!(results.iter().all(CopyResult::is_success));
    assert_eq!(fs::read_to_string(&existing).unwrap(), "custom\n");
}

#[tokio::test]
async fn test_summary_counts_files_and_total_copies() {
    let (temp_dir, located) = setup_repo(&["a", "b"]);
    fs::write(temp_dir.path().join("packages/b/LICENSE"), "custom\n").unwrap();

    let sync = file_sync(temp_dir.path(), false, false);
    let stream = sync.sync_files(&["LICENSE", "docs/GUIDE.md"], &located).unwrap();
    let summaries = summarize_copies(stream).await.unwrap();

    assert_eq!(
        summaries,
        vec![
            Summary::Success("Copied 2 file(s) to 3 package(s)".to_string()),
            Summary::Failure(
                "Failed to copy 1 file(s) to 1 package(s); see verbose output".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_no_packages_copies_nothing() {
    let (temp_dir, _) = setup_repo(&[]);
    let located = LocatedPackages {
        base: temp_dir.path().to_path_buf(),
        dirs: Vec::new(),
    };

    let sync = file_sync(temp_dir.path(), false, false);
    let summaries = summarize_copies(sync.sync_files(&["LICENSE"], &located).unwrap())
        .await
        .unwrap();
    assert_eq!(summaries, vec![Summary::Noop("No files copied.".to_string())]);
}

#[test]
fn test_unmatched_pattern_fails_before_copying() {
    let (temp_dir, located) = setup_repo(&["a"]);
    let sync = file_sync(temp_dir.path(), false, false);

    let err: Result<Vec<CopyResult>> = sync.plan(&["LICENSE", "NOPE*"], &located);
    match err {
        Err(Error::NoFilesMatched { pattern }) => assert_eq!(pattern, "NOPE*"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!temp_dir.path().join("packages/a/LICENSE").exists());

    let empty: &[&str] = &[];
    assert!(matches!(sync.plan(empty, &located), Err(Error::NoSourceFiles)));
}

#[test]
fn test_plan_order_is_file_then_package() {
    let (temp_dir, located) = setup_repo(&["a", "b"]);
    let sync = file_sync(temp_dir.path(), false, false);

    let plan = sync.plan(&["LICENSE", "docs/GUIDE.md"], &located).unwrap();
    let targets: Vec<PathBuf> = plan
        .iter()
        .map(|r| r.to().strip_prefix(temp_dir.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        targets,
        vec![
            PathBuf::from("packages/a/LICENSE"),
            PathBuf::from("packages/b/LICENSE"),
            PathBuf::from("packages/a/docs/GUIDE.md"),
            PathBuf::from("packages/b/docs/GUIDE.md"),
        ]
    );
}

#[test]
fn test_destination_does_not_depend_on_invocation_dir_for_absolute_inputs() {
    let source = Path::new("/repo/docs/GUIDE.md");
    let package = Path::new("/repo/packages/a");
    let base = Path::new("/repo");

    let here = destination_path(source, package, base, Path::new("/repo"));
    let there = destination_path(source, package, base, Path::new("/tmp/elsewhere"));
    assert_eq!(here, there);
    assert_eq!(here, PathBuf::from("/repo/packages/a/docs/GUIDE.md"));
}

#[test]
fn test_relative_inputs_resolve_against_invocation_dir() {
    let to = destination_path(
        Path::new("LICENSE"),
        Path::new("packages/a"),
        Path::new("."),
        Path::new("/repo"),
    );
    assert_eq!(to, PathBuf::from("/repo/packages/a/LICENSE"));
}
