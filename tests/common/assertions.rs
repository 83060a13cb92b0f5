//! Custom assertion helpers for gitpin integration tests.

use std::path::Path;

use super::git_helpers;

/// Assert that a working copy's HEAD sits at the expected commit.
pub fn assert_head_at(repo_path: &Path, expected: &str) {
    let actual = git_helpers::get_head_sha(repo_path);
    assert_eq!(
        actual,
        expected,
        "Expected repo at {} to be at {}, but was at {}",
        repo_path.display(),
        expected,
        actual
    );
}

/// Assert that a file exists at the given path.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

/// Assert that a file does NOT exist at the given path.
pub fn assert_file_not_exists(path: &Path) {
    assert!(
        !path.exists(),
        "Expected file to NOT exist: {}",
        path.display()
    );
}
