//! Git operations wrapper
//!
//! Local read-only queries (repo validity, HEAD) go through git2. Everything
//! that touches the network or moves a working copy shells out to the git
//! CLI through [`Runner`], which owns working-directory and timeout
//! handling.

pub mod reconcile;
pub mod remote;
pub mod verify;

pub use reconcile::{reconcile, MirrorBase, ReconcileOutcome, RemoteName};
pub use remote::{fetch_remote, remote_branches_containing, set_remote_url, RemoteBranch};
pub use verify::{verify_fast, verify_pin, Verification, VerifyPolicy};

use std::path::Path;

use git2::Repository;
use thiserror::Error;

use crate::core::record::{ModuleRecord, PendingChange};
use crate::util::{Captured, Runner};

/// Errors that can occur during git operations
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("commit {sha1} is not published on any known remote")]
    NotPublished {
        sha1: String,
        #[source]
        source: Box<GitError>,
    },
}

/// Build a [`GitError::CommandFailed`] from a finished git invocation.
pub(crate) fn command_failed(args: &[&str], captured: &Captured) -> GitError {
    GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        stderr: captured.stderr.trim().to_string(),
    }
}

/// Open a git repository at the given path
pub fn open_repo<P: AsRef<Path>>(path: P) -> Result<Repository, GitError> {
    Repository::open(path.as_ref())
        .map_err(|e| GitError::NotARepo(format!("{}: {}", path.as_ref().display(), e)))
}

/// Check if a path is a git repository
pub fn is_git_repo<P: AsRef<Path>>(path: P) -> bool {
    Repository::open(path.as_ref()).is_ok()
}

/// Check if a path exists
pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}

/// Commit id the working copy currently sits at.
pub fn head_sha(repo: &Repository) -> Result<String, GitError> {
    let head = repo.head()?;
    let commit = head.peel_to_commit()?;
    Ok(commit.id().to_string())
}

/// Clone `url` into `dest` with the origin remote bound under `remote_name`.
pub fn clone_repo(
    runner: &Runner,
    url: &str,
    dest: &Path,
    remote_name: &str,
) -> Result<(), GitError> {
    // git resolves the clone target against the child cwd, so hand it only
    // the final path component; the full dest would resolve a relative path
    // twice.
    let cwd = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(cwd)?;
    let target = dest.file_name().map(Path::new).unwrap_or(dest);
    let target = target.to_string_lossy();
    let args = ["clone", "--origin", remote_name, url, target.as_ref()];

    let out = runner.run("git", args, cwd)?;
    if !out.success() {
        return Err(command_failed(&args, &out));
    }
    Ok(())
}

/// Move the working copy to `revision` (detached).
pub fn checkout(runner: &Runner, worktree: &Path, revision: &str) -> Result<(), GitError> {
    let args = ["checkout", revision];
    let out = runner.run("git", args, worktree)?;
    if !out.success() {
        return Err(command_failed(&args, &out));
    }
    Ok(())
}

/// Compare a module's working-copy HEAD against its recorded pin.
///
/// `None` means the pin is current; no side effects either way.
pub fn detect_drift(
    record: &ModuleRecord,
    root: &Path,
) -> Result<Option<PendingChange>, GitError> {
    let worktree = record.worktree(root);
    let repo = open_repo(&worktree)?;
    let head = head_sha(&repo)?;
    if head == record.sha1 {
        return Ok(None);
    }
    Ok(Some(PendingChange {
        name: record.name.clone(),
        old_sha1: record.sha1.clone(),
        new_sha1: head,
    }))
}
