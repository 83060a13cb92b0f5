//! Git remote operations

use std::path::Path;

use super::{command_failed, GitError};
use crate::util::Runner;

/// Get the URL of a remote, `None` when the remote does not exist.
pub fn get_remote_url(
    runner: &Runner,
    worktree: &Path,
    remote: &str,
) -> Result<Option<String>, GitError> {
    let out = runner.run("git", ["remote", "get-url", remote], worktree)?;
    if out.success() {
        Ok(Some(out.stdout.trim().to_string()))
    } else {
        Ok(None)
    }
}

/// Set the URL of a remote (creates it if it doesn't exist).
pub fn set_remote_url(
    runner: &Runner,
    worktree: &Path,
    remote: &str,
    url: &str,
) -> Result<(), GitError> {
    // The add may lose a race with an existing binding; set-url below is
    // what has to stick.
    if get_remote_url(runner, worktree, remote)?.is_none() {
        runner.run("git", ["remote", "add", remote, url], worktree)?;
    }
    let args = ["remote", "set-url", remote, url];
    let out = runner.run("git", args, worktree)?;
    if !out.success() {
        return Err(command_failed(&args, &out));
    }
    Ok(())
}

/// Fetch from a remote.
pub fn fetch_remote(runner: &Runner, worktree: &Path, remote: &str) -> Result<(), GitError> {
    let args = ["fetch", remote];
    let out = runner.run("git", args, worktree)?;
    if !out.success() {
        return Err(command_failed(&args, &out));
    }
    Ok(())
}

/// One `remote/branch` entry from a tracking-branch listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub remote: String,
    pub branch: String,
}

/// Tracking branches whose history contains `sha1`.
///
/// Parses `git branch -r --contains`; symref lines such as
/// `origin/HEAD -> origin/main` are skipped. Fails when the commit is not
/// present in the local object store at all.
pub fn remote_branches_containing(
    runner: &Runner,
    worktree: &Path,
    sha1: &str,
) -> Result<Vec<RemoteBranch>, GitError> {
    let args = ["branch", "-r", "--contains", sha1];
    let out = runner.run("git", args, worktree)?;
    if !out.success() {
        return Err(command_failed(&args, &out));
    }

    let mut branches = Vec::new();
    for line in out.stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("->") {
            continue;
        }
        if let Some((remote, branch)) = line.split_once('/') {
            branches.push(RemoteBranch {
                remote: remote.to_string(),
                branch: branch.to_string(),
            });
        }
    }
    Ok(branches)
}
