//! Pin publication checks
//!
//! A pinned commit is only safe to record if other clones can reach it.
//! The fast tier asks the existing working copy whether a tracking branch
//! contains the pin; the slow tier proves it by cloning fresh into a
//! scratch directory and checking the pin out there.

use std::fmt;
use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use super::reconcile::{clone_and_pin, RemoteName};
use super::remote::remote_branches_containing;
use super::GitError;
use crate::core::record::ModuleRecord;
use crate::util::Runner;

/// Which remotes count as publication when a tracking branch contains
/// the pin.
#[derive(Debug, Clone)]
pub struct VerifyPolicy {
    pub remotes: Vec<String>,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        VerifyPolicy {
            remotes: vec!["origin".to_string(), "mirror".to_string()],
        }
    }
}

impl VerifyPolicy {
    fn accepts(&self, remote: &str) -> bool {
        self.remotes.iter().any(|r| r == remote)
    }
}

/// Which tier confirmed the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// A tracking branch of an accepted remote contains the pin.
    Fast,
    /// A fresh clone reached the pin.
    Slow,
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Fast => f.write_str("reachable from a tracking branch"),
            Verification::Slow => f.write_str("confirmed by fresh clone"),
        }
    }
}

/// Confirm a pin is published, trying the fast tier first.
pub fn verify_pin(
    runner: &Runner,
    root: &Path,
    record: &ModuleRecord,
    sha1: &str,
    policy: &VerifyPolicy,
) -> Result<Verification, GitError> {
    if verify_fast(runner, &record.worktree(root), sha1, policy) {
        return Ok(Verification::Fast);
    }
    debug!(module = %record.name, %sha1, "no tracking branch contains pin, cloning to verify");
    verify_slow(runner, record, sha1)?;
    Ok(Verification::Slow)
}

/// Tracking-branch containment in the existing working copy. Errors count
/// as not-verified so the slow tier gets its turn.
pub fn verify_fast(runner: &Runner, worktree: &Path, sha1: &str, policy: &VerifyPolicy) -> bool {
    match remote_branches_containing(runner, worktree, sha1) {
        Ok(branches) => branches.iter().any(|b| policy.accepts(&b.remote)),
        Err(err) => {
            debug!(%sha1, error = %err, "containment query failed");
            false
        }
    }
}

/// Full proof: clone the canonical remote into a scratch directory and
/// check the pin out there. The scratch clone is removed on drop.
pub fn verify_slow(runner: &Runner, record: &ModuleRecord, sha1: &str) -> Result<(), GitError> {
    let scratch = TempDir::new()?;
    let dest = scratch.path().join(&record.name);
    clone_and_pin(runner, &record.url, &dest, RemoteName::Origin, sha1).map_err(|source| {
        GitError::NotPublished {
            sha1: sha1.to_string(),
            source: Box::new(source),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .unwrap_or_else(|e| panic!("failed to run git {:?}: {}", args, e));
        assert!(
            output.status.success(),
            "git {:?} failed in {}: {}",
            args,
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn git_stdout(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn setup_module(temp: &TempDir) -> (ModuleRecord, String) {
        let bare_path = temp.path().join("remote.git");
        git(
            temp.path(),
            &["init", "--bare", "-b", "main", bare_path.to_str().unwrap()],
        );

        let worktree = temp.path().join("mod");
        fs::create_dir_all(&worktree).unwrap();
        git(&worktree, &["init", "-b", "main"]);
        git(&worktree, &["config", "user.email", "test@example.com"]);
        git(&worktree, &["config", "user.name", "Test User"]);
        fs::write(worktree.join("README.md"), "# Test").unwrap();
        git(&worktree, &["add", "README.md"]);
        git(&worktree, &["commit", "-m", "Initial commit"]);
        git(
            &worktree,
            &[
                "remote",
                "add",
                "origin",
                &format!("file://{}", bare_path.display()),
            ],
        );
        git(&worktree, &["push", "-u", "origin", "main"]);

        let sha = git_stdout(&worktree, &["rev-parse", "HEAD"]);
        let record = ModuleRecord {
            name: "mod".to_string(),
            url: format!("file://{}", bare_path.display()),
            path: "mod".to_string(),
            sha1: sha.clone(),
            extras: BTreeMap::new(),
        };
        (record, sha)
    }

    #[test]
    fn test_verify_pushed_commit_passes_fast() {
        let temp = TempDir::new().unwrap();
        let (record, sha) = setup_module(&temp);

        let tier = verify_pin(
            &Runner::default(),
            temp.path(),
            &record,
            &sha,
            &VerifyPolicy::default(),
        )
        .unwrap();
        assert_eq!(tier, Verification::Fast);
    }

    #[test]
    fn test_verify_unpushed_commit_fails_both_tiers() {
        let temp = TempDir::new().unwrap();
        let (record, _) = setup_module(&temp);

        let worktree = temp.path().join("mod");
        fs::write(worktree.join("local.txt"), "never pushed").unwrap();
        git(&worktree, &["add", "local.txt"]);
        git(&worktree, &["commit", "-m", "Local only"]);
        let unpushed = git_stdout(&worktree, &["rev-parse", "HEAD"]);

        let err = verify_pin(
            &Runner::default(),
            temp.path(),
            &record,
            &unpushed,
            &VerifyPolicy::default(),
        )
        .unwrap_err();
        match err {
            GitError::NotPublished { sha1, .. } => assert_eq!(sha1, unpushed),
            other => panic!("expected NotPublished, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_policy_rejects_unlisted_remote() {
        let temp = TempDir::new().unwrap();
        let (record, sha) = setup_module(&temp);

        let policy = VerifyPolicy {
            remotes: vec!["upstream".to_string()],
        };
        let worktree = temp.path().join("mod");
        assert!(!verify_fast(&Runner::default(), &worktree, &sha, &policy));

        // The slow tier still proves publication against the canonical remote.
        let tier = verify_pin(&Runner::default(), temp.path(), &record, &sha, &policy).unwrap();
        assert_eq!(tier, Verification::Slow);
    }
}
