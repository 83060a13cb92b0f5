//! Checkout-and-verify reconciliation
//!
//! Brings one module's working copy to its pinned commit: clone if the path
//! is absent (mirror first, canonical remote as fallback), then checkout
//! with a single fetch-and-retry when the pin is not yet local.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use super::remote::{fetch_remote, set_remote_url};
use super::{checkout, clone_repo, head_sha, open_repo, path_exists, GitError};
use crate::core::record::ModuleRecord;
use crate::util::Runner;

/// Remote bindings created on module clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteName {
    /// The canonical remote from the record's `url`
    Origin,
    /// The periodically refreshed mirror
    Mirror,
}

impl RemoteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteName::Origin => "origin",
            RemoteName::Mirror => "mirror",
        }
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where module mirrors live: a URL prefix or a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorBase {
    Url(String),
    Local(PathBuf),
}

impl MirrorBase {
    /// Anything with a scheme or host separator is a remote base,
    /// everything else a local directory.
    pub fn parse(base: &str) -> Self {
        if base.contains(':') {
            MirrorBase::Url(base.trim_end_matches('/').to_string())
        } else {
            MirrorBase::Local(PathBuf::from(base))
        }
    }

    /// Mirror location for one module.
    ///
    /// Remote bases append the module path directly. Local bases namespace
    /// mirrors by the last two path segments of the modules directory, the
    /// layout the mirror refresh job produces.
    pub fn locate(&self, root: &Path, module_path: &str) -> Result<String, std::io::Error> {
        match self {
            MirrorBase::Url(base) => Ok(format!("{}/{}", base, module_path)),
            MirrorBase::Local(base) => {
                let root = root.canonicalize()?;
                let segments: Vec<_> = root
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s),
                        _ => None,
                    })
                    .collect();
                let tail = &segments[segments.len().saturating_sub(2)..];
                let mut location = base.clone();
                for segment in tail {
                    location.push(segment);
                }
                location.push(module_path);
                Ok(location.to_string_lossy().into_owned())
            }
        }
    }
}

/// Terminal state of one module reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Working copy was already at the pin; nothing was touched.
    AlreadyPinned,
    /// Fresh clone, checked out at the pin.
    Cloned { from: RemoteName },
    /// Existing working copy moved to the pin.
    CheckedOut { fetched: bool },
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileOutcome::AlreadyPinned => f.write_str("already pinned"),
            ReconcileOutcome::Cloned { from } => write!(f, "cloned from {}", from),
            ReconcileOutcome::CheckedOut { fetched: true } => {
                f.write_str("fetched and checked out")
            }
            ReconcileOutcome::CheckedOut { fetched: false } => f.write_str("checked out"),
        }
    }
}

/// Bring a module's working copy to its pinned commit.
///
/// Absent path: clone from the mirror when one is configured, falling back
/// to the canonical remote on any mirror failure. Present path: checkout
/// directly, with one fetch-and-retry when the pin is unknown locally. A
/// second checkout failure is fatal for this module.
pub fn reconcile(
    runner: &Runner,
    record: &ModuleRecord,
    root: &Path,
    mirrors: Option<&MirrorBase>,
) -> Result<ReconcileOutcome, GitError> {
    let worktree = record.worktree(root);

    if path_exists(&worktree) {
        if let Ok(repo) = open_repo(&worktree) {
            if let Ok(head) = head_sha(&repo) {
                if head == record.sha1 {
                    debug!(module = %record.name, "already at pin");
                    return Ok(ReconcileOutcome::AlreadyPinned);
                }
            }
        }
        let fetched = checkout_with_retry(
            runner,
            &worktree,
            &record.sha1,
            RemoteName::Origin,
            &record.url,
        )?;
        return Ok(ReconcileOutcome::CheckedOut { fetched });
    }

    if let Some(mirrors) = mirrors {
        let location = mirrors.locate(root, &record.path)?;
        match clone_and_pin(runner, &location, &worktree, RemoteName::Mirror, &record.sha1) {
            Ok(()) => {
                // The mirror served the clone; bind the canonical remote
                // alongside it for later fetches.
                set_remote_url(runner, &worktree, RemoteName::Origin.as_str(), &record.url)?;
                return Ok(ReconcileOutcome::Cloned {
                    from: RemoteName::Mirror,
                });
            }
            Err(err) => {
                // Mirrors refresh periodically and lag the canonical remote.
                warn!(
                    module = %record.name,
                    mirror = %location,
                    error = %err,
                    "mirror clone failed, falling back to origin"
                );
                if worktree.exists() {
                    std::fs::remove_dir_all(&worktree)?;
                }
            }
        }
    }

    clone_and_pin(
        runner,
        &record.url,
        &worktree,
        RemoteName::Origin,
        &record.sha1,
    )?;
    Ok(ReconcileOutcome::Cloned {
        from: RemoteName::Origin,
    })
}

/// Clone and move to the pin, fetching once if the commit is not yet local.
pub(crate) fn clone_and_pin(
    runner: &Runner,
    url: &str,
    dest: &Path,
    remote: RemoteName,
    sha1: &str,
) -> Result<(), GitError> {
    clone_repo(runner, url, dest, remote.as_str())?;
    checkout_with_retry(runner, dest, sha1, remote, url)?;
    Ok(())
}

/// Checkout that treats an unknown revision as a stale clone: rebind the
/// remote, fetch it, and try exactly once more.
fn checkout_with_retry(
    runner: &Runner,
    worktree: &Path,
    sha1: &str,
    remote: RemoteName,
    url: &str,
) -> Result<bool, GitError> {
    match checkout(runner, worktree, sha1) {
        Ok(()) => Ok(false),
        Err(first) => {
            debug!(error = %first, remote = %remote, "checkout failed, fetching and retrying");
            set_remote_url(runner, worktree, remote.as_str(), url)?;
            fetch_remote(runner, worktree, remote.as_str())?;
            checkout(runner, worktree, sha1)?;
            Ok(true)
        }
    }
}
