//! Module records and pin bookkeeping

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// One vendored git repository, as described by its INI record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    /// Module name (the record's filename stem)
    pub name: String,
    /// Canonical remote URL (SSH, HTTPS, or file)
    pub url: String,
    /// Working-copy location relative to the modules directory
    pub path: String,
    /// Pinned commit, 40 hex digits
    pub sha1: String,
    /// Unrecognized keys, preserved across rewrites
    pub extras: BTreeMap<String, String>,
}

impl ModuleRecord {
    /// Working-copy location resolved against the modules directory.
    pub fn worktree(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }

    /// Copy of this record with the pin replaced.
    pub fn with_sha1(&self, sha1: &str) -> Self {
        Self {
            sha1: sha1.to_string(),
            ..self.clone()
        }
    }
}

/// A module whose working copy has moved off its recorded pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// Module name
    pub name: String,
    /// Pin currently recorded in the centralized system
    pub old_sha1: String,
    /// Commit the working copy actually sits at
    pub new_sha1: String,
}

/// True for a full 40-digit hex commit id.
pub fn is_full_sha1(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

static LISTING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<sha1>\w+)\s+(?P<name>\S+)").expect("listing regex"));

/// Parse `git submodule status` output into a name-to-commit map.
///
/// Lines look like ` 5d52773... DALIGNER (heads/master)`. The leading status
/// character (space, `+`, `-`) and the trailing ref hint are ignored; lines
/// that don't carry a commit and a name are skipped.
pub fn parse_submodule_listing(listing: &str) -> BTreeMap<String, String> {
    let mut sha1s = BTreeMap::new();
    for line in listing.lines() {
        if let Some(caps) = LISTING_LINE.captures(line) {
            sha1s.insert(caps["name"].to_string(), caps["sha1"].to_string());
        }
    }
    sha1s
}
