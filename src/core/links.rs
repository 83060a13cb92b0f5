//! Hosting links: tree URLs for the manifest and compare URLs for review

use crate::core::record::ModuleRecord;

/// Owner/repo pair extracted from a module URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

/// Parse a module URL to extract owner and repo.
///
/// Handles scp-like SSH (`git@host:owner/repo.git`), HTTP(S), and `file://`
/// URLs (used in testing with local bare remotes, owner becomes `local`).
pub fn parse_repo_url(url: &str) -> Option<RepoSlug> {
    // SSH URLs: git@github.com:owner/repo.git
    if url.starts_with("git@") {
        let (_, path) = url.split_once(':')?;
        let path = path.trim_end_matches(".git");
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() >= 2 {
            return Some(RepoSlug {
                owner: segments[0].to_string(),
                repo: segments[segments.len() - 1].to_string(),
            });
        }
    }

    // HTTPS URLs: https://github.com/owner/repo.git
    if url.starts_with("https://") || url.starts_with("http://") {
        let url_without_proto = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let path = url_without_proto.split_once('/')?.1.trim_end_matches(".git");
        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() >= 2 {
            return Some(RepoSlug {
                owner: segments[0].to_string(),
                repo: segments[segments.len() - 1].to_string(),
            });
        }
    }

    // file:// URLs (local bare repos)
    if url.starts_with("file://") {
        let path = url.trim_start_matches("file://").trim_end_matches(".git");
        if let Some(name) = path.rsplit('/').next() {
            if !name.is_empty() {
                return Some(RepoSlug {
                    owner: "local".to_string(),
                    repo: name.to_string(),
                });
            }
        }
    }

    None
}

/// Browse-at-commit URL for a module's pin.
pub fn tree_url(record: &ModuleRecord) -> Option<String> {
    let slug = parse_repo_url(&record.url)?;
    Some(format!(
        "https://github.com/{}/{}/tree/{}",
        slug.owner, slug.repo, record.sha1
    ))
}

/// Two-commit comparison URL for a pin move, for the submit message.
pub fn compare_url(record: &ModuleRecord, old_sha1: &str, new_sha1: &str) -> Option<String> {
    let slug = parse_repo_url(&record.url)?;
    Some(format!(
        "https://github.com/{}/{}/compare/{}...{}",
        slug.owner, slug.repo, old_sha1, new_sha1
    ))
}

/// Manifest body: every module's tree URL, sorted, one per line.
pub fn manifest_text<'a>(records: impl Iterator<Item = &'a ModuleRecord>) -> String {
    let mut urls: Vec<String> = records.filter_map(tree_url).collect();
    urls.sort();
    let mut text = urls.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }
    text
}
