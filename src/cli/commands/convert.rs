//! Convert command implementation
//!
//! Turns a repository's `.gitmodules` plus its `git submodule status`
//! listing into one module record per submodule, opened for add in p4.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use ini::Ini;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::cli::context::RunContext;
use crate::cli::output::Output;
use crate::core::record::{parse_submodule_listing, ModuleRecord};
use crate::core::store;

/// One `[submodule "..."]` section of a `.gitmodules` file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Submodule {
    url: String,
    path: String,
    extras: BTreeMap<String, String>,
}

/// Run the convert command
pub fn run_convert(ctx: &RunContext, repo: &Path) -> anyhow::Result<()> {
    let gitmodules = repo.join(".gitmodules");
    let content = std::fs::read_to_string(&gitmodules)
        .with_context(|| format!("reading {}", gitmodules.display()))?;
    let submodules = parse_gitmodules(&content)?;

    let out = ctx.runner.run("git", ["submodule", "status"], repo)?;
    if !out.success() {
        anyhow::bail!("`git submodule status` failed: {}", out.stderr.trim());
    }
    let sha1s = parse_submodule_listing(&out.stdout);

    if !submodules.keys().eq(sha1s.keys()) {
        anyhow::bail!(
            "submodule sections {:?} do not match the status listing {:?}",
            submodules.keys().collect::<Vec<_>>(),
            sha1s.keys().collect::<Vec<_>>()
        );
    }

    Output::header(&format!("Converting {} submodules...", submodules.len()));
    println!();

    let mut written = Vec::new();
    for (name, sub) in &submodules {
        let sha1 = sha1s
            .get(name)
            .with_context(|| format!("no listing entry for submodule {}", name))?;
        let record = ModuleRecord {
            name: name.clone(),
            url: sub.url.clone(),
            path: sub.path.clone(),
            sha1: sha1.clone(),
            extras: sub.extras.clone(),
        };

        let file = format!("{}.ini", name);
        store::write_record(&ctx.root().join(&file), &record)?;
        Output::success(&format!("{}: pinned at {}", name, record.sha1));
        written.push(file);
    }

    if !written.is_empty() {
        ctx.p4().add(ctx.root(), &written)?;
    }

    println!();
    Output::success(&format!(
        "Converted {} submodule(s) to module records.",
        written.len()
    ));
    Ok(())
}

/// Section header, with or without the quoting git writes.
static SUBMODULE_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^submodule\s+"?(?P<name>[^"]+?)"?$"#).expect("section regex"));

/// Parse `.gitmodules` content into named submodule sections.
fn parse_gitmodules(content: &str) -> anyhow::Result<BTreeMap<String, Submodule>> {
    // Git writes tab-indented keys; the INI parser wants them flush left.
    let normalized: String = content
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let ini = Ini::load_from_str(&normalized)?;

    let mut submodules = BTreeMap::new();
    for (section, props) in ini.iter() {
        let name = match section.and_then(|s| SUBMODULE_SECTION.captures(s)) {
            Some(caps) => caps["name"].to_string(),
            None => continue,
        };

        let mut url = None;
        let mut path = None;
        let mut extras = BTreeMap::new();
        for (key, value) in props.iter() {
            match key {
                "url" => url = Some(value.to_string()),
                "path" => path = Some(value.to_string()),
                _ => {
                    extras.insert(key.to_string(), value.to_string());
                }
            }
        }

        let url = url.with_context(|| format!("submodule {} has no url", name))?;
        let path = path.with_context(|| format!("submodule {} has no path", name))?;
        submodules.insert(name, Submodule { url, path, extras });
    }

    Ok(submodules)
}
