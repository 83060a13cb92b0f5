//! Status command implementation

use serde::Serialize;

use crate::cli::context::RunContext;
use crate::cli::output::{Output, Table};
use crate::core::record::ModuleRecord;
use crate::git::{head_sha, open_repo, path_exists};

/// JSON-serializable per-module status row
#[derive(Serialize)]
struct ModuleStatus {
    name: String,
    path: String,
    pinned: String,
    head: Option<String>,
    state: ModuleState,
}

/// How a working copy relates to its record
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ModuleState {
    Pinned,
    Drifted,
    Missing,
    Error,
}

impl ModuleState {
    fn as_str(&self) -> &'static str {
        match self {
            ModuleState::Pinned => "pinned",
            ModuleState::Drifted => "drifted",
            ModuleState::Missing => "missing",
            ModuleState::Error => "error",
        }
    }
}

/// Run the status command
pub fn run_status(ctx: &RunContext, json: bool) -> anyhow::Result<()> {
    let modules = ctx.load_modules()?;

    let rows: Vec<ModuleStatus> = modules.iter().map(|record| inspect(record, ctx)).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        Output::warning(&format!(
            "No module records found in {}",
            ctx.root().display()
        ));
        return Ok(());
    }

    Output::header("Module Status");
    println!();

    let mut table = Table::new(vec!["Module", "State", "Pinned", "Head"]);
    for row in &rows {
        let pinned = short(&row.pinned, ctx.verbose);
        let head = row
            .head
            .as_deref()
            .map(|h| short(h, ctx.verbose))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            &Output::module_name(&row.name),
            row.state.as_str(),
            &pinned,
            &head,
        ]);
    }
    table.print();

    // Summary
    println!();
    let pinned = rows
        .iter()
        .filter(|r| r.state == ModuleState::Pinned)
        .count();
    let drifted = rows
        .iter()
        .filter(|r| r.state == ModuleState::Drifted)
        .count();
    let missing = rows
        .iter()
        .filter(|r| r.state == ModuleState::Missing)
        .count();
    let error_count = rows
        .iter()
        .filter(|r| r.state == ModuleState::Error)
        .count();
    let error_suffix = if error_count > 0 {
        format!(" | {} unreadable", error_count)
    } else {
        String::new()
    };
    println!(
        "  {}/{} pinned | {} drifted | {} missing{}",
        pinned,
        rows.len(),
        drifted,
        missing,
        error_suffix
    );

    Ok(())
}

/// Read one module's working copy and classify it against the record.
fn inspect(record: &ModuleRecord, ctx: &RunContext) -> ModuleStatus {
    let worktree = record.worktree(ctx.root());
    let (head, state) = if !path_exists(&worktree) {
        (None, ModuleState::Missing)
    } else {
        match open_repo(&worktree).and_then(|repo| head_sha(&repo)) {
            Ok(head) if head == record.sha1 => (Some(head), ModuleState::Pinned),
            Ok(head) => (Some(head), ModuleState::Drifted),
            Err(_) => (None, ModuleState::Error),
        }
    };

    ModuleStatus {
        name: record.name.clone(),
        path: record.path.clone(),
        pinned: record.sha1.clone(),
        head,
        state,
    }
}

/// Full ids in verbose mode, 12-char prefixes otherwise.
fn short(sha: &str, full: bool) -> String {
    if full || sha.len() <= 12 {
        sha.to_string()
    } else {
        sha[..12].to_string()
    }
}
