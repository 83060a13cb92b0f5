//! Prepare command implementation
//!
//! Detects drifted modules, verifies their new pins are published, and
//! stages updated records in the p4 client so the operator only has to
//! review and submit.

use anyhow::Context;
use tracing::debug;

use crate::cli::context::RunContext;
use crate::cli::output::Output;
use crate::core::record::{ModuleRecord, PendingChange};
use crate::core::{links, store};
use crate::git::{detect_drift, verify_pin, VerifyPolicy};

/// Run the prepare command
pub fn run_prepare(ctx: &RunContext, no_verify: bool) -> anyhow::Result<()> {
    let modules = ctx.load_modules()?;
    if modules.is_empty() {
        Output::warning(&format!(
            "No module records found in {}",
            ctx.root().display()
        ));
        return Ok(());
    }

    let p4 = ctx.p4();

    // Records opened from an earlier run would corrupt the compare links;
    // start from a clean client.
    if p4.opened_any(ctx.root())? {
        Output::warning("Module records already opened in p4, reverting them first");
        p4.revert(ctx.root(), "*.ini")?;
    }

    Output::header(&format!("Checking {} modules for drift...", modules.len()));
    println!();

    let mut drifted: Vec<(&ModuleRecord, PendingChange)> = Vec::new();
    for record in modules.iter() {
        if let Some(change) = detect_drift(record, ctx.root())? {
            let staged = record.with_sha1(&change.new_sha1);
            let bak = ctx.root().join(format!("{}.ini.bak", record.name));
            store::write_record(&bak, &staged)?;
            p4.edit(ctx.root(), &format!("{}.ini", record.name))?;

            Output::info(&format!(
                "{}: {} -> {}",
                record.name, change.old_sha1, change.new_sha1
            ));
            drifted.push((record, change));
        }
    }

    if drifted.is_empty() {
        Output::success("No drifted modules, nothing to prepare.");
        return Ok(());
    }

    println!();
    if no_verify {
        Output::warning("Skipping pin verification (--no-verify)");
    } else {
        let policy = VerifyPolicy::default();
        for (record, change) in &drifted {
            let spinner = Output::spinner(&format!("Verifying {}...", record.name));
            match verify_pin(&ctx.runner, ctx.root(), record, &change.new_sha1, &policy) {
                Ok(tier) => {
                    spinner.finish_with_message(format!("{}: {}", record.name, tier));
                }
                Err(e) => {
                    spinner.finish_with_message(format!("{}: verification failed", record.name));
                    return Err(e).with_context(|| {
                        format!(
                            "pin {} for module {} is not safe to record",
                            change.new_sha1, record.name
                        )
                    });
                }
            }
        }
    }

    let (promoted, compare_links) = promote_staged(ctx)?;

    let reverted = p4.revert_unchanged(ctx.root())?;
    if !reverted.trim().is_empty() {
        debug!(report = %reverted.trim(), "reverted unchanged records");
    }

    let diff = p4.diff(ctx.root())?;
    if !diff.trim().is_empty() {
        println!();
        print!("{}", diff);
    }

    if !compare_links.is_empty() {
        Output::header("Add these links to your submit message:");
        for link in &compare_links {
            Output::list_item(link);
        }
    }

    println!();
    Output::success(&format!("{} record(s) staged for submit.", promoted));
    Ok(())
}

/// Promote staged records over the originals.
///
/// Scans for `<name>.ini.bak` files, drops any whose content already equals
/// the authoritative record, and renames the rest into place. Returns the
/// number promoted and the compare links for the submit message.
fn promote_staged(ctx: &RunContext) -> anyhow::Result<(usize, Vec<String>)> {
    let mut staged: Vec<(std::path::PathBuf, String)> = Vec::new();
    for entry in std::fs::read_dir(ctx.root())? {
        let entry = entry?;
        let file = entry.file_name().to_string_lossy().into_owned();
        if let Some(name) = file.strip_suffix(".ini.bak") {
            staged.push((entry.path(), name.to_string()));
        }
    }
    staged.sort();

    let mut promoted = 0;
    let mut compare_links = Vec::new();
    for (bak, name) in &staged {
        let ini = ctx.root().join(format!("{}.ini", name));
        let current = store::load_record(&ini)
            .with_context(|| format!("reading record for staged module {}", name))?;
        let new = store::load_record_named(bak, name)
            .with_context(|| format!("reading staged record {}", bak.display()))?;

        if current == new {
            debug!(module = %name, "staged record identical, dropping");
            std::fs::remove_file(bak)?;
            continue;
        }

        if let Some(link) = links::compare_url(&current, &current.sha1, &new.sha1) {
            compare_links.push(link);
        }
        std::fs::rename(bak, &ini)?;
        promoted += 1;
    }

    Ok((promoted, compare_links))
}
