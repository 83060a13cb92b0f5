//! Checkout command implementation

use std::path::Path;

use crate::cli::context::RunContext;
use crate::cli::output::Output;
use crate::core::{links, ModuleSet};
use crate::git::{reconcile, MirrorBase};

/// Run the checkout command
pub fn run_checkout(
    ctx: &RunContext,
    mirrors: Option<&str>,
    manifest: &Path,
) -> anyhow::Result<()> {
    let modules = ctx.load_modules()?;
    if modules.is_empty() {
        Output::warning(&format!(
            "No module records found in {}",
            ctx.root().display()
        ));
        return Ok(());
    }

    let mirrors = mirrors.map(MirrorBase::parse);

    Output::header(&format!("Reconciling {} modules...", modules.len()));
    println!();

    let mut success_count = 0;
    let mut failed: Vec<(String, String)> = Vec::new(); // (module, error message)

    for record in modules.iter() {
        let spinner = Output::spinner(&format!("Reconciling {}...", record.name));

        match reconcile(&ctx.runner, record, ctx.root(), mirrors.as_ref()) {
            Ok(outcome) => {
                spinner.finish_with_message(format!("{}: {}", record.name, outcome));
                success_count += 1;
            }
            Err(e) => {
                spinner.finish_with_message(format!("{}: failed - {}", record.name, e));
                failed.push((record.name.clone(), e.to_string()));
            }
        }
    }

    write_manifest(ctx, &modules, manifest);

    println!();
    if failed.is_empty() {
        Output::success(&format!("All {} modules at their pins.", success_count));
        Ok(())
    } else {
        Output::warning(&format!(
            "{} reconciled, {} failed",
            success_count,
            failed.len()
        ));
        println!();
        for (name, error) in &failed {
            Output::error(&format!("{}: {}", name, error));
        }
        std::process::exit(1);
    }
}

/// Write the tree-URL manifest next to the records. An unwritable manifest
/// is reported but never fails the run.
fn write_manifest(ctx: &RunContext, modules: &ModuleSet, manifest: &Path) {
    let path = if manifest.is_absolute() {
        manifest.to_path_buf()
    } else {
        ctx.root().join(manifest)
    };

    let text = links::manifest_text(modules.iter());
    match std::fs::write(&path, text) {
        Ok(()) => Output::info(&format!("Wrote manifest to {}", path.display())),
        Err(e) => Output::warning(&format!(
            "Could not write manifest {}: {}",
            path.display(),
            e
        )),
    }
}
