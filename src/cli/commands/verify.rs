//! Verify command implementation
//!
//! Confirms every module's current HEAD is published on a remote other
//! clones can reach. Exit code 0 = all verified, 1 = any failure.

use crate::cli::context::RunContext;
use crate::cli::output::Output;
use crate::git::{head_sha, open_repo, path_exists, verify_pin, VerifyPolicy};

/// Run the verify command
pub fn run_verify(ctx: &RunContext) -> anyhow::Result<()> {
    let modules = ctx.load_modules()?;
    if modules.is_empty() {
        Output::warning(&format!(
            "No module records found in {}",
            ctx.root().display()
        ));
        return Ok(());
    }

    Output::header(&format!("Verifying {} module heads...", modules.len()));
    println!();

    let policy = VerifyPolicy::default();
    let mut verified = 0;
    let mut failed: Vec<(String, String)> = Vec::new(); // (module, error message)

    for record in modules.iter() {
        let worktree = record.worktree(ctx.root());
        if !path_exists(&worktree) {
            Output::error(&format!(
                "{}: working copy missing at {}",
                record.name,
                worktree.display()
            ));
            failed.push((record.name.clone(), "working copy missing".to_string()));
            continue;
        }

        let head = match open_repo(&worktree).and_then(|repo| head_sha(&repo)) {
            Ok(head) => head,
            Err(e) => {
                Output::error(&format!("{}: {}", record.name, e));
                failed.push((record.name.clone(), e.to_string()));
                continue;
            }
        };

        let spinner = Output::spinner(&format!("Verifying {}...", record.name));
        match verify_pin(&ctx.runner, ctx.root(), record, &head, &policy) {
            Ok(tier) => {
                spinner.finish_with_message(format!("{}: {}", record.name, tier));
                verified += 1;
            }
            Err(e) => {
                spinner.finish_with_message(format!("{}: failed - {}", record.name, e));
                failed.push((record.name.clone(), e.to_string()));
            }
        }
    }

    println!();
    if failed.is_empty() {
        Output::success(&format!("All {} module heads are published.", verified));
        Ok(())
    } else {
        Output::warning(&format!("{} verified, {} failed", verified, failed.len()));
        println!();
        for (name, error) in &failed {
            Output::error(&format!("{}: {}", name, error));
        }
        std::process::exit(1);
    }
}
