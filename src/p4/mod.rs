//! Thin Perforce client
//!
//! Everything goes through the `p4` executable; there is no native protocol
//! speaker here. The program name is overridable through `GITPIN_P4` so
//! tests can substitute a recording stub.

use std::path::Path;

use thiserror::Error;

use crate::util::{run_captured, Captured, Runner};

/// Environment variable naming the Perforce executable.
pub const PROGRAM_ENV: &str = "GITPIN_P4";

#[derive(Error, Debug)]
pub enum P4Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },
}

/// Client bound to one executable and one [`Runner`].
#[derive(Debug, Clone)]
pub struct P4Client {
    program: String,
    runner: Runner,
}

impl P4Client {
    /// Client for the configured executable (`GITPIN_P4`, else `p4`).
    pub fn new(runner: Runner) -> Self {
        let program = std::env::var(PROGRAM_ENV).unwrap_or_else(|_| "p4".to_string());
        P4Client { program, runner }
    }

    pub fn with_program(program: impl Into<String>, runner: Runner) -> Self {
        P4Client {
            program: program.into(),
            runner,
        }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<Captured, P4Error> {
        let mut cmd = self.runner.command(&self.program, dir);
        cmd.args(args);
        // p4 shells out through these when rendering diffs; keep it plain.
        cmd.env_remove("P4DIFF");
        cmd.env_remove("P4MERGE");
        Ok(run_captured(cmd)?)
    }

    fn run_checked(&self, dir: &Path, args: &[&str]) -> Result<String, P4Error> {
        let out = self.run(dir, args)?;
        if !out.success() {
            return Err(P4Error::CommandFailed {
                command: format!("{} {}", self.program, args.join(" ")),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// Whether any file under `dir` is already opened in the client.
    pub fn opened_any(&self, dir: &Path) -> Result<bool, P4Error> {
        let out = self.run_checked(dir, &["opened", "-m", "1", "..."])?;
        Ok(!out.trim().is_empty())
    }

    /// Revert opened files matching `pattern` under `dir`.
    pub fn revert(&self, dir: &Path, pattern: &str) -> Result<(), P4Error> {
        self.run_checked(dir, &["revert", pattern])?;
        Ok(())
    }

    /// Revert files opened but left unmodified; returns p4's report.
    pub fn revert_unchanged(&self, dir: &Path) -> Result<String, P4Error> {
        self.run_checked(dir, &["revert", "-a", "..."])
    }

    /// Open `file` for edit.
    pub fn edit(&self, dir: &Path, file: &str) -> Result<(), P4Error> {
        self.run_checked(dir, &["edit", file])?;
        Ok(())
    }

    /// Diff of opened files under `dir`.
    pub fn diff(&self, dir: &Path) -> Result<String, P4Error> {
        self.run_checked(dir, &["diff", "..."])
    }

    /// Open `files` for add.
    pub fn add(&self, dir: &Path, files: &[String]) -> Result<(), P4Error> {
        let mut args = vec!["add"];
        args.extend(files.iter().map(String::as_str));
        self.run_checked(dir, &args)?;
        Ok(())
    }
}
