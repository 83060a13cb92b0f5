//! External process plumbing shared by the git and p4 layers.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};

use once_cell::sync::Lazy;
use tracing::debug;

/// Location of the coreutils `timeout` binary, probed once per process.
/// When absent, wall-clock limits silently degrade to unbounded waits.
static TIMEOUT_BIN: Lazy<Option<PathBuf>> = Lazy::new(|| which::which("timeout").ok());

/// Captured result of one external command.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    fn from_output(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs external programs with an explicit working directory and captured
/// output. One `Runner` is built per run from the CLI flags; nothing here
/// reads or mutates process-global state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner {
    timeout_secs: Option<u64>,
}

impl Runner {
    pub fn new(timeout_secs: Option<u64>) -> Self {
        Self { timeout_secs }
    }

    /// Build a command for `program` rooted at `cwd`.
    ///
    /// When a wall-clock limit is configured and the `timeout` binary is on
    /// PATH, the invocation is wrapped as `timeout <secs> <program> ...`.
    pub fn command(&self, program: &str, cwd: &Path) -> Command {
        let mut cmd = match (self.timeout_secs, TIMEOUT_BIN.as_ref()) {
            (Some(secs), Some(bin)) => {
                let mut cmd = Command::new(bin);
                cmd.arg(secs.to_string());
                cmd.arg(program);
                cmd
            }
            _ => Command::new(program),
        };
        cmd.current_dir(cwd);
        cmd
    }

    /// Run `program` with `args` in `cwd`, capturing stdout and stderr.
    pub fn run<I, S>(&self, program: &str, args: I, cwd: &Path) -> io::Result<Captured>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.command(program, cwd);
        cmd.args(args);
        run_captured(cmd)
    }
}

/// Log a command just before execution.
///
/// Emits a `tracing::debug!` event with the program name, arguments, and
/// working directory. Visible when running with `-v` (which sets
/// `gitpin=debug`) or via `RUST_LOG=gitpin::cmd=debug`.
pub fn log_cmd(cmd: &Command) {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy()).collect();
    let cwd = cmd
        .get_current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    debug!(
        target: "gitpin::cmd",
        %program,
        ?args,
        %cwd,
        "exec"
    );
}

/// Execute a prepared command, capturing stdout and stderr.
pub fn run_captured(mut cmd: Command) -> io::Result<Captured> {
    log_cmd(&cmd);
    let output = cmd.output()?;
    Ok(Captured::from_output(output))
}
