//! Run context passed to command handlers
//!
//! Bundles the modules directory and global CLI flags into a single
//! struct, eliminating repetitive parameter passing across command
//! handlers.

use std::path::{Path, PathBuf};

use crate::core::{ConfigError, ModuleSet};
use crate::p4::P4Client;
use crate::util::Runner;

/// Run context available to all command handlers.
///
/// Created once in `main()` from the global flags, then passed by
/// reference to every command.
pub struct RunContext {
    /// Directory holding the module records and their working copies
    pub directory: PathBuf,
    /// Explicit record list file (`--inis`), overriding directory discovery
    pub inis: Option<PathBuf>,
    /// Runner for git and p4 invocations
    pub runner: Runner,
    /// Perforce executable override; `None` defers to `GITPIN_P4`
    pub p4_program: Option<String>,
    /// Show verbose output (`--verbose`)
    pub verbose: bool,
}

impl RunContext {
    /// Get the modules directory as a `&Path`
    pub fn root(&self) -> &Path {
        &self.directory
    }

    /// Load the module records this run operates on.
    pub fn load_modules(&self) -> Result<ModuleSet, ConfigError> {
        match &self.inis {
            Some(list) => ModuleSet::load_list(&self.directory, list),
            None => ModuleSet::load_dir(&self.directory),
        }
    }

    /// Perforce client for this run.
    pub fn p4(&self) -> P4Client {
        match &self.p4_program {
            Some(program) => P4Client::with_program(program.clone(), self.runner),
            None => P4Client::new(self.runner),
        }
    }
}
