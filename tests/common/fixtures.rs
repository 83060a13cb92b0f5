//! Test fixtures for building modules directories.
//!
//! Provides a `ModulesBuilder` pattern for creating a temporary modules
//! directory with bare remotes, pinned records, and optional mirrors --
//! all offline.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use gitpin::cli::context::RunContext;
use gitpin::core::record::ModuleRecord;
use gitpin::core::store;
use gitpin::util::Runner;

use super::git_helpers;

/// A test modules directory with temporary directories that are cleaned up
/// on drop.
pub struct ModulesFixture {
    /// The temporary directory (holds modules, remotes, and mirrors).
    /// Kept alive for the lifetime of the fixture.
    pub _temp: TempDir,
    /// The modules directory (records and working copies).
    pub root: PathBuf,
    /// Path to the bare remotes directory.
    pub remotes_dir: PathBuf,
    /// Local mirror base, when built with mirrors.
    pub mirror_base: Option<PathBuf>,
    /// Pinned sha recorded for each module at build time.
    pub pins: BTreeMap<String, String>,
}

impl ModulesFixture {
    /// Get the path to a module's working copy.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Get the path to a module's record file.
    pub fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.ini", name))
    }

    /// Get the file:// URL for a module's bare remote.
    pub fn remote_url(&self, name: &str) -> String {
        format!(
            "file://{}",
            self.remotes_dir.join(format!("{}.git", name)).display()
        )
    }

    /// Get the path to a module's local mirror, when mirrors were built.
    pub fn mirror_path(&self, name: &str) -> Option<PathBuf> {
        self.mirror_base
            .as_ref()
            .map(|base| base.join("modules").join("work").join(name))
    }

    /// The sha recorded as this module's pin at build time.
    pub fn pin(&self, name: &str) -> &str {
        &self.pins[name]
    }

    /// Load a module's record from disk.
    pub fn load_record(&self, name: &str) -> ModuleRecord {
        store::load_record(&self.record_path(name)).expect("record should load")
    }

    /// Rewrite a module's record with a new pin.
    pub fn update_pin(&self, name: &str, sha1: &str) {
        let record = self.load_record(name).with_sha1(sha1);
        store::write_record(&self.record_path(name), &record).expect("record should write");
    }

    /// Run context rooted at this fixture's modules directory.
    pub fn context(&self) -> RunContext {
        RunContext {
            directory: self.root.clone(),
            inis: None,
            runner: Runner::default(),
            p4_program: None,
            verbose: false,
        }
    }

    /// Write a p4 stub that logs its arguments to `p4.log` in its working
    /// directory and succeeds. Returns the stub's path for `p4_program`.
    #[cfg(unix)]
    pub fn write_p4_stub(&self) -> String {
        self.write_p4_stub_with("echo \"$@\" >> p4.log")
    }

    /// Write a p4 stub with custom behavior.
    #[cfg(unix)]
    pub fn write_p4_stub_with(&self, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = self._temp.path().join("p4-stub.sh");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }
}

/// Builder for creating test modules directories.
pub struct ModulesBuilder {
    modules: Vec<ModuleSpec>,
    with_mirrors: bool,
}

struct ModuleSpec {
    name: String,
    /// Record path; defaults to the module name.
    path: Option<String>,
    /// If true, clone the working copy into the modules directory.
    cloned: bool,
}

impl ModulesBuilder {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            with_mirrors: false,
        }
    }

    /// Add a module with its working copy already cloned at the pin.
    pub fn add_module(mut self, name: &str) -> Self {
        self.modules.push(ModuleSpec {
            name: name.to_string(),
            path: None,
            cloned: true,
        });
        self
    }

    /// Add a module with a record but no working copy.
    pub fn add_absent_module(mut self, name: &str) -> Self {
        self.modules.push(ModuleSpec {
            name: name.to_string(),
            path: None,
            cloned: false,
        });
        self
    }

    /// Add a module with a record pointing at a nested working-copy path,
    /// but no working copy.
    pub fn add_absent_module_at(mut self, name: &str, path: &str) -> Self {
        self.modules.push(ModuleSpec {
            name: name.to_string(),
            path: Some(path.to_string()),
            cloned: false,
        });
        self
    }

    /// Create a bare mirror for every module, laid out the way a mirror
    /// refresh job would under `<base>/modules/work/<path>`.
    pub fn with_mirrors(mut self) -> Self {
        self.with_mirrors = true;
        self
    }

    /// Build the modules fixture.
    pub fn build(self) -> ModulesFixture {
        let temp = TempDir::new().expect("failed to create temp dir");
        // Two path segments under the temp dir so local mirror derivation
        // has a stable tail to work with.
        let root = temp.path().join("modules").join("work");
        let remotes_dir = temp.path().join("remotes");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&remotes_dir).unwrap();

        let mirror_base = if self.with_mirrors {
            Some(temp.path().join("mirrors"))
        } else {
            None
        };

        let mut pins = BTreeMap::new();

        for spec in &self.modules {
            let module_path = spec.path.clone().unwrap_or_else(|| spec.name.clone());
            let bare_path = remotes_dir.join(format!("{}.git", spec.name));
            git_helpers::init_bare_repo(&bare_path);

            // Stage an initial commit and push it to the bare remote.
            let staging = temp.path().join(format!("staging-{}", spec.name));
            git_helpers::init_repo(&staging);
            let sha = git_helpers::commit_file(
                &staging,
                "README.md",
                &format!("# {}\n", spec.name),
                "Initial commit",
            );
            let remote_url = format!("file://{}", bare_path.display());
            git_helpers::add_remote(&staging, "origin", &remote_url);
            git_helpers::push_upstream(&staging, "origin", "main");

            if let Some(base) = &mirror_base {
                let mirror = base.join("modules").join("work").join(&module_path);
                fs::create_dir_all(mirror.parent().unwrap()).unwrap();
                git_helpers::clone_bare(&remote_url, &mirror);
            }

            if spec.cloned {
                git_helpers::clone_repo(&remote_url, &root.join(&module_path));
            }

            let record = ModuleRecord {
                name: spec.name.clone(),
                url: remote_url,
                path: module_path,
                sha1: sha.clone(),
                extras: BTreeMap::new(),
            };
            store::write_record(&root.join(format!("{}.ini", spec.name)), &record)
                .expect("record should write");

            pins.insert(spec.name.clone(), sha);
        }

        ModulesFixture {
            _temp: temp,
            root,
            remotes_dir,
            mirror_base,
            pins,
        }
    }
}
