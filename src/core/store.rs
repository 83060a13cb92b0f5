//! Record storage: one INI file per module
//!
//! Records live next to each other in the modules directory and are tracked
//! by the centralized system. Keys are written in sorted order so diffs stay
//! stable across rewrites.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::core::record::{is_full_sha1, ModuleRecord};

/// Every record keeps its keys in this single section.
pub const RECORD_SECTION: &str = "general";

/// Errors that can occur when loading or validating module records
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read record file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse record INI: {0}")]
    Parse(#[from] ini::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Record path escapes modules directory: {0}")]
    PathTraversal(String),

    #[error("Duplicate module name: {0}")]
    Duplicate(String),
}

/// Load a record, deriving the module name from the filename stem.
pub fn load_record(path: &Path) -> Result<ModuleRecord, ConfigError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            ConfigError::Validation(format!("record filename is not usable: {}", path.display()))
        })?
        .to_string();
    load_record_named(path, &name)
}

/// Load a record under an explicit module name.
///
/// Used for staged `<name>.ini.bak` files, whose filename stem would
/// otherwise leak the `.ini` suffix into the name.
pub fn load_record_named(path: &Path, name: &str) -> Result<ModuleRecord, ConfigError> {
    let ini = Ini::load_from_file(path)?;
    let section = ini.section(Some(RECORD_SECTION)).ok_or_else(|| {
        ConfigError::Validation(format!(
            "record '{}' is missing its [{}] section",
            name, RECORD_SECTION
        ))
    })?;

    let mut url = None;
    let mut module_path = None;
    let mut sha1 = None;
    let mut legacy_sha1 = None;
    let mut extras = BTreeMap::new();

    for (key, value) in section.iter() {
        match key {
            "url" => url = Some(value.to_string()),
            "path" => module_path = Some(value.to_string()),
            "sha1" => sha1 = Some(value.to_string()),
            // Old records wrote the pin as `sha1now`; accept it and
            // normalize to `sha1` on the next write.
            "sha1now" => legacy_sha1 = Some(value.to_string()),
            _ => {
                extras.insert(key.to_string(), value.to_string());
            }
        }
    }

    let url = url.ok_or_else(|| missing_key(name, "url"))?;
    let module_path = module_path.ok_or_else(|| missing_key(name, "path"))?;
    let sha1 = sha1
        .or(legacy_sha1)
        .ok_or_else(|| missing_key(name, "sha1"))?;

    if url.is_empty() {
        return Err(ConfigError::Validation(format!(
            "record '{}' has an empty url",
            name
        )));
    }
    if module_path.is_empty() {
        return Err(ConfigError::Validation(format!(
            "record '{}' has an empty path",
            name
        )));
    }
    if !is_full_sha1(&sha1) {
        return Err(ConfigError::Validation(format!(
            "record '{}' pin is not a 40-digit hex commit: {:?}",
            name, sha1
        )));
    }
    if path_escapes_boundary(&module_path) {
        return Err(ConfigError::PathTraversal(format!(
            "record '{}' path: {}",
            name, module_path
        )));
    }

    Ok(ModuleRecord {
        name: name.to_string(),
        url,
        path: module_path,
        sha1,
        extras,
    })
}

/// Write a record with its keys in sorted order.
pub fn write_record(path: &Path, record: &ModuleRecord) -> Result<(), ConfigError> {
    let mut keys: BTreeMap<&str, &str> = BTreeMap::new();
    keys.insert("url", &record.url);
    keys.insert("path", &record.path);
    keys.insert("sha1", &record.sha1);
    for (key, value) in &record.extras {
        keys.insert(key, value);
    }

    let mut conf = Ini::new();
    let mut section = conf.with_section(Some(RECORD_SECTION));
    for (key, value) in keys {
        section.set(key, value);
    }
    conf.write_to_file(path)?;
    Ok(())
}

/// All module records for one run, keyed and iterated by name.
#[derive(Debug)]
pub struct ModuleSet {
    records: BTreeMap<String, ModuleRecord>,
}

impl ModuleSet {
    /// Load every `*.ini` in the modules directory.
    ///
    /// Staged `*.ini.bak` files are not records and are skipped by the
    /// extension match.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("ini") {
                paths.push(path);
            }
        }
        paths.sort();
        Self::from_paths(&paths)
    }

    /// Load records from an explicit list file: one path per line, relative
    /// paths resolved against the modules directory. Blank lines and `#`
    /// comments are skipped.
    pub fn load_list(dir: &Path, list: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(list)?;
        let mut paths = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let path = PathBuf::from(line);
            if path.is_absolute() {
                paths.push(path);
            } else {
                paths.push(dir.join(path));
            }
        }
        Self::from_paths(&paths)
    }

    fn from_paths(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut records = BTreeMap::new();
        for path in paths {
            let record = load_record(path)?;
            let name = record.name.clone();
            if records.insert(name.clone(), record).is_some() {
                return Err(ConfigError::Duplicate(name));
            }
        }
        Ok(Self { records })
    }

    pub fn get(&self, name: &str) -> Option<&ModuleRecord> {
        self.records.get(name)
    }

    /// Records in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Validation error for a required record key that is absent.
fn missing_key(name: &str, key: &str) -> ConfigError {
    ConfigError::Validation(format!(
        "record '{}' is missing required key '{}'",
        name, key
    ))
}

/// Check if a relative path escapes the modules directory
fn path_escapes_boundary(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    normalized.starts_with("..") || normalized.starts_with('/') || normalized.contains("/../")
}
