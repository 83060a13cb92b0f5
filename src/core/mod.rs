//! Core business logic for gitpin

pub mod links;
pub mod record;
pub mod store;

pub use record::{ModuleRecord, PendingChange};
pub use store::{ConfigError, ModuleSet};
