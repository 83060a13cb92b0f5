//! Keep vendored git repositories checked out at pinned commits.
//!
//! Each vendored module is described by one INI record (`url`, `path`,
//! `sha1`) living next to the working copies in a Perforce-tracked
//! directory. The library reconciles working copies against their records,
//! detects drift, verifies new pins are published, and stages record
//! updates through p4 for review and submit.

pub mod cli;
pub mod core;
pub mod git;
pub mod p4;
pub mod util;
