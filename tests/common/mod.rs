//! Shared helpers for integration tests.
//!
//! Not every test binary uses every helper.
#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;
pub mod git_helpers;
