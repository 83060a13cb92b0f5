//! CLI command implementations
//!
//! Each command is implemented in its own module.

pub mod checkout;
pub mod convert;
pub mod prepare;
pub mod status;
pub mod verify;
