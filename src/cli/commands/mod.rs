//! CLI command implementations
//!
//! This module contains all CLI command implementations.
//!
//! Exit codes shared by the commands:
//! - `0` success
//! - `1` some patients failed
//! - `2` configuration error
//! - `4` data source unreachable
//! - `5` fatal error
//! - `130` interrupted by a signal

pub mod export;
pub mod init;
pub mod validate;
