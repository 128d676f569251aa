//! Common infrastructure for the OVS agent crates.
//!
//! This crate provides the ambient pieces shared by the bridge and
//! extension layers:
//!
//! - [`OvsError`] / [`OvsResult`]: error types for all agent operations
//! - [`shell`]: safe shell command execution for `ovs-vsctl`/`ovs-ofctl`
//! - [`OvsConfig`]: agent configuration (bridge names, timeouts)

pub mod config;
pub mod error;
pub mod shell;

pub use config::OvsConfig;
pub use error::{OvsError, OvsResult};
