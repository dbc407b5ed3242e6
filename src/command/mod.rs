//! Command execution for the device agent
//!
//! This module handles:
//! - Splitting a delivered batch into command lines
//! - Handing the batch to a local program, or logging it
//! - Deciding whether the batch may be acknowledged

mod executor;

pub use executor::{CommandExecutor, CommandResult};
