//! Gadget Command Server
//!
//! Serves per-device command batches to polling devices and removes them
//! when the device acknowledges processing.

pub mod config;
pub mod http;
pub mod queue;
pub mod store;
