//! Command queue for polling devices
//!
//! This module handles:
//! - Resolving a device's current sequence token
//! - Delivering the batch stored under that token
//! - Removing a batch when the device acknowledges it

mod error;
mod service;

pub use error::QueueError;
pub use service::{CommandQueue, Delivery};
