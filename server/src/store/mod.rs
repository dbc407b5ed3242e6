//! Storage backends for per-device command queues
//!
//! This module handles:
//! - Reading the current-sequence pointer of a device
//! - Reading the command batch stored under a sequence token
//! - Deleting a batch once the device acknowledges it
//!
//! Absence is reported as `None`/`false`; every other failure is an
//! `io::Error` so callers can tell "not found" from a broken medium.

mod fs;
mod memory;

pub use fs::FsCommandStore;
pub use memory::MemoryCommandStore;

use async_trait::async_trait;
use gadget_shared::{DeviceId, SeqToken};
use std::io;

/// Persisted queue state for all devices
#[async_trait]
pub trait CommandStore: Send + Sync + 'static {
    /// Raw contents of the device's pointer record
    async fn read_pointer(&self, device: &DeviceId) -> io::Result<Option<String>>;

    /// Payload of the batch stored for (device, token), as raw bytes
    async fn read_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<Option<Vec<u8>>>;

    /// Remove the batch for (device, token), returning whether it existed
    async fn delete_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<bool>;
}
