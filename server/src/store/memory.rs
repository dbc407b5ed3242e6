//! In-memory command store for tests and embedding

use super::CommandStore;
use async_trait::async_trait;
use gadget_shared::{DeviceId, SeqToken};
use std::collections::HashMap;
use std::io;
use tokio::sync::RwLock;

#[derive(Default)]
struct DeviceQueue {
    pointer: Option<String>,
    batches: HashMap<SeqToken, Vec<u8>>,
}

/// Command store keeping all queues in a map
#[derive(Default)]
pub struct MemoryCommandStore {
    devices: RwLock<HashMap<DeviceId, DeviceQueue>>,
}

impl MemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the raw pointer record of a device
    pub async fn set_pointer(&self, device: &DeviceId, pointer: impl Into<String>) {
        let mut devices = self.devices.write().await;
        devices.entry(device.clone()).or_default().pointer = Some(pointer.into());
    }

    /// Store a batch under (device, token), replacing any previous one
    pub async fn insert_batch(&self, device: &DeviceId, seq: &SeqToken, batch: impl Into<Vec<u8>>) {
        let mut devices = self.devices.write().await;
        devices
            .entry(device.clone())
            .or_default()
            .batches
            .insert(seq.clone(), batch.into());
    }

    /// Number of batches still queued for a device
    pub async fn pending_count(&self, device: &DeviceId) -> usize {
        self.devices
            .read()
            .await
            .get(device)
            .map_or(0, |q| q.batches.len())
    }
}

#[async_trait]
impl CommandStore for MemoryCommandStore {
    async fn read_pointer(&self, device: &DeviceId) -> io::Result<Option<String>> {
        let devices = self.devices.read().await;
        Ok(devices.get(device).and_then(|q| q.pointer.clone()))
    }

    async fn read_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<Option<Vec<u8>>> {
        let devices = self.devices.read().await;
        Ok(devices.get(device).and_then(|q| q.batches.get(seq).cloned()))
    }

    async fn delete_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<bool> {
        let mut devices = self.devices.write().await;
        Ok(devices
            .get_mut(device)
            .is_some_and(|q| q.batches.remove(seq).is_some()))
    }
}
