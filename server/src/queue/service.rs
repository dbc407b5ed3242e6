//! Command queue protocol: resolve, fetch, acknowledge

use super::QueueError;
use crate::store::CommandStore;
use gadget_shared::{DeviceId, SeqToken};
use std::sync::Arc;
use tracing::{debug, warn};

/// A batch delivered to a device together with the token current at read time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub seq: SeqToken,
    pub commands: Vec<u8>,
}

/// Serves queued command batches to polling devices.
///
/// Holds no state of its own; every call goes straight to the store, and
/// the pointer read and batch read are independent of each other.
pub struct CommandQueue<S> {
    store: Arc<S>,
}

impl<S> Clone for CommandQueue<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CommandStore> CommandQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Token named by the device's pointer record
    pub async fn resolve_current_sequence(&self, device: &str) -> Result<SeqToken, QueueError> {
        let device = DeviceId::new(device)?;
        self.resolve(&device).await
    }

    async fn resolve(&self, device: &DeviceId) -> Result<SeqToken, QueueError> {
        let pointer = self
            .store
            .read_pointer(device)
            .await
            .map_err(|e| self.internal(device, e.into()))?
            .ok_or_else(|| QueueError::DeviceUnknown(device.clone()))?;

        let line = pointer.lines().next().unwrap_or_default().trim();
        if line.is_empty() {
            return Err(QueueError::NoCommandsPending(device.clone()));
        }

        SeqToken::new(line).map_err(|source| {
            self.internal(
                device,
                QueueError::CorruptPointer {
                    device: device.clone(),
                    source,
                },
            )
        })
    }

    /// Current token and its batch
    pub async fn fetch_commands(&self, device: &str) -> Result<Delivery, QueueError> {
        let device = DeviceId::new(device)?;
        let seq = self.resolve(&device).await?;

        let commands = self
            .store
            .read_batch(&device, &seq)
            .await
            .map_err(|e| self.internal(&device, e.into()))?
            .ok_or_else(|| QueueError::NoCommandsPending(device.clone()))?;

        debug!(device = %device, seq = %seq, bytes = commands.len(), "Delivering commands");
        Ok(Delivery { seq, commands })
    }

    /// Delete the batch for (device, token).
    ///
    /// The token is not checked against the current pointer, so stale or
    /// out-of-order tokens are accepted as long as their batch exists.
    pub async fn acknowledge(&self, device: &str, seq: &str) -> Result<(), QueueError> {
        let device = DeviceId::new(device)?;
        let seq = SeqToken::new(seq)?;

        let removed = self
            .store
            .delete_batch(&device, &seq)
            .await
            .map_err(|e| self.internal(&device, e.into()))?;

        if !removed {
            return Err(QueueError::NoCommandsFound);
        }

        debug!(device = %device, seq = %seq, "Commands acknowledged");
        Ok(())
    }

    fn internal(&self, device: &DeviceId, err: QueueError) -> QueueError {
        warn!(device = %device, error = %err, "Command queue fault");
        err
    }
}
