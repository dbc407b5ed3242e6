//! Directory-per-device command store
//!
//! Layout under the root directory:
//! ```text
//! <root>/<device>/seq       current sequence token (first line)
//! <root>/<device>/<token>   command batch for that token
//! ```

use super::CommandStore;
use async_trait::async_trait;
use gadget_shared::{protocol::POINTER_FILE, DeviceId, SeqToken};
use std::io::{self, ErrorKind};
use std::path::PathBuf;

/// Command store backed by a plain directory tree
#[derive(Debug, Clone)]
pub struct FsCommandStore {
    root: PathBuf,
}

impl FsCommandStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn device_dir(&self, device: &DeviceId) -> PathBuf {
        self.root.join(device.as_str())
    }
}

/// Errors that mean the record simply isn't there
fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory
    )
}

fn absent_as_none<T>(result: io::Result<T>) -> io::Result<Option<T>> {
    match result {
        Ok(content) => Ok(Some(content)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl CommandStore for FsCommandStore {
    async fn read_pointer(&self, device: &DeviceId) -> io::Result<Option<String>> {
        absent_as_none(tokio::fs::read_to_string(self.device_dir(device).join(POINTER_FILE)).await)
    }

    async fn read_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<Option<Vec<u8>>> {
        absent_as_none(tokio::fs::read(self.device_dir(device).join(seq.as_str())).await)
    }

    async fn delete_batch(&self, device: &DeviceId, seq: &SeqToken) -> io::Result<bool> {
        match tokio::fs::remove_file(self.device_dir(device).join(seq.as_str())).await {
            Ok(()) => Ok(true),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
