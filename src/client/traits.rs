//! Control API abstraction for pluggable server backends

use async_trait::async_trait;
use gadget_shared::{DeviceId, IdentError, SeqToken};
use thiserror::Error;

/// What a poll of the control endpoint reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// A batch is pending under this token
    Commands { seq: SeqToken, body: Vec<u8> },
    /// The device is known but nothing is pending
    NoCommands,
    /// The server has no pointer record for the device
    UnknownDevice,
}

/// What an acknowledgement reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// The batch was removed by this request
    Acknowledged,
    /// No batch was left to remove
    AlreadyAcknowledged,
}

/// Errors talking to the control endpoint
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Response is missing the X-Seq header")]
    MissingSeqHeader,

    #[error("Server sent an unusable sequence token: {0}")]
    InvalidToken(#[from] IdentError),

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Server side of the polling protocol
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Fetch the current batch for a device
    async fn poll(&self, device: &DeviceId) -> Result<Poll, ClientError>;

    /// Acknowledge processing of a batch
    async fn acknowledge(&self, device: &DeviceId, seq: &SeqToken) -> Result<Ack, ClientError>;
}
