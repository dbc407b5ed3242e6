//! Outcomes of queue operations that are not a delivered batch

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gadget_shared::{protocol, DeviceId, IdentError};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Device or token failed the identifier allow-list
    #[error(transparent)]
    InvalidIdentifier(#[from] IdentError),

    /// No pointer record exists for the device
    #[error("{}", protocol::device_unknown(.0.as_str()))]
    DeviceUnknown(DeviceId),

    /// Pointer resolves but no batch exists for that token
    #[error("{}", protocol::no_commands_pending(.0.as_str()))]
    NoCommandsPending(DeviceId),

    /// Acknowledge target absent
    #[error("{}", protocol::NO_COMMANDS_FOUND)]
    NoCommandsFound,

    /// Pointer record names a token that is not a safe identifier
    #[error("corrupt sequence pointer for device {device}: {source}")]
    CorruptPointer {
        device: DeviceId,
        #[source]
        source: IdentError,
    },

    /// Storage failure other than "not found"
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
}

impl QueueError {
    /// HTTP status for this outcome
    ///
    /// - Invalid identifier: 400 Bad Request
    /// - Unknown device / nothing pending / nothing to acknowledge: 404 Not Found
    /// - Corrupt pointer / storage failure: 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::DeviceUnknown(_) | Self::NoCommandsPending(_) | Self::NoCommandsFound => {
                StatusCode::NOT_FOUND
            }
            Self::CorruptPointer { .. } | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this is a server-side fault rather than an expected outcome
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::CorruptPointer { .. } | Self::Storage(_))
    }
}

impl IntoResponse for QueueError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal faults are logged by the service, never echoed
        let body = if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (
            status,
            [(axum::http::header::CONTENT_TYPE, protocol::CONTENT_TYPE)],
            body,
        )
            .into_response()
    }
}
