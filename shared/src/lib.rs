//! Gadget Shared Protocol Types
//!
//! This crate provides the identifier types, protocol constants and the
//! delivery state machine shared by the command server and device agents.

pub mod ident;
pub mod state_machine;

pub use ident::{DeviceId, IdentError, IdentKind, SeqToken};

/// Wire-level constants of the control protocol
pub mod protocol {
    /// Route prefix for polling and acknowledgement
    pub const CONTROL_PATH: &str = "/control";

    /// Response header carrying the current sequence token
    pub const HEADER_SEQ: &str = "X-Seq";

    /// Response header echoing the polled device
    pub const HEADER_DEVICE: &str = "X-Device";

    /// Query parameter naming the acknowledged token
    pub const QUERY_SEQ: &str = "seq";

    /// Content type of every control response
    pub const CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

    /// Body of a successful acknowledgement
    pub const ACK_BODY: &str = "ACK";

    /// Name of the per-device pointer record
    pub const POINTER_FILE: &str = "seq";

    /// Default listening port of the server
    pub const DEFAULT_PORT: u16 = 8086;

    /// Prefix of the "device unknown" message, used by clients to tell
    /// the two 404 outcomes of a poll apart
    pub const DEVICE_UNKNOWN_PREFIX: &str = "Device not known: ";

    /// Acknowledge target absent (already acknowledged or never existed)
    pub const NO_COMMANDS_FOUND: &str = "No commands found.";

    pub fn device_unknown(device: &str) -> String {
        format!("{DEVICE_UNKNOWN_PREFIX}{device}")
    }

    pub fn no_commands_pending(device: &str) -> String {
        format!("No commands for device: {device}")
    }

    /// Path for polling or acknowledging a device
    pub fn control_path(device: &str) -> String {
        format!("{CONTROL_PATH}/{device}")
    }
}

#[cfg(test)]
mod tests {
    use super::protocol::*;

    #[test]
    fn test_messages() {
        assert_eq!(device_unknown("ghost"), "Device not known: ghost");
        assert!(device_unknown("ghost").starts_with(DEVICE_UNKNOWN_PREFIX));
        assert_eq!(no_commands_pending("sensor1"), "No commands for device: sensor1");
        assert!(!no_commands_pending("sensor1").starts_with(DEVICE_UNKNOWN_PREFIX));
    }

    #[test]
    fn test_control_path() {
        assert_eq!(control_path("sensor1"), "/control/sensor1");
    }
}
