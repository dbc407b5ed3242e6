//! Client side of the control protocol
//!
//! This module handles:
//! - Polling the server for the current command batch
//! - Reading the sequence token from the `X-Seq` header
//! - Acknowledging processed batches

mod http;
mod traits;

pub use http::HttpControlClient;
pub use traits::{Ack, ClientError, ControlApi, Poll};
