//! HTTP boundary for polling devices
//!
//! This module handles:
//! - `GET /control/{device}` delivery with `X-Seq` / `X-Device` headers
//! - `DELETE /control/{device}?seq=` acknowledgement
//! - Mapping queue outcomes to status codes and plain-text bodies

mod routes;

pub use routes::router;
