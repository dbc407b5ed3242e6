//! Route handlers for the control protocol

use crate::queue::{CommandQueue, QueueError};
use crate::store::CommandStore;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use gadget_shared::protocol::{self, ACK_BODY, CONTENT_TYPE, HEADER_DEVICE, HEADER_SEQ, QUERY_SEQ};
use std::collections::HashMap;
use tower_http::trace::TraceLayer;

const INDEX: &str = "gadget server\n\n\
GET    /control/{device}            current command batch (X-Seq header)\n\
DELETE /control/{device}?seq={seq}  acknowledge a batch\n";

/// Build the HTTP router around a command queue
pub fn router<S: CommandStore>(queue: CommandQueue<S>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            &format!("{}/:device", protocol::CONTROL_PATH),
            get(poll_commands::<S>).delete(acknowledge::<S>),
        )
        .route("/update/:device", get(update))
        .route("/write", post(write))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(queue)
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body.into()).into_response()
}

async fn index() -> Response {
    text(StatusCode::OK, INDEX)
}

/// Get commands for the device
///
/// The batch is sent back byte for byte; it is not decoded or re-encoded.
async fn poll_commands<S: CommandStore>(
    State(queue): State<CommandQueue<S>>,
    Path(device): Path<String>,
) -> Result<Response, QueueError> {
    let delivery = queue.fetch_commands(&device).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        [
            (HEADER_SEQ, delivery.seq.into_string()),
            (HEADER_DEVICE, device),
        ],
        delivery.commands,
    )
        .into_response())
}

/// Acknowledge processing of commands
async fn acknowledge<S: CommandStore>(
    State(queue): State<CommandQueue<S>>,
    Path(device): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, QueueError> {
    let seq = params
        .get(QUERY_SEQ)
        .filter(|s| !s.is_empty())
        .ok_or(QueueError::NoCommandsFound)?;

    queue.acknowledge(&device, seq).await?;
    Ok(text(StatusCode::OK, ACK_BODY))
}

/// Firmware images are not served
async fn update(Path(device): Path<String>) -> Response {
    text(StatusCode::NOT_FOUND, format!("Unknown device: {device}"))
}

/// Telemetry forwarding is not provided
async fn write() -> Response {
    text(StatusCode::NOT_IMPLEMENTED, "Not implemented.")
}

async fn not_found(uri: Uri) -> Response {
    text(StatusCode::NOT_FOUND, format!("Not found: '{}'", uri.path()))
}
