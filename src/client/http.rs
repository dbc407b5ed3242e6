//! HTTP implementation of the control API

use super::traits::{Ack, ClientError, ControlApi, Poll};
use async_trait::async_trait;
use gadget_shared::{
    protocol::{self, DEVICE_UNKNOWN_PREFIX, HEADER_SEQ, QUERY_SEQ},
    DeviceId, SeqToken,
};
use reqwest::StatusCode;
use std::time::Duration;

/// Client for a gadget server reachable over HTTP
pub struct HttpControlClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpControlClient {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:8086`)
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn control_url(&self, device: &DeviceId) -> String {
        format!("{}{}", self.base_url, protocol::control_path(device.as_str()))
    }
}

/// Interpret a poll response
fn parse_poll(status: StatusCode, seq: Option<&str>, body: Vec<u8>) -> Result<Poll, ClientError> {
    match status {
        StatusCode::OK => {
            let seq = seq.ok_or(ClientError::MissingSeqHeader)?;
            Ok(Poll::Commands {
                seq: SeqToken::new(seq.trim())?,
                body,
            })
        }
        StatusCode::NOT_FOUND if body.starts_with(DEVICE_UNKNOWN_PREFIX.as_bytes()) => {
            Ok(Poll::UnknownDevice)
        }
        StatusCode::NOT_FOUND => Ok(Poll::NoCommands),
        other => Err(ClientError::UnexpectedStatus {
            status: other.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        }),
    }
}

/// Interpret an acknowledgement response
fn parse_ack(status: StatusCode, body: String) -> Result<Ack, ClientError> {
    match status {
        StatusCode::OK => Ok(Ack::Acknowledged),
        StatusCode::NOT_FOUND => Ok(Ack::AlreadyAcknowledged),
        other => Err(ClientError::UnexpectedStatus {
            status: other.as_u16(),
            body,
        }),
    }
}

#[async_trait]
impl ControlApi for HttpControlClient {
    async fn poll(&self, device: &DeviceId) -> Result<Poll, ClientError> {
        let response = self.http.get(self.control_url(device)).send().await?;
        let status = response.status();
        let seq = response
            .headers()
            .get(HEADER_SEQ)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        parse_poll(status, seq.as_deref(), body)
    }

    async fn acknowledge(&self, device: &DeviceId, seq: &SeqToken) -> Result<Ack, ClientError> {
        let response = self
            .http
            .delete(self.control_url(device))
            .query(&[(QUERY_SEQ, seq.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        parse_ack(status, body)
    }
}
