use super::client::{ClientError, HttpClient};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Client error: {0}")]
    ClientError(#[from] ClientError),
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Collector rejected batch: HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionResult {
    pub status_code: u16,
    pub latency: Duration,
    pub bytes_sent: usize,
}

/// Single best-effort delivery of one serialized batch.
///
/// Implementations do not retry; the caller decides what a failure means.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: &str) -> Result<TransmissionResult, TransmissionError>;
}

/// POSTs batches as `application/json` to the configured collector endpoint.
#[derive(Debug, Clone)]
pub struct BatchTransmitter {
    pub client: HttpClient,
}

impl BatchTransmitter {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn build_headers(&self) -> Result<HeaderMap, TransmissionError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        headers.insert(
            HeaderName::from_static("x-logger-version"),
            HeaderValue::from_str(env!("CARGO_PKG_VERSION")).map_err(|e| {
                TransmissionError::InvalidHeaderValue(format!("Invalid version: {}", e))
            })?,
        );

        Ok(headers)
    }
}

#[async_trait]
impl Transport for BatchTransmitter {
    async fn send(&self, payload: &str) -> Result<TransmissionResult, TransmissionError> {
        let start = Instant::now();
        let bytes_sent = payload.len();
        let headers = self.build_headers()?;

        debug!("Sending batch ({} bytes) to {}", bytes_sent, self.client.endpoint());

        let response = match self
            .client
            .client
            .post(self.client.endpoint_url.clone())
            .headers(headers)
            .body(payload.to_owned())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.client.stats.record_request(false, start.elapsed());
                return Err(e.into());
            }
        };

        let latency = start.elapsed();
        let status_code = response.status().as_u16();
        let success = response.status().is_success();
        self.client.stats.record_request(success, latency);

        if !success {
            warn!("Collector answered HTTP {} for batch", status_code);
            return Err(TransmissionError::HttpStatus {
                status: status_code,
            });
        }

        debug!("Sent batch ({} bytes) in {:?}", bytes_sent, latency);
        Ok(TransmissionResult {
            status_code,
            latency,
            bytes_sent,
        })
    }
}
