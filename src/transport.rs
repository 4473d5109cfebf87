//! Transfer of one dataset to the analysis service

use crate::error::TransportError;
use crate::response::RawResponse;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::{debug, instrument};

/// Path of the analysis endpoint, relative to the service base URL.
pub const ANALYZE_PATH: &str = "/api/analyze";

/// Name of the single multipart field carrying the dataset.
pub const FILE_FIELD: &str = "file";

/// The request body for one submission.
#[derive(Clone, PartialEq, Eq)]
pub struct TransferPayload {
    pub field: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for TransferPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferPayload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One request/response exchange with the analysis service. Implementations
/// make exactly one attempt and never retry.
#[async_trait]
pub trait AnalysisTransport {
    async fn send(&self, payload: TransferPayload) -> Result<RawResponse, TransportError>;
}

/// Multipart POST over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Build a transport for the service at `base_url`. Timeouts are left
    /// to the client's defaults.
    pub fn new(base_url: &Url) -> Result<Self, TransportError> {
        let endpoint = base_url
            .join(ANALYZE_PATH)
            .map_err(|e| TransportError::Client(e.to_string()))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, file = %payload.file_name))]
    async fn send(&self, payload: TransferPayload) -> Result<RawResponse, TransportError> {
        let part = Part::bytes(payload.bytes).file_name(payload.file_name);
        let form = Form::new().part(payload.field, part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        debug!(status, len = body.len(), "analysis service answered");

        Ok(RawResponse::new(status, body.to_vec()))
    }
}
