//! REST collaborator client for the receipt flow.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use brewlink_core::config::ApiConfig;
use brewlink_core::error::AppError;
use brewlink_core::result::AppResult;
use brewlink_core::types::{CafeId, ChannelKey, ReceiptId};

/// Response of receipt initialization: everything one submission run
/// needs to upload and await processing.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptInit {
    /// Identifier of the new receipt.
    pub receipt_id: ReceiptId,
    /// Status topic to join on the receipt channel.
    pub channel_key: ChannelKey,
    /// Pre-signed upload destination. Opaque; collaborator-specific.
    pub upload_url: String,
    /// Storage bucket coordinate, echoed back on completion.
    pub bucket: String,
    /// Storage object coordinate, echoed back on completion.
    pub object_key: String,
}

/// The receipt REST collaborator.
#[async_trait]
pub trait ReceiptApi: Send + Sync {
    /// Initialize a receipt for a cafe/location context.
    async fn initialize(
        &self,
        cafe_id: CafeId,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<ReceiptInit>;

    /// Stream the captured binary to the pre-signed upload target.
    async fn upload(&self, upload_url: &str, content_type: &str, body: Bytes) -> AppResult<()>;

    /// Notify the collaborator that the upload finished. Acknowledgement
    /// only; the real result arrives on the push channel.
    async fn complete(&self, receipt_id: &ReceiptId, bucket: &str, object_key: &str)
    -> AppResult<()>;
}

#[derive(Debug, Serialize)]
struct InitializeRequest {
    cafe_id: CafeId,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    bucket: &'a str,
    object_key: &'a str,
}

/// reqwest-backed implementation of [`ReceiptApi`].
#[derive(Debug, Clone)]
pub struct HttpReceiptApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReceiptApi {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(AppError::from)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert a non-success response into an error carrying the
    /// collaborator's message.
    async fn check(response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .ok()
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        Err(AppError::external_service(message))
    }
}

#[async_trait]
impl ReceiptApi for HttpReceiptApi {
    async fn initialize(
        &self,
        cafe_id: CafeId,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<ReceiptInit> {
        let url = format!("{}/receipts/initialize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&InitializeRequest {
                cafe_id,
                latitude,
                longitude,
            })
            .send()
            .await?;

        let init = Self::check(response).await?.json::<ReceiptInit>().await?;
        debug!(receipt_id = %init.receipt_id, "Receipt initialized");
        Ok(init)
    }

    async fn upload(&self, upload_url: &str, content_type: &str, body: Bytes) -> AppResult<()> {
        let response = self
            .client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn complete(
        &self,
        receipt_id: &ReceiptId,
        bucket: &str,
        object_key: &str,
    ) -> AppResult<()> {
        let url = format!("{}/receipts/{}/complete", self.base_url, receipt_id);
        let response = self
            .client
            .post(&url)
            .json(&CompleteRequest { bucket, object_key })
            .send()
            .await?;

        Self::check(response).await?;
        debug!(receipt_id = %receipt_id, "Upload completion reported");
        Ok(())
    }
}
