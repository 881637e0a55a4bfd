//! Image attachments
//!
//! Downloads a user-supplied attachment and turns it into an inline data
//! block the model can read. Failures are never fatal: the question is
//! simply sent without the image.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::llm::InlineData;

/// MIME type assumed when the platform does not report one
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// A file the user attached to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl Attachment {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
            filename: None,
        }
    }
}

#[async_trait]
pub trait AttachmentFetcher: Send + Sync {
    /// Download `url` as base64 inline data, `None` on any failure
    async fn fetch(&self, url: &str, content_type: Option<&str>) -> Option<InlineData>;
}

/// Fetches attachments over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpAttachmentFetcher {
    client: reqwest::Client,
}

impl HttpAttachmentFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AttachmentFetcher for HttpAttachmentFetcher {
    async fn fetch(&self, url: &str, content_type: Option<&str>) -> Option<InlineData> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to download attachment: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Attachment download returned {}", response.status());
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to read attachment body: {}", e);
                return None;
            }
        };

        debug!("Fetched {} byte attachment", bytes.len());

        Some(InlineData {
            mime_type: content_type
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME)
                .to_string(),
            data: STANDARD.encode(&bytes),
        })
    }
}
