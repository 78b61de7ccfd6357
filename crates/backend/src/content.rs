use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::BackendError, storage::UploadFile};

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract_text(&self, file: &UploadFile) -> Result<String, BackendError>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub markdown: String,
    #[serde(default)]
    pub metadata: ScrapeMetadata,
}

#[async_trait]
pub trait WebScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, BackendError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTextRequest {
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateTextResponse {
    pub text: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        request: &GenerateTextRequest,
    ) -> Result<GenerateTextResponse, BackendError>;
}
