//! Client contract for the hosted backend-as-a-service.
//!
//! Every data operation of the dashboard goes through one of these traits:
//! the auth stream, the record store (defined in `db`), object storage,
//! content extraction, web scraping and text generation. [`HttpBackend`]
//! implements all of them against the hosted API.

use std::sync::Arc;

use db::RecordStore;

pub mod auth;
pub mod content;
pub mod error;
pub mod http;
pub mod storage;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use auth::{AuthClient, AuthState, Credentials, User};
pub use content::{
    ContentExtractor, GenerateTextRequest, GenerateTextResponse, ScrapeMetadata, ScrapeResult,
    TextGenerator, WebScraper,
};
pub use error::BackendError;
pub use http::HttpBackend;
pub use storage::{LocalObjectStorage, ObjectStorage, UploadFile, UploadOptions};

/// One handle per collaborator, shared by every panel.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthClient>,
    pub records: Arc<dyn RecordStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub scraper: Arc<dyn WebScraper>,
    pub generator: Arc<dyn TextGenerator>,
}

impl Backend {
    /// Every concern served by the hosted API.
    pub fn hosted(client: Arc<HttpBackend>) -> Self {
        Self {
            auth: client.clone(),
            records: client.clone(),
            storage: client.clone(),
            extractor: client.clone(),
            scraper: client.clone(),
            generator: client,
        }
    }

    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }
}
