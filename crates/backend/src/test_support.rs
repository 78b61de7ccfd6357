//! In-process fakes for every backend collaborator, backed by an in-memory
//! SQLite record store.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use db::{Collection, ListQuery, RecordStore, SqliteRecordStore, StoreError};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    Backend,
    auth::{AuthClient, AuthState, Credentials, User},
    content::{
        ContentExtractor, GenerateTextRequest, GenerateTextResponse, ScrapeMetadata, ScrapeResult,
        TextGenerator, WebScraper,
    },
    error::BackendError,
    storage::{ObjectStorage, UploadFile, UploadOptions},
};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Accepts any token and signs in as `user_<token>`.
pub struct FakeAuth {
    tx: watch::Sender<AuthState>,
}

impl Default for FakeAuth {
    fn default() -> Self {
        let (tx, _) = watch::channel(AuthState::loading());
        Self { tx }
    }
}

impl FakeAuth {
    pub fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            display_name: None,
        }
    }

    /// Publishes a state without going through login.
    pub fn publish(&self, state: AuthState) {
        self.tx.send_replace(state);
    }
}

#[async_trait]
impl AuthClient for FakeAuth {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    async fn login(&self, credentials: Credentials) -> Result<User, BackendError> {
        use secrecy::ExposeSecret;
        let token = credentials.token.expose_secret();
        if token.is_empty() {
            self.tx.send_replace(AuthState::signed_out());
            return Err(BackendError::Unauthenticated);
        }
        let user = Self::user(&format!("user_{token}"));
        self.tx.send_replace(AuthState::signed_in(user.clone()));
        Ok(user)
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.tx.send_replace(AuthState::signed_out());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub fail: AtomicBool,
    pub uploads: Mutex<Vec<String>>,
}

impl FakeStorage {
    pub fn uploaded_paths(&self) -> Vec<String> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        _file: &UploadFile,
        path: &str,
        _options: UploadOptions,
    ) -> Result<String, BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("storage unavailable".to_string()));
        }
        lock(&self.uploads).push(path.to_string());
        Ok(format!("https://storage.test/{path}"))
    }
}

/// Delegates to `inner`, except that `list` fails while `fail_list` is set.
pub struct FlakyRecordStore {
    pub inner: Arc<dyn RecordStore>,
    pub fail_list: AtomicBool,
}

impl FlakyRecordStore {
    pub fn new(inner: Arc<dyn RecordStore>) -> Self {
        Self {
            inner,
            fail_list: AtomicBool::new(false),
        }
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        self.inner.create(collection, record).await
    }

    async fn list(&self, collection: Collection, query: ListQuery) -> Result<Vec<Value>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(format!("{collection} unavailable")));
        }
        self.inner.list(collection, query).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<Value, StoreError> {
        self.inner.update(collection, id, fields).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.inner.delete(collection, id).await
    }
}

/// Like [`fake_backend`], but records go through a [`FlakyRecordStore`].
pub async fn flaky_backend() -> (Backend, Fakes, Arc<FlakyRecordStore>) {
    let (mut backend, fakes) = fake_backend().await;
    let flaky = Arc::new(FlakyRecordStore::new(fakes.records.clone()));
    let records: Arc<dyn RecordStore> = flaky.clone();
    backend.records = records;
    (backend, fakes, flaky)
}

/// Returns the file's bytes as UTF-8, or fails for names in `failing`.
#[derive(Default)]
pub struct FakeExtractor {
    pub failing: Mutex<HashSet<String>>,
}

impl FakeExtractor {
    pub fn fail_on(&self, name: &str) {
        lock(&self.failing).insert(name.to_string());
    }
}

#[async_trait]
impl ContentExtractor for FakeExtractor {
    async fn extract_text(&self, file: &UploadFile) -> Result<String, BackendError> {
        if lock(&self.failing).contains(&file.name) {
            return Err(BackendError::Rejected(format!("cannot extract {}", file.name)));
        }
        Ok(String::from_utf8_lossy(&file.bytes).into_owned())
    }
}

#[derive(Default)]
pub struct FakeScraper {
    pub fail: AtomicBool,
    pub title: Mutex<Option<String>>,
}

#[async_trait]
impl WebScraper for FakeScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected(format!("cannot scrape {url}")));
        }
        Ok(ScrapeResult {
            markdown: format!("# Scraped\n\nContent of {url}"),
            metadata: ScrapeMetadata {
                title: lock(&self.title).clone(),
            },
        })
    }
}

/// Replies with a scripted answer and records every request.
pub struct FakeGenerator {
    pub reply: Mutex<Result<String, String>>,
    pub requests: Mutex<Vec<GenerateTextRequest>>,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self {
            reply: Mutex::new(Ok("Hello from the bot".to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGenerator {
    pub fn reply_with(&self, text: &str) {
        *lock(&self.reply) = Ok(text.to_string());
    }

    pub fn fail_with(&self, message: &str) {
        *lock(&self.reply) = Err(message.to_string());
    }

    pub fn recorded(&self) -> Vec<GenerateTextRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate_text(
        &self,
        request: &GenerateTextRequest,
    ) -> Result<GenerateTextResponse, BackendError> {
        lock(&self.requests).push(request.clone());
        match &*lock(&self.reply) {
            Ok(text) => Ok(GenerateTextResponse { text: text.clone() }),
            Err(message) => Err(BackendError::Rejected(message.clone())),
        }
    }
}

/// Handles to the fakes behind a [`Backend`] built by [`fake_backend`].
#[derive(Clone)]
pub struct Fakes {
    pub auth: Arc<FakeAuth>,
    pub records: Arc<SqliteRecordStore>,
    pub storage: Arc<FakeStorage>,
    pub extractor: Arc<FakeExtractor>,
    pub scraper: Arc<FakeScraper>,
    pub generator: Arc<FakeGenerator>,
}

pub async fn fake_backend() -> (Backend, Fakes) {
    let records = Arc::new(
        SqliteRecordStore::in_memory()
            .await
            .expect("in-memory record store"),
    );
    let fakes = Fakes {
        auth: Arc::new(FakeAuth::default()),
        records,
        storage: Arc::new(FakeStorage::default()),
        extractor: Arc::new(FakeExtractor::default()),
        scraper: Arc::new(FakeScraper::default()),
        generator: Arc::new(FakeGenerator::default()),
    };
    let backend = Backend {
        auth: fakes.auth.clone(),
        records: fakes.records.clone(),
        storage: fakes.storage.clone(),
        extractor: fakes.extractor.clone(),
        scraper: fakes.scraper.clone(),
        generator: fakes.generator.clone(),
    };
    (backend, fakes)
}
