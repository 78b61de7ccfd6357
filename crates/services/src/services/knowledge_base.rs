use std::sync::Arc;

use backend::{
    Backend, BackendError, ContentExtractor, ObjectStorage, UploadFile, UploadOptions, WebScraper,
};
use chrono::Local;
use db::{
    RecordStore, StoreError, new_record_id,
    models::{
        document::{CreateDocument, Document, DocumentKind, DocumentStatus},
        knowledge_base::{CreateKnowledgeBase, KnowledgeBase, Totals},
    },
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{RwLock, watch};
use ts_rs::TS;

use super::{
    config::{KnowledgeBaseConfig, TotalsMode},
    dashboard::DashboardService,
};

/// Stored as the content of a file whose text could not be extracted.
pub const EXTRACTION_FAILED: &str = "Content extraction failed";

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Knowledge base not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct UploadProgress {
    pub uploading: bool,
    /// 0 to 100.
    pub percent: f64,
}

/// Sub-steps of processing one file in an upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Started,
    Stored,
    Extracted,
    Recorded,
}

/// Progress published when file `index` of `total` reaches `phase`.
pub fn phase_progress(index: usize, total: usize, phase: UploadPhase) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let fraction = index as f64 / total as f64;
    match phase {
        UploadPhase::Started => fraction * 50.0,
        UploadPhase::Stored => fraction * 75.0,
        UploadPhase::Extracted => fraction * 90.0,
        UploadPhase::Recorded => (index + 1) as f64 / total as f64 * 100.0,
    }
}

#[derive(Debug, Clone)]
struct Selection {
    knowledge_base: KnowledgeBase,
    documents: Vec<Document>,
}

/// Knowledge-base creation, selection and document ingestion.
pub struct KnowledgeBaseService {
    records: Arc<dyn RecordStore>,
    storage: Arc<dyn ObjectStorage>,
    extractor: Arc<dyn ContentExtractor>,
    scraper: Arc<dyn WebScraper>,
    dashboard: Arc<DashboardService>,
    config: KnowledgeBaseConfig,
    selection: RwLock<Option<Selection>>,
    progress: watch::Sender<UploadProgress>,
}

impl KnowledgeBaseService {
    pub fn new(
        backend: &Backend,
        dashboard: Arc<DashboardService>,
        config: KnowledgeBaseConfig,
    ) -> Self {
        let (progress, _) = watch::channel(UploadProgress::default());
        Self {
            records: backend.records.clone(),
            storage: backend.storage.clone(),
            extractor: backend.extractor.clone(),
            scraper: backend.scraper.clone(),
            dashboard,
            config,
            selection: RwLock::new(None),
            progress,
        }
    }

    pub async fn create(
        &self,
        user_id: &str,
        data: &CreateKnowledgeBase,
    ) -> Result<Option<KnowledgeBase>, KnowledgeBaseError> {
        if data.name.trim().is_empty() {
            return Ok(None);
        }
        let id = new_record_id("kb");
        let knowledge_base = KnowledgeBase::create(self.records.as_ref(), user_id, data, &id)
            .await
            .inspect_err(|e| tracing::error!(user_id, error = %e, "Failed to create knowledge base"))?;
        tracing::info!(kb_id = %knowledge_base.id, user_id, "Created knowledge base");

        self.dashboard.refresh().await;
        Ok(Some(knowledge_base))
    }

    /// Makes `knowledge_base` the target of ingestion and loads its documents.
    pub async fn select(&self, knowledge_base: KnowledgeBase) -> Vec<Document> {
        *self.selection.write().await = Some(Selection {
            knowledge_base,
            documents: Vec::new(),
        });
        self.load_documents().await;
        self.documents().await
    }

    /// Drops the selection if it is one of `user_id`'s knowledge bases.
    pub async fn release_user(&self, user_id: &str) {
        let mut selection = self.selection.write().await;
        if selection
            .as_ref()
            .is_some_and(|selection| selection.knowledge_base.user_id == user_id)
        {
            *selection = None;
        }
    }

    pub async fn selected(&self) -> Option<KnowledgeBase> {
        self.selection
            .read()
            .await
            .as_ref()
            .map(|selection| selection.knowledge_base.clone())
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.selection
            .read()
            .await
            .as_ref()
            .map(|selection| selection.documents.clone())
            .unwrap_or_default()
    }

    /// Reloads the selected knowledge base's documents, newest first. On
    /// failure the previous list is kept.
    pub async fn load_documents(&self) {
        let Some(kb_id) = self.selected().await.map(|kb| kb.id) else {
            return;
        };
        match Document::find_by_knowledge_base(self.records.as_ref(), &kb_id, None).await {
            Ok(documents) => {
                let mut selection = self.selection.write().await;
                if let Some(selection) = selection
                    .as_mut()
                    .filter(|selection| selection.knowledge_base.id == kb_id)
                {
                    selection.documents = documents;
                }
            }
            Err(e) => tracing::error!(kb_id = %kb_id, error = %e, "Failed to load documents"),
        }
    }

    pub fn progress(&self) -> UploadProgress {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    fn publish_progress(&self, uploading: bool, percent: f64) {
        self.progress.send_replace(UploadProgress { uploading, percent });
    }

    /// Uploads, extracts and records each file in turn. Totals are applied
    /// once after the loop for every document created, including when the
    /// batch stops early on a storage or record failure.
    pub async fn upload_files(
        &self,
        user_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<Option<Vec<Document>>, KnowledgeBaseError> {
        let Some(knowledge_base) = self.selected().await else {
            return Ok(None);
        };
        if files.is_empty() {
            return Ok(None);
        }

        let total = files.len();
        let mut created = Vec::with_capacity(total);
        let mut failure = None;
        self.publish_progress(true, 0.0);

        for (index, file) in files.iter().enumerate() {
            self.publish_progress(true, phase_progress(index, total, UploadPhase::Started));
            match self.ingest_file(user_id, &knowledge_base, index, total, file).await {
                Ok(document) => created.push(document),
                Err(e) => {
                    tracing::error!(
                        kb_id = %knowledge_base.id,
                        file = %file.name,
                        error = %e,
                        "Upload batch stopped"
                    );
                    failure = Some(e);
                    break;
                }
            }
            self.publish_progress(true, phase_progress(index, total, UploadPhase::Recorded));
        }

        let added_bytes: u64 = created.iter().map(|doc| doc.size).sum();
        let totals_result = if created.is_empty() {
            Ok(())
        } else {
            self.apply_totals(&knowledge_base.id, |kb| {
                kb.totals_after_adding(created.len() as u64, added_bytes)
            })
            .await
            .map(|_| ())
        };
        self.publish_progress(false, 0.0);

        self.load_documents().await;
        self.dashboard.refresh().await;

        if let Some(e) = failure {
            return Err(e);
        }
        totals_result?;
        tracing::info!(
            kb_id = %knowledge_base.id,
            documents = created.len(),
            bytes = added_bytes,
            "Uploaded files"
        );
        Ok(Some(created))
    }

    async fn ingest_file(
        &self,
        user_id: &str,
        knowledge_base: &KnowledgeBase,
        index: usize,
        total: usize,
        file: &UploadFile,
    ) -> Result<Document, KnowledgeBaseError> {
        let path = format!("knowledge-bases/{}/{}", knowledge_base.id, file.name);
        let public_url = self
            .storage
            .upload(file, &path, UploadOptions { upsert: true })
            .await?;
        self.publish_progress(true, phase_progress(index, total, UploadPhase::Stored));

        let content = match self.extractor.extract_text(file).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "Text extraction failed");
                EXTRACTION_FAILED.to_string()
            }
        };
        self.publish_progress(true, phase_progress(index, total, UploadPhase::Extracted));

        let data = CreateDocument {
            knowledge_base_id: knowledge_base.id.clone(),
            user_id: user_id.to_string(),
            name: file.name.clone(),
            kind: DocumentKind::File,
            content,
            source_url: Some(public_url),
            size: file.size(),
            status: DocumentStatus::Ready,
        };
        Ok(Document::create(self.records.as_ref(), &data, &new_record_id("doc")).await?)
    }

    /// Scrapes `url` into a document of the selected knowledge base.
    pub async fn scrape_url(
        &self,
        user_id: &str,
        url: &str,
    ) -> Result<Option<Document>, KnowledgeBaseError> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(None);
        }
        let Some(knowledge_base) = self.selected().await else {
            return Ok(None);
        };

        let page = self
            .scraper
            .scrape(url)
            .await
            .inspect_err(|e| tracing::error!(url, error = %e, "Failed to scrape url"))?;
        let name = page
            .metadata
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| url.to_string());
        let data = CreateDocument {
            knowledge_base_id: knowledge_base.id.clone(),
            user_id: user_id.to_string(),
            name,
            kind: DocumentKind::Url,
            size: page.markdown.len() as u64,
            content: page.markdown,
            source_url: Some(url.to_string()),
            status: DocumentStatus::Ready,
        };
        self.add_document(&knowledge_base.id, data).await.map(Some)
    }

    /// Stores pasted text as a document of the selected knowledge base.
    pub async fn add_text(
        &self,
        user_id: &str,
        text: &str,
    ) -> Result<Option<Document>, KnowledgeBaseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let Some(knowledge_base) = self.selected().await else {
            return Ok(None);
        };

        let data = CreateDocument {
            knowledge_base_id: knowledge_base.id.clone(),
            user_id: user_id.to_string(),
            name: format!("Text Input - {}", Local::now().format("%-m/%-d/%Y")),
            kind: DocumentKind::Text,
            content: text.to_string(),
            source_url: None,
            size: text.len() as u64,
            status: DocumentStatus::Ready,
        };
        self.add_document(&knowledge_base.id, data).await.map(Some)
    }

    async fn add_document(
        &self,
        kb_id: &str,
        data: CreateDocument,
    ) -> Result<Document, KnowledgeBaseError> {
        let document = Document::create(self.records.as_ref(), &data, &new_record_id("doc"))
            .await
            .inspect_err(|e| tracing::error!(kb_id, error = %e, "Failed to create document"))?;
        let size = document.size;
        self.apply_totals(kb_id, |kb| kb.totals_after_adding(1, size))
            .await?;
        tracing::info!(kb_id, doc_id = %document.id, kind = %document.kind, "Added document");

        self.load_documents().await;
        self.dashboard.refresh().await;
        Ok(document)
    }

    pub async fn delete_document(&self, document: &Document) -> Result<(), KnowledgeBaseError> {
        Document::delete(self.records.as_ref(), &document.id)
            .await
            .inspect_err(|e| tracing::error!(doc_id = %document.id, error = %e, "Failed to delete document"))?;
        let size = document.size;
        self.apply_totals(&document.knowledge_base_id, |kb| kb.totals_after_removing(size))
            .await?;
        tracing::info!(doc_id = %document.id, kb_id = %document.knowledge_base_id, "Deleted document");

        self.load_documents().await;
        self.dashboard.refresh().await;
        Ok(())
    }

    /// Simulated retrain: waits, then stamps `updatedAt`.
    pub async fn trigger_retrain(&self, kb_id: &str) -> Result<KnowledgeBase, KnowledgeBaseError> {
        tracing::info!(kb_id, "Retraining knowledge base");
        tokio::time::sleep(self.config.retrain_delay()).await;
        let knowledge_base = KnowledgeBase::touch(self.records.as_ref(), kb_id)
            .await
            .inspect_err(|e| tracing::error!(kb_id, error = %e, "Failed to retrain knowledge base"))?;
        self.replace_selected(&knowledge_base).await;
        self.dashboard.refresh().await;
        Ok(knowledge_base)
    }

    /// Deletes the knowledge base together with its documents.
    pub async fn delete_knowledge_base(&self, kb_id: &str) -> Result<(), KnowledgeBaseError> {
        let records = self.records.as_ref();
        let documents = Document::find_by_knowledge_base(records, kb_id, None).await?;
        for document in &documents {
            Document::delete(records, &document.id).await?;
        }
        KnowledgeBase::delete(records, kb_id)
            .await
            .inspect_err(|e| tracing::error!(kb_id, error = %e, "Failed to delete knowledge base"))?;
        tracing::info!(kb_id, documents = documents.len(), "Deleted knowledge base");

        {
            let mut selection = self.selection.write().await;
            if selection
                .as_ref()
                .is_some_and(|selection| selection.knowledge_base.id == kb_id)
            {
                *selection = None;
            }
        }
        self.dashboard.refresh().await;
        Ok(())
    }

    /// Persists new totals for `kb_id` and swaps the updated record into the
    /// selection.
    async fn apply_totals<F>(&self, kb_id: &str, change: F) -> Result<KnowledgeBase, KnowledgeBaseError>
    where
        F: FnOnce(&KnowledgeBase) -> Totals,
    {
        let totals = match self.config.totals_mode {
            TotalsMode::Incremental => change(&self.totals_base(kb_id).await?),
            TotalsMode::Recompute => {
                let documents =
                    Document::find_by_knowledge_base(self.records.as_ref(), kb_id, None).await?;
                Totals {
                    document_count: documents.len() as u64,
                    total_size: documents.iter().map(|doc| doc.size).sum(),
                }
            }
        };

        let updated = KnowledgeBase::update_totals(self.records.as_ref(), kb_id, totals)
            .await
            .inspect_err(|e| tracing::error!(kb_id, error = %e, "Failed to update totals"))?;
        self.replace_selected(&updated).await;
        Ok(updated)
    }

    /// The selected snapshot when it is `kb_id`, otherwise the stored record.
    async fn totals_base(&self, kb_id: &str) -> Result<KnowledgeBase, KnowledgeBaseError> {
        if let Some(selected) = self.selected().await.filter(|kb| kb.id == kb_id) {
            return Ok(selected);
        }
        KnowledgeBase::find_by_id(self.records.as_ref(), kb_id)
            .await?
            .ok_or(KnowledgeBaseError::NotFound)
    }

    async fn replace_selected(&self, knowledge_base: &KnowledgeBase) {
        let mut selection = self.selection.write().await;
        if let Some(selection) = selection
            .as_mut()
            .filter(|selection| selection.knowledge_base.id == knowledge_base.id)
        {
            selection.knowledge_base = knowledge_base.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use backend::test_support::{Fakes, fake_backend, flaky_backend};

    use super::*;

    const USER: &str = "user_1";

    async fn service_with(
        config: KnowledgeBaseConfig,
    ) -> (KnowledgeBaseService, Arc<DashboardService>, Fakes) {
        let (backend, fakes) = fake_backend().await;
        let dashboard = Arc::new(DashboardService::new(backend.records.clone()));
        dashboard.load_for(USER).await;
        (
            KnowledgeBaseService::new(&backend, dashboard.clone(), config),
            dashboard,
            fakes,
        )
    }

    async fn service() -> (KnowledgeBaseService, Arc<DashboardService>, Fakes) {
        service_with(KnowledgeBaseConfig::default()).await
    }

    async fn create_and_select(service: &KnowledgeBaseService, name: &str) -> KnowledgeBase {
        let kb = service
            .create(
                USER,
                &CreateKnowledgeBase {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        service.select(kb.clone()).await;
        kb
    }

    #[test]
    fn phase_progress_matches_batch_position() {
        assert_eq!(phase_progress(0, 2, UploadPhase::Started), 0.0);
        assert_eq!(phase_progress(1, 2, UploadPhase::Started), 25.0);
        assert_eq!(phase_progress(1, 2, UploadPhase::Stored), 37.5);
        assert_eq!(phase_progress(1, 2, UploadPhase::Extracted), 45.0);
        assert_eq!(phase_progress(0, 2, UploadPhase::Recorded), 50.0);
        assert_eq!(phase_progress(1, 2, UploadPhase::Recorded), 100.0);
        assert_eq!(phase_progress(0, 0, UploadPhase::Recorded), 0.0);
    }

    #[tokio::test]
    async fn blank_name_creates_nothing() {
        let (service, dashboard, _) = service().await;
        let created = service
            .create(
                USER,
                &CreateKnowledgeBase {
                    name: "   ".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(created.is_none());
        assert!(dashboard.knowledge_bases().await.is_empty());
    }

    #[tokio::test]
    async fn create_then_paste_text_updates_totals_and_lists() {
        let (service, dashboard, _) = service().await;
        create_and_select(&service, "Docs").await;
        assert_eq!(dashboard.knowledge_bases().await.len(), 1);

        let document = service.add_text(USER, "hello").await.unwrap().unwrap();
        assert_eq!(document.kind, DocumentKind::Text);
        assert_eq!(document.size, 5);
        assert!(document.name.starts_with("Text Input - "));

        let kb = service.selected().await.unwrap();
        assert_eq!(kb.document_count, 1);
        assert_eq!(kb.total_size, 5);
        let documents = service.documents().await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, document.id);
        assert_eq!(dashboard.knowledge_bases().await[0].total_size, 5);
    }

    #[tokio::test]
    async fn failed_document_reload_keeps_the_previous_list() {
        let (backend, _, flaky) = flaky_backend().await;
        let dashboard = Arc::new(DashboardService::new(backend.records.clone()));
        let service = KnowledgeBaseService::new(&backend, dashboard, KnowledgeBaseConfig::default());
        let kb = create_and_select(&service, "Docs").await;
        let first = service.add_text(USER, "hello").await.unwrap().unwrap();

        let data = CreateDocument {
            knowledge_base_id: kb.id.clone(),
            user_id: USER.to_string(),
            name: "Later".to_string(),
            kind: DocumentKind::Text,
            content: "world".to_string(),
            source_url: None,
            size: 5,
            status: DocumentStatus::Ready,
        };
        Document::create(backend.records.as_ref(), &data, "doc_later")
            .await
            .unwrap();

        flaky.set_fail_list(true);
        service.load_documents().await;
        let ids: Vec<_> = service.documents().await.into_iter().map(|doc| doc.id).collect();
        assert_eq!(ids, vec![first.id]);

        flaky.set_fail_list(false);
        service.load_documents().await;
        assert_eq!(service.documents().await.len(), 2);
    }

    #[tokio::test]
    async fn blank_text_and_missing_selection_are_ignored() {
        let (service, _, _) = service().await;
        assert!(service.add_text(USER, "hello").await.unwrap().is_none());
        create_and_select(&service, "Docs").await;
        assert!(service.add_text(USER, "  \n").await.unwrap().is_none());
        assert_eq!(service.selected().await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn sequential_upload_counts_every_file_even_when_extraction_fails() {
        let (service, _, fakes) = service().await;
        let kb = create_and_select(&service, "Docs").await;
        fakes.extractor.fail_on("scan.pdf");

        let files = vec![
            UploadFile::new("a.txt", b"alpha".to_vec()),
            UploadFile::new("scan.pdf", vec![0u8; 120]),
            UploadFile::new("b.md", b"# bee".to_vec()),
        ];
        let created = service.upload_files(USER, files).await.unwrap().unwrap();
        assert_eq!(created.len(), 3);

        let kb_after = service.selected().await.unwrap();
        assert_eq!(kb_after.document_count, 3);
        assert_eq!(kb_after.total_size, 5 + 120 + 5);

        let scan = created.iter().find(|doc| doc.name == "scan.pdf").unwrap();
        assert_eq!(scan.content, EXTRACTION_FAILED);
        assert_eq!(
            fakes.storage.uploaded_paths(),
            vec![
                format!("knowledge-bases/{}/a.txt", kb.id),
                format!("knowledge-bases/{}/scan.pdf", kb.id),
                format!("knowledge-bases/{}/b.md", kb.id),
            ]
        );
        assert_eq!(service.documents().await.len(), 3);
        assert_eq!(service.progress(), UploadProgress::default());
    }

    #[tokio::test]
    async fn storage_failure_stops_the_batch_and_returns_the_error() {
        let (service, _, fakes) = service().await;
        create_and_select(&service, "Docs").await;
        fakes.storage.fail.store(true, Ordering::SeqCst);

        let result = service
            .upload_files(USER, vec![UploadFile::new("a.txt", b"alpha".to_vec())])
            .await;
        assert!(matches!(result, Err(KnowledgeBaseError::Backend(_))));
        assert_eq!(service.selected().await.unwrap().document_count, 0);
        assert!(service.documents().await.is_empty());
        assert!(!service.progress().uploading);
    }

    #[tokio::test]
    async fn empty_upload_is_a_no_op() {
        let (service, _, _) = service().await;
        create_and_select(&service, "Docs").await;
        assert!(service.upload_files(USER, Vec::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scrape_names_document_by_title_or_url() {
        let (service, _, fakes) = service().await;
        create_and_select(&service, "Docs").await;

        let untitled = service
            .scrape_url(USER, "https://example.com/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untitled.name, "https://example.com/a");
        assert_eq!(untitled.kind, DocumentKind::Url);
        assert_eq!(untitled.source_url.as_deref(), Some("https://example.com/a"));

        *fakes.scraper.title.lock().unwrap() = Some("Example Page".to_string());
        let titled = service
            .scrape_url(USER, "https://example.com/b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(titled.name, "Example Page");

        let kb = service.selected().await.unwrap();
        assert_eq!(kb.document_count, 2);
        assert_eq!(kb.total_size, untitled.size + titled.size);
        assert!(service.scrape_url(USER, " ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn scrape_failure_is_returned_and_nothing_is_recorded() {
        let (service, _, fakes) = service().await;
        create_and_select(&service, "Docs").await;
        fakes.scraper.fail.store(true, Ordering::SeqCst);

        let result = service.scrape_url(USER, "https://example.com").await;
        assert!(matches!(result, Err(KnowledgeBaseError::Backend(_))));
        assert_eq!(service.selected().await.unwrap().document_count, 0);
    }

    #[tokio::test]
    async fn deleting_clamps_totals_at_zero() {
        let (service, _, _) = service().await;
        create_and_select(&service, "Docs").await;
        let document = service.add_text(USER, "hello world").await.unwrap().unwrap();

        let mut oversized = document.clone();
        oversized.size = 1_000;
        service.delete_document(&oversized).await.unwrap();

        let kb = service.selected().await.unwrap();
        assert_eq!(kb.document_count, 0);
        assert_eq!(kb.total_size, 0);
        assert!(service.documents().await.is_empty());
    }

    #[tokio::test]
    async fn recompute_mode_uses_the_document_list() {
        let (service, _, _) = service_with(KnowledgeBaseConfig {
            totals_mode: TotalsMode::Recompute,
            ..Default::default()
        })
        .await;
        create_and_select(&service, "Docs").await;
        service.add_text(USER, "abc").await.unwrap();
        let second = service.add_text(USER, "defgh").await.unwrap().unwrap();
        assert_eq!(service.selected().await.unwrap().total_size, 8);

        service.delete_document(&second).await.unwrap();
        let kb = service.selected().await.unwrap();
        assert_eq!(kb.document_count, 1);
        assert_eq!(kb.total_size, 3);
    }

    #[tokio::test]
    async fn retrain_waits_then_stamps_updated_at() {
        let (service, _, _) = service_with(KnowledgeBaseConfig {
            retrain_delay_ms: 20,
            ..Default::default()
        })
        .await;
        let kb = create_and_select(&service, "Docs").await;

        let started = std::time::Instant::now();
        let retrained = service.trigger_retrain(&kb.id).await.unwrap();
        assert!(started.elapsed() >= service.config.retrain_delay());
        assert!(retrained.updated_at.is_some());
        assert_eq!(service.selected().await.unwrap().updated_at, retrained.updated_at);
    }

    #[tokio::test]
    async fn deleting_a_knowledge_base_removes_its_documents_and_selection() {
        let (service, dashboard, fakes) = service().await;
        let kb = create_and_select(&service, "Docs").await;
        service.add_text(USER, "hello").await.unwrap();

        service.delete_knowledge_base(&kb.id).await.unwrap();
        assert!(service.selected().await.is_none());
        assert!(dashboard.knowledge_bases().await.is_empty());
        assert!(
            Document::find_by_knowledge_base(fakes.records.as_ref(), &kb.id, None)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
