use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use backend::{Backend, HttpBackend, LocalObjectStorage};
use db::{RecordStore, SqliteRecordStore};
use secrecy::SecretString;
use services::services::{
    analytics::{AnalyticsService, StaticAnalyticsSource},
    chatbots::ChatbotService,
    config::{Config, ObjectStorageKind, RecordStoreKind},
    dashboard::DashboardService,
    integrations::{IntegrationService, SimulatedConnector},
    knowledge_base::KnowledgeBaseService,
    session::{SessionContext, Subscription},
    test_chat::TestChat,
};
use tokio::sync::RwLock;
use utils::assets::asset_dir;

/// Every panel service of the single-user dashboard host, wired to one
/// backend and one session.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    records: Arc<dyn RecordStore>,
    session: SessionContext,
    dashboard: Arc<DashboardService>,
    knowledge_bases: Arc<KnowledgeBaseService>,
    chatbots: Arc<ChatbotService>,
    test_chat: Arc<TestChat>,
    integrations: Arc<IntegrationService>,
    analytics: Arc<AnalyticsService>,
    _watchers: Arc<Vec<Subscription>>,
}

impl LocalDeployment {
    /// Builds the backend described by `config`: the hosted API, optionally
    /// with records and files kept locally.
    pub async fn connect(config: Config, api_key: Option<SecretString>) -> anyhow::Result<Self> {
        let hosted = Arc::new(
            HttpBackend::new(
                config.backend.base_url.clone(),
                config.backend.project_id.clone(),
                api_key,
            )
            .context("failed to build backend client")?,
        );
        let mut backend = Backend::hosted(hosted);

        if config.backend.record_store == RecordStoreKind::Sqlite {
            let url = config.backend.sqlite_url.clone().unwrap_or_else(|| {
                format!("sqlite://{}", asset_dir().join("records.db").display())
            });
            let store = SqliteRecordStore::connect(&url)
                .await
                .with_context(|| format!("failed to open record store at {url}"))?;
            tracing::info!(%url, "Using local record store");
            backend = backend.with_records(Arc::new(store));
        }
        if config.backend.object_storage == ObjectStorageKind::Local {
            let root = config
                .backend
                .storage_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| asset_dir().join("storage"));
            tracing::info!(root = %root.display(), "Using local object storage");
            backend = backend.with_storage(Arc::new(LocalObjectStorage::new(root)));
        }

        Ok(Self::new(config, backend))
    }

    /// Must be called inside a tokio runtime; session watchers are spawned.
    pub fn new(config: Config, backend: Backend) -> Self {
        let session = SessionContext::new(backend.auth.clone());
        let dashboard = Arc::new(DashboardService::new(backend.records.clone()));
        let knowledge_bases = Arc::new(KnowledgeBaseService::new(
            &backend,
            dashboard.clone(),
            config.knowledge_base.clone(),
        ));
        let test_chat = Arc::new(TestChat::new(&backend, config.chat.context_document_limit));
        let chatbots = Arc::new(ChatbotService::new(
            backend.records.clone(),
            dashboard.clone(),
            test_chat.clone(),
            config.chat.chatbot_defaults(),
            config.embed_origin.clone(),
        ));
        let integrations = Arc::new(IntegrationService::new(Arc::new(SimulatedConnector::new(
            config.integrations.setup_delay(),
            config.integrations.webhook_base_url.clone(),
        ))));
        let analytics = Arc::new(AnalyticsService::new(Arc::new(StaticAnalyticsSource::new(
            config.analytics.loading_delay(),
        ))));

        let dashboard_watch = dashboard.watch_session(&session);
        // Session-local panel state belongs to the user who opened it.
        let panels_watch = session.on_user_switch({
            let knowledge_bases = knowledge_bases.clone();
            let test_chat = test_chat.clone();
            let integrations = integrations.clone();
            move |previous| {
                let knowledge_bases = knowledge_bases.clone();
                let test_chat = test_chat.clone();
                let integrations = integrations.clone();
                async move {
                    knowledge_bases.release_user(&previous).await;
                    test_chat.release_user(&previous).await;
                    integrations.release_user(&previous).await;
                }
            }
        });

        Self {
            config: Arc::new(RwLock::new(config)),
            records: backend.records.clone(),
            session,
            dashboard,
            knowledge_bases,
            chatbots,
            test_chat,
            integrations,
            analytics,
            _watchers: Arc::new(vec![dashboard_watch, panels_watch]),
        }
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn dashboard(&self) -> &Arc<DashboardService> {
        &self.dashboard
    }

    pub fn knowledge_bases(&self) -> &Arc<KnowledgeBaseService> {
        &self.knowledge_bases
    }

    pub fn chatbots(&self) -> &Arc<ChatbotService> {
        &self.chatbots
    }

    pub fn test_chat(&self) -> &Arc<TestChat> {
        &self.test_chat
    }

    pub fn integrations(&self) -> &Arc<IntegrationService> {
        &self.integrations
    }

    pub fn analytics(&self) -> &Arc<AnalyticsService> {
        &self.analytics
    }
}
