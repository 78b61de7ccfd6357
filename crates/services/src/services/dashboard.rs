use std::sync::Arc;

use backend::AuthState;
use db::{
    RecordStore,
    models::{chatbot::Chatbot, knowledge_base::KnowledgeBase},
};
use serde::Serialize;
use tokio::sync::RwLock;
use ts_rs::TS;

use super::{
    format::format_size,
    session::{SessionContext, Subscription},
};

const RECENT_LIMIT: usize = 3;

/// Lists shown across the dashboard panels for the signed-in user.
#[derive(Debug, Clone, Default, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardState {
    pub user_id: Option<String>,
    pub knowledge_bases: Vec<KnowledgeBase>,
    pub chatbots: Vec<Chatbot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RecentKnowledgeBase {
    pub id: String,
    pub name: String,
    #[ts(type = "number")]
    pub document_count: u64,
    pub size_label: String,
    pub retrain_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RecentChatbot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub visibility_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardOverview {
    pub knowledge_base_count: usize,
    pub chatbot_count: usize,
    #[ts(type = "number")]
    pub total_documents: u64,
    #[ts(type = "number")]
    pub total_size: u64,
    pub total_size_label: String,
    pub recent_knowledge_bases: Vec<RecentKnowledgeBase>,
    pub recent_chatbots: Vec<RecentChatbot>,
}

impl DashboardOverview {
    pub fn from_state(state: &DashboardState) -> Self {
        let total_documents = state
            .knowledge_bases
            .iter()
            .map(|kb| kb.document_count)
            .sum();
        let total_size = state.knowledge_bases.iter().map(|kb| kb.total_size).sum();

        let recent_knowledge_bases = state
            .knowledge_bases
            .iter()
            .take(RECENT_LIMIT)
            .map(|kb| RecentKnowledgeBase {
                id: kb.id.clone(),
                name: kb.name.clone(),
                document_count: kb.document_count,
                size_label: format_size(kb.total_size),
                retrain_label: if kb.auto_retrain { "Auto-retrain" } else { "Manual" }.to_string(),
            })
            .collect();
        let recent_chatbots = state
            .chatbots
            .iter()
            .take(RECENT_LIMIT)
            .map(|bot| RecentChatbot {
                id: bot.id.clone(),
                name: bot.name.clone(),
                description: bot.description.clone(),
                visibility_label: if bot.is_public { "Public" } else { "Private" }.to_string(),
            })
            .collect();

        Self {
            knowledge_base_count: state.knowledge_bases.len(),
            chatbot_count: state.chatbots.len(),
            total_documents,
            total_size,
            total_size_label: format_size(total_size),
            recent_knowledge_bases,
            recent_chatbots,
        }
    }
}

/// Loads and holds the signed-in user's knowledge bases and chatbots.
pub struct DashboardService {
    records: Arc<dyn RecordStore>,
    state: RwLock<DashboardState>,
}

impl DashboardService {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub async fn snapshot(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    pub async fn overview(&self) -> DashboardOverview {
        DashboardOverview::from_state(&*self.state.read().await)
    }

    pub async fn knowledge_bases(&self) -> Vec<KnowledgeBase> {
        self.state.read().await.knowledge_bases.clone()
    }

    pub async fn chatbots(&self) -> Vec<Chatbot> {
        self.state.read().await.chatbots.clone()
    }

    /// Loads the lists for `user_id` unless they are already held for that user.
    pub async fn load_for(&self, user_id: &str) {
        {
            let mut state = self.state.write().await;
            if state.user_id.as_deref() == Some(user_id) {
                return;
            }
            *state = DashboardState {
                user_id: Some(user_id.to_string()),
                ..Default::default()
            };
        }
        self.reload(user_id).await;
    }

    /// Re-queries both lists for `user_id`, switching to that user if needed.
    pub async fn reload_for(&self, user_id: &str) {
        let held = self.state.read().await.user_id.as_deref() == Some(user_id);
        if held {
            self.reload(user_id).await;
        } else {
            self.load_for(user_id).await;
        }
    }

    /// Reloads both lists for the current user.
    pub async fn refresh(&self) {
        let user_id = self.state.read().await.user_id.clone();
        if let Some(user_id) = user_id {
            self.reload(&user_id).await;
        }
    }

    pub async fn clear(&self) {
        *self.state.write().await = DashboardState::default();
    }

    pub async fn apply_auth_state(&self, auth: &AuthState) {
        match &auth.user {
            Some(user) => self.load_for(&user.id).await,
            None if !auth.is_loading => self.clear().await,
            None => {}
        }
    }

    /// Keeps the lists in step with the session until the subscription drops.
    pub fn watch_session(self: &Arc<Self>, session: &SessionContext) -> Subscription {
        let mut rx = session.changes();
        let dashboard = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                let auth = rx.borrow_and_update().clone();
                dashboard.apply_auth_state(&auth).await;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        Subscription::from_task(task)
    }

    async fn reload(&self, user_id: &str) {
        let records = self.records.as_ref();
        let (knowledge_bases, chatbots) = tokio::join!(
            KnowledgeBase::find_by_user(records, user_id),
            Chatbot::find_by_user(records, user_id),
        );

        let mut state = self.state.write().await;
        if state.user_id.as_deref() != Some(user_id) {
            return;
        }
        match knowledge_bases {
            Ok(knowledge_bases) => state.knowledge_bases = knowledge_bases,
            Err(e) => tracing::error!(user_id, error = %e, "Failed to load knowledge bases"),
        }
        match chatbots {
            Ok(chatbots) => state.chatbots = chatbots,
            Err(e) => tracing::error!(user_id, error = %e, "Failed to load chatbots"),
        }
    }
}
