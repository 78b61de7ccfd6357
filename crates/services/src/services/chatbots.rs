use std::sync::Arc;

use db::{
    RecordStore, StoreError, new_record_id,
    models::{
        chatbot::{Chatbot, ChatbotDefaults, CreateChatbot},
        knowledge_base::KnowledgeBase,
    },
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use super::{dashboard::DashboardService, test_chat::TestChat};

#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Knowledge base not found")]
    KnowledgeBaseNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ModelOption {
    pub id: String,
    pub label: String,
}

pub fn available_models() -> Vec<ModelOption> {
    [
        ("gpt-4o-mini", "GPT-4o Mini (Fast)"),
        ("gpt-4o", "GPT-4o (Balanced)"),
        ("gpt-4.1", "GPT-4.1 (Advanced)"),
    ]
    .into_iter()
    .map(|(id, label)| ModelOption {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect()
}

/// HTML snippet that embeds the chatbot widget served under `origin`.
pub fn embed_code(origin: &str, bot_id: &str) -> String {
    format!(
        "<iframe\n  src=\"{}/embed/chatbot/{bot_id}\"\n  width=\"400\"\n  height=\"600\"\n  frameborder=\"0\"\n  style=\"border-radius: 8px; box-shadow: 0 4px 12px rgba(0,0,0,0.1);\">\n</iframe>",
        origin.trim_end_matches('/')
    )
}

pub fn knowledge_base_name(knowledge_bases: &[KnowledgeBase], kb_id: &str) -> String {
    knowledge_bases
        .iter()
        .find(|kb| kb.id == kb_id)
        .map(|kb| kb.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub struct ChatbotService {
    records: Arc<dyn RecordStore>,
    dashboard: Arc<DashboardService>,
    test_chat: Arc<TestChat>,
    defaults: ChatbotDefaults,
    embed_origin: String,
}

impl ChatbotService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        dashboard: Arc<DashboardService>,
        test_chat: Arc<TestChat>,
        defaults: ChatbotDefaults,
        embed_origin: String,
    ) -> Self {
        Self {
            records,
            dashboard,
            test_chat,
            defaults,
            embed_origin,
        }
    }

    /// Creates a chatbot over one of the user's knowledge bases. A blank name
    /// or missing knowledge base creates nothing.
    pub async fn create(
        &self,
        user_id: &str,
        data: &CreateChatbot,
    ) -> Result<Option<Chatbot>, ChatbotError> {
        let Some(kb_id) = data
            .knowledge_base_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            return Ok(None);
        };
        if data.name.trim().is_empty() {
            return Ok(None);
        }

        let owned = KnowledgeBase::find_by_id(self.records.as_ref(), kb_id)
            .await?
            .is_some_and(|kb| kb.user_id == user_id);
        if !owned {
            return Err(ChatbotError::KnowledgeBaseNotFound);
        }

        let id = new_record_id("bot");
        let chatbot = Chatbot::create(
            self.records.as_ref(),
            user_id,
            kb_id,
            data,
            &self.defaults,
            &id,
        )
        .await
        .inspect_err(|e| tracing::error!(user_id, kb_id, error = %e, "Failed to create chatbot"))?;
        tracing::info!(bot_id = %chatbot.id, kb_id, "Created chatbot");

        self.dashboard.refresh().await;
        Ok(Some(chatbot))
    }

    /// Opens a fresh test conversation with `chatbot`.
    pub async fn select(&self, chatbot: Chatbot) {
        self.test_chat.select(Some(chatbot)).await;
    }

    pub async fn delete(&self, chatbot: &Chatbot) -> Result<(), ChatbotError> {
        Chatbot::delete(self.records.as_ref(), &chatbot.id)
            .await
            .inspect_err(|e| tracing::error!(bot_id = %chatbot.id, error = %e, "Failed to delete chatbot"))?;
        tracing::info!(bot_id = %chatbot.id, "Deleted chatbot");

        if self
            .test_chat
            .selected()
            .await
            .is_some_and(|selected| selected.id == chatbot.id)
        {
            self.test_chat.select(None).await;
        }
        self.dashboard.refresh().await;
        Ok(())
    }

    pub fn embed_code(&self, bot_id: &str) -> String {
        embed_code(&self.embed_origin, bot_id)
    }

    pub fn test_chat(&self) -> &Arc<TestChat> {
        &self.test_chat
    }
}
