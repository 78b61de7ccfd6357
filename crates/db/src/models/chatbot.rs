use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{BoolFromInt, formats::Flexible, serde_as};
use ts_rs::TS;

use super::{decode, decode_all};
use crate::store::{Collection, ListQuery, RecordStore, StoreError};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Chatbot {
    pub id: String,
    pub knowledge_base_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde_as(as = "BoolFromInt<Flexible>")]
    #[serde(default)]
    #[ts(type = "boolean")]
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateChatbot {
    pub name: String,
    pub description: Option<String>,
    pub knowledge_base_id: Option<String>,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub is_public: bool,
}

/// Values used for fields a create request leaves out.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatbotDefaults {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Chatbot {
    pub async fn find_by_user(
        store: &dyn RecordStore,
        user_id: &str,
    ) -> Result<Vec<Self>, StoreError> {
        let rows = store
            .list(
                Collection::Chatbots,
                ListQuery::new().filter("userId", user_id).newest_first(),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn find_by_id(store: &dyn RecordStore, id: &str) -> Result<Option<Self>, StoreError> {
        let rows = store
            .list(Collection::Chatbots, ListQuery::new().filter("id", id).limit(1))
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    /// The caller validates name and knowledge base; temperature is clamped to 0..=1.
    pub async fn create(
        store: &dyn RecordStore,
        user_id: &str,
        knowledge_base_id: &str,
        data: &CreateChatbot,
        defaults: &ChatbotDefaults,
        id: &str,
    ) -> Result<Self, StoreError> {
        let system_prompt = data
            .system_prompt
            .clone()
            .filter(|prompt| !prompt.trim().is_empty())
            .unwrap_or_else(|| defaults.system_prompt.clone());
        let model = data.model.clone().unwrap_or_else(|| defaults.model.clone());
        let temperature = data
            .temperature
            .unwrap_or(defaults.temperature)
            .clamp(0.0, 1.0);
        let max_tokens = data.max_tokens.unwrap_or(defaults.max_tokens);

        let record = json!({
            "id": id,
            "knowledgeBaseId": knowledge_base_id,
            "userId": user_id,
            "name": data.name.trim(),
            "description": data.description.clone().unwrap_or_default(),
            "systemPrompt": system_prompt,
            "model": model,
            "temperature": temperature,
            "maxTokens": max_tokens,
            "isPublic": i64::from(data.is_public),
        });
        decode(store.create(Collection::Chatbots, record).await?)
    }

    pub async fn delete(store: &dyn RecordStore, id: &str) -> Result<(), StoreError> {
        store.delete(Collection::Chatbots, id).await
    }
}
