use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{NoneAsEmptyString, serde_as};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{decode, decode_all};
use crate::store::{Collection, ListQuery, RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    File,
    Url,
    Text,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Ready,
    Processing,
    Error,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub knowledge_base_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub content: String,
    /// Public storage url for files, the scraped page for urls.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(rename = "url", default)]
    #[ts(type = "string | null")]
    pub source_url: Option<String>,
    #[serde(rename = "fileSize", default)]
    pub size: u64,
    #[serde(default)]
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub knowledge_base_id: String,
    pub user_id: String,
    pub name: String,
    pub kind: DocumentKind,
    pub content: String,
    pub source_url: Option<String>,
    pub size: u64,
    pub status: DocumentStatus,
}

impl Document {
    /// Documents of one knowledge base, newest first.
    pub async fn find_by_knowledge_base(
        store: &dyn RecordStore,
        knowledge_base_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Self>, StoreError> {
        let mut query = ListQuery::new()
            .filter("knowledgeBaseId", knowledge_base_id)
            .newest_first();
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        decode_all(store.list(Collection::Documents, query).await?)
    }

    pub async fn find_by_id(store: &dyn RecordStore, id: &str) -> Result<Option<Self>, StoreError> {
        let rows = store
            .list(Collection::Documents, ListQuery::new().filter("id", id).limit(1))
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    pub async fn create(
        store: &dyn RecordStore,
        data: &CreateDocument,
        id: &str,
    ) -> Result<Self, StoreError> {
        let record = json!({
            "id": id,
            "knowledgeBaseId": data.knowledge_base_id,
            "userId": data.user_id,
            "name": data.name,
            "type": data.kind,
            "content": data.content,
            "url": data.source_url.clone().unwrap_or_default(),
            "fileSize": data.size,
            "status": data.status,
        });
        decode(store.create(Collection::Documents, record).await?)
    }

    pub async fn delete(store: &dyn RecordStore, id: &str) -> Result<(), StoreError> {
        store.delete(Collection::Documents, id).await
    }
}
