use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{BoolFromInt, formats::Flexible, serde_as};
use strum_macros::{Display, EnumIter, EnumString};
use ts_rs::TS;

use super::{decode, decode_all};
use crate::store::{Collection, ListQuery, RecordStore, StoreError};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RetrainSchedule {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Running total maintained by the ingestion flows.
    #[serde(rename = "fileCount", default)]
    pub document_count: u64,
    /// Running total of document bytes.
    #[serde(default)]
    pub total_size: u64,
    #[serde_as(as = "BoolFromInt<Flexible>")]
    #[serde(default)]
    #[ts(type = "boolean")]
    pub auto_retrain: bool,
    #[serde(default)]
    pub retrain_schedule: RetrainSchedule,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct CreateKnowledgeBase {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub auto_retrain: bool,
    pub retrain_schedule: Option<RetrainSchedule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
pub struct Totals {
    pub document_count: u64,
    pub total_size: u64,
}

impl KnowledgeBase {
    pub fn totals(&self) -> Totals {
        Totals {
            document_count: self.document_count,
            total_size: self.total_size,
        }
    }

    pub fn totals_after_adding(&self, documents: u64, bytes: u64) -> Totals {
        Totals {
            document_count: self.document_count.saturating_add(documents),
            total_size: self.total_size.saturating_add(bytes),
        }
    }

    /// Totals after removing one document, clamped at zero.
    pub fn totals_after_removing(&self, bytes: u64) -> Totals {
        Totals {
            document_count: self.document_count.saturating_sub(1),
            total_size: self.total_size.saturating_sub(bytes),
        }
    }

    pub async fn find_by_user(
        store: &dyn RecordStore,
        user_id: &str,
    ) -> Result<Vec<Self>, StoreError> {
        let rows = store
            .list(
                Collection::KnowledgeBases,
                ListQuery::new().filter("userId", user_id).newest_first(),
            )
            .await?;
        decode_all(rows)
    }

    pub async fn find_by_id(store: &dyn RecordStore, id: &str) -> Result<Option<Self>, StoreError> {
        let rows = store
            .list(
                Collection::KnowledgeBases,
                ListQuery::new().filter("id", id).limit(1),
            )
            .await?;
        rows.into_iter().next().map(decode).transpose()
    }

    pub async fn create(
        store: &dyn RecordStore,
        user_id: &str,
        data: &CreateKnowledgeBase,
        id: &str,
    ) -> Result<Self, StoreError> {
        let record = json!({
            "id": id,
            "userId": user_id,
            "name": data.name.trim(),
            "description": data.description.clone().unwrap_or_default(),
            "autoRetrain": i64::from(data.auto_retrain),
            "retrainSchedule": data.retrain_schedule.unwrap_or_default(),
            "fileCount": 0,
            "totalSize": 0,
        });
        decode(store.create(Collection::KnowledgeBases, record).await?)
    }

    pub async fn update_totals(
        store: &dyn RecordStore,
        id: &str,
        totals: Totals,
    ) -> Result<Self, StoreError> {
        let fields = json!({
            "fileCount": totals.document_count,
            "totalSize": totals.total_size,
        });
        decode(store.update(Collection::KnowledgeBases, id, fields).await?)
    }

    /// Bumps `updatedAt`; used as the retrain marker.
    pub async fn touch(store: &dyn RecordStore, id: &str) -> Result<Self, StoreError> {
        let fields = json!({
            "updatedAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        decode(store.update(Collection::KnowledgeBases, id, fields).await?)
    }

    pub async fn delete(store: &dyn RecordStore, id: &str) -> Result<(), StoreError> {
        store.delete(Collection::KnowledgeBases, id).await
    }
}
