use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: String },
    #[error("record store rejected the request: {0}")]
    Backend(String),
}

/// Collections exposed by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Collection {
    KnowledgeBases,
    Documents,
    Chatbots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// `{where, orderBy, limit}` query understood by every store.
///
/// `where` is a conjunction of field equalities on the wire field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(rename = "where", skip_serializing_if = "serde_json::Map::is_empty", default)]
    pub filters: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(field.to_string(), value.into());
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn newest_first(self) -> Self {
        self.order_by("createdAt", SortDirection::Desc)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Record CRUD over loosely-typed JSON documents, as offered by the hosted
/// backend. Typed access lives in [`crate::models`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Stores `record` (which must carry an `id`) and returns it as persisted,
    /// including store-assigned `createdAt`.
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError>;

    async fn list(&self, collection: Collection, query: ListQuery) -> Result<Vec<Value>, StoreError>;

    /// Merges `fields` into the record and returns the merged record.
    async fn update(&self, collection: Collection, id: &str, fields: Value)
    -> Result<Value, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}
