use std::str::FromStr;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use sqlx::{
    QueryBuilder, Row, Sqlite, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::store::{Collection, ListQuery, RecordStore, SortDirection, StoreError};

/// Local stand-in for the hosted record store, keeping each record as a JSON
/// document in SQLite.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pub pool: SqlitePool,
}

impl SqliteRecordStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        Self::from_pool(pool).await
    }

    /// Single-connection in-memory store; every connection to `sqlite::memory:`
    /// would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("Record store migrations applied");
        Ok(Self { pool })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_path(field: &str) -> String {
    format!("$.{field}")
}

fn push_filter_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &Value) -> Result<(), StoreError> {
    match value {
        Value::String(s) => {
            builder.push_bind(s.clone());
        }
        Value::Bool(b) => {
            builder.push_bind(i64::from(*b));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                builder.push_bind(i);
            } else if let Some(f) = n.as_f64() {
                builder.push_bind(f);
            }
        }
        Value::Null => {
            builder.push("NULL");
        }
        other => {
            return Err(StoreError::Backend(format!(
                "unsupported filter value: {other}"
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let Value::Object(mut fields) = record else {
            return Err(StoreError::Backend("record must be a JSON object".to_string()));
        };
        let id = fields
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| StoreError::Backend("record is missing an id".to_string()))?;

        let now = now_timestamp();
        fields
            .entry("createdAt")
            .or_insert_with(|| Value::String(now.clone()));
        fields.entry("updatedAt").or_insert(Value::String(now));

        let record = Value::Object(fields);
        sqlx::query("INSERT INTO records (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection.as_ref())
            .bind(&id)
            .bind(serde_json::to_string(&record)?)
            .execute(&self.pool)
            .await?;

        Ok(record)
    }

    async fn list(&self, collection: Collection, query: ListQuery) -> Result<Vec<Value>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT data FROM records WHERE collection = ");
        builder.push_bind(collection.as_ref().to_string());

        for (field, value) in &query.filters {
            builder.push(" AND json_extract(data, ");
            builder.push_bind(json_path(field));
            if value.is_null() {
                builder.push(") IS NULL");
                continue;
            }
            builder.push(") = ");
            push_filter_value(&mut builder, value)?;
        }

        match &query.order_by {
            Some(order) => {
                let direction = match order.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                builder.push(" ORDER BY json_extract(data, ");
                builder.push_bind(json_path(&order.field));
                builder.push(format!(") {direction}, seq {direction}"));
            }
            None => {
                builder.push(" ORDER BY seq ASC");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let data: String = row.get("data");
                serde_json::from_str(&data).map_err(StoreError::from)
            })
            .collect()
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<Value, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT data FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_ref())
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let data: String = row.get("data");
        let mut record: Value = serde_json::from_str(&data)?;
        if let (Value::Object(existing), Value::Object(changes)) = (&mut record, fields) {
            let explicit_updated_at = changes.contains_key("updatedAt");
            for (key, value) in changes {
                if key == "id" {
                    continue;
                }
                existing.insert(key, value);
            }
            if !explicit_updated_at {
                existing.insert("updatedAt".to_string(), Value::String(now_timestamp()));
            }
        }

        sqlx::query("UPDATE records SET data = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.as_ref())
            .bind(id)
            .bind(serde_json::to_string(&record)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn store() -> SqliteRecordStore {
        SqliteRecordStore::in_memory()
            .await
            .expect("create sqlite memory store")
    }

    #[tokio::test]
    async fn create_assigns_timestamps_and_round_trips() {
        let store = store().await;
        let created = store
            .create(Collection::Documents, json!({"id": "doc_1", "name": "a"}))
            .await
            .unwrap();
        assert!(created["createdAt"].is_string());

        let listed = store.list(Collection::Documents, ListQuery::new()).await.unwrap();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn list_filters_orders_and_limits() {
        let store = store().await;
        for (id, owner) in [("kb_1", "u1"), ("kb_2", "u2"), ("kb_3", "u1")] {
            store
                .create(
                    Collection::KnowledgeBases,
                    json!({"id": id, "userId": owner, "createdAt": "2026-01-01T00:00:00.000Z"}),
                )
                .await
                .unwrap();
        }

        let rows = store
            .list(
                Collection::KnowledgeBases,
                ListQuery::new().filter("userId", "u1").newest_first(),
            )
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        // Equal createdAt falls back to insertion order, newest first.
        assert_eq!(ids, vec!["kb_3", "kb_1"]);

        let limited = store
            .list(
                Collection::KnowledgeBases,
                ListQuery::new().filter("userId", "u1").limit(1),
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = store().await;
        store
            .create(Collection::Chatbots, json!({"id": "same"}))
            .await
            .unwrap();
        store
            .create(Collection::Documents, json!({"id": "same"}))
            .await
            .unwrap();
        store.delete(Collection::Chatbots, "same").await.unwrap();
        assert_eq!(
            store.list(Collection::Documents, ListQuery::new()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let store = store().await;
        store
            .create(
                Collection::KnowledgeBases,
                json!({"id": "kb_1", "fileCount": 0, "name": "Docs"}),
            )
            .await
            .unwrap();
        let updated = store
            .update(
                Collection::KnowledgeBases,
                "kb_1",
                json!({"id": "other", "fileCount": 2}),
            )
            .await
            .unwrap();
        assert_eq!(updated["id"], "kb_1");
        assert_eq!(updated["fileCount"], 2);
        assert_eq!(updated["name"], "Docs");
    }

    #[tokio::test]
    async fn missing_records_report_not_found() {
        let store = store().await;
        let err = store
            .update(Collection::Chatbots, "nope", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        let err = store.delete(Collection::Chatbots, "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
