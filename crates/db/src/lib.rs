pub mod models;
pub mod sqlite;
pub mod store;

pub use sqlite::SqliteRecordStore;
pub use store::{Collection, ListQuery, OrderBy, RecordStore, SortDirection, StoreError};

/// Generates a client-side record id such as `kb_3f2a…`.
pub fn new_record_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
