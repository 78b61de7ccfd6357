use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::StoreError;

pub mod chatbot;
pub mod document;
pub mod knowledge_base;

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    Ok(serde_json::from_value(value)?)
}

fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>, StoreError> {
    values.into_iter().map(decode).collect()
}
