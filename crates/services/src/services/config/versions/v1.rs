use std::time::Duration;

use db::models::chatbot::ChatbotDefaults;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use crate::services::config::DEFAULT_SYSTEM_PROMPT;

fn default_base_url() -> String {
    "https://api.chatbase-unlimited.com".to_string()
}

fn default_project_id() -> String {
    "chatbase-unlimited".to_string()
}

fn default_embed_origin() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_webhook_base_url() -> String {
    "https://api.chatbase-unlimited.com/webhooks".to_string()
}

fn default_context_document_limit() -> usize {
    10
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_retrain_delay_ms() -> u64 {
    2000
}

fn default_setup_delay_ms() -> u64 {
    2000
}

fn default_loading_delay_ms() -> u64 {
    1000
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordStoreKind {
    #[default]
    Remote,
    Sqlite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectStorageKind {
    #[default]
    Remote,
    Local,
}

/// Where knowledge-base running totals are computed from after a mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, TS, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TotalsMode {
    /// Apply increments to the selected snapshot.
    #[default]
    Incremental,
    /// Sum the authoritative document list.
    Recompute,
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default)]
    pub record_store: RecordStoreKind,
    #[serde(default)]
    pub object_storage: ObjectStorageKind,
    /// Defaults to `records.db` in the asset directory.
    #[serde(default)]
    pub sqlite_url: Option<String>,
    /// Defaults to `storage/` in the asset directory.
    #[serde(default)]
    pub storage_dir: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_id: default_project_id(),
            record_store: RecordStoreKind::default(),
            object_storage: ObjectStorageKind::default(),
            sqlite_url: None,
            storage_dir: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct ChatConfig {
    /// Documents concatenated into the prompt context.
    #[serde(default = "default_context_document_limit")]
    #[ts(type = "number")]
    pub context_document_limit: usize,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

impl ChatConfig {
    pub fn chatbot_defaults(&self) -> ChatbotDefaults {
        ChatbotDefaults {
            system_prompt: self.default_system_prompt.clone(),
            model: self.default_model.clone(),
            temperature: self.default_temperature,
            max_tokens: self.default_max_tokens,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            context_document_limit: default_context_document_limit(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            default_system_prompt: default_system_prompt(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct KnowledgeBaseConfig {
    #[serde(default)]
    pub totals_mode: TotalsMode,
    #[serde(default = "default_retrain_delay_ms")]
    #[ts(type = "number")]
    pub retrain_delay_ms: u64,
}

impl KnowledgeBaseConfig {
    pub fn retrain_delay(&self) -> Duration {
        Duration::from_millis(self.retrain_delay_ms)
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            totals_mode: TotalsMode::default(),
            retrain_delay_ms: default_retrain_delay_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct IntegrationsConfig {
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,
    #[serde(default = "default_setup_delay_ms")]
    #[ts(type = "number")]
    pub setup_delay_ms: u64,
}

impl IntegrationsConfig {
    pub fn setup_delay(&self) -> Duration {
        Duration::from_millis(self.setup_delay_ms)
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            webhook_base_url: default_webhook_base_url(),
            setup_delay_ms: default_setup_delay_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
pub struct AnalyticsConfig {
    #[serde(default = "default_loading_delay_ms")]
    #[ts(type = "number")]
    pub loading_delay_ms: u64,
}

impl AnalyticsConfig {
    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            loading_delay_ms: default_loading_delay_ms(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct Config {
    pub config_version: String,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub integrations: IntegrationsConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Origin used in generated embed snippets.
    #[serde(default = "default_embed_origin")]
    pub embed_origin: String,
}

impl From<String> for Config {
    fn from(raw_config: String) -> Self {
        match serde_json::from_str::<Config>(&raw_config) {
            Ok(config) if config.config_version == "v1" => config,
            Ok(config) => {
                tracing::warn!(
                    version = %config.config_version,
                    "Unknown config version, using default"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Config parse failed: {}, using default", e);
                Self::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: "v1".to_string(),
            backend: BackendConfig::default(),
            chat: ChatConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            integrations: IntegrationsConfig::default(),
            analytics: AnalyticsConfig::default(),
            embed_origin: default_embed_origin(),
        }
    }
}
