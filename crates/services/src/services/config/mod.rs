use std::path::Path;

use thiserror::Error;

mod versions;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Use the provided knowledge base to answer questions accurately and helpfully.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Config = versions::v1::Config;
pub type BackendConfig = versions::v1::BackendConfig;
pub type RecordStoreKind = versions::v1::RecordStoreKind;
pub type ObjectStorageKind = versions::v1::ObjectStorageKind;
pub type ChatConfig = versions::v1::ChatConfig;
pub type KnowledgeBaseConfig = versions::v1::KnowledgeBaseConfig;
pub type TotalsMode = versions::v1::TotalsMode;
pub type IntegrationsConfig = versions::v1::IntegrationsConfig;
pub type AnalyticsConfig = versions::v1::AnalyticsConfig;

/// Will always return config, falling back to the default
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from(raw_config),
        Err(_) => {
            tracing::info!("No config file found, creating one");
            Config::default()
        }
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let raw_config = serde_json::to_string_pretty(config)?;
    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}
