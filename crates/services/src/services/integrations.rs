use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::new_record_id;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use tokio::sync::RwLock;
use ts_rs::TS;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Integration not found: {0}")]
    NotFound(String),
    #[error("Integration setup failed: {0}")]
    Setup(String),
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationKind {
    Slack,
    N8n,
    Zapier,
    Webhook,
}

impl IntegrationKind {
    /// Display name given to a newly connected integration, e.g. `Slack Integration`.
    pub fn integration_name(self) -> String {
        let id = self.as_ref();
        let mut chars = id.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        format!("{capitalized} Integration")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Integration {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub status: IntegrationStatus,
    pub config: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Integration {
    pub fn webhook_url(&self) -> Option<&str> {
        self.config.get("webhook_url").map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct IntegrationType {
    pub id: IntegrationKind,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
}

pub fn catalog() -> Vec<IntegrationType> {
    let entry = |id, name: &str, description: &str, features: [&str; 4]| IntegrationType {
        id,
        name: name.to_string(),
        description: description.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
    };
    vec![
        entry(
            IntegrationKind::Slack,
            "Slack",
            "Connect your chatbots to Slack channels for team collaboration",
            ["Channel integration", "Direct messages", "Bot commands", "File sharing"],
        ),
        entry(
            IntegrationKind::N8n,
            "n8n",
            "Automate workflows with powerful no-code automation",
            ["Workflow triggers", "Data processing", "API integrations", "Custom logic"],
        ),
        entry(
            IntegrationKind::Zapier,
            "Zapier",
            "Connect with 5000+ apps through Zapier automation",
            ["App connections", "Trigger events", "Data sync", "Multi-step workflows"],
        ),
        entry(
            IntegrationKind::Webhook,
            "Custom Webhooks",
            "Create custom integrations with webhook endpoints",
            ["Real-time events", "Custom payloads", "HTTP callbacks", "API integration"],
        ),
    ]
}

/// The integrations listed before the user connects anything.
pub fn seed_integrations() -> Vec<Integration> {
    [
        ("slack_1", "Customer Support Slack", IntegrationKind::Slack),
        ("n8n_1", "Workflow Automation", IntegrationKind::N8n),
        ("zapier_1", "Zapier Workflows", IntegrationKind::Zapier),
    ]
    .into_iter()
    .map(|(id, name, kind)| Integration {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        status: IntegrationStatus::Disconnected,
        config: BTreeMap::new(),
        last_sync: None,
    })
    .collect()
}

pub fn webhook_url(base_url: &str, kind: IntegrationKind, user_id: &str) -> String {
    format!("{}/{kind}/{user_id}", base_url.trim_end_matches('/'))
}

/// Establishes a connection to an external service.
#[async_trait]
pub trait IntegrationConnector: Send + Sync {
    async fn connect(
        &self,
        kind: IntegrationKind,
        user_id: &str,
    ) -> Result<Integration, IntegrationError>;
}

/// Waits a fixed delay and reports the integration as connected.
pub struct SimulatedConnector {
    delay: Duration,
    webhook_base_url: String,
}

impl SimulatedConnector {
    pub fn new(delay: Duration, webhook_base_url: impl Into<String>) -> Self {
        Self {
            delay,
            webhook_base_url: webhook_base_url.into(),
        }
    }
}

#[async_trait]
impl IntegrationConnector for SimulatedConnector {
    async fn connect(
        &self,
        kind: IntegrationKind,
        user_id: &str,
    ) -> Result<Integration, IntegrationError> {
        tokio::time::sleep(self.delay).await;
        let now = Utc::now();
        Ok(Integration {
            id: new_record_id(kind.as_ref()),
            name: kind.integration_name(),
            kind,
            status: IntegrationStatus::Connected,
            config: BTreeMap::from([(
                "webhook_url".to_string(),
                webhook_url(&self.webhook_base_url, kind, user_id),
            )]),
            last_sync: Some(now),
        })
    }
}

/// Session-local list of integrations, owned by the user who last set one up.
pub struct IntegrationService {
    connector: Arc<dyn IntegrationConnector>,
    panel: RwLock<Panel>,
}

struct Panel {
    owner: Option<String>,
    integrations: Vec<Integration>,
}

impl Default for Panel {
    fn default() -> Self {
        Self {
            owner: None,
            integrations: seed_integrations(),
        }
    }
}

impl IntegrationService {
    pub fn new(connector: Arc<dyn IntegrationConnector>) -> Self {
        Self {
            connector,
            panel: RwLock::new(Panel::default()),
        }
    }

    pub async fn list(&self) -> Vec<Integration> {
        self.panel.read().await.integrations.clone()
    }

    pub async fn connected_count(&self) -> usize {
        self.panel
            .read()
            .await
            .integrations
            .iter()
            .filter(|integration| integration.status == IntegrationStatus::Connected)
            .count()
    }

    pub async fn setup(
        &self,
        kind: IntegrationKind,
        user_id: &str,
    ) -> Result<Integration, IntegrationError> {
        tracing::info!(%kind, user_id, "Setting up integration");
        let integration = self
            .connector
            .connect(kind, user_id)
            .await
            .inspect_err(|e| tracing::error!(%kind, error = %e, "Failed to set up integration"))?;
        let mut panel = self.panel.write().await;
        if panel.owner.as_deref().is_some_and(|owner| owner != user_id) {
            *panel = Panel::default();
        }
        panel.owner = Some(user_id.to_string());
        panel.integrations.push(integration.clone());
        Ok(integration)
    }

    /// Marks the integration disconnected; it stays in the list.
    pub async fn disconnect(&self, id: &str) -> Result<Integration, IntegrationError> {
        let mut panel = self.panel.write().await;
        let integration = panel
            .integrations
            .iter_mut()
            .find(|integration| integration.id == id)
            .ok_or_else(|| IntegrationError::NotFound(id.to_string()))?;
        integration.status = IntegrationStatus::Disconnected;
        tracing::info!(integration_id = id, "Disconnected integration");
        Ok(integration.clone())
    }

    /// Restores the seed list if it still belongs to `user_id`.
    pub async fn release_user(&self, user_id: &str) {
        let mut panel = self.panel.write().await;
        if panel.owner.as_deref() == Some(user_id) {
            *panel = Panel::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IntegrationService {
        IntegrationService::new(Arc::new(SimulatedConnector::new(
            Duration::from_secs(2),
            "https://api.chatbase-unlimited.com/webhooks",
        )))
    }

    #[tokio::test]
    async fn starts_with_three_disconnected_integrations() {
        let service = service();
        let ids: Vec<_> = service.list().await.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["slack_1", "n8n_1", "zapier_1"]);
        assert_eq!(service.connected_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn setup_waits_then_appends_a_connected_integration() {
        let service = service();
        let started = tokio::time::Instant::now();
        let integration = service.setup(IntegrationKind::Slack, "user_1").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(integration.name, "Slack Integration");
        assert_eq!(integration.status, IntegrationStatus::Connected);
        assert_eq!(
            integration.webhook_url(),
            Some("https://api.chatbase-unlimited.com/webhooks/slack/user_1")
        );
        assert!(integration.last_sync.is_some());
        assert_eq!(service.list().await.len(), 4);
        assert_eq!(service.connected_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_keeps_the_record() {
        let service = service();
        let integration = service.setup(IntegrationKind::N8n, "user_1").await.unwrap();
        assert_eq!(integration.name, "N8n Integration");

        let disconnected = service.disconnect(&integration.id).await.unwrap();
        assert_eq!(disconnected.status, IntegrationStatus::Disconnected);
        assert_eq!(service.list().await.len(), 4);
        assert_eq!(service.connected_count().await, 0);

        assert!(matches!(
            service.disconnect("missing").await,
            Err(IntegrationError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_setups_get_distinct_ids() {
        let service = service();
        let (a, b) = tokio::join!(
            service.setup(IntegrationKind::Slack, "user_1"),
            service.setup(IntegrationKind::Slack, "user_1"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("slack_"));

        service.disconnect(&b.id).await.unwrap();
        let status_of = |id: &str, list: &[Integration]| {
            list.iter().find(|i| i.id == id).map(|i| i.status)
        };
        let list = service.list().await;
        assert_eq!(status_of(&a.id, &list), Some(IntegrationStatus::Connected));
        assert_eq!(status_of(&b.id, &list), Some(IntegrationStatus::Disconnected));
        assert_eq!(service.connected_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn list_starts_over_for_a_new_user() {
        let service = service();
        service.setup(IntegrationKind::Zapier, "user_alice").await.unwrap();
        let bob = service.setup(IntegrationKind::Slack, "user_bob").await.unwrap();

        let list = service.list().await;
        assert_eq!(list.len(), 4);
        assert_eq!(list[3].id, bob.id);
        assert_eq!(service.connected_count().await, 1);

        // A late release for the previous user leaves bob's list alone.
        service.release_user("user_alice").await;
        assert_eq!(service.list().await.len(), 4);

        service.release_user("user_bob").await;
        assert_eq!(service.list().await.len(), 3);
        assert_eq!(service.connected_count().await, 0);
    }

    #[test]
    fn catalog_lists_four_kinds_with_features() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog[3].name, "Custom Webhooks");
        assert!(catalog.iter().all(|entry| entry.features.len() == 4));
    }
}
