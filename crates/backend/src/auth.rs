use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use ts_rs::TS;

use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Snapshot published by the auth stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: None,
            is_loading: false,
        }
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_loading: false,
        }
    }
}

pub struct Credentials {
    pub token: SecretString,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Receiver of the current auth state; it starts out loading until the
    /// first login or logout resolves it.
    fn subscribe(&self) -> watch::Receiver<AuthState>;

    async fn login(&self, credentials: Credentials) -> Result<User, BackendError>;

    async fn logout(&self) -> Result<(), BackendError>;
}
