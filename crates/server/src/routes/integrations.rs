use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use backend::User;
use serde::{Deserialize, Serialize};
use services::services::integrations::{Integration, IntegrationKind, IntegrationType, catalog};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IntegrationsView {
    pub integrations: Vec<Integration>,
    #[ts(type = "number")]
    pub connected_count: usize,
}

#[derive(Debug, Deserialize, TS)]
pub struct SetupIntegrationRequest {
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
}

pub async fn get_integrations(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<IntegrationsView>> {
    let service = deployment.integrations();
    ResponseJson(ApiResponse::success(IntegrationsView {
        integrations: service.list().await,
        connected_count: service.connected_count().await,
    }))
}

pub async fn get_catalog() -> ResponseJson<ApiResponse<Vec<IntegrationType>>> {
    ResponseJson(ApiResponse::success(catalog()))
}

pub async fn setup_integration(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<SetupIntegrationRequest>,
) -> Result<ResponseJson<ApiResponse<Integration>>, ApiError> {
    let integration = deployment
        .integrations()
        .setup(payload.kind, &user.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(integration)))
}

pub async fn disconnect_integration(
    State(deployment): State<DeploymentImpl>,
    Path(integration_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<Integration>>, ApiError> {
    let integration = deployment.integrations().disconnect(&integration_id).await?;
    Ok(ResponseJson(ApiResponse::success(integration)))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/", get(get_integrations).post(setup_integration))
        .route("/catalog", get(get_catalog))
        .route("/{integration_id}/disconnect", post(disconnect_integration))
}
