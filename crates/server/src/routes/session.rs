use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use backend::{Credentials, User};
use serde::Deserialize;
use services::services::session::GateView;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct LoginRequest {
    pub token: String,
}

/// Which surface the client should render: loading, marketing or dashboard.
pub async fn get_session(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<GateView>> {
    ResponseJson(ApiResponse::success(deployment.session().gate()))
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::BadRequest("token is required".to_string()));
    }
    let user = deployment
        .session()
        .login(Credentials::token(payload.token))
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Sign-in failed"))?;
    tracing::info!(user_id = %user.id, "Signed in");
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn logout(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.session().logout().await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/session", get(get_session))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}
