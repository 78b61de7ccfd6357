use axum::{
    Extension, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use backend::User;
use db::models::{chatbot::Chatbot, knowledge_base::KnowledgeBase};
use serde::Serialize;
use services::services::dashboard::DashboardOverview;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardResponse {
    pub overview: DashboardOverview,
    pub knowledge_bases: Vec<KnowledgeBase>,
    pub chatbots: Vec<Chatbot>,
}

async fn current_dashboard(deployment: &DeploymentImpl) -> DashboardResponse {
    let state = deployment.dashboard().snapshot().await;
    DashboardResponse {
        overview: DashboardOverview::from_state(&state),
        knowledge_bases: state.knowledge_bases,
        chatbots: state.chatbots,
    }
}

pub async fn get_dashboard(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<DashboardResponse>> {
    deployment.dashboard().load_for(&user.id).await;
    ResponseJson(ApiResponse::success(current_dashboard(&deployment).await))
}

/// Re-queries the user's lists.
pub async fn refresh_dashboard(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<DashboardResponse>> {
    deployment.dashboard().reload_for(&user.id).await;
    ResponseJson(ApiResponse::success(current_dashboard(&deployment).await))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/refresh", post(refresh_dashboard))
}
