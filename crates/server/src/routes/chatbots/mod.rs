use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use backend::User;
use db::models::chatbot::{Chatbot, CreateChatbot};
use serde::Serialize;
use services::services::chatbots::{ModelOption, available_models, knowledge_base_name};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::load_chatbot_middleware,
    routes::test_chat::{self, TestChatView},
};

/// A chatbot as listed, with the name of the knowledge base it answers from.
#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ChatbotSummary {
    #[serde(flatten)]
    pub chatbot: Chatbot,
    pub knowledge_base_name: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct EmbedCode {
    pub code: String,
}

pub async fn get_chatbots(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Vec<ChatbotSummary>>> {
    let dashboard = deployment.dashboard();
    dashboard.reload_for(&user.id).await;
    let state = dashboard.snapshot().await;
    let summaries = state
        .chatbots
        .into_iter()
        .map(|chatbot| ChatbotSummary {
            knowledge_base_name: knowledge_base_name(
                &state.knowledge_bases,
                &chatbot.knowledge_base_id,
            ),
            chatbot,
        })
        .collect();
    ResponseJson(ApiResponse::success(summaries))
}

/// Returns `null` data when the name or knowledge base is missing.
pub async fn create_chatbot(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateChatbot>,
) -> Result<ResponseJson<ApiResponse<Option<Chatbot>>>, ApiError> {
    let created = deployment.chatbots().create(&user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(created)))
}

pub async fn get_models() -> ResponseJson<ApiResponse<Vec<ModelOption>>> {
    ResponseJson(ApiResponse::success(available_models()))
}

pub async fn get_chatbot(
    Extension(chatbot): Extension<Chatbot>,
) -> ResponseJson<ApiResponse<Chatbot>> {
    ResponseJson(ApiResponse::success(chatbot))
}

pub async fn delete_chatbot(
    Extension(chatbot): Extension<Chatbot>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.chatbots().delete(&chatbot).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Starts a fresh test conversation with the chatbot.
pub async fn select_chatbot(
    Extension(chatbot): Extension<Chatbot>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<TestChatView>> {
    deployment.chatbots().select(chatbot).await;
    ResponseJson(ApiResponse::success(
        test_chat::current_view(&deployment).await,
    ))
}

pub async fn get_embed_code(
    Extension(chatbot): Extension<Chatbot>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<EmbedCode>> {
    ResponseJson(ApiResponse::success(EmbedCode {
        code: deployment.chatbots().embed_code(&chatbot.id),
    }))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let chatbot_router = Router::new()
        .route("/", get(get_chatbot).delete(delete_chatbot))
        .route("/embed", get(get_embed_code))
        .route("/select", post(select_chatbot))
        .layer(from_fn_with_state(deployment.clone(), load_chatbot_middleware));

    Router::new()
        .route("/", get(get_chatbots).post(create_chatbot))
        .route("/models", get(get_models))
        .nest("/{bot_id}", chatbot_router)
}
