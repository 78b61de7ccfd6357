use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::chatbot::Chatbot;
use serde::{Deserialize, Serialize};
use services::services::test_chat::{ChatMessage, ChatState, SendOutcome};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TestChatView {
    pub chatbot: Option<Chatbot>,
    pub state: ChatState,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize, TS)]
pub struct SendMessageRequest {
    pub content: String,
}

pub(crate) async fn current_view(deployment: &DeploymentImpl) -> TestChatView {
    let chat = deployment.test_chat();
    TestChatView {
        chatbot: chat.selected().await,
        state: chat.state().await,
        messages: chat.messages().await,
    }
}

pub async fn get_test_chat(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<TestChatView>> {
    ResponseJson(ApiResponse::success(current_view(&deployment).await))
}

pub async fn close_test_chat(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<TestChatView>> {
    deployment.test_chat().select(None).await;
    ResponseJson(ApiResponse::success(current_view(&deployment).await))
}

pub async fn get_messages(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Vec<ChatMessage>>> {
    ResponseJson(ApiResponse::success(deployment.test_chat().messages().await))
}

pub async fn send_message(
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<SendMessageRequest>,
) -> ResponseJson<ApiResponse<SendOutcome>> {
    let outcome = deployment.test_chat().send(&payload.content).await;
    ResponseJson(ApiResponse::success(outcome))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/test-chat", get(get_test_chat).delete(close_test_chat))
        .route("/test-chat/messages", get(get_messages).post(send_message))
}
