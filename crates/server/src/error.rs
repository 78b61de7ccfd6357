use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use backend::BackendError;
use db::StoreError;
use services::services::{
    analytics::AnalyticsError, chatbots::ChatbotError, integrations::IntegrationError,
    knowledge_base::KnowledgeBaseError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    KnowledgeBase(#[from] KnowledgeBaseError),
    #[error(transparent)]
    Chatbot(#[from] ChatbotError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("Not signed in")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::Unauthenticated | BackendError::Status { status: 401, .. } => {
            StatusCode::UNAUTHORIZED
        }
        BackendError::Status { status: 403, .. } => StatusCode::FORBIDDEN,
        BackendError::Status { status: 404, .. } => StatusCode::NOT_FOUND,
        BackendError::Rejected(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(err) => store_status(err),
            ApiError::Backend(err) => backend_status(err),
            ApiError::KnowledgeBase(KnowledgeBaseError::Store(err)) => store_status(err),
            ApiError::KnowledgeBase(KnowledgeBaseError::Backend(err)) => backend_status(err),
            ApiError::KnowledgeBase(KnowledgeBaseError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Chatbot(ChatbotError::Store(err)) => store_status(err),
            ApiError::Chatbot(ChatbotError::KnowledgeBaseNotFound) => StatusCode::NOT_FOUND,
            ApiError::Integration(IntegrationError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Integration(IntegrationError::Setup(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Analytics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(err) => err.status(),
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        }
        let message = self.to_string();
        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}
