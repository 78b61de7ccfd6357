use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
};
use backend::{UploadFile, User};
use db::models::{document::Document, knowledge_base::KnowledgeBase};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use super::focus;
use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ScrapeUrlRequest {
    pub url: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct AddTextRequest {
    pub text: String,
}

pub async fn get_documents(
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Vec<Document>>> {
    focus(&deployment, &knowledge_base).await;
    ResponseJson(ApiResponse::success(
        deployment.knowledge_bases().documents().await,
    ))
}

/// Every multipart field carrying a file name becomes one upload; other
/// fields are ignored.
pub async fn upload_files(
    Extension(user): Extension<User>,
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Option<Vec<Document>>>>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let mut file = UploadFile::new(name, field.bytes().await?);
        file.content_type = content_type;
        files.push(file);
    }
    tracing::debug!(kb_id = %knowledge_base.id, files = files.len(), "Received upload");

    focus(&deployment, &knowledge_base).await;
    let documents = deployment
        .knowledge_bases()
        .upload_files(&user.id, files)
        .await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

pub async fn scrape_url(
    Extension(user): Extension<User>,
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<ScrapeUrlRequest>,
) -> Result<ResponseJson<ApiResponse<Option<Document>>>, ApiError> {
    focus(&deployment, &knowledge_base).await;
    let document = deployment
        .knowledge_bases()
        .scrape_url(&user.id, &payload.url)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub async fn add_text(
    Extension(user): Extension<User>,
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<AddTextRequest>,
) -> Result<ResponseJson<ApiResponse<Option<Document>>>, ApiError> {
    focus(&deployment, &knowledge_base).await;
    let document = deployment
        .knowledge_bases()
        .add_text(&user.id, &payload.text)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

pub async fn delete_document(
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
    Path((_, doc_id)): Path<(String, String)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let document = Document::find_by_id(deployment.records().as_ref(), &doc_id)
        .await?
        .filter(|document| document.knowledge_base_id == knowledge_base.id)
        .ok_or_else(|| ApiError::NotFound(format!("document {doc_id}")))?;

    focus(&deployment, &knowledge_base).await;
    deployment.knowledge_bases().delete_document(&document).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}
