pub mod documents;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use backend::User;
use db::models::{
    document::Document,
    knowledge_base::{CreateKnowledgeBase, KnowledgeBase},
};
use serde::Serialize;
use services::services::knowledge_base::UploadProgress;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::load_knowledge_base_middleware};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct KnowledgeBaseDetail {
    pub knowledge_base: KnowledgeBase,
    pub documents: Vec<Document>,
}

/// Makes `knowledge_base` the ingestion target unless it already is.
pub(crate) async fn focus(deployment: &DeploymentImpl, knowledge_base: &KnowledgeBase) {
    let service = deployment.knowledge_bases();
    let already = service
        .selected()
        .await
        .is_some_and(|selected| selected.id == knowledge_base.id);
    if !already {
        service.select(knowledge_base.clone()).await;
    }
}

pub async fn get_knowledge_bases(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Vec<KnowledgeBase>>> {
    deployment.dashboard().reload_for(&user.id).await;
    ResponseJson(ApiResponse::success(
        deployment.dashboard().knowledge_bases().await,
    ))
}

/// Returns `null` data when the name is blank.
pub async fn create_knowledge_base(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Json(payload): Json<CreateKnowledgeBase>,
) -> Result<ResponseJson<ApiResponse<Option<KnowledgeBase>>>, ApiError> {
    let created = deployment
        .knowledge_bases()
        .create(&user.id, &payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(created)))
}

pub async fn get_upload_progress(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<UploadProgress>> {
    ResponseJson(ApiResponse::success(deployment.knowledge_bases().progress()))
}

/// Selects the knowledge base and returns it with its documents.
pub async fn get_knowledge_base(
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<KnowledgeBaseDetail>> {
    let documents = deployment
        .knowledge_bases()
        .select(knowledge_base.clone())
        .await;
    let knowledge_base = deployment
        .knowledge_bases()
        .selected()
        .await
        .unwrap_or(knowledge_base);
    ResponseJson(ApiResponse::success(KnowledgeBaseDetail {
        knowledge_base,
        documents,
    }))
}

pub async fn retrain_knowledge_base(
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<KnowledgeBase>>, ApiError> {
    let retrained = deployment
        .knowledge_bases()
        .trigger_retrain(&knowledge_base.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(retrained)))
}

pub async fn delete_knowledge_base(
    Extension(knowledge_base): Extension<KnowledgeBase>,
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment
        .knowledge_bases()
        .delete_knowledge_base(&knowledge_base.id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let knowledge_base_router = Router::new()
        .route(
            "/",
            get(get_knowledge_base).delete(delete_knowledge_base),
        )
        .route("/retrain", post(retrain_knowledge_base))
        .route("/documents", get(documents::get_documents))
        .route(
            "/documents/files",
            post(documents::upload_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/documents/url", post(documents::scrape_url))
        .route("/documents/text", post(documents::add_text))
        .route("/documents/{doc_id}", delete(documents::delete_document))
        .layer(from_fn_with_state(
            deployment.clone(),
            load_knowledge_base_middleware,
        ));

    Router::new()
        .route("/", get(get_knowledge_bases).post(create_knowledge_base))
        .route("/upload-progress", get(get_upload_progress))
        .nest("/{kb_id}", knowledge_base_router)
}
