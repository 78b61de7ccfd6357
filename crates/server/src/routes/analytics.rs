use axum::{
    Extension, Router,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use backend::User;
use serde::Deserialize;
use services::services::analytics::{AnalyticsReport, TimeRange};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

#[derive(Debug, Default, Deserialize, TS)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub range: TimeRange,
}

pub async fn get_analytics(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<ResponseJson<ApiResponse<AnalyticsReport>>, ApiError> {
    let report = deployment.analytics().report(&user.id, query.range).await?;
    Ok(ResponseJson(ApiResponse::success(report)))
}

/// Downloads daily volume as `chatbot-analytics-<range>.csv`.
pub async fn export_analytics(
    Extension(user): Extension<User>,
    State(deployment): State<DeploymentImpl>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Response, ApiError> {
    let export = deployment.analytics().export(&user.id, query.range).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response())
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/", get(get_analytics))
        .route("/export", get(export_analytics))
}
