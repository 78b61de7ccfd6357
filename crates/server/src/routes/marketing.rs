use axum::{Router, response::Json as ResponseJson, routing::get};
use services::services::marketing::{MarketingPage, marketing_page};
use utils::response::ApiResponse;

use crate::DeploymentImpl;

pub async fn get_marketing_page() -> ResponseJson<ApiResponse<MarketingPage>> {
    ResponseJson(ApiResponse::success(marketing_page()))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new().route("/marketing", get(get_marketing_page))
}
