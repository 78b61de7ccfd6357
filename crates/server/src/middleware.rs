use std::collections::HashMap;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use backend::User;
use db::models::{chatbot::Chatbot, knowledge_base::KnowledgeBase};

use crate::{DeploymentImpl, error::ApiError};

/// Rejects requests made while nobody is signed in and exposes the user as
/// an `Extension<User>`.
pub async fn require_user(
    State(deployment): State<DeploymentImpl>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = deployment.session().user().ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn path_param(params: &HashMap<String, String>, name: &str) -> Result<String, ApiError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("missing path parameter {name}")))
}

fn current_user(request: &Request) -> Result<User, ApiError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or(ApiError::Unauthorized)
}

pub async fn load_knowledge_base_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let kb_id = path_param(&params, "kb_id")?;
    let user = current_user(&request)?;

    let records = deployment.records();
    let Some(knowledge_base) = KnowledgeBase::find_by_id(records.as_ref(), &kb_id).await? else {
        tracing::warn!(kb_id = %kb_id, "Knowledge base not found");
        return Err(ApiError::NotFound(format!("knowledge base {kb_id}")));
    };
    if knowledge_base.user_id != user.id {
        return Err(ApiError::Forbidden(
            "Knowledge base belongs to another user".to_string(),
        ));
    }

    request.extensions_mut().insert(knowledge_base);
    Ok(next.run(request).await)
}

pub async fn load_chatbot_middleware(
    State(deployment): State<DeploymentImpl>,
    Path(params): Path<HashMap<String, String>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bot_id = path_param(&params, "bot_id")?;
    let user = current_user(&request)?;

    let records = deployment.records();
    let Some(chatbot) = Chatbot::find_by_id(records.as_ref(), &bot_id).await? else {
        tracing::warn!(bot_id = %bot_id, "Chatbot not found");
        return Err(ApiError::NotFound(format!("chatbot {bot_id}")));
    };
    if chatbot.user_id != user.id {
        return Err(ApiError::Forbidden(
            "Chatbot belongs to another user".to_string(),
        ));
    }

    request.extensions_mut().insert(chatbot);
    Ok(next.run(request).await)
}
