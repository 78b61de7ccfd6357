use axum::{Router, middleware::from_fn_with_state};

use crate::{DeploymentImpl, middleware::require_user};

pub mod analytics;
pub mod chatbots;
pub mod dashboard;
pub mod health;
pub mod integrations;
pub mod knowledge_bases;
pub mod marketing;
pub mod session;
pub mod test_chat;

/// Every API route, mounted under `/api`.
pub fn router(deployment: DeploymentImpl) -> Router {
    let signed_in = Router::new()
        .merge(dashboard::router())
        .merge(test_chat::router())
        .nest("/knowledge-bases", knowledge_bases::router(&deployment))
        .nest("/chatbots", chatbots::router(&deployment))
        .nest("/integrations", integrations::router())
        .nest("/analytics", analytics::router())
        .route_layer(from_fn_with_state(deployment.clone(), require_user));

    let api = Router::new()
        .merge(health::router())
        .merge(session::router())
        .merge(marketing::router())
        .merge(signed_in);

    Router::new().nest("/api", api).with_state(deployment)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use backend::test_support::{Fakes, fake_backend};
    use db::models::knowledge_base::{CreateKnowledgeBase, KnowledgeBase};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use services::services::{
        config::Config,
        integrations::{IntegrationKind, IntegrationStatus},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::deployment::LocalDeployment;

    async fn test_app() -> (Router, DeploymentImpl, Fakes) {
        let (backend, fakes) = fake_backend().await;
        let mut config = Config::default();
        config.knowledge_base.retrain_delay_ms = 0;
        config.integrations.setup_delay_ms = 0;
        config.analytics.loading_delay_ms = 0;
        let deployment = LocalDeployment::new(config, backend);
        (router(deployment.clone()), deployment, fakes)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::delete(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn sign_in(app: &Router, token: &str) -> String {
        let (status, body) = send(app, post_json("/api/auth/login", json!({ "token": token }))).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_kb(app: &Router, name: &str) -> String {
        let (status, body) = send(app, post_json("/api/knowledge-bases", json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_and_marketing_are_public() {
        let (app, _, _) = test_app().await;
        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");

        let (status, body) = send(&app, get("/api/marketing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pricing"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn session_gate_follows_sign_in() {
        let (app, _, _) = test_app().await;
        let (_, body) = send(&app, get("/api/session")).await;
        assert_eq!(body["data"]["view"], "loading");

        let user_id = sign_in(&app, "alice").await;
        assert_eq!(user_id, "user_alice");
        let (_, body) = send(&app, get("/api/session")).await;
        assert_eq!(body["data"]["view"], "dashboard");
        assert_eq!(body["data"]["user"]["id"], "user_alice");

        let (status, _) = send(&app, post_json("/api/auth/logout", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, get("/api/session")).await;
        assert_eq!(body["data"]["view"], "marketing");
    }

    #[tokio::test]
    async fn dashboard_routes_require_a_user() {
        let (app, _, _) = test_app().await;
        let (status, body) = send(&app, get("/api/dashboard")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, post_json("/api/auth/login", json!({ "token": " " }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn text_documents_update_totals() {
        let (app, _, _) = test_app().await;
        sign_in(&app, "alice").await;

        let (_, body) = send(&app, post_json("/api/knowledge-bases", json!({ "name": "  " }))).await;
        assert_eq!(body["success"], true);
        assert!(body["data"].is_null());

        let kb_id = create_kb(&app, "Docs").await;
        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/knowledge-bases/{kb_id}/documents/text"),
                json!({ "text": "hello world" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["type"], "text");
        assert_eq!(body["data"]["fileSize"], 11);
        let doc_id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, get(&format!("/api/knowledge-bases/{kb_id}"))).await;
        assert_eq!(body["data"]["knowledgeBase"]["fileCount"], 1);
        assert_eq!(body["data"]["knowledgeBase"]["totalSize"], 11);
        assert_eq!(body["data"]["documents"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, post_json("/api/dashboard/refresh", json!({}))).await;
        assert_eq!(body["data"]["overview"]["knowledgeBaseCount"], 1);
        assert_eq!(body["data"]["overview"]["totalDocuments"], 1);

        let (status, _) = send(
            &app,
            delete(&format!("/api/knowledge-bases/{kb_id}/documents/{doc_id}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, get(&format!("/api/knowledge-bases/{kb_id}"))).await;
        assert_eq!(body["data"]["knowledgeBase"]["fileCount"], 0);
        assert_eq!(body["data"]["knowledgeBase"]["totalSize"], 0);

        let (status, _) = send(
            &app,
            delete(&format!("/api/knowledge-bases/{kb_id}/documents/{doc_id}")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn multipart_upload_creates_file_documents() {
        let (app, _, fakes) = test_app().await;
        sign_in(&app, "alice").await;
        let kb_id = create_kb(&app, "Docs").await;

        let body = "--BOUNDARY\r\n\
            Content-Disposition: form-data; name=\"files\"; filename=\"notes.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            hello\r\n\
            --BOUNDARY--\r\n";
        let request = Request::post(format!("/api/knowledge-bases/{kb_id}/documents/files"))
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let documents = body["data"].as_array().unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["name"], "notes.txt");
        assert_eq!(documents[0]["type"], "file");
        assert_eq!(documents[0]["content"], "hello");
        assert_eq!(fakes.storage.uploaded_paths().len(), 1);

        let (_, body) = send(&app, get("/api/knowledge-bases/upload-progress")).await;
        assert_eq!(body["data"]["uploading"], false);
    }

    #[tokio::test]
    async fn other_users_knowledge_bases_are_forbidden() {
        let (app, _, fakes) = test_app().await;
        sign_in(&app, "alice").await;
        KnowledgeBase::create(
            fakes.records.as_ref(),
            "user_bob",
            &CreateKnowledgeBase {
                name: "Private".to_string(),
                ..Default::default()
            },
            "kb_bob",
        )
        .await
        .unwrap();

        let (status, _) = send(&app, get("/api/knowledge-bases/kb_bob")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, get("/api/knowledge-bases/kb_missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app, get("/api/knowledge-bases")).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn retrain_and_delete_knowledge_base() {
        let (app, _, _) = test_app().await;
        sign_in(&app, "alice").await;
        let kb_id = create_kb(&app, "Docs").await;

        let (status, body) = send(
            &app,
            post_json(&format!("/api/knowledge-bases/{kb_id}/retrain"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"]["updatedAt"].is_null());

        let (status, _) = send(&app, delete(&format!("/api/knowledge-bases/{kb_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, get(&format!("/api/knowledge-bases/{kb_id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chatbot_test_conversation() {
        let (app, _, fakes) = test_app().await;
        sign_in(&app, "alice").await;
        let kb_id = create_kb(&app, "Docs").await;

        let (status, body) = send(
            &app,
            post_json(
                "/api/chatbots",
                json!({ "name": "Support", "knowledge_base_id": kb_id }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let bot_id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, get("/api/chatbots")).await;
        assert_eq!(body["data"][0]["id"], bot_id.as_str());
        assert_eq!(body["data"][0]["knowledgeBaseName"], "Docs");

        let (_, body) = send(&app, post_json("/api/test-chat/messages", json!({ "content": "hi" }))).await;
        assert_eq!(body["data"]["outcome"], "ignored");
        assert_eq!(body["data"]["reason"], "no_chatbot");

        let (_, body) = send(&app, post_json(&format!("/api/chatbots/{bot_id}/select"), json!({}))).await;
        assert_eq!(body["data"]["chatbot"]["id"], bot_id.as_str());
        assert!(body["data"]["messages"].as_array().unwrap().is_empty());

        let (_, body) = send(&app, post_json("/api/test-chat/messages", json!({ "content": "hi" }))).await;
        assert_eq!(body["data"]["outcome"], "replied");
        assert_eq!(body["data"]["message"]["content"], "Hello from the bot");
        assert_eq!(fakes.generator.recorded().len(), 1);

        let (_, body) = send(&app, get(&format!("/api/chatbots/{bot_id}/embed"))).await;
        assert!(
            body["data"]["code"]
                .as_str()
                .unwrap()
                .contains(&format!("/embed/chatbot/{bot_id}"))
        );

        let (status, _) = send(&app, delete(&format!("/api/chatbots/{bot_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, get("/api/test-chat")).await;
        assert!(body["data"]["chatbot"].is_null());
    }

    #[tokio::test]
    async fn chatbot_needs_an_owned_knowledge_base() {
        let (app, _, _) = test_app().await;
        sign_in(&app, "alice").await;
        let (status, body) = send(&app, post_json("/api/chatbots", json!({ "name": "Support" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].is_null());

        let (status, _) = send(
            &app,
            post_json(
                "/api/chatbots",
                json!({ "name": "Support", "knowledge_base_id": "kb_missing" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn integrations_connect_and_disconnect() {
        let (app, _, _) = test_app().await;
        sign_in(&app, "alice").await;

        let (status, body) = send(&app, post_json("/api/integrations", json!({ "type": "slack" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "connected");
        assert!(
            body["data"]["config"]["webhook_url"]
                .as_str()
                .unwrap()
                .ends_with("/slack/user_alice")
        );
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, get("/api/integrations")).await;
        assert_eq!(body["data"]["connectedCount"], 1);
        assert_eq!(body["data"]["integrations"].as_array().unwrap().len(), 4);

        let (_, body) = send(&app, post_json(&format!("/api/integrations/{id}/disconnect"), json!({}))).await;
        assert_eq!(body["data"]["status"], "disconnected");
        let (status, _) = send(&app, post_json("/api/integrations/missing/disconnect", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn analytics_report_and_csv_export() {
        let (app, _, _) = test_app().await;
        sign_in(&app, "alice").await;

        let (status, body) = send(&app, get("/api/analytics?range=30d")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["range"], "30d");

        let (status, _) = send(&app, get("/api/analytics?range=1y")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let response = app.clone().oneshot(get("/api/analytics/export")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"chatbot-analytics-7d.csv\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).starts_with("Date,Messages\n"));
    }

    #[tokio::test]
    async fn signing_out_resets_session_panels() {
        let (app, deployment, _) = test_app().await;
        sign_in(&app, "alice").await;
        send(&app, post_json("/api/integrations", json!({ "type": "zapier" }))).await;
        assert_eq!(deployment.integrations().list().await.len(), 4);

        send(&app, post_json("/api/auth/logout", json!({}))).await;
        let (status, _) = send(&app, get("/api/integrations")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for _ in 0..50 {
            if deployment.integrations().list().await.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(deployment.integrations().list().await.len(), 3);
    }

    #[tokio::test]
    async fn quick_user_switch_keeps_the_new_users_setup() {
        let (app, deployment, _) = test_app().await;
        sign_in(&app, "alice").await;
        send(&app, post_json("/api/integrations", json!({ "type": "zapier" }))).await;

        send(&app, post_json("/api/auth/logout", json!({}))).await;
        sign_in(&app, "bob").await;
        let (status, _) = send(&app, post_json("/api/integrations", json!({ "type": "slack" }))).await;
        assert_eq!(status, StatusCode::OK);

        // Let the session watcher catch up with both switches.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let integrations = deployment.integrations().list().await;
        assert_eq!(integrations.len(), 4);
        let connected: Vec<_> = integrations
            .iter()
            .filter(|integration| integration.status == IntegrationStatus::Connected)
            .collect();
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].kind, IntegrationKind::Slack);
        assert!(
            connected[0]
                .webhook_url()
                .is_some_and(|url| url.ends_with("/slack/user_bob"))
        );
    }
}
