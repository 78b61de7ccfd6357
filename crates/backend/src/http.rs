use std::sync::RwLock;

use async_trait::async_trait;
use db::{Collection, ListQuery, RecordStore, StoreError};
use reqwest::{
    Client, RequestBuilder, Response,
    multipart::{Form, Part},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::watch;

use crate::{
    auth::{AuthClient, AuthState, Credentials, User},
    content::{
        ContentExtractor, GenerateTextRequest, GenerateTextResponse, ScrapeResult, TextGenerator,
        WebScraper,
    },
    error::BackendError,
    storage::{ObjectStorage, UploadFile, UploadOptions},
};

const PROJECT_KEY_HEADER: &str = "x-project-key";

#[derive(Deserialize)]
struct MeResponse {
    user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    public_url: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    text: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

/// Client for the hosted backend API.
///
/// Requests are authorised with the signed-in user's token when there is one
/// and always carry the project key when configured.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    project_id: String,
    project_key: Option<SecretString>,
    user_token: RwLock<Option<SecretString>>,
    auth_tx: watch::Sender<AuthState>,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        project_key: Option<SecretString>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .user_agent(concat!("kb-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (auth_tx, _) = watch::channel(AuthState::loading());
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            project_key,
            user_token: RwLock::new(None),
            auth_tx,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/projects/{}/{}", self.base_url, self.project_id, path)
    }

    fn current_token(&self) -> Option<String> {
        self.user_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|token| token.expose_secret().to_string())
    }

    fn set_token(&self, token: Option<SecretString>) {
        *self
            .user_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = token;
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.project_key {
            Some(key) => request.header(PROJECT_KEY_HEADER, key.expose_secret()),
            None => request,
        };
        match self.current_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|err| err.message)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                }
            });
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::check(self.authorize(request).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    fn file_part(file: &UploadFile) -> Result<Part, BackendError> {
        let part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
        Ok(match &file.content_type {
            Some(content_type) => part.mime_str(content_type)?,
            None => part,
        })
    }
}

#[async_trait]
impl AuthClient for HttpBackend {
    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }

    async fn login(&self, credentials: Credentials) -> Result<User, BackendError> {
        let request = self
            .client
            .get(self.endpoint("auth/me"))
            .bearer_auth(credentials.token.expose_secret());
        let request = match &self.project_key {
            Some(key) => request.header(PROJECT_KEY_HEADER, key.expose_secret()),
            None => request,
        };

        let result = match request.send().await {
            Ok(response) => match Self::check(response).await {
                Ok(response) => response.json::<MeResponse>().await.map_err(BackendError::from),
                Err(err) => Err(err),
            },
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(me) => {
                self.set_token(Some(credentials.token));
                self.auth_tx.send_replace(AuthState::signed_in(me.user.clone()));
                tracing::info!(user_id = %me.user.id, "Signed in");
                Ok(me.user)
            }
            Err(err) => {
                self.set_token(None);
                self.auth_tx.send_replace(AuthState::signed_out());
                Err(err)
            }
        }
    }

    async fn logout(&self) -> Result<(), BackendError> {
        if self.current_token().is_some() {
            let request = self.authorize(self.client.post(self.endpoint("auth/logout")));
            match request.send().await {
                Ok(response) => {
                    if let Err(err) = Self::check(response).await {
                        tracing::warn!(error = %err, "Remote sign-out failed");
                    }
                }
                Err(err) => tracing::warn!(error = %err, "Remote sign-out failed"),
            }
        }
        self.set_token(None);
        self.auth_tx.send_replace(AuthState::signed_out());
        Ok(())
    }
}

#[async_trait]
impl RecordStore for HttpBackend {
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let request = self
            .client
            .post(self.endpoint(&format!("db/{collection}")))
            .json(&record);
        Ok(self.send_json(request).await?)
    }

    async fn list(&self, collection: Collection, query: ListQuery) -> Result<Vec<Value>, StoreError> {
        let request = self
            .client
            .post(self.endpoint(&format!("db/{collection}/query")))
            .json(&query);
        Ok(self.send_json(request).await?)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Value,
    ) -> Result<Value, StoreError> {
        let request = self
            .client
            .patch(self.endpoint(&format!("db/{collection}/{id}")))
            .json(&fields);
        Ok(self.send_json(request).await?)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let request = self
            .authorize(self.client.delete(self.endpoint(&format!("db/{collection}/{id}"))));
        let response = request.send().await.map_err(BackendError::from)?;
        match Self::check(response).await {
            Ok(_) => Ok(()),
            Err(BackendError::Status { status: 404, .. }) => Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpBackend {
    async fn upload(
        &self,
        file: &UploadFile,
        path: &str,
        options: UploadOptions,
    ) -> Result<String, BackendError> {
        let form = Form::new()
            .part("file", Self::file_part(file)?)
            .text("path", path.to_string())
            .text("upsert", options.upsert.to_string());
        let request = self.client.post(self.endpoint("storage/upload")).multipart(form);
        let uploaded: UploadResponse = self.send_json(request).await?;
        Ok(uploaded.public_url)
    }
}

#[async_trait]
impl ContentExtractor for HttpBackend {
    async fn extract_text(&self, file: &UploadFile) -> Result<String, BackendError> {
        let form = Form::new().part("file", Self::file_part(file)?);
        let request = self.client.post(self.endpoint("data/extract")).multipart(form);
        let extracted: ExtractResponse = self.send_json(request).await?;
        Ok(extracted.text)
    }
}

#[async_trait]
impl WebScraper for HttpBackend {
    async fn scrape(&self, url: &str) -> Result<ScrapeResult, BackendError> {
        let request = self
            .client
            .post(self.endpoint("data/scrape"))
            .json(&serde_json::json!({ "url": url }));
        self.send_json(request).await
    }
}

#[async_trait]
impl TextGenerator for HttpBackend {
    async fn generate_text(
        &self,
        request: &GenerateTextRequest,
    ) -> Result<GenerateTextResponse, BackendError> {
        let http_request = self.client.post(self.endpoint("ai/text")).json(request);
        self.send_json(http_request).await
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn backend(server: &mockito::ServerGuard) -> HttpBackend {
        HttpBackend::new(
            server.url(),
            "proj",
            Some(SecretString::from("project-key".to_string())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn login_publishes_signed_in_state_and_authorizes_later_calls() {
        let mut server = mockito::Server::new_async().await;
        let me = server
            .mock("GET", "/v1/projects/proj/auth/me")
            .match_header("authorization", "Bearer user-token")
            .match_header("x-project-key", "project-key")
            .with_status(200)
            .with_body(r#"{"user":{"id":"user_1","email":"a@b.c"}}"#)
            .create_async()
            .await;
        let list = server
            .mock("POST", "/v1/projects/proj/db/chatbots/query")
            .match_header("authorization", "Bearer user-token")
            .match_body(Matcher::PartialJson(json!({"where": {"userId": "user_1"}})))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = backend(&server);
        let rx = client.subscribe();
        assert!(rx.borrow().is_loading);

        let user = client.login(Credentials::token("user-token")).await.unwrap();
        assert_eq!(user.id, "user_1");
        assert_eq!(rx.borrow().user.as_ref().map(|u| u.id.as_str()), Some("user_1"));

        let rows = client
            .list(Collection::Chatbots, ListQuery::new().filter("userId", "user_1"))
            .await
            .unwrap();
        assert!(rows.is_empty());

        me.assert_async().await;
        list.assert_async().await;
    }

    #[tokio::test]
    async fn failed_login_resolves_to_signed_out() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/projects/proj/auth/me")
            .with_status(401)
            .with_body(r#"{"error":"invalid token"}"#)
            .create_async()
            .await;

        let client = backend(&server);
        let err = client.login(Credentials::token("bad")).await.unwrap_err();
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid token");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*client.subscribe().borrow(), AuthState::signed_out());
    }

    #[tokio::test]
    async fn generate_text_posts_camel_case_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/projects/proj/ai/text")
            .match_body(Matcher::Json(json!({
                "prompt": "hi",
                "model": "gpt-4o-mini",
                "maxTokens": 1000,
                "temperature": 0.5
            })))
            .with_status(200)
            .with_body(r#"{"text":"hello"}"#)
            .create_async()
            .await;

        let client = backend(&server);
        let response = client
            .generate_text(&GenerateTextRequest {
                prompt: "hi".to_string(),
                model: "gpt-4o-mini".to_string(),
                max_tokens: 1000,
                temperature: 0.5,
            })
            .await
            .unwrap();
        assert_eq!(response.text, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v1/projects/proj/db/documents/doc_1")
            .with_status(404)
            .create_async()
            .await;

        let client = backend(&server);
        let err = client.delete(Collection::Documents, "doc_1").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn scrape_reads_markdown_and_title() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/projects/proj/data/scrape")
            .match_body(Matcher::Json(json!({"url": "https://example.com"})))
            .with_status(200)
            .with_body(r##"{"markdown":"# Example","metadata":{"title":"Example"}}"##)
            .create_async()
            .await;

        let client = backend(&server);
        let page = client.scrape("https://example.com").await.unwrap();
        assert_eq!(page.markdown, "# Example");
        assert_eq!(page.metadata.title.as_deref(), Some("Example"));
    }
}
