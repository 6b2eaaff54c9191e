//! HTTP implementation of [`SessionService`] against the labs API.
//!
//! Endpoints (relative to the configured base URL):
//! - `POST auth/sessions` starts a session
//! - `GET auth/sessions/{id}` reads it back
//!
//! Bound credentials travel as `Authorization: Bearer <token>` plus an
//! `X-Session-ID` header.

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::ApiError;
use crate::session::Credentials;
use crate::session::Session;
use crate::session::SessionService;

const SESSIONS_PATH: &str = "auth/sessions";
const SESSION_ID_HEADER: &str = "X-Session-ID";
const USER_AGENT: &str = concat!("labctl/", env!("CARGO_PKG_VERSION"));

/// Cloneable API handle. Clones share bound credentials.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    sessions_url: Url,
    credentials: Arc<RwLock<Option<Credentials>>>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Self::with_http_client(http, base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let invalid = |reason: String| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        // `Url::join` drops the last segment unless the base ends with '/'.
        let mut normalized = base_url.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot be used as a base".to_string()));
        }
        let sessions_url = base
            .join(SESSIONS_PATH)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            http,
            sessions_url,
            credentials: Arc::new(RwLock::new(None)),
        })
    }

    /// Currently bound credentials, if any.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn session_url(&self, id: &str) -> Result<Url, ApiError> {
        let mut url = self.sessions_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl {
                url: self.sessions_url.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            })?
            .push(id);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.credentials() {
            Some(creds) => builder
                .bearer_auth(&creds.access_token)
                .header(SESSION_ID_HEADER, &creds.session_id),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SessionService for ApiClient {
    async fn create_session(&self) -> Result<Session, ApiError> {
        let session: Session = self
            .send(self.request(Method::POST, self.sessions_url.clone()))
            .await?;
        tracing::debug!(session_id = %session.id, "created login session");
        Ok(session)
    }

    async fn get_session(&self, id: &str) -> Result<Session, ApiError> {
        let url = self.session_url(id)?;
        self.send(self.request(Method::GET, url)).await
    }

    fn bind_credentials(&self, credentials: Credentials) {
        tracing::debug!(session_id = %credentials.session_id, "binding API credentials");
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/api", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn create_session_posts_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sessions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ses-1",
                "accessToken": "tok-1",
                "authUrl": "https://labs.example/cli/ses-1",
                "authenticated": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server).await.create_session().await.unwrap();

        assert_eq!(session.id, "ses-1");
        assert_eq!(session.access_token, "tok-1");
        assert_eq!(session.auth_url, "https://labs.example/cli/ses-1");
        assert!(!session.authenticated);
    }

    #[tokio::test]
    async fn bound_credentials_are_sent_by_every_clone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sessions/ses-1"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("x-session-id", "ses-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "ses-1",
                "authenticated": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let clone = client.clone();
        client.bind_credentials(Credentials::new("ses-1", "tok-1"));

        let session = clone.get_session("ses-1").await.unwrap();

        assert!(session.authenticated);
        assert_eq!(clone.credentials(), Some(Credentials::new("ses-1", "tok-1")));
    }

    #[tokio::test]
    async fn session_id_is_escaped_as_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sessions/a%2Fb"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "a/b" })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server).await.get_session("a/b").await.unwrap();

        assert_eq!(session.id, "a/b");
    }

    #[tokio::test]
    async fn error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/sessions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.create_session().await.unwrap_err();

        match &err {
            ApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sessions/ses-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_session("ses-1")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Decode(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = ApiClient::new("mailto:someone@example.com").unwrap_err();

        assert!(matches!(err, ApiError::InvalidBaseUrl { .. }));
    }
}
