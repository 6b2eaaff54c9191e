//! Login sessions and the service seam the login flow talks to.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ApiError;

/// Server-side record of a login attempt.
///
/// `authenticated` flips to `true` once the user approves the session in a
/// browser. Clients only ever observe it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, rename = "authUrl")]
    pub auth_url: String,
    #[serde(default)]
    pub authenticated: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("access_token", &redacted(&self.access_token))
            .field("auth_url", &self.auth_url)
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

/// A session id paired with its access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub session_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn new(session_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("session_id", &self.session_id)
            .field("access_token", &redacted(&self.access_token))
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

/// Remote session operations used by the login flow.
///
/// Binding credentials affects every later call made through the same
/// handle, including clones that share its state.
#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Start a new, not yet authorized, session.
    async fn create_session(&self) -> Result<Session, ApiError>;

    /// Fetch the current state of a session.
    async fn get_session(&self, id: &str) -> Result<Session, ApiError>;

    /// Attach credentials to subsequent outgoing requests.
    fn bind_credentials(&self, credentials: Credentials);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_decodes_camel_case() {
        let session: Session = serde_json::from_str(
            r#"{"id":"s1","accessToken":"t1","authUrl":"https://labs.example/auth/s1","authenticated":true}"#,
        )
        .unwrap();

        assert_eq!(session.id, "s1");
        assert_eq!(session.access_token, "t1");
        assert_eq!(session.auth_url, "https://labs.example/auth/s1");
        assert!(session.authenticated);
    }

    #[test]
    fn missing_flag_means_not_authenticated() {
        let session: Session = serde_json::from_str(r#"{"id":"s1"}"#).unwrap();

        assert!(!session.authenticated);
        assert_eq!(session.access_token, "");
    }

    #[test]
    fn debug_hides_tokens() {
        let creds = Credentials::new("s1", "very-secret");
        let session = Session {
            id: "s1".to_string(),
            access_token: "very-secret".to_string(),
            auth_url: String::new(),
            authenticated: false,
        };

        assert!(!format!("{creds:?}").contains("very-secret"));
        assert!(!format!("{session:?}").contains("very-secret"));
    }
}
