use lab_api_client::Credentials;

use crate::error::LoginError;

/// Caller input for a login attempt. Empty strings count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LoginOptions {
    pub session_id: Option<String>,
    pub access_token: Option<String>,
}

/// Which path a valid set of options selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMode {
    /// The caller already holds credentials; skip the browser flow.
    Direct(Credentials),
    /// Create a session and wait for the user to authorize it.
    Interactive,
}

impl LoginOptions {
    pub fn new(session_id: Option<String>, access_token: Option<String>) -> Self {
        Self {
            session_id,
            access_token,
        }
    }

    pub fn direct(session_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::new(Some(session_id.into()), Some(access_token.into()))
    }

    /// Reject a half-specified pair.
    pub fn validate(&self) -> Result<(), LoginError> {
        self.mode().map(|_| ())
    }

    pub fn mode(&self) -> Result<LoginMode, LoginError> {
        let session_id = self.session_id.as_deref().filter(|s| !s.is_empty());
        let access_token = self.access_token.as_deref().filter(|s| !s.is_empty());

        match (session_id, access_token) {
            (Some(id), Some(token)) => Ok(LoginMode::Direct(Credentials::new(id, token))),
            (None, None) => Ok(LoginMode::Interactive),
            (Some(_), None) => Err(LoginError::Configuration(
                "Access token must be provided if session ID is specified.".to_string(),
            )),
            (None, Some(_)) => Err(LoginError::Configuration(
                "Session ID must be provided if access token is specified.".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for LoginOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOptions")
            .field("session_id", &self.session_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
