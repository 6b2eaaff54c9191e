use std::path::PathBuf;

use lab_api_client::ApiError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failures of a login attempt.
///
/// `Configuration` and `AlreadyAuthenticated` are raised before any side
/// effect. The rest abort the flow after it has started.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Only one half of a session id / access token pair was supplied.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "Already logged in. Use 'labctl auth logout' first if you want to log in as a different user."
    )]
    AlreadyAuthenticated,

    #[error("couldn't start a session: {0}")]
    SessionCreation(#[source] ApiError),

    #[error("couldn't save the credentials to the config file: {0}")]
    Persistence(#[source] BoxError),

    #[error("couldn't generate SSH identity in {}: {source}", dir.display())]
    IdentityProvisioning {
        dir: PathBuf,
        #[source]
        source: BoxError,
    },
}
