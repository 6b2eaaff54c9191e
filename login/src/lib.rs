//! Browser-delegated login for `labctl`.
//!
//! A login either binds credentials the caller already holds, or creates a
//! remote session, sends the user to authorize it in a browser and polls
//! until that happens. Success persists the credentials and makes sure a
//! local SSH identity exists.

mod browser;
mod error;
mod login;
mod options;
mod poll;
mod store;

pub use browser::Browser;
pub use browser::SystemBrowser;
pub use error::BoxError;
pub use error::LoginError;
pub use login::Login;
pub use login::LoginEvent;
pub use login::LoginOutcome;
pub use options::LoginMode;
pub use options::LoginOptions;
pub use poll::DEFAULT_LOGIN_TIMEOUT;
pub use poll::DEFAULT_POLL_INTERVAL;
pub use poll::PollOutcome;
pub use poll::PollSettings;
pub use poll::wait_for_authorization;
pub use store::CredentialStore;
pub use store::IdentityProvisioner;
pub use store::SshIdentityProvisioner;
