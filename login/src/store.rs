//! Persistence seams: where credentials are stored and where the SSH
//! identity is provisioned.

use std::path::Path;
use std::path::PathBuf;

use lab_api_client::Credentials;
use lab_config::Config;

use crate::error::BoxError;

/// Mutable holder of the stored credential pair.
pub trait CredentialStore: Send {
    /// The stored pair, only when both halves are present.
    fn stored_credentials(&self) -> Option<Credentials>;

    /// Update the in-memory pair. Not durable until [`CredentialStore::dump`].
    fn set_credentials(&mut self, credentials: &Credentials);

    /// Durably persist the whole store.
    fn dump(&self) -> Result<(), BoxError>;

    /// Directory the SSH identity belongs in.
    fn ssh_dir(&self) -> PathBuf;
}

impl CredentialStore for Config {
    fn stored_credentials(&self) -> Option<Credentials> {
        self.is_logged_in()
            .then(|| Credentials::new(&self.session_id, &self.access_token))
    }

    fn set_credentials(&mut self, credentials: &Credentials) {
        self.session_id.clone_from(&credentials.session_id);
        self.access_token.clone_from(&credentials.access_token);
    }

    fn dump(&self) -> Result<(), BoxError> {
        Config::dump(self).map_err(Into::into)
    }

    fn ssh_dir(&self) -> PathBuf {
        self.ssh_dir.clone()
    }
}

/// Creates the local SSH identity. Must not replace an existing one.
pub trait IdentityProvisioner: Send + Sync {
    fn generate_identity(&self, dir: &Path) -> Result<(), BoxError>;
}

/// Ed25519 identity on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct SshIdentityProvisioner;

impl IdentityProvisioner for SshIdentityProvisioner {
    fn generate_identity(&self, dir: &Path) -> Result<(), BoxError> {
        lab_ssh::generate_identity(dir)?;
        Ok(())
    }
}
