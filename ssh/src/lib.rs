//! Local SSH identity used by `labctl` to reach playground machines.
//!
//! An identity is an ed25519 keypair stored as `id_ed25519` and
//! `id_ed25519.pub` in OpenSSH format. Provisioning is create-if-absent:
//! an existing private key is never replaced.

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::DirBuilderExt;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::path::PathBuf;

use ssh_key::Algorithm;
use ssh_key::LineEnding;
use ssh_key::PrivateKey;
use ssh_key::rand_core::OsRng;
use thiserror::Error;

pub const IDENTITY_FILE: &str = "id_ed25519";
pub const PUBLIC_IDENTITY_FILE: &str = "id_ed25519.pub";

const KEY_COMMENT: &str = "labctl";

#[derive(Debug, Error)]
pub enum SshError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("key error: {0}")]
    Key(#[from] ssh_key::Error),
}

/// Paths of an identity rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPaths {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

impl IdentityPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            private_key: dir.join(IDENTITY_FILE),
            public_key: dir.join(PUBLIC_IDENTITY_FILE),
        }
    }
}

/// Ensure an identity exists in `dir`, generating one only if absent.
///
/// If the private key exists but the public half is missing, the public key
/// is re-derived from it. Nothing is written when both files are present.
pub fn generate_identity(dir: &Path) -> Result<IdentityPaths, SshError> {
    let paths = IdentityPaths::in_dir(dir);

    if paths.private_key.exists() {
        if !paths.public_key.exists() {
            tracing::info!(
                "restoring missing public key {}",
                paths.public_key.display()
            );
            let key = PrivateKey::read_openssh_file(&paths.private_key)?;
            write_public_key(&key, &paths.public_key)?;
        } else {
            tracing::debug!("SSH identity already present in {}", dir.display());
        }
        return Ok(paths);
    }

    create_private_dir(dir)?;

    let mut key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)?;
    key.set_comment(KEY_COMMENT);

    let pem = key.to_openssh(LineEnding::LF)?;
    match write_new_file(&paths.private_key, pem.as_bytes(), 0o600) {
        Ok(()) => {}
        Err(SshError::Io { source, .. }) if source.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(
                "SSH identity appeared concurrently in {}, keeping it",
                dir.display()
            );
            return Ok(paths);
        }
        Err(err) => return Err(err),
    }
    write_public_key(&key, &paths.public_key)?;

    tracing::info!("generated SSH identity {}", paths.private_key.display());
    Ok(paths)
}

fn write_public_key(key: &PrivateKey, path: &Path) -> Result<(), SshError> {
    let mut line = key.public_key().to_openssh()?;
    line.push('\n');
    write_file(path, line.as_bytes(), 0o644)
}

fn create_private_dir(dir: &Path) -> Result<(), SshError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    builder.create(dir).map_err(|source| SshError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, data: &[u8], mode: u32) -> Result<(), SshError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    open_and_write(options, path, data, mode)
}

/// Like [`write_file`] but fails with `AlreadyExists` instead of replacing.
fn write_new_file(path: &Path, data: &[u8], mode: u32) -> Result<(), SshError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    open_and_write(options, path, data, mode)
}

#[cfg_attr(not(unix), allow(unused_variables, unused_mut))]
fn open_and_write(
    mut options: OpenOptions,
    path: &Path,
    data: &[u8],
    mode: u32,
) -> Result<(), SshError> {
    #[cfg(unix)]
    options.mode(mode);

    options
        .open(path)
        .and_then(|mut file| file.write_all(data))
        .map_err(|source| SshError::Io {
            path: path.to_path_buf(),
            source,
        })
}
