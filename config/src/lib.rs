//! Persistent `labctl` configuration.
//!
//! The config lives at `$LABCTL_HOME/config.toml` (default `~/.labctl`).
//! A missing file loads as defaults; `dump` rewrites the whole file
//! atomically through a temp sibling.

use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Overrides the directory holding `config.toml`.
pub const LABCTL_HOME_ENV_VAR: &str = "LABCTL_HOME";

/// Overrides the API base URL for a single invocation. Never persisted.
pub const API_BASE_URL_ENV_VAR: &str = "LABCTL_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "https://labs.iximiuz.com/api";

const CONFIG_FILE: &str = "config.toml";
const SSH_DIR: &str = "ssh";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("couldn't encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("could not determine home directory")]
    NoHomeDir,
}

/// On-disk shape. Every key is optional so partial files load.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigToml {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssh_dir: Option<PathBuf>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Where `dump` writes to.
    pub file_path: PathBuf,
    pub api_base_url: String,
    pub session_id: String,
    pub access_token: String,
    pub ssh_dir: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("file_path", &self.file_path)
            .field("api_base_url", &self.api_base_url)
            .field("session_id", &self.session_id)
            .field(
                "access_token",
                &if self.access_token.is_empty() { "" } else { "<redacted>" },
            )
            .field("ssh_dir", &self.ssh_dir)
            .finish()
    }
}

impl Config {
    /// Load from the default location, honoring `LABCTL_HOME`.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(find_labctl_home()?.join(CONFIG_FILE))
    }

    /// Load from `file_path`, falling back to defaults when it does not exist.
    pub fn load(file_path: PathBuf) -> Result<Self, ConfigError> {
        let parsed = match fs::read_to_string(&file_path) {
            Ok(contents) => {
                toml::from_str::<ConfigToml>(&contents).map_err(|source| ConfigError::Parse {
                    path: file_path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", file_path.display());
                ConfigToml::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: file_path,
                    source,
                });
            }
        };

        let home = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            api_base_url: parsed
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            session_id: parsed.session_id.unwrap_or_default(),
            access_token: parsed.access_token.unwrap_or_default(),
            ssh_dir: parsed.ssh_dir.unwrap_or_else(|| home.join(SSH_DIR)),
            file_path,
        })
    }

    /// Both halves of the stored credential pair are present.
    pub fn is_logged_in(&self) -> bool {
        !self.session_id.is_empty() && !self.access_token.is_empty()
    }

    /// Persist the whole config, replacing the file atomically.
    ///
    /// The file is created with `0o600` on unix since it holds the access token.
    pub fn dump(&self) -> Result<(), ConfigError> {
        let doc = ConfigToml {
            api_base_url: Some(self.api_base_url.clone()),
            session_id: non_empty(&self.session_id),
            access_token: non_empty(&self.access_token),
            ssh_dir: Some(self.ssh_dir.clone()),
        };
        let contents = toml::to_string_pretty(&doc)?;

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.file_path.with_extension("toml.tmp");
        write_private(&tmp, contents.as_bytes()).map_err(|source| ConfigError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.file_path).map_err(|source| ConfigError::Io {
            path: self.file_path.clone(),
            source,
        })?;

        tracing::debug!("config written to {}", self.file_path.display());
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path)?;
    // `mode` only applies on creation; a stale tmp file keeps its old bits.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    file.sync_all()
}

/// `$LABCTL_HOME` if set, otherwise `~/.labctl`.
pub fn find_labctl_home() -> Result<PathBuf, ConfigError> {
    if let Ok(home) = std::env::var(LABCTL_HOME_ENV_VAR)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }

    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".labctl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = Config::load(path.clone()).unwrap();

        assert_eq!(config.file_path, path);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.ssh_dir, dir.path().join("ssh"));
        assert!(!config.is_logged_in());
    }

    #[test]
    fn dump_then_load_keeps_credentials() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        config.session_id = "ses-1".to_string();
        config.access_token = "tok-1".to_string();

        config.dump().unwrap();
        let reloaded = Config::load(config.file_path.clone()).unwrap();

        assert_eq!(reloaded, config);
        assert!(reloaded.is_logged_in());
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn dump_creates_missing_parent_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config::load(path.clone()).unwrap();

        config.dump().unwrap();

        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn dump_restricts_permissions() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        config.dump().unwrap();

        let mode = fs::metadata(&config.file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn dump_tightens_a_stale_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, "leftover").unwrap();
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).unwrap();

        let mut config = Config::load(path.clone()).unwrap();
        config.session_id = "ses-1".to_string();
        config.access_token = "tok-1".to_string();
        config.dump().unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!tmp.exists());
        assert!(Config::load(path).unwrap().is_logged_in());
    }

    #[test]
    fn half_pair_is_not_logged_in() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        config.session_id = "ses-1".to_string();

        assert!(!config.is_logged_in());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "session_id = \"abc\"\n").unwrap();

        let config = Config::load(path).unwrap();

        assert_eq!(config.session_id, "abc");
        assert_eq!(config.access_token, "");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "session_id = [").unwrap();

        let err = Config::load(path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn debug_redacts_access_token() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        config.access_token = "super-secret".to_string();

        let rendered = format!("{config:?}");

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
