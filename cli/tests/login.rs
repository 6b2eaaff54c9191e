//! `labctl auth login` integration tests.
//!
//! Every test runs the binary against an isolated LABCTL_HOME. None of them
//! reach the real service: direct mode never sends a request and the
//! interactive case points LABCTL_API_BASE_URL at a closed port.

use std::fs;
use std::path::Path;

use anyhow::Result;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Create a labctl command with an isolated LABCTL_HOME.
fn labctl(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("labctl")?;
    cmd.env("LABCTL_HOME", home);
    cmd.env_remove("LABCTL_API_BASE_URL");
    cmd.env_remove("RUST_LOG");
    Ok(cmd)
}

#[test]
fn session_id_without_token_is_rejected() -> Result<()> {
    let home = TempDir::new()?;

    labctl(home.path())?
        .args(["auth", "login", "-s", "ses-1"])
        .assert()
        .code(1)
        .stderr(contains(
            "Access token must be provided if session ID is specified.",
        ));

    assert!(!home.path().join("config.toml").exists());
    Ok(())
}

#[test]
fn token_without_session_id_is_rejected() -> Result<()> {
    let home = TempDir::new()?;

    labctl(home.path())?
        .args(["auth", "login", "--access-token", "tok-1"])
        .assert()
        .code(1)
        .stderr(contains(
            "Session ID must be provided if access token is specified.",
        ));

    assert!(!home.path().join("config.toml").exists());
    Ok(())
}

#[test]
fn direct_login_saves_credentials_and_identity() -> Result<()> {
    let home = TempDir::new()?;

    labctl(home.path())?
        .args(["auth", "login", "-s", "ses-1", "-t", "tok-1"])
        .assert()
        .success()
        .stderr(contains("Authenticated."));

    let config = fs::read_to_string(home.path().join("config.toml"))?;
    assert!(config.contains("session_id = \"ses-1\""));
    assert!(config.contains("access_token = \"tok-1\""));
    assert!(home.path().join("ssh").join("id_ed25519").exists());
    assert!(home.path().join("ssh").join("id_ed25519.pub").exists());
    Ok(())
}

#[test]
fn second_login_is_refused() -> Result<()> {
    let home = TempDir::new()?;
    labctl(home.path())?
        .args(["auth", "login", "-s", "ses-1", "-t", "tok-1"])
        .assert()
        .success();
    let before = fs::read_to_string(home.path().join("config.toml"))?;

    labctl(home.path())?
        .args(["auth", "login", "-s", "ses-2", "-t", "tok-2"])
        .assert()
        .code(1)
        .stderr(contains("Already logged in."));

    let after = fs::read_to_string(home.path().join("config.toml"))?;
    assert_eq!(before, after);
    Ok(())
}

#[test]
fn explicit_config_path_is_honored() -> Result<()> {
    let home = TempDir::new()?;
    let other = TempDir::new()?;
    let config_path = other.path().join("custom.toml");

    labctl(home.path())?
        .arg("--config")
        .arg(&config_path)
        .args(["auth", "login", "-s", "ses-1", "-t", "tok-1"])
        .assert()
        .success();

    assert!(config_path.exists());
    assert!(!home.path().join("config.toml").exists());
    assert!(other.path().join("ssh").join("id_ed25519").exists());
    Ok(())
}

#[test]
fn unreachable_service_fails_session_creation() -> Result<()> {
    let home = TempDir::new()?;

    labctl(home.path())?
        .env("LABCTL_API_BASE_URL", "http://127.0.0.1:1/api")
        .args(["auth", "login"])
        .assert()
        .code(1)
        .stderr(contains("couldn't start a session"));

    assert!(!home.path().join("config.toml").exists());
    Ok(())
}

#[test]
fn help_lists_the_login_flags() -> Result<()> {
    let home = TempDir::new()?;

    labctl(home.path())?
        .args(["auth", "login", "--help"])
        .assert()
        .success()
        .stdout(contains("--session-id"))
        .stdout(contains("--access-token"));
    Ok(())
}
