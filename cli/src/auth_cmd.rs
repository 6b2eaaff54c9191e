//! `labctl auth` subcommands.
//!
//! ## Commands
//!
//! - `labctl auth login` - browser-based login
//! - `labctl auth login --session-id <ID> --access-token <TOKEN>` - bind existing credentials

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use clap::Parser;
use clap::Subcommand;
use lab_api_client::ApiClient;
use lab_config::API_BASE_URL_ENV_VAR;
use lab_config::Config;
use lab_login::Login;
use lab_login::LoginOptions;
use lab_login::LoginOutcome;
use lab_login::SshIdentityProvisioner;
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressRenderer;
use crate::progress::SPINNER_INTERVAL;

/// Exit status when the user interrupts the login with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

/// Authenticate with the labs service.
#[derive(Debug, Parser)]
pub struct AuthCli {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthSubcommand {
    /// Log in as a Labs user (you will be prompted to open a browser page with a one-time use URL)
    Login(LoginArgs),
}

#[derive(Debug, Parser)]
pub struct LoginArgs {
    /// Session ID
    #[arg(long = "session-id", short = 's', value_name = "ID")]
    pub session_id: Option<String>,

    /// Access token
    #[arg(long = "access-token", short = 't', value_name = "TOKEN")]
    pub access_token: Option<String>,
}

impl AuthCli {
    /// Run the subcommand and return the process exit status.
    pub async fn run(self, config_path: Option<PathBuf>) -> i32 {
        match self.command {
            AuthSubcommand::Login(args) => match run_login(args, config_path).await {
                Ok(outcome) => exit_code(outcome),
                Err(err) => {
                    eprintln!("{err}");
                    1
                }
            },
        }
    }
}

fn exit_code(outcome: LoginOutcome) -> i32 {
    match outcome {
        LoginOutcome::Authenticated | LoginOutcome::Authorized => 0,
        LoginOutcome::TimedOut => 1,
        LoginOutcome::Cancelled => EXIT_INTERRUPTED,
    }
}

async fn run_login(args: LoginArgs, config_path: Option<PathBuf>) -> anyhow::Result<LoginOutcome> {
    let options = LoginOptions::new(args.session_id, args.access_token);
    options.validate()?;

    let mut config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let base_url = std::env::var(API_BASE_URL_ENV_VAR)
        .ok()
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| config.api_base_url.clone());
    let client = ApiClient::new(&base_url)?;

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("interrupt received, cancelling login");
                cancel.cancel();
            }
        }
    });

    let progress = Arc::new(Mutex::new(ProgressRenderer::new(std::io::stderr())));
    let spinner = tokio::spawn({
        let progress = Arc::clone(&progress);
        async move {
            let mut ticks = tokio::time::interval(SPINNER_INTERVAL);
            loop {
                ticks.tick().await;
                progress.lock().unwrap_or_else(PoisonError::into_inner).tick();
            }
        }
    });

    let result = Login::new(&client, &mut config, &SshIdentityProvisioner)
        .on_event({
            let progress = Arc::clone(&progress);
            move |event| {
                progress
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .handle(&event);
            }
        })
        .run(&options, &cancel)
        .await;
    spinner.abort();
    interrupt.abort();

    let outcome = result?;
    progress
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .finish(outcome);
    Ok(outcome)
}
