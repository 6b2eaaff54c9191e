use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use lab_cli::auth_cmd::AuthCli;
use tracing_subscriber::EnvFilter;

/// Command-line client for the labs platform.
#[derive(Debug, Parser)]
#[command(name = "labctl", version, about)]
struct Cli {
    /// Path to the config file (defaults to $LABCTL_HOME/config.toml)
    #[arg(long = "config", value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authenticate with the labs service
    Auth(AuthCli),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Auth(auth) => auth.run(cli.config).await,
    };
    std::process::exit(code);
}
