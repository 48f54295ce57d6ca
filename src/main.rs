//! MyTune - a music review client

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mytune::{
    cli::{self, Cli},
    config::Config,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mytune=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(args: Cli) -> anyhow::Result<()> {
    let config = Config::load_with_env(&args.config)?;
    tracing::debug!("Configuration loaded from {}", args.config.display());
    cli::run(args.command, &config).await
}
