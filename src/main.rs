mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

use liveimport::error;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liveimport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { file, package } => {
            cli::analyze(&file, &package)?;
        }
        Commands::Check { statements, package } => {
            cli::check(&statements, package.as_deref())?;
        }
        Commands::Plan {
            root,
            touched,
            format,
        } => {
            cli::plan(&root, &touched, format)?;
        }
        Commands::Watch { root } => {
            cli::watch(&root)?;
        }
    }

    Ok(())
}
