use std::io::stdout;

use anyhow::Context;
use calsift_app::cli::{Cli, Command};
use calsift_app::command;
use calsift_core::config::load_config;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_config()?;
    cli.apply(&mut settings);
    settings.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.logging.level.as_str()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    tracing::debug!(config = ?settings, "Configuration loaded");

    match &cli.command {
        Command::Report {
            request,
            collection,
        } => {
            command::report(&settings, request, collection, stdout().lock())
                .with_context(|| format!("REPORT {} failed", request.display()))?;
        }
        Command::Etag { collection } => {
            command::etag(collection, stdout().lock())?;
        }
        Command::Check { file } => {
            let count = command::check(&settings, file, stdout().lock())
                .with_context(|| format!("{} is not valid iCalendar", file.display()))?;
            tracing::info!(calendars = count, "Calendar data is valid");
        }
    }

    Ok(())
}
