use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use secrely_app::cli::Commands;
use secrely_app::context::load_config;
use secrely_app::utils::logging::init_tracing;
use secrely_app::{commands, AppContext, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Availability(args) = &cli.command {
        commands::availability::show(args);
        return Ok(());
    }

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let ctx = AppContext::new(
        config,
        Arc::new(|url: &str| println!("Open this URL to sign in:\n  {url}")),
    )
    .await
    .context("failed to initialize application")?;

    commands::run(&ctx, cli.command)
        .await
        .map_err(|err| anyhow!(commands::describe_failure(&err)))?;
    Ok(())
}
