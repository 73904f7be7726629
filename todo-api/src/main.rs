use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use todo_api::{AppConfig, Cli, Global, api, logging};
use todo_core::Database;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;

    logging::init(&config.logging)?;

    let database_url = config.database_url()?;
    tracing::info!("Opening database {}", database_url);

    let db = Database::connect(&database_url)
        .await
        .context("failed to open database")?;

    let global = Arc::new(Global::new(config, db));

    let listener = TcpListener::bind(global.config().api.bind_address)
        .await
        .context("failed to bind api listener")?;

    api::run(global.clone(), listener, shutdown_signal()).await?;

    global.db().close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
