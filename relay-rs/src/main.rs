//! relay-rs: relay control plane
//!
//! Boot order: configuration, TLS identity, initial routes, control API.

use clap::{CommandFactory, Parser};
use relay_rs::cli::Cli;
use relay_rs::engine::ForwardFactory;
use relay_rs::{BaseConfig, ConfigStore, ControlApi, RouterManager, TlsIdentity};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        return Ok(());
    }
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BaseConfig::from_file(path)?,
        None => BaseConfig::default(),
    };
    cli.apply(&mut config);

    // Initialize logging
    let default_filter = if config.debug {
        "relay_rs=debug,tower_http=debug"
    } else {
        "relay_rs=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting relay-rs v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {} ({} routes)", path.display(), config.routes.len());
    }

    let identity = TlsIdentity::resolve(&cli.cert, &cli.key)?;
    identity.install_default()?;

    let factory = Arc::new(ForwardFactory::new(config.debug));
    let routers = Arc::new(RouterManager::new(factory));
    let count = routers.activate(&config.all_routes())?;
    info!("Serving {} router(s)", count);

    let store = Arc::new(ConfigStore::new(config, cli.config.clone()));
    let api = ControlApi::new(store, routers.clone());
    api.run(&cli.api, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down"),
            Err(e) => {
                warn!("Cannot listen for Ctrl-C ({}), running until killed", e);
                std::future::pending::<()>().await
            }
        }
    })
    .await?;

    routers.shutdown();
    Ok(())
}
