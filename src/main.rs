use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mailcatch::{
    config::Config,
    database,
    notify::{self, Hub},
    sink::{Sink, Tee},
    smtp::Server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(&config)?;

    let db = database::Client::new(config.db_url.as_deref()).await?;
    let (store, mut writer) = database::channel(db);

    let hub = Hub::new(config.notify_capacity);
    tokio::spawn(notify::log_new_mail(hub.subscribe()));

    let sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(store), Arc::new(hub)];
    let sink: Arc<dyn Sink> = Arc::new(Tee::new(sinks));
    let server = Server::bind(config.smtp_addr(), config.session(), sink).await?;

    tokio::select! {
        res = server.run() => res?,
        () = writer.run() => tracing::warn!("Mail store closed"),
        () = shutdown_signal() => tracing::info!("Shutting down"),
    }

    if config.clear_on_shutdown {
        tracing::info!("Clearing all captured mail");
        writer.clear().await?;
    } else {
        writer.flush().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
