use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use blogflow::app::{AppState, router};
use blogflow::config::AppConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Data directory for flow state and cached search results.
    /// Defaults to `$BLOGFLOW_DATA_DIR`, then `.blogflow`.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    blogflow::logging::init()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting blogflow-app");

    let config = AppConfig::from_env()
        .context("load config")?
        .with_data_dir(args.data_dir);
    tracing::info!(?config, "loaded config");

    let generator = config
        .generator(reqwest::Client::new())
        .context("build generator")?;
    let state = AppState {
        generator,
        state_store: config.state_store(),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {}: {err}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
