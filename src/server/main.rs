use clap::Parser;
use duo_session::config::Config;
use duo_session::media::LoopbackGateway;
use duo_session::model::StaticCatalog;
use duo_session::server::{
    create_session_route, init_telemetry, shutdown_telemetry, MemoryDirectory, ProtocolRouter,
    ServerError, CALL_PATH,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "duo-server")]
#[command(version, about = "Pairs two participants for a call, then runs a timed round")]
struct Args {
    /// Address to listen on (overrides BIND_ADDRESS)
    #[arg(short = 'b', long)]
    bind: Option<SocketAddr>,

    /// Seconds the describer studies the image (overrides REVIEW_SECONDS)
    #[arg(long)]
    review_seconds: Option<u64>,

    /// Length of the first questioning window (overrides FIRST_QUERY_SECONDS)
    #[arg(long)]
    first_query_seconds: Option<u64>,

    /// Length of the second questioning window (overrides SECOND_QUERY_SECONDS)
    #[arg(long)]
    second_query_seconds: Option<u64>,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config::from_env();
        if let Some(address) = self.bind {
            config = config.with_bind_address(address);
        }
        if let Some(seconds) = self.review_seconds {
            config = config.with_review_seconds(seconds);
        }
        if let Some(seconds) = self.first_query_seconds {
            config = config.with_first_query_seconds(seconds);
        }
        if let Some(seconds) = self.second_query_seconds {
            config = config.with_second_query_seconds(seconds);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = Args::parse();
    init_telemetry()?;

    let config = args.into_config();
    info!(?config, "Starting server");

    let router = ProtocolRouter::new(
        Arc::new(MemoryDirectory::new()),
        Arc::new(LoopbackGateway::new()),
        Arc::new(StaticCatalog::default()),
        config.durations,
    );
    let app = create_session_route(router);

    let listener = TcpListener::bind(config.bind_address).await?;
    info!(address = %config.bind_address, path = CALL_PATH, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_telemetry();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
