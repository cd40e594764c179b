use clap::Parser;
use sendwire_client::{
    ClientConfig, SendClient,
    gateway::{
        config::{GatewayArgs, GatewayConfig},
        router,
    },
};
use tokio::{net::TcpListener, runtime::Handle, signal};
use tonic::transport::Endpoint;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = GatewayConfig::try_from(GatewayArgs::parse())?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .pretty(),
        )
        .init();

    // Connects on first use so the gateway can start before the server.
    let channel = Endpoint::from_shared(config.server_uri.clone())?.connect_lazy();
    let client = SendClient::new(
        channel,
        Handle::current(),
        ClientConfig {
            response_timeout: config.response_timeout,
            stream_buffer_size: config.stream_buffer_size,
        },
    );

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(
        "Gateway listening on {} and forwarding to {}",
        config.listen_addr,
        config.server_uri
    );

    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
