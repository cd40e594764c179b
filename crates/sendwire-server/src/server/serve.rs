//! Router assembly and the serve loop shared by the binary and the
//! integration tests.

use crate::server::{config::ServerConfig, service::handler::GreetingService};
use futures::Stream;
use sendwire_core::proto::{FILE_DESCRIPTOR_SET, send_service_server::SendServiceServer};
use tokio::io::{AsyncRead, AsyncWrite};
use tonic::{
    codec::CompressionEncoding,
    transport::{Server, server::Connected},
};
use tonic_reflection::server::Builder;
use tonic_web::GrpcWebLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

/// Serves `SendService`, health and reflection on `incoming` until `signal`
/// resolves.
///
/// Once `signal` fires the health status flips to `NOT_SERVING` and the
/// service runs its shutdown phases before the transport stops accepting
/// connections.
///
/// # Errors
///
/// Fails if reflection cannot be built or the transport errors out.
pub async fn serve_with_incoming<I, IO, IE, F>(
    config: ServerConfig,
    incoming: I,
    signal: F,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
    F: Future<Output = ()>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<SendServiceServer<GreetingService>>()
        .await;

    let service = GreetingService::new(config);

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let shutdown = {
        let service = service.clone();
        async move {
            signal.await;
            tracing::info!("Shutdown signal received, terminating gracefully...");

            health_reporter
                .set_not_serving::<SendServiceServer<GreetingService>>()
                .await;
            service.shutdown().await;
        }
    };

    Server::builder()
        .accept_http1(true)
        .http2_adaptive_window(Some(true))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(GrpcWebLayer::new()),
        )
        .add_service(health_service)
        .add_service(reflection)
        .add_service(build_send_service(service))
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn build_send_service(service: GreetingService) -> SendServiceServer<GreetingService> {
    SendServiceServer::new(service)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
