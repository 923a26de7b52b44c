//! gRPC server hosting the echo service.
//!
//! Registers the echo service, the standard health service and, when
//! enabled, the reflection service, then serves until a shutdown signal
//! arrives. In-flight calls are drained before `serve_with_shutdown`
//! returns.

use crate::config::Config;
use crate::proto::echo_service_server::EchoServiceServer;
use crate::proto::FILE_DESCRIPTOR_SET;
use crate::protocols::echo::{EchoContract, EchoHandler, GrpcEcho};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Server instance
pub struct Server {
    config: Config,
    handler: Arc<dyn EchoContract>,
}

impl Server {
    /// Create a server backed by the default [`EchoHandler`].
    pub fn new(config: Config) -> Self {
        Self::with_handler(config, Arc::new(EchoHandler::new()))
    }

    /// Create a server backed by any echo contract implementation.
    pub fn with_handler(config: Config, handler: Arc<dyn EchoContract>) -> Self {
        Server { config, handler }
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listen = self.config.listen_addr();
        let listener = TcpListener::bind(&listen)
            .await
            .map_err(|e| ServerError::Bind(listen, e))?;

        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `signal` resolves.
    pub async fn serve_with_shutdown<F>(
        &self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = listener.local_addr().map_err(ServerError::Io)?;

        let echo = GrpcEcho::new(Arc::clone(&self.handler)).into_server(
            self.config.max_recv_msg_size,
            self.config.max_send_msg_size,
        );

        // The overall server ("") starts out SERVING
        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<EchoServiceServer<GrpcEcho>>()
            .await;

        let reflection = if self.config.enable_reflection {
            Some(reflection_service()?)
        } else {
            None
        };

        info!(
            address = %addr,
            reflection = self.config.enable_reflection,
            max_recv_msg_size = self.config.max_recv_msg_size,
            max_send_msg_size = self.config.max_send_msg_size,
            handler_timeout = ?self.config.handler_timeout,
            "Server listening"
        );

        tonic::transport::Server::builder()
            .timeout(self.config.handler_timeout)
            .layer(TraceLayer::new_for_grpc())
            .add_service(health_service)
            .add_service(echo)
            .add_optional_service(reflection)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

fn reflection_service() -> Result<
    tonic_reflection::server::v1::ServerReflectionServer<
        impl tonic_reflection::server::v1::ServerReflection,
    >,
    ServerError,
> {
    let service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;
    Ok(service)
}

/// Resolves on Ctrl-C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

/// Server errors
#[derive(Debug)]
pub enum ServerError {
    Bind(String, std::io::Error),
    Io(std::io::Error),
    Transport(tonic::transport::Error),
    Reflection(tonic_reflection::server::Error),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Bind(addr, e) => write!(f, "Failed to listen on {}: {}", addr, e),
            ServerError::Io(e) => write!(f, "I/O error: {}", e),
            ServerError::Transport(e) => write!(f, "Failed to serve: {}", e),
            ServerError::Reflection(e) => {
                write!(f, "Failed to build reflection service: {}", e)
            }
        }
    }
}

impl std::error::Error for ServerError {}

impl From<tonic::transport::Error> for ServerError {
    fn from(e: tonic::transport::Error) -> Self {
        ServerError::Transport(e)
    }
}

impl From<tonic_reflection::server::Error> for ServerError {
    fn from(e: tonic_reflection::server::Error) -> Self {
        ServerError::Reflection(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, EchoClient};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tonic::Code;
    use tonic_health::pb::health_check_response::ServingStatus;
    use tonic_health::pb::health_client::HealthClient;
    use tonic_health::pb::HealthCheckRequest;

    struct Running {
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        handle: JoinHandle<Result<(), ServerError>>,
    }

    // Run the server in a background task on an ephemeral port.
    async fn run_in_background(config: Config) -> Running {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Could not bind ephemeral socket");
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();

        let server = Server::new(config);
        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        Running {
            addr,
            shutdown,
            handle,
        }
    }

    async fn client(addr: SocketAddr) -> EchoClient {
        EchoClient::connect(&addr.to_string(), Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_echo_over_network() {
        let running = run_in_background(Config::default()).await;
        let mut client = client(running.addr).await;

        for input in ["hello integration", "", "hello", "héllo 🌍"] {
            assert_eq!(client.echo(input).await.unwrap(), input);
        }

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_calls_no_cross_talk() {
        let running = run_in_background(Config::default()).await;
        let client = client(running.addr).await;

        let mut tasks = Vec::new();
        for i in 0..64 {
            let mut client = client.clone();
            tasks.push(tokio::spawn(async move {
                let message = format!("payload-{}-{}", i, "é".repeat(i));
                let echoed = client.echo(message.clone()).await.unwrap();
                assert_eq!(echoed, message);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_health_serving() {
        let running = run_in_background(Config::default()).await;
        let channel = tonic::transport::Endpoint::from_shared(format!("http://{}", running.addr))
            .unwrap()
            .connect()
            .await
            .unwrap();
        let mut health = HealthClient::new(channel);

        for service in ["", "echo.v1.EchoService"] {
            let response = health
                .check(HealthCheckRequest {
                    service: service.to_string(),
                })
                .await
                .unwrap()
                .into_inner();
            assert_eq!(response.status, ServingStatus::Serving as i32);
        }

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_request_rejected() {
        let config = Config {
            max_recv_msg_size: 1024,
            ..Config::default()
        };
        let running = run_in_background(config).await;
        let mut client = client(running.addr).await;

        match client.echo("x".repeat(2048)).await {
            Err(ClientError::Status(status)) => {
                assert!(
                    matches!(status.code(), Code::OutOfRange | Code::ResourceExhausted),
                    "unexpected status: {:?}",
                    status
                );
            }
            other => panic!("unexpected: {:?}", other),
        }

        // Smaller messages still go through
        assert_eq!(client.echo("small").await.unwrap(), "small");

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_response_rejected() {
        let config = Config {
            max_send_msg_size: 100,
            ..Config::default()
        };
        let running = run_in_background(config).await;
        let mut client = client(running.addr).await;

        // The request decodes fine; encoding the echoed response exceeds the limit
        match client.echo("y".repeat(200)).await {
            Err(ClientError::Status(status)) => {
                assert_eq!(status.code(), Code::OutOfRange, "unexpected status: {:?}", status);
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert_eq!(client.echo("fits").await.unwrap(), "fits");

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serves_with_reflection_enabled() {
        let config = Config {
            enable_reflection: true,
            ..Config::default()
        };
        let running = run_in_background(config).await;
        let mut client = client(running.addr).await;
        assert_eq!(client.echo("reflected").await.unwrap(), "reflected");

        running.shutdown.send(()).unwrap();
        running.handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_reflection_service_builds() {
        assert!(reflection_service().is_ok());
    }

    #[tokio::test]
    async fn test_bind_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = Config {
            host: "127.0.0.1".to_string(),
            port,
            ..Config::default()
        };
        match Server::new(config).run().await {
            Err(ServerError::Bind(addr, _)) => assert_eq!(addr, format!("127.0.0.1:{}", port)),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
