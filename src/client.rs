//! gRPC client for the echo service.

use crate::proto::echo_service_client::EchoServiceClient;
use crate::proto::EchoRequest;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Thin wrapper around the generated client with a per-call deadline.
#[derive(Debug, Clone)]
pub struct EchoClient {
    inner: EchoServiceClient<Channel>,
}

impl EchoClient {
    /// Connect to a server at `addr` (`host:port`). `timeout` bounds both
    /// connecting and every subsequent call.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self, ClientError> {
        let channel = Endpoint::from_shared(format!("http://{addr}"))?
            .connect_timeout(timeout)
            .timeout(timeout)
            .connect()
            .await?;
        debug!(address = addr, "Connected");

        Ok(Self::new(channel))
    }

    /// Wrap an existing channel. Deadlines are whatever the channel's
    /// endpoint was configured with.
    pub fn new(channel: Channel) -> Self {
        EchoClient {
            inner: EchoServiceClient::new(channel),
        }
    }

    /// Send `message` and return what the server echoed.
    pub async fn echo(&mut self, message: impl Into<String>) -> Result<String, ClientError> {
        let request = EchoRequest {
            message: message.into(),
        };
        let response = self.inner.echo(request).await?;
        Ok(response.into_inner().message)
    }
}

/// Client errors
#[derive(Debug)]
pub enum ClientError {
    Transport(tonic::transport::Error),
    Status(tonic::Status),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "Failed to connect: {}", e),
            ClientError::Status(s) => {
                write!(f, "Echo call failed: {:?}: {}", s.code(), s.message())
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tonic::transport::Error> for ClientError {
    fn from(e: tonic::transport::Error) -> Self {
        ClientError::Transport(e)
    }
}

impl From<tonic::Status> for ClientError {
    fn from(s: tonic::Status) -> Self {
        ClientError::Status(s)
    }
}
