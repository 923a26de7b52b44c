//! gRPC adapter for the echo contract.

use super::handler::{EchoContract, EchoHandler};
use crate::proto::echo_service_server::{EchoService, EchoServiceServer};
use crate::proto::{EchoRequest, EchoResponse};
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::trace;

/// Binds an [`EchoContract`] to the generated `EchoService` trait.
#[derive(Clone)]
pub struct GrpcEcho {
    handler: Arc<dyn EchoContract>,
}

impl GrpcEcho {
    /// Serve calls with `handler`.
    pub fn new(handler: Arc<dyn EchoContract>) -> Self {
        GrpcEcho { handler }
    }

    /// Wrap in the generated server with the given message size limits.
    pub fn into_server(
        self,
        max_recv_msg_size: usize,
        max_send_msg_size: usize,
    ) -> EchoServiceServer<Self> {
        EchoServiceServer::new(self)
            .max_decoding_message_size(max_recv_msg_size)
            .max_encoding_message_size(max_send_msg_size)
    }
}

impl Default for GrpcEcho {
    fn default() -> Self {
        GrpcEcho::new(Arc::new(EchoHandler::new()))
    }
}

#[tonic::async_trait]
impl EchoService for GrpcEcho {
    async fn echo(&self, request: Request<EchoRequest>) -> Result<Response<EchoResponse>, Status> {
        // Metadata and extensions are not used
        let request = request.into_inner();
        trace!(len = request.message.len(), "Echo");

        Ok(Response::new(self.handler.echo(&request)))
    }
}
