//! Echo business logic.

use crate::proto::{EchoRequest, EchoResponse};

/// The echo service contract.
///
/// Implementations must be safe to share across concurrent calls; the
/// server holds a single `Arc<dyn EchoContract>` for its whole lifetime.
pub trait EchoContract: Send + Sync + 'static {
    fn echo(&self, request: &EchoRequest) -> EchoResponse;
}

/// Stateless handler that copies the request message into the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl EchoHandler {
    pub fn new() -> Self {
        EchoHandler
    }
}

impl EchoContract for EchoHandler {
    fn echo(&self, request: &EchoRequest) -> EchoResponse {
        EchoResponse {
            message: request.message.clone(),
        }
    }
}
