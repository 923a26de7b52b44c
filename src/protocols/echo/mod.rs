//! Echo service implementation.
//!
//! A unary RPC that returns its input:
//!
//! ```text
//! service EchoService {
//!   rpc Echo(EchoRequest) returns (EchoResponse);
//! }
//!
//! Request:  EchoRequest  { message: "hello" }
//! Response: EchoResponse { message: "hello" }
//! ```
//!
//! The handler accepts any text, including the empty string, and never
//! fails. Transport failures (disconnects, deadlines, oversized frames)
//! are reported by the gRPC runtime before or after the handler runs.

pub mod handler;
pub mod service;

pub use handler::{EchoContract, EchoHandler};
pub use service::GrpcEcho;
