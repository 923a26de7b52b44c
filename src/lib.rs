//! echo-server: a gRPC echo service
//!
//! The `echo.v1.EchoService/Echo` RPC returns its request message
//! unchanged. The server also exposes:
//! - the standard gRPC health service (`grpc.health.v1.Health`)
//! - the gRPC reflection service, when enabled
//!
//! Configuration comes from CLI arguments, environment variables or a
//! TOML file.

pub mod client;
pub mod config;
pub mod proto;
pub mod protocols;
pub mod server;

pub use client::{ClientError, EchoClient};
pub use config::{Config, ConfigError};
pub use protocols::echo::{EchoContract, EchoHandler, GrpcEcho};
pub use server::{Server, ServerError};
