//! Service implementations.
//!
//! Each service keeps its business logic behind a plain trait and exposes
//! it to the gRPC runtime through a thin adapter.
//!
//! - `echo`: returns the request message unchanged

pub mod echo;
