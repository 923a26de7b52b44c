//! Generated protobuf and gRPC code for `echo.v1`.

tonic::include_proto!("echo.v1");

/// Encoded `FileDescriptorSet` for `echo/v1/service.proto`, served by the
/// reflection service.
pub const FILE_DESCRIPTOR_SET: &[u8] =
    include_bytes!(concat!(env!("OUT_DIR"), "/echo_descriptor.bin"));
