use prost::Message;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto");

    let file_descriptors = protox::compile(["echo/v1/service.proto"], ["proto"])?;

    // Embedded by the reflection service
    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    std::fs::write(
        out_dir.join("echo_descriptor.bin"),
        file_descriptors.encode_to_vec(),
    )?;

    tonic_prost_build::configure().compile_fds(file_descriptors)?;
    Ok(())
}
