//! Build script for kudu-proto
//!
//! Generates the master-service bindings during `cargo build`, using the
//! vendored `protoc` unless `PROTOC` already points at one.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    let build_server = std::env::var_os("CARGO_FEATURE_SERVER").is_some();

    tonic_build::configure()
        .build_server(build_server)
        .build_client(true)
        .type_attribute(".", "#[allow(missing_docs)]")
        .compile(
            &[
                "proto/kudu/common/common.proto",
                "proto/kudu/common/wire_protocol.proto",
                "proto/kudu/consensus/metadata.proto",
                "proto/kudu/client/client.proto",
                "proto/kudu/master/master.proto",
            ],
            &["proto"],
        )?;

    println!("cargo:rerun-if-changed=proto");
    Ok(())
}
