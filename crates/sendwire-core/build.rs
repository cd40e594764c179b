/// Builds the gRPC client and server bindings for `proto/sendwire.proto`.
///
/// Generated code lands in `OUT_DIR` and is pulled in by
/// `sendwire_core::proto` through `tonic::include_proto!("sendwire")`.
///
/// A serialized `FileDescriptorSet` is written next to it as
/// `sendwire_descriptor.bin` so the server can expose gRPC reflection.
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails, which aborts the
/// build with the `protoc` diagnostic.
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("sendwire_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    println!("cargo:rerun-if-changed=proto/sendwire.proto");

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/sendwire.proto"], &["proto"])
        .unwrap();
}
