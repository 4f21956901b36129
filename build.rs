//! Generates the `logs.LogService` gRPC glue.
//!
//! Messages live in `src/proto.rs` as prost-derived structs, so the build
//! does not need `protoc`.

fn main() {
    let write_log = tonic_build::manual::Method::builder()
        .name("write_log")
        .route_name("WriteLog")
        .input_type("crate::proto::LogRequest")
        .output_type("crate::proto::LogResponse")
        .codec_path("tonic::codec::ProstCodec")
        .build();

    let service = tonic_build::manual::Service::builder()
        .name("LogService")
        .package("logs")
        .method(write_log)
        .build();

    tonic_build::manual::Builder::new().compile(&[service]);

    println!("cargo:rerun-if-changed=build.rs");
}
