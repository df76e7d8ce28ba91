/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

/// Build script – compiles the Logic 2 automation schema into Rust source code.
///
/// tonic-build wraps prost-build and additionally generates tonic server/client
/// stubs.  The generated files are written to `OUT_DIR` (managed by Cargo) and
/// pulled into the crate via `tonic::include_proto!` in `src/proto/mod.rs`.
///
/// Prerequisites
/// -------------
/// If `PROTOC` is set it is used as-is.  Otherwise the protoc binary bundled by
/// `protoc-bin-vendored` is used, so no system install is required.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The schema is shared by every client of the automation API, so it lives
    // at the repository root rather than inside this crate.
    let proto_root = "../proto";
    let proto_file = format!("{}/saleae/grpc/saleae.proto", proto_root);

    // Tell Cargo to re-run this build script when the proto file changes
    println!("cargo:rerun-if-changed={}", proto_file);
    println!("cargo:rerun-if-env-changed=PROTOC");

    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()?;
        std::env::set_var("PROTOC", protoc);
    }

    tonic_build::configure()
        // Client stubs drive Logic 2; server stubs back the simulator in test-tools.
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &[proto_file.as_str()], // proto files to compile
            &[proto_root],          // directories to search for imports
        )?;

    Ok(())
}
