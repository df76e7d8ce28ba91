/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

/// Proto-generated modules.
///
/// `tonic::include_proto!` expands to an `include!` of the file that
/// prost/tonic-build wrote into `OUT_DIR` during the build script.
pub mod saleae_automation {
    // Package name declared in saleae.proto is `saleae.automation`, so the
    // generated file is `saleae.automation.rs`.
    tonic::include_proto!("saleae.automation");
}

/// Major version of the automation API this client speaks.
///
/// A server reporting a different major version is rejected at connect time.
pub const THIS_API_VERSION_MAJOR: u32 = 1;
pub const THIS_API_VERSION_MINOR: u32 = 0;
pub const THIS_API_VERSION_PATCH: u32 = 0;
