//! Layout strings reported by the native backend, per supported triple.
//!
//! The builder in [`crate::data_layout`] derives its string from the target
//! descriptor alone. [`verify_data_layout`] cross-checks that derivation
//! against what the backend's own target-data query returns, so a descriptor
//! that drifts from the backend is caught before any type is lowered.

use crate::{data_layout, Target, TargetError};

/// `(triple, layout)` pairs as the backend reports them.
pub const REFERENCE_LAYOUTS: &[(&str, &str)] = &[
    (
        "x86_64-unknown-linux-gnu",
        "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128",
    ),
    (
        "x86_64-unknown-linux-musl",
        "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128",
    ),
    (
        "x86_64-apple-darwin",
        "e-m:o-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128",
    ),
    (
        "x86_64-pc-windows-msvc",
        "e-m:w-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128",
    ),
    (
        "x86_64-pc-windows-gnu",
        "e-m:w-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128",
    ),
    (
        "i686-unknown-linux-gnu",
        "e-m:e-p:32:32-p270:32:32-p271:32:32-p272:64:64-i128:128-f64:32:64-f80:32-n8:16:32-S128",
    ),
    (
        "aarch64-unknown-linux-gnu",
        "e-m:e-i8:8:32-i16:16:32-i64:64-i128:128-n32:64-S128",
    ),
    (
        "aarch64-unknown-linux-musl",
        "e-m:e-i8:8:32-i16:16:32-i64:64-i128:128-n32:64-S128",
    ),
    ("aarch64-apple-darwin", "e-m:o-i64:64-i128:128-n32:64-S128"),
    (
        "arm-unknown-linux-gnueabihf",
        "e-m:e-p:32:32-Fi8-i64:64-v128:64:128-a:0:32-n32-S64",
    ),
    (
        "riscv64gc-unknown-linux-gnu",
        "e-m:e-p:64:64-i64:64-i128:128-n32:64-S128",
    ),
    ("riscv32imac-unknown-none-elf", "e-m:e-p:32:32-i64:64-n32-S128"),
    (
        "wasm32-unknown-unknown",
        "e-m:e-p:32:32-p10:8:8-p20:8:8-i64:64-i128:128-n32:64-S128-ni:1:10:20",
    ),
    (
        "wasm32-wasi",
        "e-m:e-p:32:32-p10:8:8-p20:8:8-i64:64-i128:128-n32:64-S128-ni:1:10:20",
    ),
    (
        "wasm64-unknown-unknown",
        "e-m:e-p:64:64-p10:8:8-p20:8:8-i64:64-i128:128-n32:64-S128-ni:1:10:20",
    ),
    (
        "mips-unknown-linux-gnu",
        "E-m:m-p:32:32-i8:8:32-i16:16:32-i64:64-n32-S64",
    ),
    (
        "mipsel-unknown-linux-gnu",
        "e-m:m-p:32:32-i8:8:32-i16:16:32-i64:64-n32-S64",
    ),
    (
        "powerpc64le-unknown-linux-gnu",
        "e-m:e-Fn32-i64:64-i128:128-n32:64-S128-v256:256:512",
    ),
];

/// The backend's layout string for `triple`, if known.
pub fn reference_layout(triple: &str) -> Option<&'static str> {
    REFERENCE_LAYOUTS
        .iter()
        .find(|(t, _)| *t == triple)
        .map(|(_, layout)| *layout)
}

/// Check that the derived layout string matches the backend's byte for byte.
///
/// A mismatch means the descriptor and the backend disagree about memory
/// layout; callers must treat it as fatal.
pub fn verify_data_layout(target: &Target) -> Result<(), TargetError> {
    let actual = data_layout(target);
    let Some(expected) = reference_layout(target.triple()) else {
        tracing::warn!(triple = target.triple(), "no reference layout to verify against");
        return Ok(());
    };
    if actual == expected {
        Ok(())
    } else {
        tracing::error!(triple = target.triple(), %expected, %actual, "data layout mismatch");
        Err(TargetError::LayoutMismatch {
            triple: target.triple().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}
