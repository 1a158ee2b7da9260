use super::*;
use crate::{reference_layout, verify_data_layout, TargetError, SUPPORTED_TARGETS};
use pretty_assertions::assert_eq;

fn layout(triple: &str) -> String {
    data_layout(&Target::from_triple(triple).unwrap())
}

#[test]
fn x86_64_linux() {
    assert_eq!(
        layout("x86_64-unknown-linux-gnu"),
        "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128"
    );
}

#[test]
fn mangling_follows_object_format() {
    assert!(layout("x86_64-apple-darwin").starts_with("e-m:o-"));
    assert!(layout("x86_64-pc-windows-msvc").starts_with("e-m:w-"));
    assert!(layout("wasm32-wasi").starts_with("e-m:e-"));
    assert!(layout("mips-unknown-linux-gnu").starts_with("E-m:m-"));
    assert!(layout("mipsel-unknown-linux-gnu").starts_with("e-m:m-"));
}

#[test]
fn pointer_specs_only_when_divergent_or_forced() {
    // 64-bit default: no `p:` entry.
    assert!(!layout("aarch64-unknown-linux-gnu").contains("-p:"));
    // Forced on riscv64 even though it matches the default.
    assert!(layout("riscv64gc-unknown-linux-gnu").contains("-p:64:64-"));
    // wasm address space 1 matches address space 0 and is omitted.
    let wasm = layout("wasm32-unknown-unknown");
    assert!(!wasm.contains("-p1:"));
    assert!(wasm.contains("-p10:8:8-p20:8:8-"));
    assert!(wasm.ends_with("-ni:1:10:20"));
}

#[test]
fn i686_float_alignment() {
    assert_eq!(
        layout("i686-unknown-linux-gnu"),
        "e-m:e-p:32:32-p270:32:32-p271:32:32-p272:64:64-i128:128-f64:32:64-f80:32-n8:16:32-S128"
    );
}

#[test]
fn unsupported_float_widths_are_skipped() {
    for triple in ["aarch64-unknown-linux-gnu", "wasm32-unknown-unknown", "arm-unknown-linux-gnueabihf"] {
        let l = layout(triple);
        assert!(!l.contains("-f80"), "{triple}: {l}");
        assert!(!l.contains("-f16"), "{triple}: {l}");
    }
}

#[test]
fn arm_function_pointer_and_aggregate() {
    assert_eq!(
        layout("arm-unknown-linux-gnueabihf"),
        "e-m:e-p:32:32-Fi8-i64:64-v128:64:128-a:0:32-n32-S64"
    );
}

#[test]
fn ppc_wide_vector_override_trails_stack() {
    assert!(layout("powerpc64le-unknown-linux-gnu").ends_with("-S128-v256:256:512"));
}

#[test]
fn deterministic() {
    let t = Target::from_triple("x86_64-pc-windows-gnu").unwrap();
    assert_eq!(data_layout(&t), data_layout(&t));
}

#[test]
fn every_supported_target_matches_backend() {
    for triple in SUPPORTED_TARGETS {
        let target = Target::from_triple(triple).unwrap();
        assert_eq!(
            data_layout(&target),
            reference_layout(triple).unwrap(),
            "layout mismatch for {triple}"
        );
        assert_eq!(verify_data_layout(&target), Ok(()));
    }
}

#[test]
fn mismatch_error_names_both_strings() {
    let err = TargetError::LayoutMismatch {
        triple: "t".to_string(),
        expected: "e-a".to_string(),
        actual: "e-b".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("e-a") && msg.contains("e-b"));
}
