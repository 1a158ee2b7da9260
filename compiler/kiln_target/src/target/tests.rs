use super::*;
use pretty_assertions::assert_eq;

fn target(triple: &str) -> Target {
    Target::from_triple(triple).unwrap()
}

#[test]
fn every_supported_triple_builds() {
    for triple in SUPPORTED_TARGETS {
        let t = Target::from_triple(triple);
        assert!(t.is_ok(), "{triple}: {t:?}");
    }
}

#[test]
fn unsupported_triple_is_rejected() {
    let err = Target::from_triple("sparc64-unknown-linux-gnu").unwrap_err();
    assert!(matches!(err, TargetError::UnsupportedTarget { .. }));
    assert!(err.to_string().contains("x86_64-unknown-linux-gnu"));
}

#[test]
fn arch_parse_accepts_isa_suffixes() {
    assert_eq!(Arch::parse("riscv64gc").unwrap(), Arch::Riscv64);
    assert_eq!(Arch::parse("riscv32imac").unwrap(), Arch::Riscv32);
    assert_eq!(Arch::parse("thumbv7em").unwrap(), Arch::Thumb);
    assert_eq!(Arch::parse("armv7").unwrap(), Arch::Arm);
    assert_eq!(Arch::parse("arm64").unwrap(), Arch::Aarch64);
    assert_eq!(
        Arch::parse("vax").unwrap_err(),
        TargetError::UnknownArch("vax".to_string())
    );
}

#[test]
fn object_format_follows_os() {
    assert_eq!(target("x86_64-unknown-linux-gnu").object_format(), ObjectFormat::Elf);
    assert_eq!(target("aarch64-apple-darwin").object_format(), ObjectFormat::MachO);
    assert_eq!(target("x86_64-pc-windows-gnu").object_format(), ObjectFormat::Coff);
    assert_eq!(target("wasm32-wasi").object_format(), ObjectFormat::Wasm);
}

#[test]
fn mips_is_big_endian() {
    assert_eq!(target("mips-unknown-linux-gnu").endian(), Endian::Big);
    assert_eq!(target("mipsel-unknown-linux-gnu").endian(), Endian::Little);
}

#[test]
fn int_align_picks_next_wider_entry() {
    let x64 = target("x86_64-unknown-linux-gnu");
    assert_eq!(x64.int_align(1), 1);
    assert_eq!(x64.int_align(8), 1);
    assert_eq!(x64.int_align(12), 2);
    assert_eq!(x64.int_align(24), 4);
    assert_eq!(x64.int_align(48), 8);
    assert_eq!(x64.int_align(64), 8);
    assert_eq!(x64.int_align(80), 16);
    assert_eq!(x64.int_align(128), 16);
    // Wider than every entry: the widest entry wins.
    assert_eq!(x64.int_align(256), 16);
}

#[test]
fn int_align_without_i128_entry() {
    let arm = target("arm-unknown-linux-gnueabihf");
    assert_eq!(arm.int128_align(), None);
    assert_eq!(arm.int_align(128), 8);

    let i686 = target("i686-unknown-linux-gnu");
    assert_eq!(i686.int_align(64), 4);
    assert_eq!(i686.int128_align(), Some(16));
}

#[test]
fn c_types_match_platform_abi() {
    let win = target("x86_64-pc-windows-msvc");
    assert_eq!(win.c_type(CType::Long).size_bytes(), 4);
    assert_eq!(win.c_type(CType::LongDouble).size_bytes(), 8);

    let linux = target("x86_64-unknown-linux-gnu");
    assert_eq!(linux.c_type(CType::Long).size_bytes(), 8);
    assert_eq!(linux.c_type(CType::LongDouble).size_bytes(), 16);

    let i686 = target("i686-unknown-linux-gnu");
    assert_eq!(i686.c_type(CType::LongLong).align_bytes(), 4);
    assert_eq!(i686.c_type(CType::Double).align_bytes(), 4);
    assert_eq!(i686.c_type(CType::LongDouble).size_bytes(), 12);
}

#[test]
fn float_and_vector_alignment() {
    let i686 = target("i686-unknown-linux-gnu");
    assert_eq!(i686.float_align(64), 4);
    assert_eq!(i686.float_align(80), 4);
    assert_eq!(target("x86_64-unknown-linux-gnu").float_align(80), 16);

    let arm = target("arm-unknown-linux-gnueabihf");
    assert_eq!(arm.vector_align(128), 8);
    assert_eq!(arm.vector_align(64), 8);
    // No table entry: natural power-of-two alignment.
    assert_eq!(arm.vector_align(96), 16);
    assert_eq!(arm.vector_align(256), 32);
}

#[test]
fn pointer_layout_per_address_space() {
    let x64 = target("x86_64-unknown-linux-gnu");
    assert_eq!(x64.pointer_layout(0).size_bytes(), 8);
    assert_eq!(x64.pointer_layout(270).size_bytes(), 4);
    assert_eq!(x64.pointer_layout(272).size_bytes(), 8);
    // Unknown address spaces behave like address space 0.
    assert_eq!(x64.pointer_layout(7).id, 0);

    let wasm = target("wasm32-unknown-unknown");
    assert_eq!(wasm.ptr_bytes(), 4);
    assert_eq!(wasm.pointer_layout(10).size_bytes(), 1);
    assert!(wasm.pointer_layout(1).non_integral);
}

#[test]
fn float_support_flags() {
    assert!(target("x86_64-unknown-linux-gnu").supports_f16());
    assert!(target("x86_64-unknown-linux-gnu").supports_f80());
    assert!(!target("aarch64-unknown-linux-gnu").supports_f80());
    assert!(!target("wasm32-unknown-unknown").supports_f16());
    assert!(!target("arm-unknown-linux-gnueabihf").supports_f16());
}

#[test]
fn riscv_d_extension_from_isa_string() {
    assert!(target("riscv64gc-unknown-linux-gnu").features().riscv_d);
    assert!(!target("riscv32imac-unknown-none-elf").features().riscv_d);
}

#[test]
fn arm_hard_float_from_env() {
    let arm = target("arm-unknown-linux-gnueabihf");
    assert_eq!(arm.env(), Env::GnuEabiHf);
    assert!(arm.features().arm_hard_float);
}

#[test]
fn host_descriptor_matches_native_byte_order() {
    // Unsupported hosts have no descriptor to check.
    if let Ok(host) = Target::host() {
        let native = if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        };
        assert_eq!(host.endian(), native, "{}", host.triple());
    }
}
