//! Data layout string construction.
//!
//! [`data_layout`] renders a [`Target`] into the backend's layout grammar:
//!
//! ```text
//! e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128
//! ```
//!
//! Components are emitted in a fixed order and only when they differ from
//! the backend's built-in defaults (or when the target requires them to be
//! spelled out). The result is computed once per target setup; it never
//! consults per-type state.

use std::fmt::Write;

use crate::target::{
    AddressSpaceLayout, AlignSpec, Arch, Endian, FnPtrAlign, ObjectFormat, Target,
    DEFAULT_AGGREGATE_PREF_BITS, DEFAULT_FLOAT_ALIGNS, DEFAULT_INT_ALIGNS, DEFAULT_POINTER_BITS,
    DEFAULT_VECTOR_ALIGNS,
};

/// Build the canonical data layout string for `target`.
#[tracing::instrument(level = "trace", skip_all, fields(triple = target.triple()))]
pub fn data_layout(target: &Target) -> String {
    let mut out = String::with_capacity(96);

    out.push(match target.endian() {
        Endian::Little => 'e',
        Endian::Big => 'E',
    });
    push(&mut out, format_args!("m:{}", mangling(target)));

    write_pointers(&mut out, target);

    match target.fn_ptr_align() {
        Some(FnPtrAlign::Independent(bits)) => push(&mut out, format_args!("Fi{bits}")),
        Some(FnPtrAlign::MultipleOfFunction(bits)) => push(&mut out, format_args!("Fn{bits}")),
        None => {}
    }

    for spec in target.int_aligns() {
        if differs(spec, DEFAULT_INT_ALIGNS) {
            write_align(&mut out, 'i', spec);
        }
    }

    for spec in target.float_aligns() {
        let supported = match spec.bits {
            16 => target.supports_f16(),
            80 => target.supports_f80(),
            _ => true,
        };
        // x86 always spells out f80, defaults or not.
        let forced = spec.bits == 80 && target.arch().is_x86();
        if supported && (forced || differs(spec, DEFAULT_FLOAT_ALIGNS)) {
            write_align(&mut out, 'f', spec);
        }
    }

    for spec in target.vector_aligns() {
        if differs(spec, DEFAULT_VECTOR_ALIGNS) {
            write_align(&mut out, 'v', spec);
        }
    }

    if target.aggregate_pref_bits() != DEFAULT_AGGREGATE_PREF_BITS {
        push(&mut out, format_args!("a:0:{}", target.aggregate_pref_bits()));
    }

    let natives = target.native_int_widths();
    if !natives.is_empty() {
        let widths: Vec<String> = natives.iter().map(ToString::to_string).collect();
        push(&mut out, format_args!("n{}", widths.join(":")));
    }

    if target.is_windows() || target.stack_align_bits() != target.ptr_bits() {
        push(&mut out, format_args!("S{}", target.stack_align_bits()));
    }

    for spec in target.vector_overrides() {
        write_align(&mut out, 'v', spec);
    }

    let non_integral: Vec<String> = target
        .address_spaces()
        .iter()
        .filter(|a| a.non_integral)
        .map(|a| a.id.to_string())
        .collect();
    if !non_integral.is_empty() {
        push(&mut out, format_args!("ni:{}", non_integral.join(":")));
    }

    tracing::trace!(layout = %out, "data layout");
    out
}

/// Private-symbol mangling style.
fn mangling(target: &Target) -> char {
    if target.arch().is_mips() {
        return 'm';
    }
    match target.object_format() {
        ObjectFormat::Elf | ObjectFormat::Wasm => 'e',
        ObjectFormat::MachO => 'o',
        ObjectFormat::Coff if target.arch() == Arch::X86 => 'x',
        ObjectFormat::Coff => 'w',
    }
}

fn write_pointers(out: &mut String, target: &Target) {
    let default = AddressSpaceLayout {
        id: 0,
        size_bits: DEFAULT_POINTER_BITS,
        abi_bits: DEFAULT_POINTER_BITS,
        pref_bits: DEFAULT_POINTER_BITS,
        index_bits: DEFAULT_POINTER_BITS,
        non_integral: false,
        force: false,
    };
    let p0 = *target.pointer_layout(0);

    for space in target.address_spaces() {
        let baseline = if space.id == 0 { &default } else { &p0 };
        if !space.force && space.same_shape(baseline) {
            continue;
        }
        out.push_str("-p");
        if space.id != 0 {
            let _ = write!(out, "{}", space.id);
        }
        let _ = write!(out, ":{}:{}", space.size_bits, space.abi_bits);
        let has_index = space.index_bits != space.size_bits;
        if has_index || space.pref_bits != space.abi_bits {
            let _ = write!(out, ":{}", space.pref_bits);
        }
        if has_index {
            let _ = write!(out, ":{}", space.index_bits);
        }
    }
}

/// Whether `spec` is absent from, or different to, the default table.
fn differs(spec: &AlignSpec, defaults: &[AlignSpec]) -> bool {
    defaults.iter().find(|d| d.bits == spec.bits) != Some(spec)
}

fn write_align(out: &mut String, kind: char, spec: &AlignSpec) {
    let _ = write!(out, "-{kind}{}:{}", spec.bits, spec.abi_bits);
    if spec.pref_bits != spec.abi_bits {
        let _ = write!(out, ":{}", spec.pref_bits);
    }
}

fn push(out: &mut String, args: std::fmt::Arguments<'_>) {
    out.push('-');
    let _ = out.write_fmt(args);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap known-good triples")]
mod tests;
