//! RISC-V (LP64D / ILP32) classification.
//!
//! Aggregates up to `2×XLEN` bits travel in one or two integer registers.
//! With the `D` extension, a struct of at most two fields where at least one
//! is a float is passed field by field so floats land in FP registers.

use kiln_types::{ContainerLayout, Idx, PtrSize, TypeData};
use smallvec::{smallvec, SmallVec};

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass, Slots};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Class {
    ByValue,
    Memory,
    Integer,
    DoubleInteger,
    Fields(Slots),
}

fn xlen(cx: &AbiCx<'_>) -> u64 {
    u64::from(cx.target.ptr_bits())
}

/// The field-by-field split used by the floating-point convention, if
/// `ty` qualifies for it.
fn float_fields(cx: &AbiCx<'_>, ty: Idx) -> Option<Slots> {
    let fields: SmallVec<[Idx; 4]> = match cx.get(ty) {
        TypeData::Struct(s) if s.layout != ContainerLayout::Packed => s
            .fields
            .iter()
            .filter(|f| !f.is_comptime && cx.pool.has_runtime_bits(f.ty))
            .map(|f| f.ty)
            .collect(),
        TypeData::Tuple { fields } => fields
            .iter()
            .filter(|f| !f.is_comptime && cx.pool.has_runtime_bits(f.ty))
            .map(|f| f.ty)
            .collect(),
        _ => return None,
    };
    if fields.len() > 2 {
        return None;
    }
    let mut any_float = false;
    for &f in &fields {
        match cx.get(f) {
            TypeData::Float { bits } if *bits <= 64 => any_float = true,
            TypeData::Int { .. } | TypeData::Bool | TypeData::Enum { .. } => {
                if cx.bit_size(f) > xlen(cx) {
                    return None;
                }
            }
            TypeData::Pointer(p) if p.size != PtrSize::Slice => {}
            _ => return None,
        }
    }
    any_float.then(|| fields.iter().map(|&f| AbiSlot::Source(f)).collect())
}

fn classify(cx: &AbiCx<'_>, ty: Idx) -> Class {
    let max = 2 * xlen(cx);
    match cx.get(ty) {
        TypeData::Struct(s) if s.layout == ContainerLayout::Packed => {
            return if cx.bit_size(ty) > max {
                Class::Memory
            } else {
                Class::ByValue
            };
        }
        TypeData::Union(u) if u.layout == ContainerLayout::Packed => {
            return if cx.bit_size(ty) > max {
                Class::Memory
            } else {
                Class::ByValue
            };
        }
        TypeData::Int { .. } | TypeData::Enum { .. } | TypeData::ErrorSet(_) => {
            return if cx.bit_size(ty) > max {
                Class::Memory
            } else {
                Class::ByValue
            };
        }
        TypeData::Vector { .. } => {
            return if cx.bit_size(ty) > max {
                Class::Memory
            } else {
                Class::Integer
            };
        }
        _ => {}
    }
    if cx.is_scalar(ty) {
        return Class::ByValue;
    }
    if cx.target.features().riscv_d {
        if let Some(slots) = float_fields(cx, ty) {
            return Class::Fields(slots);
        }
    }
    let bits = cx.size(ty) * 8;
    if bits > max {
        Class::Memory
    } else if bits > xlen(cx) {
        Class::DoubleInteger
    } else {
        Class::Integer
    }
}

/// Half floats travel as 16-bit integers without FP registers.
fn widened_half(cx: &AbiCx<'_>, ty: Idx) -> Option<AbiSlot> {
    let half = matches!(cx.get(ty), TypeData::Float { bits: 16 });
    (half && !cx.target.features().riscv_d).then_some(AbiSlot::Int(16))
}

fn register_pair(cx: &AbiCx<'_>) -> Slots {
    let bits = xlen(cx) as u32;
    smallvec![AbiSlot::Int(bits), AbiSlot::Int(bits)]
}

/// RISC-V integer calling convention, with the hardware floating-point
/// convention when the target has `D`.
#[derive(Copy, Clone, Debug, Default)]
pub struct RiscV;

impl Classifier for RiscV {
    fn name(&self) -> &'static str {
        "riscv"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        match classify(cx, ty) {
            Class::ByValue => match widened_half(cx, ty) {
                Some(slot) => ParamClass::Widened(slot),
                None => ParamClass::ByValue,
            },
            Class::Memory => ParamClass::ByReference {
                mutable: true,
                caller_copy: false,
            },
            Class::Integer => ParamClass::AbiSizedInt,
            Class::DoubleInteger => ParamClass::Split(register_pair(cx)),
            Class::Fields(slots) => ParamClass::Split(slots),
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        match classify(cx, ty) {
            Class::ByValue => match widened_half(cx, ty) {
                Some(slot) => ReturnClass::Widened(slot),
                None => ReturnClass::ByValue,
            },
            Class::Memory => ReturnClass::Sret,
            Class::Integer => ReturnClass::AbiSizedInt,
            Class::DoubleInteger => ReturnClass::Split(register_pair(cx)),
            Class::Fields(slots) => ReturnClass::Split(slots),
        }
    }
}
