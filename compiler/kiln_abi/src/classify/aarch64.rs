//! AArch64 (AAPCS64) classification.

use kiln_types::{Idx, TypeData};
use smallvec::smallvec;

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass};
use crate::ty::FloatKind;

/// Homogeneous float aggregates of up to this many members go in SIMD
/// registers.
const MAX_HFA_MEMBERS: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Class {
    ByValue,
    Memory,
    /// Fits one 64-bit register.
    Integer,
    /// Fits two 64-bit registers.
    DoubleInteger,
    Hfa { elem: FloatKind, count: u32 },
}

fn classify(cx: &AbiCx<'_>, ty: Idx) -> Class {
    if cx.is_scalar(ty) {
        let wide_vector = matches!(cx.get(ty), TypeData::Vector { .. }) && cx.bit_size(ty) > 128;
        return if wide_vector {
            Class::Memory
        } else {
            Class::ByValue
        };
    }
    if let Some((elem, count)) = cx.homogeneous_floats(ty, MAX_HFA_MEMBERS) {
        return Class::Hfa { elem, count };
    }
    match cx.size(ty) * 8 {
        0..=64 => Class::Integer,
        65..=128 => Class::DoubleInteger,
        _ => Class::Memory,
    }
}

/// AArch64 procedure call standard.
#[derive(Copy, Clone, Debug, Default)]
pub struct Aarch64;

impl Classifier for Aarch64 {
    fn name(&self) -> &'static str {
        "aarch64-aapcs64"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        match classify(cx, ty) {
            Class::ByValue => ParamClass::ByValue,
            Class::Memory => ParamClass::ByReference {
                mutable: true,
                caller_copy: false,
            },
            Class::Integer => ParamClass::AbiSizedInt,
            Class::DoubleInteger => ParamClass::Split(smallvec![AbiSlot::Int(64), AbiSlot::Int(64)]),
            Class::Hfa { elem, count } => ParamClass::PackedArray { elem, count },
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        match classify(cx, ty) {
            Class::ByValue => ReturnClass::ByValue,
            Class::Memory => ReturnClass::Sret,
            Class::Integer => ReturnClass::AbiSizedInt,
            Class::DoubleInteger => {
                ReturnClass::Split(smallvec![AbiSlot::Int(64), AbiSlot::Int(64)])
            }
            Class::Hfa { elem, count } => ReturnClass::PackedArray { elem, count },
        }
    }
}
