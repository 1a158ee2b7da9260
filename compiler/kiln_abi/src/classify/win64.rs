//! x86-64 Windows classification.
//!
//! Every argument occupies exactly one register or stack slot. Values of
//! 1, 2, 4 or 8 bytes travel as integers of that size, floats and vectors in
//! XMM registers, everything else by reference.

use kiln_types::{ContainerLayout, Idx, TypeData};

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Class {
    Integer,
    Sse,
    /// Wide integers: by reference in, `<2 x i64>` out.
    WideInt,
    Memory,
}

fn classify(cx: &AbiCx<'_>, ty: Idx) -> Class {
    let data = cx.get(ty);
    if matches!(data, TypeData::Float { .. } | TypeData::Vector { .. }) {
        return Class::Sse;
    }
    match cx.size(ty) {
        1 | 2 | 4 | 8 => Class::Integer,
        _ => match data {
            TypeData::Int { .. } => Class::WideInt,
            TypeData::Struct(s) if s.layout == ContainerLayout::Packed => Class::WideInt,
            TypeData::Union(u) if u.layout == ContainerLayout::Packed => Class::WideInt,
            _ => Class::Memory,
        },
    }
}

/// x86-64 Microsoft x64.
#[derive(Copy, Clone, Debug, Default)]
pub struct Win64;

impl Classifier for Win64 {
    fn name(&self) -> &'static str {
        "x86_64-win64"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        match classify(cx, ty) {
            Class::Integer if cx.is_scalar(ty) => ParamClass::ByValue,
            Class::Integer => ParamClass::AbiSizedInt,
            Class::Sse => ParamClass::ByValue,
            Class::WideInt => ParamClass::ByReference {
                mutable: false,
                caller_copy: false,
            },
            Class::Memory => ParamClass::ByReference {
                mutable: true,
                caller_copy: false,
            },
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        match classify(cx, ty) {
            Class::Integer if cx.is_scalar(ty) => ReturnClass::ByValue,
            Class::Integer => ReturnClass::AbiSizedInt,
            Class::Sse => ReturnClass::ByValue,
            Class::WideInt => ReturnClass::Widened(AbiSlot::IntVector { len: 2, bits: 64 }),
            Class::Memory => ReturnClass::Sret,
        }
    }
}
