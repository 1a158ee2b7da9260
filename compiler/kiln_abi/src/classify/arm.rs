//! 32-bit ARM (AAPCS) classification.
//!
//! Aggregates are passed in core registers as arrays of 32-bit words, or of
//! 64-bit doublewords when doubleword aligned. Under the VFP variant,
//! homogeneous float aggregates go in floating-point registers instead.

use kiln_types::{align_forward, ContainerLayout, Idx, TypeData};
use smallvec::SmallVec;

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass, Slots};

/// Aggregates larger than this many bytes are passed in memory.
const MAX_BYVAL_SIZE: u64 = 64;

const MAX_HFA_MEMBERS: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Class {
    ByValue,
    Memory,
    I32Array(u32),
    I64Array(u32),
}

/// ARM AAPCS; `hard_float` selects the VFP variant.
#[derive(Copy, Clone, Debug, Default)]
pub struct Arm {
    pub hard_float: bool,
}

impl Arm {
    fn classify(self, cx: &AbiCx<'_>, ty: Idx, is_return: bool) -> Class {
        match cx.get(ty) {
            TypeData::Struct(s) if s.layout == ContainerLayout::Packed => {
                return if cx.bit_size(ty) > 64 {
                    Class::Memory
                } else {
                    Class::ByValue
                };
            }
            TypeData::Union(u) if u.layout == ContainerLayout::Packed => {
                return if cx.bit_size(ty) > 64 {
                    Class::Memory
                } else {
                    Class::ByValue
                };
            }
            TypeData::Enum { .. } | TypeData::ErrorSet(_) if cx.bit_size(ty) > 64 => {
                return Class::Memory;
            }
            TypeData::Vector { .. } => {
                let bits = cx.bit_size(ty);
                let too_big = bits > 512 || (is_return && bits > 128);
                return if too_big { Class::Memory } else { Class::ByValue };
            }
            _ => {}
        }
        if cx.is_scalar(ty) {
            return Class::ByValue;
        }

        let layout = cx.layout(ty);
        if layout.size > MAX_BYVAL_SIZE {
            return Class::Memory;
        }
        if self.hard_float && cx.homogeneous_floats(ty, MAX_HFA_MEMBERS).is_some() {
            return Class::ByValue;
        }
        if layout.align > 4 {
            Class::I64Array((align_forward(layout.size, 8) / 8) as u32)
        } else {
            Class::I32Array((align_forward(layout.size, 4) / 4) as u32)
        }
    }

    /// Half floats travel as 16-bit integers without native half support.
    fn widened_half(cx: &AbiCx<'_>, ty: Idx) -> Option<AbiSlot> {
        let half = matches!(cx.get(ty), TypeData::Float { bits: 16 });
        (half && !cx.target.features().arm_fullfp16).then_some(AbiSlot::Int(16))
    }
}

fn words(count: u32, bits: u32) -> Slots {
    let mut out: Slots = SmallVec::new();
    out.extend((0..count).map(|_| AbiSlot::Int(bits)));
    out
}

impl Classifier for Arm {
    fn name(&self) -> &'static str {
        if self.hard_float {
            "arm-aapcs-vfp"
        } else {
            "arm-aapcs"
        }
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        match self.classify(cx, ty, false) {
            Class::ByValue => match Self::widened_half(cx, ty) {
                Some(slot) => ParamClass::Widened(slot),
                None => ParamClass::ByValue,
            },
            Class::Memory => ParamClass::ByReference {
                mutable: false,
                caller_copy: true,
            },
            Class::I32Array(n) => ParamClass::Split(words(n, 32)),
            Class::I64Array(n) => ParamClass::Split(words(n, 64)),
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        match self.classify(cx, ty, true) {
            Class::ByValue => match Self::widened_half(cx, ty) {
                Some(slot) => ReturnClass::Widened(slot),
                None => ReturnClass::ByValue,
            },
            Class::I32Array(1) => ReturnClass::Split(words(1, 32)),
            Class::Memory | Class::I32Array(_) | Class::I64Array(_) => ReturnClass::Sret,
        }
    }
}
