//! Calling-convention classification.
//!
//! Decides, for each parameter and the return value of a function type, how
//! the value crosses the call boundary at the machine level. The internal
//! (`Auto`) convention follows the by-reference policy alone; C conventions
//! go through a per-architecture [`Classifier`].
//!
//! Rules shared by every convention are applied before dispatch:
//! zero-size parameters vanish, slices travel as `(pointer, length)`, and a
//! zero-size error type still returns its error code.
//!
//! # References
//!
//! - System V AMD64 psABI, section 3.2.3
//! - Microsoft x64 calling convention
//! - AAPCS64 and AAPCS (ARM)
//! - RISC-V ELF psABI, hardware floating-point calling convention
//! - WebAssembly tool-conventions `BasicCABI.md`

mod aarch64;
mod arm;
mod generic;
mod riscv;
mod sysv;
mod wasm;
mod win64;

use kiln_target::{Arch, Target};
use kiln_types::{
    align_forward, CallConv, ContainerLayout, ErrorUnionRepr, Idx,
    OptionalRepr, Pool, PtrSize, TypeData, TypeLayout,
};
use smallvec::SmallVec;

use crate::by_ref::is_by_ref;
use crate::ty::FloatKind;
use crate::LowerError;

pub use aarch64::Aarch64;
pub use arm::Arm;
pub use generic::Generic;
pub use riscv::RiscV;
pub use sysv::SysV;
pub use wasm::Wasm;
pub use win64::Win64;

// ---------------------------------------------------------------------------
// Classification results
// ---------------------------------------------------------------------------

/// One machine value in a split or widened parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum AbiSlot {
    Int(u32),
    Float(FloatKind),
    FloatVector { len: u32, elem: FloatKind },
    IntVector { len: u32, bits: u32 },
    /// The lowered form of a source type.
    Source(Idx),
}

pub type Slots = SmallVec<[AbiSlot; 4]>;

/// How one parameter is passed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamClass {
    /// Not passed at all.
    NoBits,
    /// Passed as the type's own lowered form.
    ByValue,
    /// Passed as a pointer to the value.
    ///
    /// `mutable`: the callee may write through the pointer, so the caller
    /// passes a private copy. `caller_copy`: the copy lives in the argument
    /// area and the pointer carries the backend's `byval` marker.
    ByReference { mutable: bool, caller_copy: bool },
    /// Passed as one integer exactly as wide as the type's ABI size.
    AbiSizedInt,
    /// Spread over several machine values.
    Split(Slots),
    /// `(pointer, length)` pair.
    Slice,
    /// Reinterpreted as a single different machine value.
    Widened(AbiSlot),
    /// Homogeneous float aggregate passed as an array of floats.
    PackedArray { elem: FloatKind, count: u32 },
}

/// How the return value comes back.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ReturnClass {
    NoBits,
    /// A zero-size error type; the error code is returned.
    ErrorCode,
    ByValue,
    /// Written through a hidden leading pointer parameter.
    Sret,
    AbiSizedInt,
    Split(Slots),
    Widened(AbiSlot),
    PackedArray { elem: FloatKind, count: u32 },
}

impl ReturnClass {
    pub fn is_sret(&self) -> bool {
        matches!(self, Self::Sret)
    }
}

// ---------------------------------------------------------------------------
// Classifier seam
// ---------------------------------------------------------------------------

/// A C calling convention for one architecture family.
///
/// Called only for types with runtime bits that are not slices.
pub trait Classifier: Sync {
    fn name(&self) -> &'static str;

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass;

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass;
}

static SYSV: SysV = SysV;
static WIN64: Win64 = Win64;
static AARCH64: Aarch64 = Aarch64;
static ARM_SOFT: Arm = Arm { hard_float: false };
static ARM_VFP: Arm = Arm { hard_float: true };
static RISCV: RiscV = RiscV;
static WASM: Wasm = Wasm;
static GENERIC: Generic = Generic;

/// The target's default C calling convention.
pub fn select_c_abi(target: &Target) -> &'static dyn Classifier {
    match target.arch() {
        Arch::X86_64 if target.is_windows() => &WIN64,
        Arch::X86_64 => &SYSV,
        Arch::Aarch64 => &AARCH64,
        Arch::Arm | Arch::Thumb if target.features().arm_hard_float => &ARM_VFP,
        Arch::Arm | Arch::Thumb => &ARM_SOFT,
        Arch::Riscv32 | Arch::Riscv64 => &RISCV,
        Arch::Wasm32 | Arch::Wasm64 => &WASM,
        Arch::X86 | Arch::Mips | Arch::Mipsel | Arch::Powerpc64le => &GENERIC,
    }
}

/// Classifier for `cc` on `target`; `None` for the internal convention.
///
/// An explicit convention that belongs to another architecture degrades to
/// the generic classifier.
pub fn classifier_for(
    cc: CallConv,
    target: &Target,
    c_abi: &'static dyn Classifier,
) -> Result<Option<&'static dyn Classifier>, LowerError> {
    let arch = target.arch();
    let classifier: &'static dyn Classifier = match cc {
        CallConv::Auto => return Ok(None),
        CallConv::Async => return Err(LowerError::unimplemented("async calling convention")),
        CallConv::C => c_abi,
        CallConv::SysV if arch == Arch::X86_64 => &SYSV,
        CallConv::Win64 if arch == Arch::X86_64 => &WIN64,
        CallConv::Aapcs if arch.is_arm() => &ARM_SOFT,
        CallConv::AapcsVfp if arch.is_arm() => &ARM_VFP,
        CallConv::SysV | CallConv::Win64 | CallConv::Aapcs | CallConv::AapcsVfp => {
            tracing::warn!(?cc, %arch, "calling convention does not apply to target; using generic");
            &GENERIC
        }
    };
    Ok(Some(classifier))
}

/// Classify one parameter of a function with convention `cc`.
#[tracing::instrument(level = "trace", skip(cx, c_abi))]
pub fn classify_param(
    cx: &AbiCx<'_>,
    cc: CallConv,
    c_abi: &'static dyn Classifier,
    ty: Idx,
) -> Result<ParamClass, LowerError> {
    let classifier = classifier_for(cc, cx.target, c_abi)?;
    if !cx.pool.has_runtime_bits(ty) {
        return Ok(ParamClass::NoBits);
    }
    if cx.pool.is_slice(ty) || cx.pool.is_optional_slice(ty) {
        return Ok(ParamClass::Slice);
    }
    let class = match classifier {
        None if is_by_ref(cx.pool, ty) => ParamClass::ByReference {
            mutable: false,
            caller_copy: false,
        },
        None => ParamClass::ByValue,
        Some(c) => c.classify_param(cx, ty),
    };
    tracing::trace!(?class, "param");
    Ok(class)
}

/// Classify the return value of a function with convention `cc`.
#[tracing::instrument(level = "trace", skip(cx, c_abi))]
pub fn classify_return(
    cx: &AbiCx<'_>,
    cc: CallConv,
    c_abi: &'static dyn Classifier,
    ty: Idx,
) -> Result<ReturnClass, LowerError> {
    let classifier = classifier_for(cc, cx.target, c_abi)?;
    if !cx.pool.has_runtime_bits(ty) {
        return Ok(if cx.pool.is_error_type(ty) {
            ReturnClass::ErrorCode
        } else {
            ReturnClass::NoBits
        });
    }
    // Slices come back as the lowered `{ptr, len}` pair everywhere.
    if cx.pool.is_slice(ty) || cx.pool.is_optional_slice(ty) {
        return Ok(ReturnClass::ByValue);
    }
    let class = match classifier {
        None if is_by_ref(cx.pool, ty) => ReturnClass::Sret,
        None => ReturnClass::ByValue,
        Some(c) => c.classify_return(cx, ty),
    };
    tracing::trace!(?class, "return");
    Ok(class)
}

// ---------------------------------------------------------------------------
// Shared queries
// ---------------------------------------------------------------------------

/// A runtime member of an aggregate at a byte offset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub ty: Idx,
    pub offset: u64,
}

/// What a classifier may ask about types.
#[derive(Copy, Clone)]
pub struct AbiCx<'a> {
    pub pool: &'a Pool,
    pub target: &'a Target,
}

impl<'a> AbiCx<'a> {
    pub fn new(pool: &'a Pool, target: &'a Target) -> Self {
        Self { pool, target }
    }

    pub fn layout(&self, ty: Idx) -> TypeLayout {
        self.pool.abi_layout(ty, self.target)
    }

    pub fn size(&self, ty: Idx) -> u64 {
        self.layout(ty).size
    }

    pub fn bit_size(&self, ty: Idx) -> u64 {
        self.pool.bit_size(ty, self.target)
    }

    pub fn get(&self, ty: Idx) -> &'a TypeData {
        self.pool.get(ty)
    }

    /// Types every C convention passes as a single machine scalar.
    pub fn is_scalar(&self, ty: Idx) -> bool {
        match self.pool.get(ty) {
            TypeData::Bool
            | TypeData::Int { .. }
            | TypeData::Float { .. }
            | TypeData::ErrorSet(_)
            | TypeData::Enum { .. }
            | TypeData::Vector { .. } => true,
            TypeData::Pointer(p) => p.size != PtrSize::Slice,
            TypeData::Optional { child } => {
                self.pool.optional_repr(*child) == OptionalRepr::Payload
                    && !self.pool.is_slice(*child)
            }
            TypeData::Struct(s) => s.layout == ContainerLayout::Packed,
            TypeData::Union(u) => u.layout == ContainerLayout::Packed,
            _ => false,
        }
    }

    /// Float width of `ty` if it is a float the backend has a format for.
    pub fn float_kind(&self, ty: Idx) -> Option<FloatKind> {
        match self.pool.get(ty) {
            TypeData::Float { bits: 80 } if !self.target.supports_f80() => None,
            TypeData::Float { bits } => FloatKind::from_bits(*bits),
            _ => None,
        }
    }

    /// Runtime members of an in-memory aggregate with their offsets.
    ///
    /// Array elements are listed individually; callers bound the aggregate
    /// size before asking. Scalars and bit-packed containers have no
    /// members.
    pub fn members(&self, ty: Idx) -> SmallVec<[Member; 8]> {
        let pool = self.pool;
        let mut out = SmallVec::new();
        let seq = |out: &mut SmallVec<[Member; 8]>, tys: &mut dyn Iterator<Item = Idx>| {
            let mut offset = 0;
            for ty in tys {
                let l = self.layout(ty);
                offset = align_forward(offset, l.align);
                if l.size > 0 {
                    out.push(Member { ty, offset });
                }
                offset += l.size;
            }
        };
        match pool.get(ty) {
            TypeData::Struct(s) if s.layout != ContainerLayout::Packed => seq(
                &mut out,
                &mut s.fields.iter().filter(|f| !f.is_comptime).map(|f| f.ty),
            ),
            TypeData::Tuple { fields } => seq(
                &mut out,
                &mut fields.iter().filter(|f| !f.is_comptime).map(|f| f.ty),
            ),
            TypeData::Array {
                len,
                child,
                sentinel,
            } => {
                let elem = self.size(*child);
                if elem > 0 {
                    for i in 0..len + u64::from(*sentinel) {
                        out.push(Member {
                            ty: *child,
                            offset: i * elem,
                        });
                    }
                }
            }
            TypeData::Optional { child } => match pool.optional_repr(*child) {
                OptionalRepr::FlagOnly => out.push(Member {
                    ty: Idx::U8,
                    offset: 0,
                }),
                OptionalRepr::Payload => out.push(Member {
                    ty: *child,
                    offset: 0,
                }),
                OptionalRepr::PayloadAndFlag => {
                    seq(&mut out, &mut [*child, Idx::U8].into_iter());
                }
            },
            TypeData::ErrorUnion { error_set, payload } => {
                let order = match pool.error_union_repr(*error_set, *payload, self.target) {
                    ErrorUnionRepr::Empty => Vec::new(),
                    ErrorUnionRepr::PayloadOnly => vec![*payload],
                    ErrorUnionRepr::ErrorOnly => vec![*error_set],
                    ErrorUnionRepr::ErrorFirst => vec![*error_set, *payload],
                    ErrorUnionRepr::PayloadFirst => vec![*payload, *error_set],
                };
                seq(&mut out, &mut order.into_iter());
            }
            TypeData::Union(u) if u.layout != ContainerLayout::Packed => {
                let payload = pool.union_payload_layout(u, self.target);
                let (payload_at, tag) = match (pool.union_has_tag(u), u.tag) {
                    (true, Some(tag)) => {
                        let tag_layout = self.layout(tag);
                        if tag_layout.align >= payload.align {
                            (align_forward(tag_layout.size, payload.align), Some((tag, 0)))
                        } else {
                            let at = align_forward(payload.size, tag_layout.align);
                            (0, Some((tag, at)))
                        }
                    }
                    _ => (0, None),
                };
                if let Some((tag, offset)) = tag {
                    out.push(Member { ty: tag, offset });
                }
                for f in &u.fields {
                    if self.size(f.ty) > 0 {
                        out.push(Member {
                            ty: f.ty,
                            offset: payload_at,
                        });
                    }
                }
            }
            _ => {}
        }
        out
    }

    /// Float format shared by every leaf of a homogeneous float aggregate
    /// of at most `max` elements, with the element count.
    pub fn homogeneous_floats(&self, ty: Idx, max: u32) -> Option<(FloatKind, u32)> {
        let mut kind = None;
        let count = self.count_floats(ty, max, &mut kind)?;
        Some((kind?, count))
    }

    fn count_floats(&self, ty: Idx, max: u32, kind: &mut Option<FloatKind>) -> Option<u32> {
        kiln_stack::ensure_sufficient_stack(|| {
            if !self.pool.has_runtime_bits(ty) {
                return Some(0);
            }
            if let Some(k) = self.float_kind(ty) {
                if kind.is_some_and(|seen| seen != k) {
                    return None;
                }
                *kind = Some(k);
                return Some(1);
            }
            let is_union = match self.pool.get(ty) {
                TypeData::Struct(s) if s.layout != ContainerLayout::Packed => false,
                TypeData::Tuple { .. } => false,
                TypeData::Array { len, .. } if *len <= u64::from(max) => false,
                TypeData::Union(u)
                    if u.layout != ContainerLayout::Packed && !self.pool.union_has_tag(u) =>
                {
                    true
                }
                _ => return None,
            };
            let mut total = 0;
            for m in self.members(ty) {
                let n = self.count_floats(m.ty, max, kind)?;
                total = if is_union { total.max(n) } else { total + n };
                if total > max {
                    return None;
                }
            }
            Some(total)
        })
    }
}
