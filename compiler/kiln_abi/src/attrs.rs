//! Machine-call attributes.
//!
//! Restates classification facts in the vocabulary of the backend's
//! parameter attributes. Nothing here makes a new decision: a pointer that
//! cannot be zero is `nonnull`, a hidden return pointer is `sret`, an
//! integer the ABI promotes carries `signext`/`zeroext`.

use bitflags::bitflags;
use kiln_target::{Arch, Target};
use kiln_types::{
    CallConv, OptionalRepr, PointerType, Pool, PtrFlags, PtrSize, Signedness, TypeData,
    TypeLayout, ERROR_CODE_BITS,
};

use crate::ty::LlTy;

bitflags! {
    /// Parameter and return attributes, packed into a bitfield.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct ParamAttrs: u16 {
        const NON_NULL   = 1 << 0;
        const NO_ALIAS   = 1 << 1;
        const READ_ONLY  = 1 << 2;
        const NO_UNDEF   = 1 << 3;
        const SIGN_EXT   = 1 << 4;
        const ZERO_EXT   = 1 << 5;
        const STRUCT_RET = 1 << 6;
        const BY_VAL     = 1 << 7;
    }
}

/// Attributes of one machine parameter or of the return value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrSet {
    pub flags: ParamAttrs,
    /// Pointee alignment, in bytes.
    pub align: Option<u64>,
    /// Pointee type of `sret` and `byval` pointers.
    pub pointee: Option<LlTy>,
}

impl AttrSet {
    pub const NONE: Self = Self {
        flags: ParamAttrs::empty(),
        align: None,
        pointee: None,
    };

    pub fn with(flags: ParamAttrs) -> Self {
        Self {
            flags,
            ..Self::NONE
        }
    }

    pub fn contains(&self, flags: ParamAttrs) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

/// `signext`/`zeroext` for integers the C convention widens to a register.
pub fn int_extension(pool: &Pool, target: &Target, cc: CallConv, ty: kiln_types::Idx) -> ParamAttrs {
    if cc == CallConv::Auto {
        return ParamAttrs::empty();
    }
    let (bits, signedness) = match pool.get(ty) {
        TypeData::Bool => (1, Signedness::Unsigned),
        TypeData::Int { bits, signedness } => (*bits, *signedness),
        TypeData::ErrorSet(_) => (ERROR_CODE_BITS, Signedness::Unsigned),
        TypeData::Enum { tag, .. } => return int_extension(pool, target, cc, *tag),
        _ => return ParamAttrs::empty(),
    };
    let promoted = if target.is_darwin() {
        (bits < 32).then_some(signedness)
    } else {
        match target.arch() {
            Arch::Aarch64 => None,
            // The backend sign-extends 32-bit values regardless of signedness.
            Arch::Riscv64 if bits == 32 => Some(Signedness::Signed),
            Arch::Riscv64 | Arch::Powerpc64le => (bits < 64).then_some(signedness),
            _ => (bits <= 16).then_some(signedness),
        }
    };
    match promoted {
        Some(_) if bits == 1 => ParamAttrs::ZERO_EXT,
        Some(Signedness::Signed) => ParamAttrs::SIGN_EXT,
        Some(Signedness::Unsigned) => ParamAttrs::ZERO_EXT,
        None => ParamAttrs::empty(),
    }
}

/// A pointer passed by value.
pub fn pointer(pool: &Pool, target: &Target, p: &PointerType, noalias: bool) -> AttrSet {
    let mut flags = ParamAttrs::empty();
    if !p.allows_zero() {
        flags |= ParamAttrs::NON_NULL;
    }
    if p.flags.contains(PtrFlags::CONST) && !p.flags.contains(PtrFlags::VOLATILE) {
        flags |= ParamAttrs::READ_ONLY;
    }
    if noalias {
        flags |= ParamAttrs::NO_ALIAS;
    }
    let align = pool
        .has_runtime_bits(p.child)
        .then(|| pool.abi_layout(p.child, target).align);
    AttrSet {
        flags,
        align,
        pointee: None,
    }
}

/// A by-value parameter: pointer facts for pointers, promotion for integers.
pub fn by_value(
    pool: &Pool,
    target: &Target,
    cc: CallConv,
    ty: kiln_types::Idx,
    noalias: bool,
) -> AttrSet {
    match pool.get(ty) {
        TypeData::Pointer(p) if p.size != PtrSize::Slice => pointer(pool, target, p, noalias),
        TypeData::Optional { child } if pool.optional_repr(*child) == OptionalRepr::Payload => {
            match pool.get(*child) {
                TypeData::Pointer(p) => {
                    let mut attrs = pointer(pool, target, p, noalias);
                    attrs.flags.remove(ParamAttrs::NON_NULL);
                    attrs
                }
                _ => AttrSet::with(int_extension(pool, target, cc, *child)),
            }
        }
        _ => AttrSet::with(int_extension(pool, target, cc, ty)),
    }
}

/// Pointer to a value the callee reads in place.
///
/// A mutable reference points at a caller-made copy the callee may clobber;
/// `caller_copy` puts that copy in the argument area (`byval`).
pub fn by_reference(layout: TypeLayout, mutable: bool, caller_copy: bool, pointee: LlTy) -> AttrSet {
    if caller_copy {
        return AttrSet {
            flags: ParamAttrs::NON_NULL | ParamAttrs::BY_VAL,
            align: Some(layout.align),
            pointee: Some(pointee),
        };
    }
    let flags = if mutable {
        ParamAttrs::NO_UNDEF
    } else {
        ParamAttrs::NON_NULL | ParamAttrs::READ_ONLY
    };
    AttrSet {
        flags,
        align: Some(layout.align),
        pointee: None,
    }
}

/// The hidden return pointer.
pub fn sret(layout: TypeLayout, pointee: LlTy) -> AttrSet {
    AttrSet {
        flags: ParamAttrs::STRUCT_RET | ParamAttrs::NO_ALIAS | ParamAttrs::NON_NULL,
        align: Some(layout.align),
        pointee: Some(pointee),
    }
}

/// The slice pointer half of a `(pointer, length)` pair.
pub fn slice_pointer(pool: &Pool, target: &Target, ty: kiln_types::Idx, noalias: bool) -> AttrSet {
    let (p, optional) = match pool.get(ty) {
        TypeData::Pointer(p) => (p, false),
        TypeData::Optional { child } => match pool.get(*child) {
            TypeData::Pointer(p) => (p, true),
            _ => return AttrSet::NONE,
        },
        _ => return AttrSet::NONE,
    };
    let mut attrs = pointer(pool, target, p, noalias);
    if optional {
        attrs.flags.remove(ParamAttrs::NON_NULL);
    }
    attrs
}

/// Attributes of a value returned directly.
pub fn return_value(pool: &Pool, target: &Target, cc: CallConv, ty: kiln_types::Idx) -> AttrSet {
    match pool.get(ty) {
        TypeData::Pointer(p) if p.size != PtrSize::Slice && !p.allows_zero() => {
            AttrSet::with(ParamAttrs::NON_NULL)
        }
        TypeData::Pointer(_) | TypeData::Optional { .. } => AttrSet::NONE,
        _ => AttrSet::with(int_extension(pool, target, cc, ty)),
    }
}
