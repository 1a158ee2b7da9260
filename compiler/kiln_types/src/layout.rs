//! Frontend ABI size and alignment.
//!
//! This is the type system's own layout computation, written against the
//! source types and the target's C type facts. The lowering engine derives
//! the same numbers independently from lowered types and the backend's
//! alignment tables; the two must agree for every type with runtime bits.
//!
//! Representation predicates that both sides must share (when an optional
//! is represented by its payload, whether a union carries a tag, ...) live
//! here as well, so the lowering engine asks rather than re-derives them.

use kiln_stack::ensure_sufficient_stack;
use kiln_target::{CType, Target};

use crate::data::{ContainerLayout, ErrorSet, PtrSize, TypeData, UnionType};
use crate::{Idx, Pool};

/// Width of an error code.
pub const ERROR_CODE_BITS: u16 = 16;

/// Size and ABI alignment of a type, in bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeLayout {
    pub size: u64,
    pub align: u64,
}

impl TypeLayout {
    /// Layout of types without runtime bits.
    pub const ZERO: Self = Self { size: 0, align: 1 };

    pub const fn new(size: u64, align: u64) -> Self {
        Self { size, align }
    }
}

/// Round `offset` up to a multiple of `align` (a power of two).
#[inline]
pub fn align_forward(offset: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    (offset + align - 1) & !(align - 1)
}

/// Sequential C-style composition: each member at the next offset aligned
/// for it, total size rounded up to the largest alignment.
pub fn compose(members: impl IntoIterator<Item = TypeLayout>) -> TypeLayout {
    let mut offset = 0;
    let mut align = 1;
    for m in members {
        offset = align_forward(offset, m.align) + m.size;
        align = align.max(m.align);
    }
    TypeLayout::new(align_forward(offset, align), align)
}

/// Where an error union keeps its two halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorUnionRepr {
    /// Neither half has runtime bits.
    Empty,
    /// The error set is empty; only the payload is stored.
    PayloadOnly,
    /// The payload has no bits; only the error code is stored.
    ErrorOnly,
    /// Both halves, error code first.
    ErrorFirst,
    /// Both halves, payload first.
    PayloadFirst,
}

/// Where an optional keeps its presence flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OptionalRepr {
    /// Payload has no bits: the optional is a bare `u8` flag.
    FlagOnly,
    /// Null is an in-band payload value (non-zero pointers, slices, error sets).
    Payload,
    /// `{payload, u8 flag}`.
    PayloadAndFlag,
}

impl Pool {
    /// Whether values of `idx` occupy any memory at runtime.
    pub fn has_runtime_bits(&self, idx: Idx) -> bool {
        ensure_sufficient_stack(|| match self.get(idx) {
            TypeData::Void
            | TypeData::NoReturn
            | TypeData::Comptime
            | TypeData::Opaque { .. }
            | TypeData::Function(_) => false,
            TypeData::Bool | TypeData::Float { .. } | TypeData::Pointer(_) => true,
            TypeData::Optional { .. } => true,
            TypeData::Int { bits, .. } => *bits > 0,
            TypeData::Array {
                len,
                child,
                sentinel,
            } => len + u64::from(*sentinel) > 0 && self.has_runtime_bits(*child),
            TypeData::Vector { len, child } => *len > 0 && self.has_runtime_bits(*child),
            TypeData::ErrorSet(set) => error_set_has_bits(set),
            TypeData::ErrorUnion { error_set, payload } => {
                self.has_runtime_bits(*error_set) || self.has_runtime_bits(*payload)
            }
            TypeData::Enum { tag, .. } => self.has_runtime_bits(*tag),
            TypeData::Struct(s) => s
                .fields
                .iter()
                .any(|f| !f.is_comptime && self.has_runtime_bits(f.ty)),
            TypeData::Tuple { fields } => fields
                .iter()
                .any(|f| !f.is_comptime && self.has_runtime_bits(f.ty)),
            TypeData::Union(u) => {
                self.union_has_tag(u) || u.fields.iter().any(|f| self.has_runtime_bits(f.ty))
            }
        })
    }

    /// Whether the type is an error set or an error union.
    pub fn is_error_type(&self, idx: Idx) -> bool {
        matches!(
            self.get(idx),
            TypeData::ErrorSet(_) | TypeData::ErrorUnion { .. }
        )
    }

    /// `[]T` or `[]const T`.
    pub fn is_slice(&self, idx: Idx) -> bool {
        matches!(self.get(idx), TypeData::Pointer(p) if p.size == PtrSize::Slice)
    }

    /// `?[]T`, which shares the slice representation.
    pub fn is_optional_slice(&self, idx: Idx) -> bool {
        matches!(self.get(idx), TypeData::Optional { child } if self.is_slice(*child))
    }

    /// Whether the union stores a runtime tag.
    ///
    /// The tag is dropped for single-variant unions and zero-bit tag types.
    pub fn union_has_tag(&self, u: &UnionType) -> bool {
        match u.tag {
            Some(tag) => u.fields.len() > 1 && self.has_runtime_bits(tag),
            None => false,
        }
    }

    pub fn optional_repr(&self, child: Idx) -> OptionalRepr {
        if !self.has_runtime_bits(child) {
            return OptionalRepr::FlagOnly;
        }
        let in_band = match self.get(child) {
            TypeData::Pointer(p) => !p.allows_zero(),
            TypeData::ErrorSet(_) => true,
            _ => false,
        };
        if in_band {
            OptionalRepr::Payload
        } else {
            OptionalRepr::PayloadAndFlag
        }
    }

    pub fn error_union_repr(&self, error_set: Idx, payload: Idx, target: &Target) -> ErrorUnionRepr {
        match (self.has_runtime_bits(error_set), self.has_runtime_bits(payload)) {
            (false, false) => ErrorUnionRepr::Empty,
            (false, true) => ErrorUnionRepr::PayloadOnly,
            (true, false) => ErrorUnionRepr::ErrorOnly,
            (true, true) => {
                let error_align = error_code_layout(target).align;
                let payload_align = self.abi_layout(payload, target).align;
                // Higher alignment first; ties put the error code first.
                if error_align >= payload_align {
                    ErrorUnionRepr::ErrorFirst
                } else {
                    ErrorUnionRepr::PayloadFirst
                }
            }
        }
    }

    /// ABI size and alignment of `idx` on `target`.
    ///
    /// Types without runtime bits have [`TypeLayout::ZERO`].
    pub fn abi_layout(&self, idx: Idx, target: &Target) -> TypeLayout {
        if !self.has_runtime_bits(idx) {
            return TypeLayout::ZERO;
        }
        ensure_sufficient_stack(|| self.abi_layout_inner(idx, target))
    }

    fn abi_layout_inner(&self, idx: Idx, target: &Target) -> TypeLayout {
        match self.get(idx) {
            TypeData::Bool => TypeLayout::new(1, 1),
            TypeData::Int { bits, .. } => int_layout(u64::from(*bits), target),
            TypeData::Float { bits } => float_layout(*bits, target),
            TypeData::Pointer(p) => {
                let ptr = target.pointer_layout(p.addrspace);
                let ptr = TypeLayout::new(ptr.size_bytes(), ptr.align_bytes());
                if p.size == PtrSize::Slice {
                    compose([ptr, usize_layout(target)])
                } else {
                    ptr
                }
            }
            TypeData::Array {
                len,
                child,
                sentinel,
            } => {
                let elem = self.abi_layout(*child, target);
                TypeLayout::new(
                    (len + u64::from(*sentinel)).saturating_mul(elem.size),
                    elem.align,
                )
            }
            TypeData::Vector { len, child } => {
                let bits = u64::from(*len) * self.bit_size(*child, target);
                let align = target.vector_align(bits);
                TypeLayout::new(align_forward(bits.div_ceil(8), align), align)
            }
            TypeData::Optional { child } => match self.optional_repr(*child) {
                OptionalRepr::FlagOnly => TypeLayout::new(1, 1),
                OptionalRepr::Payload => self.abi_layout(*child, target),
                OptionalRepr::PayloadAndFlag => {
                    compose([self.abi_layout(*child, target), TypeLayout::new(1, 1)])
                }
            },
            TypeData::ErrorSet(_) => error_code_layout(target),
            TypeData::ErrorUnion { error_set, payload } => {
                let err = error_code_layout(target);
                match self.error_union_repr(*error_set, *payload, target) {
                    ErrorUnionRepr::Empty => TypeLayout::ZERO,
                    ErrorUnionRepr::PayloadOnly => self.abi_layout(*payload, target),
                    ErrorUnionRepr::ErrorOnly => err,
                    ErrorUnionRepr::ErrorFirst => compose([err, self.abi_layout(*payload, target)]),
                    ErrorUnionRepr::PayloadFirst => {
                        compose([self.abi_layout(*payload, target), err])
                    }
                }
            }
            TypeData::Enum { tag, .. } => self.abi_layout(*tag, target),
            TypeData::Struct(s) => match s.layout {
                ContainerLayout::Packed => int_layout(self.bit_size(idx, target), target),
                ContainerLayout::Auto | ContainerLayout::Extern => compose(
                    s.fields
                        .iter()
                        .filter(|f| !f.is_comptime)
                        .map(|f| self.abi_layout(f.ty, target)),
                ),
            },
            TypeData::Tuple { fields } => compose(
                fields
                    .iter()
                    .filter(|f| !f.is_comptime)
                    .map(|f| self.abi_layout(f.ty, target)),
            ),
            TypeData::Union(u) => {
                if u.layout == ContainerLayout::Packed {
                    return int_layout(self.bit_size(idx, target), target);
                }
                let payload = self.union_payload_layout(u, target);
                match (self.union_has_tag(u), u.tag) {
                    (true, Some(tag)) => {
                        let tag = self.abi_layout(tag, target);
                        if tag.align >= payload.align {
                            compose([tag, payload])
                        } else {
                            compose([payload, tag])
                        }
                    }
                    _ => payload,
                }
            }
            TypeData::Void
            | TypeData::NoReturn
            | TypeData::Comptime
            | TypeData::Opaque { .. }
            | TypeData::Function(_) => TypeLayout::ZERO,
        }
    }

    /// Payload area of a non-packed union: the largest member rounded up to
    /// the strictest member alignment.
    pub fn union_payload_layout(&self, u: &UnionType, target: &Target) -> TypeLayout {
        let (size, align) = u
            .fields
            .iter()
            .map(|f| self.abi_layout(f.ty, target))
            .fold((0, 1), |(size, align), l| (size.max(l.size), align.max(l.align)));
        TypeLayout::new(align_forward(size, align), align)
    }

    /// Width in bits when packed into a bit-packed container.
    pub fn bit_size(&self, idx: Idx, target: &Target) -> u64 {
        ensure_sufficient_stack(|| match self.get(idx) {
            TypeData::Bool => 1,
            TypeData::Int { bits, .. } | TypeData::Float { bits } => u64::from(*bits),
            TypeData::Pointer(p) if p.size != PtrSize::Slice => {
                u64::from(target.pointer_layout(p.addrspace).size_bits)
            }
            TypeData::Enum { tag, .. } => self.bit_size(*tag, target),
            TypeData::ErrorSet(set) if error_set_has_bits(set) => u64::from(ERROR_CODE_BITS),
            TypeData::Vector { len, child } => u64::from(*len) * self.bit_size(*child, target),
            TypeData::Struct(s) if s.layout == ContainerLayout::Packed => s
                .fields
                .iter()
                .filter(|f| !f.is_comptime)
                .map(|f| self.bit_size(f.ty, target))
                .sum(),
            TypeData::Union(u) if u.layout == ContainerLayout::Packed => u
                .fields
                .iter()
                .map(|f| self.bit_size(f.ty, target))
                .max()
                .unwrap_or(0),
            _ => self.abi_layout(idx, target).size * 8,
        })
    }
}

/// Whether an error set needs storage: `anyerror` or a non-empty set.
pub fn error_set_has_bits(set: &ErrorSet) -> bool {
    match set {
        ErrorSet::Global => true,
        ErrorSet::Named(names) => !names.is_empty(),
    }
}

/// Layout of an error code.
pub fn error_code_layout(target: &Target) -> TypeLayout {
    int_layout(u64::from(ERROR_CODE_BITS), target)
}

fn usize_layout(target: &Target) -> TypeLayout {
    int_layout(u64::from(target.ptr_bits()), target)
}

/// Integer layout from the target's C types: `char`/`short`/`int` widths are
/// naturally aligned, anything up to 64 bits aligns like `long long`, wider
/// integers like `__int128` where the target has one.
pub fn int_layout(bits: u64, target: &Target) -> TypeLayout {
    if bits == 0 {
        return TypeLayout::ZERO;
    }
    let long_long = target.c_type(CType::LongLong).align_bytes();
    let align = match bits {
        1..=8 => target.c_type(CType::Char).align_bytes(),
        9..=16 => target.c_type(CType::Short).align_bytes(),
        17..=32 => target.c_type(CType::Int).align_bytes(),
        33..=64 => long_long,
        _ => target.int128_align().unwrap_or(long_long),
    };
    TypeLayout::new(align_forward(bits.div_ceil(8), align), align)
}

fn float_layout(bits: u16, target: &Target) -> TypeLayout {
    match bits {
        32 => {
            let c = target.c_type(CType::Float);
            TypeLayout::new(c.size_bytes(), c.align_bytes())
        }
        64 => {
            let c = target.c_type(CType::Double);
            TypeLayout::new(c.size_bytes(), c.align_bytes())
        }
        80 if target.supports_f80() => {
            let align = target.float_align(80);
            TypeLayout::new(align_forward(10, align), align)
        }
        80 => int_layout(80, target),
        bits => {
            let size = u64::from(bits) / 8;
            TypeLayout::new(size, target.float_align(u32::from(bits)))
        }
    }
}
