//! Source type descriptors.
//!
//! [`TypeData`] is the frontend's already-validated description of a type.
//! The lowering engine reads it through [`Pool::get`](crate::Pool::get) and
//! never mutates it.

use bitflags::bitflags;

use crate::Idx;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Pointer flavor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum PtrSize {
    /// Single-item pointer `*T`.
    One,
    /// Many-item pointer `[*]T`.
    Many,
    /// Pointer plus length `[]T`.
    Slice,
    /// C pointer `[*c]T`: may be null.
    C,
}

bitflags! {
    /// Pointer qualifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    #[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
    pub struct PtrFlags: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        /// Address zero is a valid pointee address.
        const ALLOW_ZERO = 1 << 2;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerType {
    pub child: Idx,
    pub size: PtrSize,
    pub addrspace: u32,
    pub flags: PtrFlags,
}

impl PointerType {
    /// Whether the all-zero bit pattern is a valid pointer value.
    pub fn allows_zero(&self) -> bool {
        self.size == PtrSize::C || self.flags.contains(PtrFlags::ALLOW_ZERO)
    }
}

/// Container layout requested in source.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ContainerLayout {
    /// Compiler-chosen layout (declaration order, natural alignment).
    Auto,
    /// C-compatible layout.
    Extern,
    /// Bit-packed into a single backing integer.
    Packed,
}

/// Source-level calling convention.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum CallConv {
    /// Internal convention for non-exported functions.
    #[default]
    Auto,
    /// The target's default C calling convention.
    C,
    /// x86-64 System V, regardless of OS.
    SysV,
    /// x86-64 Windows, regardless of OS.
    Win64,
    /// ARM AAPCS with integer registers for floats.
    Aapcs,
    /// ARM AAPCS with VFP registers for floats.
    AapcsVfp,
    /// Continuation-passing async functions.
    Async,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StructField {
    pub name: String,
    pub ty: Idx,
    /// Comptime fields have no runtime storage.
    pub is_comptime: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct StructType {
    pub name: String,
    pub layout: ContainerLayout,
    pub fields: Vec<StructField>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct TupleField {
    pub ty: Idx,
    pub is_comptime: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct UnionField {
    pub name: String,
    pub ty: Idx,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct UnionType {
    pub name: String,
    pub layout: ContainerLayout,
    /// Enum tag type for tagged unions.
    pub tag: Option<Idx>,
    pub fields: Vec<UnionField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSet {
    /// `anyerror`: every error in the program.
    Global,
    /// An explicit set of error names; may be empty.
    Named(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct FnType {
    pub params: Vec<Idx>,
    pub ret: Idx,
    pub cc: CallConv,
    pub varargs: bool,
    /// Bit `i` set: parameter `i` is declared `noalias`.
    pub noalias: u32,
}

impl FnType {
    pub fn param_is_noalias(&self, index: usize) -> bool {
        index < 32 && self.noalias & (1 << index) != 0
    }
}

/// A source type, as the frontend describes it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeData {
    Void,
    NoReturn,
    Bool,
    /// Compile-time-only values (`comptime_int`, `type`, ...).
    Comptime,
    Int {
        bits: u16,
        signedness: Signedness,
    },
    Float {
        bits: u16,
    },
    Pointer(PointerType),
    Array {
        len: u64,
        child: Idx,
        /// A trailing sentinel element is stored after the last element.
        sentinel: bool,
    },
    Vector {
        len: u32,
        child: Idx,
    },
    Optional {
        child: Idx,
    },
    ErrorUnion {
        error_set: Idx,
        payload: Idx,
    },
    ErrorSet(ErrorSet),
    Enum {
        name: String,
        tag: Idx,
        variants: Vec<String>,
    },
    Struct(StructType),
    /// Anonymous struct.
    Tuple {
        fields: Vec<TupleField>,
    },
    Union(UnionType),
    Function(FnType),
    Opaque {
        name: String,
    },
}

impl TypeData {
    /// Nominal types get a fresh identity per declaration; everything else is
    /// interned by structure.
    pub fn is_nominal(&self) -> bool {
        matches!(
            self,
            Self::Struct(_) | Self::Union(_) | Self::Enum { .. } | Self::Opaque { .. }
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::NoReturn => "noreturn",
            Self::Bool => "bool",
            Self::Comptime => "comptime",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Pointer(_) => "pointer",
            Self::Array { .. } => "array",
            Self::Vector { .. } => "vector",
            Self::Optional { .. } => "optional",
            Self::ErrorUnion { .. } => "error_union",
            Self::ErrorSet(_) => "error_set",
            Self::Enum { .. } => "enum",
            Self::Struct(_) => "struct",
            Self::Tuple { .. } => "tuple",
            Self::Union(_) => "union",
            Self::Function(_) => "function",
            Self::Opaque { .. } => "opaque",
        }
    }
}
