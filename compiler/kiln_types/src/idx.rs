//! Source type identity.
//!
//! `Idx` is the stable identity the lowering engine keys every cache on.
//! Equal indices always denote the same type; structural types are interned
//! so equal structure also yields equal indices.
//!
//! Primitive types have fixed indices and are pre-interned by [`Pool::new`].
//!
//! [`Pool::new`]: crate::Pool::new

use std::fmt;

/// A 32-bit index into the type pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Idx(u32);

impl Idx {
    // === Primitive Types ===
    // Pre-interned in this order at pool creation.

    /// `void`: no runtime bits.
    pub const VOID: Self = Self(0);
    /// `noreturn`: the type of expressions that never complete.
    pub const NORETURN: Self = Self(1);
    pub const BOOL: Self = Self(2);
    pub const U1: Self = Self(3);
    pub const U8: Self = Self(4);
    pub const I8: Self = Self(5);
    pub const U16: Self = Self(6);
    pub const I16: Self = Self(7);
    pub const U32: Self = Self(8);
    pub const I32: Self = Self(9);
    pub const U64: Self = Self(10);
    pub const I64: Self = Self(11);
    pub const U128: Self = Self(12);
    pub const I128: Self = Self(13);
    pub const F16: Self = Self(14);
    pub const F32: Self = Self(15);
    pub const F64: Self = Self(16);
    pub const F80: Self = Self(17);
    pub const F128: Self = Self(18);
    /// The global error set.
    pub const ANYERROR: Self = Self(19);
    /// Compile-time-only integer; never reaches codegen as a value.
    pub const COMPTIME_INT: Self = Self(20);

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 21;

    /// First index handed out for user and structural types.
    pub const FIRST_DYNAMIC: u32 = Self::PRIMITIVE_COUNT;

    /// Sentinel value indicating no type.
    pub const NONE: Self = Self(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::PRIMITIVE_COUNT
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Display name for primitive types.
    pub fn primitive_name(self) -> Option<&'static str> {
        let name = match self {
            Self::VOID => "void",
            Self::NORETURN => "noreturn",
            Self::BOOL => "bool",
            Self::U1 => "u1",
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::U128 => "u128",
            Self::I128 => "i128",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::F80 => "f80",
            Self::F128 => "f128",
            Self::ANYERROR => "anyerror",
            Self::COMPTIME_INT => "comptime_int",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for Idx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.primitive_name() {
            write!(f, "Idx({name})")
        } else if self.is_none() {
            write!(f, "Idx(NONE)")
        } else {
            write!(f, "Idx({})", self.0)
        }
    }
}
