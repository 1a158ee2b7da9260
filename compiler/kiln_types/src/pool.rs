//! Type pool.
//!
//! Owns every [`TypeData`] and hands out [`Idx`] identities:
//! - structural types (ints, pointers, arrays, optionals, tuples, functions,
//!   ...) are interned, so equal structure yields the same index
//! - nominal types (structs, unions, enums, opaques) get a fresh index per
//!   declaration
//!
//! Structs and unions are declared before their fields are defined, which is
//! how self-referential types are built: the declaration's index can appear
//! in its own field list.

mod construct;

use rustc_hash::FxHashMap;

use crate::data::{ErrorSet, FnType, Signedness, StructField, TypeData, UnionField};
use crate::Idx;

/// Storage for all source types of one compilation.
#[derive(Debug, Clone)]
pub struct Pool {
    items: Vec<TypeData>,
    interned: FxHashMap<TypeData, Idx>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Create a pool with the primitive types pre-interned at their fixed
    /// indices.
    pub fn new() -> Self {
        use Signedness::{Signed, Unsigned};

        let mut pool = Self {
            items: Vec::with_capacity(Idx::FIRST_DYNAMIC as usize + 64),
            interned: FxHashMap::default(),
        };
        let primitives = [
            (Idx::VOID, TypeData::Void),
            (Idx::NORETURN, TypeData::NoReturn),
            (Idx::BOOL, TypeData::Bool),
            (Idx::U1, TypeData::Int { bits: 1, signedness: Unsigned }),
            (Idx::U8, TypeData::Int { bits: 8, signedness: Unsigned }),
            (Idx::I8, TypeData::Int { bits: 8, signedness: Signed }),
            (Idx::U16, TypeData::Int { bits: 16, signedness: Unsigned }),
            (Idx::I16, TypeData::Int { bits: 16, signedness: Signed }),
            (Idx::U32, TypeData::Int { bits: 32, signedness: Unsigned }),
            (Idx::I32, TypeData::Int { bits: 32, signedness: Signed }),
            (Idx::U64, TypeData::Int { bits: 64, signedness: Unsigned }),
            (Idx::I64, TypeData::Int { bits: 64, signedness: Signed }),
            (Idx::U128, TypeData::Int { bits: 128, signedness: Unsigned }),
            (Idx::I128, TypeData::Int { bits: 128, signedness: Signed }),
            (Idx::F16, TypeData::Float { bits: 16 }),
            (Idx::F32, TypeData::Float { bits: 32 }),
            (Idx::F64, TypeData::Float { bits: 64 }),
            (Idx::F80, TypeData::Float { bits: 80 }),
            (Idx::F128, TypeData::Float { bits: 128 }),
            (Idx::ANYERROR, TypeData::ErrorSet(ErrorSet::Global)),
            (Idx::COMPTIME_INT, TypeData::Comptime),
        ];
        for (expected, data) in primitives {
            let idx = pool.intern(data);
            debug_assert_eq!(idx, expected, "primitive pre-interned out of order");
        }
        debug_assert_eq!(pool.items.len(), Idx::FIRST_DYNAMIC as usize);
        pool
    }

    /// Look up a type.
    ///
    /// `idx` must have been produced by this pool.
    #[inline]
    pub fn get(&self, idx: Idx) -> &TypeData {
        &self.items[idx.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The function type behind `idx`, if it is one.
    pub fn fn_type(&self, idx: Idx) -> Option<&FnType> {
        match self.get(idx) {
            TypeData::Function(f) => Some(f),
            _ => None,
        }
    }

    fn push(&mut self, data: TypeData) -> Idx {
        let idx = Idx::from_raw(self.items.len() as u32);
        self.items.push(data);
        idx
    }

    /// Intern a structural type.
    pub(crate) fn intern(&mut self, data: TypeData) -> Idx {
        debug_assert!(!data.is_nominal(), "nominal {} interned", data.kind_name());
        if let Some(&idx) = self.interned.get(&data) {
            return idx;
        }
        let idx = self.push(data.clone());
        self.interned.insert(data, idx);
        idx
    }

    /// Allocate a fresh identity for a nominal type.
    pub(crate) fn push_nominal(&mut self, data: TypeData) -> Idx {
        debug_assert!(data.is_nominal());
        let idx = self.push(data);
        tracing::trace!(?idx, kind = self.get(idx).kind_name(), "nominal type declared");
        idx
    }

    /// Fill in the fields of a struct created by [`Pool::declare_struct`].
    ///
    /// Fields are defined exactly once.
    pub fn define_struct(&mut self, idx: Idx, fields: Vec<StructField>) {
        debug_assert!(
            matches!(self.get(idx), TypeData::Struct(s) if s.fields.is_empty()),
            "define_struct on {idx:?} that is not an undefined struct"
        );
        if let TypeData::Struct(s) = &mut self.items[idx.index()] {
            s.fields = fields;
        }
    }

    /// Fill in the fields of a union created by [`Pool::declare_union`].
    pub fn define_union(&mut self, idx: Idx, fields: Vec<UnionField>) {
        debug_assert!(
            matches!(self.get(idx), TypeData::Union(u) if u.fields.is_empty()),
            "define_union on {idx:?} that is not an undefined union"
        );
        if let TypeData::Union(u) = &mut self.items[idx.index()] {
            u.fields = fields;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap known-good triples")]
mod tests;
