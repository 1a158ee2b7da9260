//! Whether values of a type live in memory rather than in SSA registers.
//!
//! Code generation keeps by-reference values behind a pointer to a stack
//! slot, and the internal calling convention passes them by pointer.

use kiln_types::{ContainerLayout, Idx, OptionalRepr, Pool, TypeData};

/// Whether `idx` is handled by reference.
///
/// Any aggregate with at least one runtime field qualifies; scalars,
/// pointers, vectors and bit-packed containers never do.
pub fn is_by_ref(pool: &Pool, idx: Idx) -> bool {
    match pool.get(idx) {
        TypeData::Void
        | TypeData::NoReturn
        | TypeData::Comptime
        | TypeData::Bool
        | TypeData::Int { .. }
        | TypeData::Float { .. }
        | TypeData::Pointer(_)
        | TypeData::Vector { .. }
        | TypeData::ErrorSet(_)
        | TypeData::Enum { .. }
        | TypeData::Function(_)
        | TypeData::Opaque { .. } => false,
        TypeData::Array { .. } | TypeData::Tuple { .. } => pool.has_runtime_bits(idx),
        TypeData::Struct(s) => s.layout != ContainerLayout::Packed && pool.has_runtime_bits(idx),
        TypeData::Union(u) => u.layout != ContainerLayout::Packed && pool.has_runtime_bits(idx),
        TypeData::Optional { child } => match pool.optional_repr(*child) {
            OptionalRepr::FlagOnly => false,
            OptionalRepr::Payload => is_by_ref(pool, *child),
            OptionalRepr::PayloadAndFlag => true,
        },
        TypeData::ErrorUnion { error_set, payload } => {
            match (pool.has_runtime_bits(*error_set), pool.has_runtime_bits(*payload)) {
                (_, false) => false,
                (false, true) => is_by_ref(pool, *payload),
                (true, true) => true,
            }
        }
    }
}
