//! Source types for the kiln backend.
//!
//! The lowering engine consumes types through this crate only:
//! - [`Idx`]: stable identity of a source type
//! - [`Pool`]: interned storage, constructors and lookup
//! - [`TypeData`]: the kind-tagged descriptor of one type
//! - the frontend's independent ABI size/alignment (`Pool::abi_layout`)

mod data;
mod idx;
mod layout;
mod pool;

pub use data::{
    CallConv, ContainerLayout, ErrorSet, FnType, PointerType, PtrFlags, PtrSize, Signedness,
    StructField, StructType, TupleField, TypeData, UnionField, UnionType,
};
pub use idx::Idx;
pub use layout::{
    align_forward, compose, error_code_layout, error_set_has_bits, int_layout, ErrorUnionRepr,
    OptionalRepr, TypeLayout, ERROR_CODE_BITS,
};
pub use pool::Pool;
