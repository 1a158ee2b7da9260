//! Target descriptors for the kiln backend.
//!
//! - [`Target`]: read-only facts about one compilation target
//! - [`data_layout`]: the target's canonical data layout string
//! - [`verify_data_layout`]: byte-for-byte cross-check against the layout the
//!   native backend reports (`strict-layout` builds and tests only)

mod data_layout;
mod error;
#[cfg(any(test, feature = "strict-layout"))]
mod reference;
mod target;
mod triple;

pub use data_layout::data_layout;
pub use error::TargetError;
#[cfg(any(test, feature = "strict-layout"))]
pub use reference::{reference_layout, verify_data_layout, REFERENCE_LAYOUTS};
pub use target::{
    AddressSpaceLayout, AlignSpec, Arch, CType, CTypeLayout, Endian, Env, Features, FnPtrAlign,
    ObjectFormat, Os, Target, DEFAULT_AGGREGATE_PREF_BITS, DEFAULT_FLOAT_ALIGNS,
    DEFAULT_INT_ALIGNS, DEFAULT_POINTER_BITS, DEFAULT_VECTOR_ALIGNS,
};
pub use triple::{TargetTripleComponents, SUPPORTED_TARGETS};
