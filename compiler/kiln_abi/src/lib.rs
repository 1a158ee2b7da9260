//! Type and ABI lowering for the kiln backend.
//!
//! Turns frontend source types into the backend's lowered types and decides
//! how values cross call boundaries on each supported target.
//!
//! # Key Types
//!
//! - [`TypeLowering`]: per-compilation-unit lowering cache
//! - [`TypeTable`]: arena of lowered types with once-settable named structs
//! - [`AggregateLayout`]: explicit-padding field layout of an aggregate
//! - [`Classifier`]: one C calling convention for one architecture family
//! - [`CallShape`]: a function type after classification
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=kiln_abi=debug`: placeholder creation and body resolution.
//! - `RUST_LOG=kiln_abi=trace`: per-field layout and every classification.
//! - `KILN_STRICT_LAYOUT=1`: compare every lowered layout with the
//!   frontend's (see [`LowerConfig::from_env`]).

mod attrs;
mod by_ref;
mod call;
pub mod classify;
mod config;
mod error;
mod layout;
mod lower;
mod ty;

use std::sync::Once;

pub use attrs::{AttrSet, ParamAttrs};
pub use by_ref::is_by_ref;
pub use call::{CallShape, MachineParam, ParamOrigin};
pub use classify::{select_c_abi, AbiSlot, Classifier, ParamClass, ReturnClass};
pub use config::LowerConfig;
pub use error::LowerError;
pub use layout::{AggregateLayout, FieldAccess, FieldLayout, StructLayoutBuilder, LAYOUT_VERSION};
pub use lower::TypeLowering;
pub use ty::{DisplayTy, FloatKind, LlTy, LoweredType, StructBody, StructBodyRef, TypeTable};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for lowering diagnostics.
///
/// Reads `RUST_LOG` for filtering. Does nothing when `RUST_LOG` is unset, and
/// only the first call has an effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
