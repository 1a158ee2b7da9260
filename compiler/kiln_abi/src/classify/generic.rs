//! Fallback for targets without a dedicated C classifier.

use kiln_types::Idx;

use super::{AbiCx, Classifier, ParamClass, ReturnClass};

/// Passes every value as its own lowered type and lets the backend apply
/// the platform rules.
#[derive(Copy, Clone, Debug, Default)]
pub struct Generic;

impl Classifier for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        tracing::trace!(triple = cx.target.triple(), ?ty, "generic by-value parameter");
        ParamClass::ByValue
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        tracing::trace!(triple = cx.target.triple(), ?ty, "generic by-value return");
        ReturnClass::ByValue
    }
}
