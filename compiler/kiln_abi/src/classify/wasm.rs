//! WebAssembly basic C ABI classification.
//!
//! Scalars pass directly. An aggregate whose only runtime member is itself
//! passable directly is passed as that member; every other aggregate goes
//! by reference.

use kiln_types::{ContainerLayout, Idx, TypeData};

use super::{AbiCx, AbiSlot, Classifier, ParamClass, ReturnClass};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Class {
    Direct(Idx),
    Indirect,
}

fn classify(cx: &AbiCx<'_>, ty: Idx) -> Class {
    kiln_stack::ensure_sufficient_stack(|| {
        if cx.is_scalar(ty) {
            return Class::Direct(ty);
        }
        let only_member = match cx.get(ty) {
            TypeData::Struct(s) if s.layout != ContainerLayout::Packed => {
                let mut runtime = s
                    .fields
                    .iter()
                    .filter(|f| !f.is_comptime && cx.pool.has_runtime_bits(f.ty));
                match (runtime.next(), runtime.next()) {
                    (Some(f), None) => Some(f.ty),
                    _ => None,
                }
            }
            TypeData::Tuple { fields } => {
                let mut runtime = fields
                    .iter()
                    .filter(|f| !f.is_comptime && cx.pool.has_runtime_bits(f.ty));
                match (runtime.next(), runtime.next()) {
                    (Some(f), None) => Some(f.ty),
                    _ => None,
                }
            }
            TypeData::Union(u) if !cx.pool.union_has_tag(u) => {
                let mut runtime = u.fields.iter().filter(|f| cx.pool.has_runtime_bits(f.ty));
                match (runtime.next(), runtime.next()) {
                    (Some(f), None) => Some(f.ty),
                    _ => None,
                }
            }
            _ => None,
        };
        match only_member {
            Some(member) if cx.size(member) == cx.size(ty) => classify(cx, member),
            _ => Class::Indirect,
        }
    })
}

/// WebAssembly `BasicCABI`.
#[derive(Copy, Clone, Debug, Default)]
pub struct Wasm;

impl Classifier for Wasm {
    fn name(&self) -> &'static str {
        "wasm-basic-c"
    }

    fn classify_param(&self, cx: &AbiCx<'_>, ty: Idx) -> ParamClass {
        match classify(cx, ty) {
            Class::Direct(inner) if inner == ty => ParamClass::ByValue,
            Class::Direct(inner) => ParamClass::Widened(AbiSlot::Source(inner)),
            Class::Indirect => ParamClass::ByReference {
                mutable: false,
                caller_copy: false,
            },
        }
    }

    fn classify_return(&self, cx: &AbiCx<'_>, ty: Idx) -> ReturnClass {
        match classify(cx, ty) {
            Class::Direct(inner) if inner == ty => ReturnClass::ByValue,
            Class::Direct(inner) => ReturnClass::Widened(AbiSlot::Source(inner)),
            Class::Indirect => ReturnClass::Sret,
        }
    }
}
