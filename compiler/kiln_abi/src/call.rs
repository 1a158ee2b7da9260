//! Machine-level call signatures.
//!
//! [`CallShape`] is a function type after classification: the flat list of
//! machine parameters (hidden pointers first), the machine return type, and
//! the attributes of each.

use kiln_types::{CallConv, FnType, Idx, TypeData};

use crate::attrs::{self, AttrSet};
use crate::classify::{self, AbiSlot, ParamClass, ReturnClass};
use crate::lower::TypeLowering;
use crate::ty::LlTy;
use crate::LowerError;

/// Where a machine parameter comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamOrigin {
    /// The hidden `sret` pointer.
    ReturnPointer,
    /// The hidden error return trace pointer.
    ErrorTrace,
    /// Part `part` of source parameter `index`.
    Source { index: u32, part: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MachineParam {
    pub ty: LlTy,
    pub origin: ParamOrigin,
    pub attrs: AttrSet,
}

/// A classified function signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallShape {
    pub cc: CallConv,
    pub params: Vec<MachineParam>,
    pub ret: LlTy,
    pub ret_attrs: AttrSet,
    pub sret: bool,
    /// One entry per source parameter.
    pub param_classes: Vec<ParamClass>,
    pub return_class: ReturnClass,
    pub varargs: bool,
}

impl CallShape {
    /// Machine parameters that carry source parameter `index`.
    pub fn source_params(&self, index: u32) -> impl Iterator<Item = &MachineParam> {
        self.params
            .iter()
            .filter(move |p| matches!(p.origin, ParamOrigin::Source { index: i, .. } if i == index))
    }
}

impl TypeLowering<'_> {
    pub fn classify_param(&self, cc: CallConv, ty: Idx) -> Result<ParamClass, LowerError> {
        classify::classify_param(&self.abi_cx(), cc, self.c_abi(), ty)
    }

    pub fn classify_return(&self, cc: CallConv, ty: Idx) -> Result<ReturnClass, LowerError> {
        classify::classify_return(&self.abi_cx(), cc, self.c_abi(), ty)
    }

    /// Classify `f` and build its machine signature.
    #[tracing::instrument(level = "trace", skip_all, fields(cc = ?f.cc, params = f.params.len()))]
    pub fn classify_call(&mut self, f: &FnType) -> Result<CallShape, LowerError> {
        let pool = self.pool();
        let target = self.target();
        let return_class = self.classify_return(f.cc, f.ret)?;
        let mut params = Vec::new();

        let (ret, ret_attrs) = match &return_class {
            ReturnClass::NoBits => (self.table_mut().void()?, AttrSet::NONE),
            ReturnClass::ErrorCode => (self.error_code()?, AttrSet::NONE),
            ReturnClass::ByValue => (
                self.lower(f.ret)?,
                attrs::return_value(pool, target, f.cc, f.ret),
            ),
            ReturnClass::Sret => {
                let pointee = self.lower(f.ret)?;
                let ptr = self.table_mut().ptr(0)?;
                params.try_reserve(1)?;
                params.push(MachineParam {
                    ty: ptr,
                    origin: ParamOrigin::ReturnPointer,
                    attrs: attrs::sret(pool.abi_layout(f.ret, target), pointee),
                });
                // Internal error-returning functions still hand back the
                // error code so they coerce to a plain `anyerror` return.
                let ret = if f.cc == CallConv::Auto && pool.is_error_type(f.ret) {
                    self.error_code()?
                } else {
                    self.table_mut().void()?
                };
                (ret, AttrSet::NONE)
            }
            ReturnClass::AbiSizedInt => (self.abi_sized_int(f.ret)?, AttrSet::NONE),
            ReturnClass::Split(slots) if slots.len() == 1 => {
                (self.lower_slot(slots[0])?, AttrSet::NONE)
            }
            ReturnClass::Split(slots) => {
                let mut fields = Vec::new();
                fields.try_reserve(slots.len())?;
                for &slot in slots {
                    fields.push(self.lower_slot(slot)?);
                }
                (self.table_mut().anon_struct(fields, false)?, AttrSet::NONE)
            }
            ReturnClass::Widened(slot) => (self.lower_slot(*slot)?, AttrSet::NONE),
            ReturnClass::PackedArray { elem, count } => {
                (self.float_array(*elem, *count)?, AttrSet::NONE)
            }
        };

        if self.config().error_tracing && f.cc == CallConv::Auto && pool.is_error_type(f.ret) {
            let ptr = self.table_mut().ptr(0)?;
            params.try_reserve(1)?;
            params.push(MachineParam {
                ty: ptr,
                origin: ParamOrigin::ErrorTrace,
                attrs: AttrSet::with(attrs::ParamAttrs::NON_NULL),
            });
        }

        let mut param_classes = Vec::new();
        param_classes.try_reserve(f.params.len())?;
        for (i, &ty) in f.params.iter().enumerate() {
            let class = self.classify_param(f.cc, ty)?;
            self.push_machine_params(&mut params, f, i, ty, &class)?;
            param_classes.push(class);
        }

        let shape = CallShape {
            cc: f.cc,
            params,
            ret,
            ret_attrs,
            sret: return_class.is_sret(),
            param_classes,
            return_class,
            varargs: f.varargs,
        };
        tracing::trace!(
            ret = %self.display(shape.ret),
            machine_params = shape.params.len(),
            sret = shape.sret,
            "call shape"
        );
        Ok(shape)
    }

    /// Call shape of the function type `fn_idx`; `None` if it is not one.
    pub fn fn_shape(&mut self, fn_idx: Idx) -> Result<Option<CallShape>, LowerError> {
        let Some(f) = self.pool().fn_type(fn_idx) else {
            debug_assert!(false, "fn_shape on non-function type {fn_idx:?}");
            return Ok(None);
        };
        self.classify_call(f).map(Some)
    }

    fn push_machine_params(
        &mut self,
        params: &mut Vec<MachineParam>,
        f: &FnType,
        index: usize,
        ty: Idx,
        class: &ParamClass,
    ) -> Result<(), LowerError> {
        let pool = self.pool();
        let target = self.target();
        let noalias = f.param_is_noalias(index);
        let origin = |part: u32| ParamOrigin::Source {
            index: index as u32,
            part,
        };
        let mut push = |ty: LlTy, part: u32, attrs: AttrSet| -> Result<(), LowerError> {
            params.try_reserve(1)?;
            params.push(MachineParam {
                ty,
                origin: origin(part),
                attrs,
            });
            Ok(())
        };

        match class {
            ParamClass::NoBits => {}
            ParamClass::ByValue => {
                let ll = self.lower(ty)?;
                push(ll, 0, attrs::by_value(pool, target, f.cc, ty, noalias))?;
            }
            ParamClass::ByReference {
                mutable,
                caller_copy,
            } => {
                let pointee = self.lower(ty)?;
                let ptr = self.table_mut().ptr(0)?;
                let layout = pool.abi_layout(ty, target);
                push(ptr, 0, attrs::by_reference(layout, *mutable, *caller_copy, pointee))?;
            }
            ParamClass::AbiSizedInt => {
                let ll = self.abi_sized_int(ty)?;
                push(ll, 0, AttrSet::NONE)?;
            }
            ParamClass::Split(slots) => {
                for (part, &slot) in slots.iter().enumerate() {
                    let ll = self.lower_slot(slot)?;
                    let attrs = match slot {
                        AbiSlot::Source(src) => attrs::by_value(pool, target, f.cc, src, false),
                        _ => AttrSet::NONE,
                    };
                    push(ll, part as u32, attrs)?;
                }
            }
            ParamClass::Slice => {
                let slice = match pool.get(ty) {
                    TypeData::Optional { child } => *child,
                    _ => ty,
                };
                let addrspace = match pool.get(slice) {
                    TypeData::Pointer(p) => p.addrspace,
                    _ => 0,
                };
                let ptr = self.table_mut().ptr(addrspace)?;
                let len = self.table_mut().int(u32::from(target.ptr_bits()))?;
                push(ptr, 0, attrs::slice_pointer(pool, target, ty, noalias))?;
                push(len, 1, AttrSet::with(attrs::ParamAttrs::NO_UNDEF))?;
            }
            ParamClass::Widened(slot) => {
                let ll = self.lower_slot(*slot)?;
                push(ll, 0, AttrSet::NONE)?;
            }
            ParamClass::PackedArray { elem, count } => {
                let ll = self.float_array(*elem, *count)?;
                push(ll, 0, AttrSet::NONE)?;
            }
        }
        Ok(())
    }

    /// Lowered form of one classifier slot.
    pub fn lower_slot(&mut self, slot: AbiSlot) -> Result<LlTy, LowerError> {
        match slot {
            AbiSlot::Int(bits) => self.table_mut().int(bits),
            AbiSlot::Float(kind) => self.table_mut().float(kind),
            AbiSlot::FloatVector { len, elem } => {
                let elem = self.table_mut().float(elem)?;
                self.table_mut().vector(len, elem)
            }
            AbiSlot::IntVector { len, bits } => {
                let elem = self.table_mut().int(bits)?;
                self.table_mut().vector(len, elem)
            }
            AbiSlot::Source(ty) => self.lower(ty),
        }
    }

    fn abi_sized_int(&mut self, ty: Idx) -> Result<LlTy, LowerError> {
        let size = self.pool().abi_layout(ty, self.target()).size;
        self.table_mut().int((size * 8) as u32)
    }

    fn float_array(&mut self, elem: crate::ty::FloatKind, count: u32) -> Result<LlTy, LowerError> {
        let elem = self.table_mut().float(elem)?;
        self.table_mut().array(u64::from(count), elem)
    }

    fn error_code(&mut self) -> Result<LlTy, LowerError> {
        self.table_mut().int(u32::from(kiln_types::ERROR_CODE_BITS))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap known-good triples")]
mod tests;
