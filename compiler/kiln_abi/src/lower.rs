//! Type lowering cache.
//!
//! [`TypeLowering`] maps source types to lowered types, memoized by [`Idx`].
//! One instance lives for one compilation unit (or one parallel worker) and
//! is dropped at the end of code generation.
//!
//! Structs and unions use two-phase creation so self-referential type graphs
//! terminate:
//! 1. Declare an opaque named struct and register it in the cache
//! 2. Lower the field types (which may find the placeholder)
//! 3. Set the placeholder's body, exactly once
//!
//! Every aggregate body is produced by [`StructLayoutBuilder`], which spells
//! out all padding, so the lowered layout never depends on the backend's own
//! padding rules. With `strict_checks` on, every lowered type is compared
//! against the frontend's [`Pool::abi_layout`].

use std::cmp::Reverse;

use kiln_stack::ensure_sufficient_stack;
use kiln_target::Target;
use kiln_types::{
    ContainerLayout, ErrorUnionRepr, FnType, Idx, OptionalRepr, Pool, PtrSize, StructType,
    TypeData, TypeLayout, UnionType, ERROR_CODE_BITS,
};
use rustc_hash::FxHashMap;

use crate::classify::{select_c_abi, AbiCx, Classifier};
use crate::layout::{AggregateLayout, FieldAccess, FieldLayout, StructLayoutBuilder};
use crate::ty::{try_to_vec, DisplayTy, FloatKind, LlTy, StructBody, TypeTable};
use crate::{LowerConfig, LowerError};

/// Per-compilation-unit lowering state.
pub struct TypeLowering<'a> {
    pool: &'a Pool,
    target: &'a Target,
    config: LowerConfig,
    c_abi: &'static dyn Classifier,
    table: TypeTable,
    cache: FxHashMap<Idx, LlTy>,
    layouts: FxHashMap<Idx, AggregateLayout>,
}

impl<'a> TypeLowering<'a> {
    pub fn new(pool: &'a Pool, target: &'a Target, config: LowerConfig) -> Self {
        let c_abi = select_c_abi(target);
        tracing::debug!(triple = target.triple(), c_abi = c_abi.name(), ?config, "type lowering created");
        Self {
            pool,
            target,
            config,
            c_abi,
            table: TypeTable::new(),
            cache: FxHashMap::default(),
            layouts: FxHashMap::default(),
        }
    }

    pub fn pool(&self) -> &'a Pool {
        self.pool
    }

    pub fn target(&self) -> &'a Target {
        self.target
    }

    pub fn config(&self) -> LowerConfig {
        self.config
    }

    /// The target's default C convention.
    pub fn c_abi(&self) -> &'static dyn Classifier {
        self.c_abi
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    pub(crate) fn table_mut(&mut self) -> &mut TypeTable {
        &mut self.table
    }

    pub(crate) fn abi_cx(&self) -> AbiCx<'a> {
        AbiCx::new(self.pool, self.target)
    }

    pub fn display(&self, ll: LlTy) -> DisplayTy<'_> {
        self.table.display(ll)
    }

    /// Size and alignment of a lowered type, from the target's tables.
    pub fn layout_of(&self, ll: LlTy) -> Option<TypeLayout> {
        self.table.layout_of(ll, self.target)
    }

    /// Whether values of `idx` are handled through a pointer.
    pub fn is_by_ref(&self, idx: Idx) -> bool {
        crate::by_ref::is_by_ref(self.pool, idx)
    }

    /// Number of source types lowered so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    // -----------------------------------------------------------------------
    // Lowering
    // -----------------------------------------------------------------------

    /// Lower `idx`, reusing the cached result when there is one.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn lower(&mut self, idx: Idx) -> Result<LlTy, LowerError> {
        if let Some(&ll) = self.cache.get(&idx) {
            return Ok(ll);
        }
        ensure_sufficient_stack(|| self.lower_uncached(idx))
    }

    fn lower_uncached(&mut self, idx: Idx) -> Result<LlTy, LowerError> {
        let ll = self.lower_inner(idx)?;
        self.cache.try_reserve(1)?;
        self.cache.insert(idx, ll);
        if self.config.strict_checks {
            self.check_layout(idx, ll);
        }
        Ok(ll)
    }

    fn lower_inner(&mut self, idx: Idx) -> Result<LlTy, LowerError> {
        let pool = self.pool;
        let data = pool.get(idx);

        // Kinds that lower to something even without runtime bits.
        match data {
            TypeData::Function(f) => return self.lower_fn(f),
            TypeData::Opaque { name } => {
                tracing::debug!(%name, ?idx, "opaque type declared");
                return self.table.declare_named(name);
            }
            TypeData::Array {
                len,
                child,
                sentinel,
            } if !pool.has_runtime_bits(*child) && len + u64::from(*sentinel) > 0 => {
                return self.table.bytes(len + u64::from(*sentinel));
            }
            _ => {}
        }

        if !pool.has_runtime_bits(idx) {
            return self.table.void();
        }

        match data {
            TypeData::Void
            | TypeData::NoReturn
            | TypeData::Comptime
            | TypeData::Function(_)
            | TypeData::Opaque { .. } => self.table.void(),
            TypeData::Bool => self.table.int(1),
            TypeData::Int { bits, .. } => self.table.int(u32::from(*bits)),
            TypeData::Float { bits } => self.lower_float(*bits),
            TypeData::Pointer(p) if p.size == PtrSize::Slice => self.lower_slice(idx, p.addrspace),
            TypeData::Pointer(p) => self.table.ptr(p.addrspace),
            TypeData::Array {
                len,
                child,
                sentinel,
            } => {
                let elem = self.lower(*child)?;
                self.table.array(len + u64::from(*sentinel), elem)
            }
            TypeData::Vector { len, child } => {
                let elem = match pool.get(*child) {
                    TypeData::Bool => self.table.int(1)?,
                    _ => self.lower(*child)?,
                };
                self.table.vector(*len, elem)
            }
            TypeData::Optional { child } => self.lower_optional(idx, *child),
            TypeData::ErrorSet(_) => self.table.int(u32::from(ERROR_CODE_BITS)),
            TypeData::ErrorUnion { error_set, payload } => {
                self.lower_error_union(idx, *error_set, *payload)
            }
            TypeData::Enum { tag, .. } => self.lower(*tag),
            TypeData::Struct(s) if s.layout == ContainerLayout::Packed => self.lower_packed(idx),
            TypeData::Struct(s) => self.lower_struct(idx, s),
            TypeData::Tuple { fields } => {
                let fields = fields.iter().map(|f| (f.ty, f.is_comptime));
                let layout = self.layout_fields(fields)?;
                let ll = self.table.anon_struct(try_to_vec(&layout.machine_fields)?, false)?;
                self.record_layout(idx, layout)?;
                Ok(ll)
            }
            TypeData::Union(u) if u.layout == ContainerLayout::Packed => self.lower_packed(idx),
            TypeData::Union(u) => self.lower_union(idx, u),
        }
    }

    fn lower_float(&mut self, bits: u16) -> Result<LlTy, LowerError> {
        let kind = match bits {
            16 if !self.target.supports_f16() => return self.table.int(16),
            80 if !self.target.supports_f80() => return self.table.int(80),
            bits => FloatKind::from_bits(bits),
        };
        match kind {
            Some(kind) => self.table.float(kind),
            None => {
                debug_assert!(false, "no float format for f{bits}");
                self.table.int(u32::from(bits))
            }
        }
    }

    /// `{ptr, usize}`.
    fn lower_slice(&mut self, idx: Idx, addrspace: u32) -> Result<LlTy, LowerError> {
        let ptr = self.table.ptr(addrspace)?;
        let len = self.table.int(u32::from(self.target.ptr_bits()))?;
        let mut builder = StructLayoutBuilder::new();
        builder.push(&mut self.table, self.target, idx, Some(ptr))?;
        builder.push(&mut self.table, self.target, idx, Some(len))?;
        let (fields, _, _) = builder.finish(&mut self.table)?;
        self.table.anon_struct(fields, false)
    }

    fn lower_packed(&mut self, idx: Idx) -> Result<LlTy, LowerError> {
        let bits = self.pool.bit_size(idx, self.target);
        self.table.int(bits as u32)
    }

    fn lower_optional(&mut self, idx: Idx, child: Idx) -> Result<LlTy, LowerError> {
        match self.pool.optional_repr(child) {
            OptionalRepr::FlagOnly => self.table.int(8),
            OptionalRepr::Payload => self.lower(child),
            OptionalRepr::PayloadAndFlag => {
                let payload = self.lower(child)?;
                let flag = self.table.int(8)?;
                let mut builder = StructLayoutBuilder::new();
                let payload = builder.push(&mut self.table, self.target, child, Some(payload))?;
                let flag = builder.push(&mut self.table, self.target, Idx::U8, Some(flag))?;
                self.finish_anon(idx, builder, try_to_vec(&[payload])?, Some(flag))
            }
        }
    }

    fn lower_error_union(
        &mut self,
        idx: Idx,
        error_set: Idx,
        payload: Idx,
    ) -> Result<LlTy, LowerError> {
        let error_first = match self.pool.error_union_repr(error_set, payload, self.target) {
            ErrorUnionRepr::Empty => return self.table.void(),
            ErrorUnionRepr::PayloadOnly => return self.lower(payload),
            ErrorUnionRepr::ErrorOnly => return self.table.int(u32::from(ERROR_CODE_BITS)),
            ErrorUnionRepr::ErrorFirst => true,
            ErrorUnionRepr::PayloadFirst => false,
        };
        let code_ll = self.table.int(u32::from(ERROR_CODE_BITS))?;
        let payload_ll = self.lower(payload)?;

        let mut builder = StructLayoutBuilder::new();
        let (code, value) = if error_first {
            let code = builder.push(&mut self.table, self.target, error_set, Some(code_ll))?;
            let value = builder.push(&mut self.table, self.target, payload, Some(payload_ll))?;
            (code, value)
        } else {
            let value = builder.push(&mut self.table, self.target, payload, Some(payload_ll))?;
            let code = builder.push(&mut self.table, self.target, error_set, Some(code_ll))?;
            (code, value)
        };
        self.finish_anon(idx, builder, try_to_vec(&[value])?, Some(code))
    }

    fn finish_anon(
        &mut self,
        idx: Idx,
        builder: StructLayoutBuilder,
        fields: Vec<FieldLayout>,
        tag: Option<FieldLayout>,
    ) -> Result<LlTy, LowerError> {
        let (machine_fields, size, align) = builder.finish(&mut self.table)?;
        let ll = self.table.anon_struct(try_to_vec(&machine_fields)?, false)?;
        self.record_layout(
            idx,
            AggregateLayout {
                machine_fields,
                fields,
                tag,
                size,
                align,
            },
        )?;
        Ok(ll)
    }

    fn lower_struct(&mut self, idx: Idx, s: &'a StructType) -> Result<LlTy, LowerError> {
        let named = self.declare_placeholder(idx, &s.name)?;
        let fields = s.fields.iter().map(|f| (f.ty, f.is_comptime));
        let layout = self.layout_fields(fields)?;
        self.resolve_placeholder(idx, named, layout)?;
        Ok(named)
    }

    /// Sequential layout of `(type, is_comptime)` fields.
    fn layout_fields(
        &mut self,
        fields: impl Iterator<Item = (Idx, bool)>,
    ) -> Result<AggregateLayout, LowerError> {
        let mut builder = StructLayoutBuilder::new();
        let mut out = Vec::new();
        for (ty, is_comptime) in fields {
            let ll = if !is_comptime && self.pool.has_runtime_bits(ty) {
                Some(self.lower(ty)?)
            } else {
                None
            };
            let field = builder.push(&mut self.table, self.target, ty, ll)?;
            tracing::trace!(?ty, offset = field.byte_offset, index = ?field.machine_index, "field");
            out.try_reserve(1)?;
            out.push(field);
        }
        let (machine_fields, size, align) = builder.finish(&mut self.table)?;
        Ok(AggregateLayout {
            machine_fields,
            fields: out,
            tag: None,
            size,
            align,
        })
    }

    /// Union layout: one payload slot holding the most-aligned member, padded
    /// out to the payload size, and the tag on whichever side has the larger
    /// alignment.
    fn lower_union(&mut self, idx: Idx, u: &'a UnionType) -> Result<LlTy, LowerError> {
        let named = self.declare_placeholder(idx, &u.name)?;
        let pool = self.pool;
        let target = self.target;
        let payload_layout = pool.union_payload_layout(u, target);

        let widest = u
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| pool.has_runtime_bits(f.ty))
            .max_by_key(|(i, f)| {
                let l = pool.abi_layout(f.ty, target);
                (l.align, l.size, Reverse(*i))
            })
            .map(|(i, f)| (i, f.ty));

        // (member index, lowered payload, member is the payload slot itself)
        let payload = match widest {
            Some((i, ty)) => {
                let ll = self.lower(ty)?;
                let size = pool.abi_layout(ty, target).size;
                if size < payload_layout.size {
                    let pad = self.table.bytes(payload_layout.size - size)?;
                    let padded = try_to_vec(&[ll, pad])?;
                    Some((i, ty, self.table.anon_struct(padded, false)?, false))
                } else {
                    Some((i, ty, ll, true))
                }
            }
            None => None,
        };

        let tag = match u.tag {
            Some(tag) if pool.union_has_tag(u) => Some((tag, self.lower(tag)?)),
            _ => None,
        };
        let tag_first = tag.is_some_and(|(tag, _)| {
            pool.abi_layout(tag, target).align >= payload_layout.align
        });

        let mut builder = StructLayoutBuilder::new();
        let mut tag_field = None;
        if tag_first {
            if let Some((tag, ll)) = tag {
                tag_field = Some(builder.push(&mut self.table, target, tag, Some(ll))?);
            }
        }
        let slot = match payload {
            Some((_, ty, ll, _)) => Some(builder.push(&mut self.table, target, ty, Some(ll))?),
            None => None,
        };
        if !tag_first {
            if let Some((tag, ll)) = tag {
                tag_field = Some(builder.push(&mut self.table, target, tag, Some(ll))?);
            }
        }
        let (machine_fields, size, align) = builder.finish(&mut self.table)?;

        let payload_offset = slot.map_or(0, |s| s.byte_offset);
        let mut fields = Vec::new();
        fields.try_reserve(u.fields.len())?;
        for (i, f) in u.fields.iter().enumerate() {
            let machine_index = match (payload, slot) {
                (Some((widest, _, _, true)), Some(slot)) if widest == i => slot.machine_index,
                _ => None,
            };
            fields.push(FieldLayout {
                machine_index,
                source_type: f.ty,
                alignment: pool.abi_layout(f.ty, target).align,
                byte_offset: payload_offset,
            });
        }

        let layout = AggregateLayout {
            machine_fields,
            fields,
            tag: tag_field,
            size,
            align,
        };
        self.resolve_placeholder(idx, named, layout)?;
        Ok(named)
    }

    fn declare_placeholder(&mut self, idx: Idx, name: &str) -> Result<LlTy, LowerError> {
        let named = self.table.declare_named(name)?;
        self.cache.try_reserve(1)?;
        self.cache.insert(idx, named);
        tracing::debug!(%name, ?idx, "aggregate placeholder registered");
        Ok(named)
    }

    fn resolve_placeholder(
        &mut self,
        idx: Idx,
        named: LlTy,
        layout: AggregateLayout,
    ) -> Result<(), LowerError> {
        self.table.set_body(
            named,
            StructBody {
                packed: false,
                fields: try_to_vec(&layout.machine_fields)?,
            },
        );
        tracing::debug!(ty = %self.table.display(named), size = layout.size, "aggregate body set");
        self.record_layout(idx, layout)
    }

    fn record_layout(&mut self, idx: Idx, layout: AggregateLayout) -> Result<(), LowerError> {
        self.layouts.try_reserve(1)?;
        self.layouts.insert(idx, layout);
        Ok(())
    }

    fn lower_fn(&mut self, f: &FnType) -> Result<LlTy, LowerError> {
        let shape = self.classify_call(f)?;
        let mut params = Vec::new();
        params.try_reserve_exact(shape.params.len())?;
        params.extend(shape.params.iter().map(|p| p.ty));
        self.table.function(shape.ret, params, shape.varargs)
    }

    fn check_layout(&self, idx: Idx, ll: LlTy) {
        if !self.pool.has_runtime_bits(idx) {
            return;
        }
        let expected = self.pool.abi_layout(idx, self.target);
        let actual = self.table.layout_of(ll, self.target);
        if actual != Some(expected) {
            tracing::error!(
                ?idx,
                ty = %self.table.display(ll),
                ?expected,
                ?actual,
                "lowered layout disagrees with source layout"
            );
            debug_assert!(
                false,
                "layout mismatch for {idx:?} lowered as {}: expected {expected:?}, got {actual:?}",
                self.table.display(ll)
            );
        }
    }

    // -----------------------------------------------------------------------
    // Field access
    // -----------------------------------------------------------------------

    /// Field layout of an aggregate lowered through [`StructLayoutBuilder`].
    ///
    /// `None` for types that are not stored as a padded struct (scalars,
    /// packed containers, collapsed optionals and error unions).
    pub fn aggregate_layout(&mut self, idx: Idx) -> Result<Option<&AggregateLayout>, LowerError> {
        self.lower(idx)?;
        Ok(self.layouts.get(&idx))
    }

    /// How code generation reaches source field `field` of `idx`.
    pub fn field_access(&mut self, idx: Idx, field: usize) -> Result<Option<FieldAccess>, LowerError> {
        Ok(self
            .aggregate_layout(idx)?
            .and_then(|layout| layout.field_access(field)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap known-good triples")]
mod tests;
