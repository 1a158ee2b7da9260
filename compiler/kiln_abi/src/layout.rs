//! Aggregate layout with explicit padding.
//!
//! Aggregates are emitted as non-packed machine structs whose padding is
//! spelled out as `[n x i8]` fields, so the byte offset of every source
//! field is fixed by this module rather than left to the backend. Fields
//! without runtime bits get an offset but no machine field.

use kiln_target::Target;
use kiln_types::{align_forward, Idx, TypeLayout};

use crate::ty::{LlTy, TypeTable};
use crate::LowerError;

/// Revision of the field ordering and padding rules below. Bump it whenever
/// a lowered aggregate could change shape.
pub const LAYOUT_VERSION: u32 = 1;

/// Placement of one source field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    /// Index of the machine field holding this value; `None` for zero-size
    /// fields.
    pub machine_index: Option<u32>,
    pub source_type: Idx,
    pub alignment: u64,
    pub byte_offset: u64,
}

/// How code generation reaches a source field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldAccess {
    /// Struct GEP to this machine field.
    Index(u32),
    /// Zero-size field inside the aggregate: base address plus this many
    /// bytes.
    ByteOffset(u64),
    /// Zero-size field at the very end: one element past the base.
    PastEnd,
}

/// Field placement of a lowered aggregate.
///
/// `fields` is indexed by source field for structs, tuples and unions (every
/// union member sits at the payload offset). Optionals and error unions list
/// the payload alone and keep the flag or error code in `tag`. Order in
/// `fields` is semantic; `machine_index` gives the physical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateLayout {
    pub machine_fields: Vec<LlTy>,
    pub fields: Vec<FieldLayout>,
    pub tag: Option<FieldLayout>,
    pub size: u64,
    pub align: u64,
}

impl AggregateLayout {
    pub fn field(&self, index: usize) -> Option<&FieldLayout> {
        self.fields.get(index)
    }

    pub fn field_access(&self, index: usize) -> Option<FieldAccess> {
        let field = self.fields.get(index)?;
        Some(match field.machine_index {
            Some(i) => FieldAccess::Index(i),
            None if field.byte_offset >= self.size => FieldAccess::PastEnd,
            None => FieldAccess::ByteOffset(field.byte_offset),
        })
    }
}

/// Places fields one after another at their natural alignment, inserting
/// explicit padding before each field and at the end.
#[derive(Debug, Default)]
pub struct StructLayoutBuilder {
    machine: Vec<LlTy>,
    offset: u64,
    align: u64,
}

impl StructLayoutBuilder {
    pub fn new() -> Self {
        Self {
            machine: Vec::new(),
            offset: 0,
            align: 1,
        }
    }

    /// Place one field. `ll` is `None` for a field without runtime bits.
    pub fn push(
        &mut self,
        table: &mut TypeTable,
        target: &Target,
        source: Idx,
        ll: Option<LlTy>,
    ) -> Result<FieldLayout, LowerError> {
        let layout = match ll {
            Some(ll) => table.layout_of(ll, target).unwrap_or_else(|| {
                tracing::error!(ty = %table.display(ll), "unsized type placed in an aggregate");
                debug_assert!(false, "unsized field {}", table.display(ll));
                TypeLayout::ZERO
            }),
            None => TypeLayout::ZERO,
        };

        let machine_index = match ll {
            Some(ll) if layout.size > 0 => {
                let start = align_forward(self.offset, layout.align);
                self.pad_to(table, start)?;
                self.machine.try_reserve(1)?;
                let index = self.machine.len() as u32;
                self.machine.push(ll);
                self.offset += layout.size;
                self.align = self.align.max(layout.align);
                Some(index)
            }
            _ => None,
        };

        let byte_offset = match machine_index {
            Some(_) => self.offset - layout.size,
            None => self.offset,
        };
        Ok(FieldLayout {
            machine_index,
            source_type: source,
            alignment: layout.align,
            byte_offset,
        })
    }

    fn pad_to(&mut self, table: &mut TypeTable, offset: u64) -> Result<(), LowerError> {
        if offset > self.offset {
            let pad = table.bytes(offset - self.offset)?;
            self.machine.try_reserve(1)?;
            self.machine.push(pad);
            self.offset = offset;
        }
        Ok(())
    }

    /// Add trailing padding and return `(machine fields, size, align)`.
    pub fn finish(mut self, table: &mut TypeTable) -> Result<(Vec<LlTy>, u64, u64), LowerError> {
        let size = align_forward(self.offset, self.align);
        self.pad_to(table, size)?;
        Ok((self.machine, size, self.align))
    }
}
