//! Lowered machine-level types.
//!
//! [`TypeTable`] is an append-only arena of [`LoweredType`]s addressed by
//! [`LlTy`]. Structural types are interned, so two requests for the same
//! shape return the same handle. Named structs are the exception: every
//! [`TypeTable::declare_named`] call creates a fresh identity whose body is
//! filled in later, exactly once. That split is what lets a struct refer to
//! itself through a pointer while it is still being lowered.

use std::cell::OnceCell;
use std::fmt::{self, Write as _};

use kiln_stack::ensure_sufficient_stack;
use kiln_target::Target;
use kiln_types::{align_forward, TypeLayout};
use rustc_hash::FxHashMap;

use crate::LowerError;

/// Handle to a lowered type in a [`TypeTable`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct LlTy(u32);

impl LlTy {
    pub const fn raw(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Machine floating-point formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum FloatKind {
    Half,
    Float,
    Double,
    /// x87 80-bit extended precision.
    X86Fp80,
    Fp128,
}

impl FloatKind {
    pub fn bits(self) -> u32 {
        match self {
            Self::Half => 16,
            Self::Float => 32,
            Self::Double => 64,
            Self::X86Fp80 => 80,
            Self::Fp128 => 128,
        }
    }

    /// Float format of a `bits`-wide source float, if the backend has one.
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits {
            16 => Some(Self::Half),
            32 => Some(Self::Float),
            64 => Some(Self::Double),
            80 => Some(Self::X86Fp80),
            128 => Some(Self::Fp128),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
            Self::X86Fp80 => "x86_fp80",
            Self::Fp128 => "fp128",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum LoweredType {
    Void,
    Int(u32),
    Float(FloatKind),
    /// Opaque pointer in an address space.
    Ptr(u32),
    Array {
        len: u64,
        elem: LlTy,
    },
    Vector {
        len: u32,
        elem: LlTy,
    },
    /// Anonymous struct.
    Struct {
        packed: bool,
        fields: Vec<LlTy>,
    },
    /// Named struct; index into the table's named entries.
    Named(u32),
    Function {
        ret: LlTy,
        params: Vec<LlTy>,
        varargs: bool,
    },
}

/// Field list of a struct, named or anonymous.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructBody {
    pub packed: bool,
    pub fields: Vec<LlTy>,
}

#[derive(Debug)]
struct NamedStruct {
    name: String,
    body: OnceCell<StructBody>,
}

/// Arena of lowered types.
#[derive(Debug, Default)]
pub struct TypeTable {
    types: Vec<LoweredType>,
    interned: FxHashMap<LoweredType, LlTy>,
    named: Vec<NamedStruct>,
    /// Number of named structs created per source name, for uniquing.
    name_uses: FxHashMap<String, u32>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, ll: LlTy) -> &LoweredType {
        &self.types[ll.index()]
    }

    fn push(&mut self, ty: LoweredType) -> Result<LlTy, LowerError> {
        self.types.try_reserve(1)?;
        let ll = LlTy(self.types.len() as u32);
        self.types.push(ty);
        Ok(ll)
    }

    fn intern(&mut self, ty: LoweredType) -> Result<LlTy, LowerError> {
        if let Some(&ll) = self.interned.get(&ty) {
            return Ok(ll);
        }
        self.interned.try_reserve(1)?;
        let ll = self.push(ty.clone())?;
        self.interned.insert(ty, ll);
        Ok(ll)
    }

    // -- Constructors --

    pub fn void(&mut self) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Void)
    }

    pub fn int(&mut self, bits: u32) -> Result<LlTy, LowerError> {
        debug_assert!(bits > 0, "zero-width integers are lowered to void");
        self.intern(LoweredType::Int(bits))
    }

    pub fn float(&mut self, kind: FloatKind) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Float(kind))
    }

    pub fn ptr(&mut self, addrspace: u32) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Ptr(addrspace))
    }

    pub fn array(&mut self, len: u64, elem: LlTy) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Array { len, elem })
    }

    pub fn vector(&mut self, len: u32, elem: LlTy) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Vector { len, elem })
    }

    /// `[len x i8]`, the filler used for explicit padding.
    pub fn bytes(&mut self, len: u64) -> Result<LlTy, LowerError> {
        let byte = self.int(8)?;
        self.array(len, byte)
    }

    pub fn anon_struct(&mut self, fields: Vec<LlTy>, packed: bool) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Struct { packed, fields })
    }

    pub fn function(
        &mut self,
        ret: LlTy,
        params: Vec<LlTy>,
        varargs: bool,
    ) -> Result<LlTy, LowerError> {
        self.intern(LoweredType::Function {
            ret,
            params,
            varargs,
        })
    }

    /// Create a named struct with no body yet.
    ///
    /// Until [`set_body`](Self::set_body) is called the struct is opaque.
    pub fn declare_named(&mut self, name: &str) -> Result<LlTy, LowerError> {
        self.named.try_reserve(1)?;
        self.name_uses.try_reserve(1)?;
        let uses = self.name_uses.get(name).copied().unwrap_or(0);

        // Room for `.` and a u32 suffix.
        let mut unique = String::new();
        unique.try_reserve_exact(name.len() + 11)?;
        unique.push_str(name);
        if uses > 0 {
            let _ = write!(unique, ".{uses}");
        }
        match self.name_uses.get_mut(name) {
            Some(n) => *n += 1,
            None => {
                let mut key = String::new();
                key.try_reserve_exact(name.len())?;
                key.push_str(name);
                self.name_uses.insert(key, 1);
            }
        }

        let id = self.named.len() as u32;
        self.named.push(NamedStruct {
            name: unique,
            body: OnceCell::new(),
        });
        self.push(LoweredType::Named(id))
    }

    /// Resolve a named struct's body. Each named struct is resolved once.
    pub fn set_body(&mut self, named: LlTy, body: StructBody) {
        let LoweredType::Named(id) = self.types[named.index()] else {
            debug_assert!(false, "set_body on non-named type {named:?}");
            return;
        };
        let entry = &self.named[id as usize];
        if entry.body.set(body).is_err() {
            tracing::error!(name = %entry.name, "named struct resolved twice");
            debug_assert!(false, "named struct `{}` resolved twice", entry.name);
        }
    }

    // -- Queries --

    /// Name of a named struct.
    pub fn name(&self, ll: LlTy) -> Option<&str> {
        match self.get(ll) {
            LoweredType::Named(id) => Some(&self.named[*id as usize].name),
            _ => None,
        }
    }

    /// Body of a struct type. `None` for non-structs and unresolved named
    /// structs.
    pub fn struct_body(&self, ll: LlTy) -> Option<StructBodyRef<'_>> {
        match self.get(ll) {
            LoweredType::Struct { packed, fields } => Some(StructBodyRef {
                packed: *packed,
                fields,
            }),
            LoweredType::Named(id) => {
                self.named[*id as usize]
                    .body
                    .get()
                    .map(|b| StructBodyRef {
                        packed: b.packed,
                        fields: &b.fields,
                    })
            }
            _ => None,
        }
    }

    /// Whether `ll` is a named struct whose body has not been set.
    pub fn is_opaque(&self, ll: LlTy) -> bool {
        matches!(self.get(ll), LoweredType::Named(id) if self.named[*id as usize].body.get().is_none())
    }

    /// Width in bits of a scalar or vector element.
    fn scalar_bits(&self, ll: LlTy, target: &Target) -> Option<u64> {
        match self.get(ll) {
            LoweredType::Int(bits) => Some(u64::from(*bits)),
            LoweredType::Float(kind) => Some(u64::from(kind.bits())),
            LoweredType::Ptr(space) => Some(u64::from(target.pointer_layout(*space).size_bits)),
            _ => None,
        }
    }

    /// Size and ABI alignment the backend gives `ll` under `target`'s data
    /// layout. `None` for unsized types (void, functions, opaque structs).
    pub fn layout_of(&self, ll: LlTy, target: &Target) -> Option<TypeLayout> {
        ensure_sufficient_stack(|| match self.get(ll) {
            LoweredType::Void | LoweredType::Function { .. } => None,
            LoweredType::Int(bits) => {
                let align = target.int_align(*bits);
                Some(TypeLayout::new(
                    align_forward(u64::from(*bits).div_ceil(8), align),
                    align,
                ))
            }
            LoweredType::Float(kind) => {
                let align = target.float_align(kind.bits());
                let store = match kind {
                    FloatKind::X86Fp80 => 10,
                    other => u64::from(other.bits()) / 8,
                };
                Some(TypeLayout::new(align_forward(store, align), align))
            }
            LoweredType::Ptr(space) => {
                let p = target.pointer_layout(*space);
                Some(TypeLayout::new(p.size_bytes(), p.align_bytes()))
            }
            LoweredType::Array { len, elem } => {
                let elem = self.layout_of(*elem, target)?;
                Some(TypeLayout::new(len.saturating_mul(elem.size), elem.align))
            }
            LoweredType::Vector { len, elem } => {
                let bits = u64::from(*len) * self.scalar_bits(*elem, target)?;
                let align = target.vector_align(bits);
                Some(TypeLayout::new(align_forward(bits.div_ceil(8), align), align))
            }
            LoweredType::Struct { packed, fields } => self.struct_layout(fields, *packed, target),
            LoweredType::Named(id) => {
                let body = self.named[*id as usize].body.get()?;
                self.struct_layout(&body.fields, body.packed, target)
            }
        })
    }

    fn struct_layout(&self, fields: &[LlTy], packed: bool, target: &Target) -> Option<TypeLayout> {
        let mut offset = 0;
        let mut align = 1;
        for &field in fields {
            let l = self.layout_of(field, target)?;
            if !packed {
                offset = align_forward(offset, l.align);
                align = align.max(l.align);
            }
            offset += l.size;
        }
        Some(TypeLayout::new(align_forward(offset, align), align))
    }

    /// Render `ll` in the backend's textual type syntax.
    pub fn display(&self, ll: LlTy) -> DisplayTy<'_> {
        DisplayTy { table: self, ll }
    }
}

/// Borrowed view of a struct body.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StructBodyRef<'t> {
    pub packed: bool,
    pub fields: &'t [LlTy],
}

pub struct DisplayTy<'t> {
    table: &'t TypeTable,
    ll: LlTy,
}

impl DisplayTy<'_> {
    fn with(&self, ll: LlTy) -> Self {
        Self {
            table: self.table,
            ll,
        }
    }

    fn list(&self, f: &mut fmt::Formatter<'_>, items: &[LlTy]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", self.with(*item))?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayTy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.table.get(self.ll) {
            LoweredType::Void => f.write_str("void"),
            LoweredType::Int(bits) => write!(f, "i{bits}"),
            LoweredType::Float(kind) => f.write_str(kind.name()),
            LoweredType::Ptr(0) => f.write_str("ptr"),
            LoweredType::Ptr(space) => write!(f, "ptr addrspace({space})"),
            LoweredType::Array { len, elem } => write!(f, "[{len} x {}]", self.with(*elem)),
            LoweredType::Vector { len, elem } => write!(f, "<{len} x {}>", self.with(*elem)),
            LoweredType::Struct { packed, fields } => {
                if fields.is_empty() {
                    return f.write_str(if *packed { "<{}>" } else { "{}" });
                }
                f.write_str(if *packed { "<{ " } else { "{ " })?;
                self.list(f, fields)?;
                f.write_str(if *packed { " }>" } else { " }" })
            }
            LoweredType::Named(id) => write!(f, "%{}", self.table.named[*id as usize].name),
            LoweredType::Function {
                ret,
                params,
                varargs,
            } => {
                write!(f, "{} (", self.with(*ret))?;
                self.list(f, params)?;
                if *varargs {
                    f.write_str(if params.is_empty() { "..." } else { ", ..." })?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Copy `items` into a new vector, reporting allocation failure.
pub(crate) fn try_to_vec<T: Copy>(items: &[T]) -> Result<Vec<T>, LowerError> {
    let mut out = Vec::new();
    out.try_reserve_exact(items.len())?;
    out.extend_from_slice(items);
    Ok(out)
}
