//! Type construction helpers for the Pool.

use crate::data::{
    CallConv, ContainerLayout, ErrorSet, FnType, PointerType, PtrFlags, PtrSize, Signedness,
    StructField, StructType, TupleField, TypeData, UnionField, UnionType,
};
use crate::{Idx, Pool};

impl Pool {
    // === Scalars ===

    pub fn int(&mut self, bits: u16, signedness: Signedness) -> Idx {
        self.intern(TypeData::Int { bits, signedness })
    }

    pub fn float(&mut self, bits: u16) -> Idx {
        self.intern(TypeData::Float { bits })
    }

    // === Pointers ===

    pub fn pointer_type(&mut self, ptr: PointerType) -> Idx {
        self.intern(TypeData::Pointer(ptr))
    }

    fn ptr(&mut self, child: Idx, size: PtrSize, flags: PtrFlags) -> Idx {
        self.pointer_type(PointerType {
            child,
            size,
            addrspace: 0,
            flags,
        })
    }

    /// `*T`
    pub fn pointer(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::One, PtrFlags::empty())
    }

    /// `*const T`
    pub fn const_pointer(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::One, PtrFlags::CONST)
    }

    /// `[*]T`
    pub fn many_pointer(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::Many, PtrFlags::empty())
    }

    /// `[*c]T`
    pub fn c_pointer(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::C, PtrFlags::empty())
    }

    /// `[]T`
    pub fn slice(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::Slice, PtrFlags::empty())
    }

    /// `[]const T`
    pub fn const_slice(&mut self, child: Idx) -> Idx {
        self.ptr(child, PtrSize::Slice, PtrFlags::CONST)
    }

    // === Sequences ===

    /// `[len]T`
    pub fn array(&mut self, len: u64, child: Idx) -> Idx {
        self.intern(TypeData::Array {
            len,
            child,
            sentinel: false,
        })
    }

    /// `[len:s]T`: one extra element slot holds the sentinel.
    pub fn array_sentinel(&mut self, len: u64, child: Idx) -> Idx {
        self.intern(TypeData::Array {
            len,
            child,
            sentinel: true,
        })
    }

    /// `@Vector(len, T)`
    pub fn vector(&mut self, len: u32, child: Idx) -> Idx {
        self.intern(TypeData::Vector { len, child })
    }

    // === Optionals and errors ===

    /// `?T`
    pub fn optional(&mut self, child: Idx) -> Idx {
        self.intern(TypeData::Optional { child })
    }

    /// `error{A, B, ...}`; names are order-insensitive.
    pub fn error_set(&mut self, names: &[&str]) -> Idx {
        let mut names: Vec<String> = names.iter().map(|n| (*n).to_string()).collect();
        names.sort();
        names.dedup();
        self.intern(TypeData::ErrorSet(ErrorSet::Named(names)))
    }

    /// `E!T`
    pub fn error_union(&mut self, error_set: Idx, payload: Idx) -> Idx {
        self.intern(TypeData::ErrorUnion { error_set, payload })
    }

    // === Aggregates ===

    /// Anonymous struct of runtime fields.
    pub fn tuple(&mut self, fields: &[Idx]) -> Idx {
        let fields = fields
            .iter()
            .map(|&ty| TupleField {
                ty,
                is_comptime: false,
            })
            .collect();
        self.intern(TypeData::Tuple { fields })
    }

    pub fn tuple_with(&mut self, fields: Vec<TupleField>) -> Idx {
        self.intern(TypeData::Tuple { fields })
    }

    /// Declare a struct whose fields are defined later by
    /// [`Pool::define_struct`].
    pub fn declare_struct(&mut self, name: &str, layout: ContainerLayout) -> Idx {
        self.push_nominal(TypeData::Struct(StructType {
            name: name.to_string(),
            layout,
            fields: Vec::new(),
        }))
    }

    /// Declare and define a struct in one step.
    pub fn struct_type(&mut self, name: &str, layout: ContainerLayout, fields: &[(&str, Idx)]) -> Idx {
        let idx = self.declare_struct(name, layout);
        let fields = fields
            .iter()
            .map(|&(name, ty)| StructField {
                name: name.to_string(),
                ty,
                is_comptime: false,
            })
            .collect();
        self.define_struct(idx, fields);
        idx
    }

    /// Declare a union whose fields are defined later by
    /// [`Pool::define_union`].
    pub fn declare_union(&mut self, name: &str, layout: ContainerLayout, tag: Option<Idx>) -> Idx {
        self.push_nominal(TypeData::Union(UnionType {
            name: name.to_string(),
            layout,
            tag,
            fields: Vec::new(),
        }))
    }

    pub fn union_type(
        &mut self,
        name: &str,
        layout: ContainerLayout,
        tag: Option<Idx>,
        fields: &[(&str, Idx)],
    ) -> Idx {
        let idx = self.declare_union(name, layout, tag);
        let fields = fields
            .iter()
            .map(|&(name, ty)| UnionField {
                name: name.to_string(),
                ty,
            })
            .collect();
        self.define_union(idx, fields);
        idx
    }

    /// `enum(tag) { variants... }`
    pub fn enum_type(&mut self, name: &str, tag: Idx, variants: &[&str]) -> Idx {
        self.push_nominal(TypeData::Enum {
            name: name.to_string(),
            tag,
            variants: variants.iter().map(|v| (*v).to_string()).collect(),
        })
    }

    pub fn opaque(&mut self, name: &str) -> Idx {
        self.push_nominal(TypeData::Opaque {
            name: name.to_string(),
        })
    }

    // === Functions ===

    pub fn function_type(&mut self, f: FnType) -> Idx {
        self.intern(TypeData::Function(f))
    }

    /// `fn (params...) callconv(cc) ret`
    pub fn function(&mut self, params: &[Idx], ret: Idx, cc: CallConv) -> Idx {
        self.function_type(FnType {
            params: params.to_vec(),
            ret,
            cc,
            varargs: false,
            noalias: 0,
        })
    }
}
