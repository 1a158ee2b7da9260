use super::*;
use crate::data::{CallConv, ContainerLayout, PtrFlags, PtrSize, TupleField};
use pretty_assertions::assert_eq;

#[test]
fn primitives_at_fixed_indices() {
    let pool = Pool::new();
    assert_eq!(pool.len(), Idx::FIRST_DYNAMIC as usize);
    assert_eq!(pool.get(Idx::BOOL), &TypeData::Bool);
    assert_eq!(
        pool.get(Idx::I32),
        &TypeData::Int {
            bits: 32,
            signedness: Signedness::Signed
        }
    );
    assert_eq!(pool.get(Idx::ANYERROR), &TypeData::ErrorSet(ErrorSet::Global));
}

#[test]
fn structural_types_are_interned() {
    let mut pool = Pool::new();
    assert_eq!(pool.int(32, Signedness::Unsigned), Idx::U32);

    let a = pool.pointer(Idx::U8);
    let b = pool.pointer(Idx::U8);
    assert_eq!(a, b);
    assert_ne!(a, pool.const_pointer(Idx::U8));

    let t1 = pool.tuple(&[Idx::U8, Idx::U64]);
    let t2 = pool.tuple(&[Idx::U8, Idx::U64]);
    assert_eq!(t1, t2);
    assert_ne!(t1, pool.tuple(&[Idx::U64, Idx::U8]));

    let f1 = pool.function(&[t1], Idx::VOID, CallConv::C);
    let f2 = pool.function(&[t2], Idx::VOID, CallConv::C);
    assert_eq!(f1, f2);
    assert_ne!(f1, pool.function(&[t1], Idx::VOID, CallConv::Auto));
}

#[test]
fn error_set_names_are_order_insensitive() {
    let mut pool = Pool::new();
    let a = pool.error_set(&["OutOfMemory", "Overflow"]);
    let b = pool.error_set(&["Overflow", "OutOfMemory", "Overflow"]);
    assert_eq!(a, b);
}

#[test]
fn nominal_types_get_fresh_identities() {
    let mut pool = Pool::new();
    let a = pool.struct_type("P", ContainerLayout::Auto, &[("x", Idx::U8)]);
    let b = pool.struct_type("P", ContainerLayout::Auto, &[("x", Idx::U8)]);
    assert_ne!(a, b);
    assert_ne!(pool.opaque("O"), pool.opaque("O"));
}

#[test]
fn self_referential_struct() {
    let mut pool = Pool::new();
    let node = pool.declare_struct("Node", ContainerLayout::Auto);
    let next = pool.pointer(node);
    let opt_next = pool.optional(next);
    pool.define_struct(
        node,
        vec![
            StructField {
                name: "value".to_string(),
                ty: Idx::U32,
                is_comptime: false,
            },
            StructField {
                name: "next".to_string(),
                ty: opt_next,
                is_comptime: false,
            },
        ],
    );
    let TypeData::Struct(s) = pool.get(node) else {
        panic!("expected struct");
    };
    assert_eq!(s.fields.len(), 2);
    assert_eq!(s.fields[1].ty, opt_next);
}

#[test]
fn pointer_flavors() {
    let mut pool = Pool::new();
    let s = pool.const_slice(Idx::U8);
    let TypeData::Pointer(p) = pool.get(s) else {
        panic!("expected pointer");
    };
    assert_eq!(p.size, PtrSize::Slice);
    assert!(p.flags.contains(PtrFlags::CONST));
    assert!(!p.allows_zero());

    let c = pool.c_pointer(Idx::U8);
    let TypeData::Pointer(p) = pool.get(c) else {
        panic!("expected pointer");
    };
    assert!(p.allows_zero());
}

#[test]
fn fn_type_lookup() {
    let mut pool = Pool::new();
    let f = pool.function_type(FnType {
        params: vec![Idx::U8, Idx::U8],
        ret: Idx::VOID,
        cc: CallConv::C,
        varargs: true,
        noalias: 0b10,
    });
    let sig = pool.fn_type(f).unwrap();
    assert!(sig.varargs);
    assert!(!sig.param_is_noalias(0));
    assert!(sig.param_is_noalias(1));
    assert!(pool.fn_type(Idx::U8).is_none());
}

#[test]
fn tuple_comptime_fields_distinguish_types() {
    let mut pool = Pool::new();
    let a = pool.tuple(&[Idx::U8]);
    let b = pool.tuple_with(vec![TupleField {
        ty: Idx::U8,
        is_comptime: true,
    }]);
    assert_ne!(a, b);
}
