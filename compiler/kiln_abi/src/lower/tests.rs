use kiln_target::Target;
use kiln_types::{
    CallConv, ContainerLayout, Idx, Pool, Signedness, StructField, TypeLayout, UnionField,
};
use pretty_assertions::assert_eq;

use super::*;
use crate::layout::FieldAccess;

fn target(triple: &str) -> Target {
    Target::from_triple(triple).unwrap()
}

fn strict() -> LowerConfig {
    LowerConfig::default().with_strict_checks(true)
}

fn show(lowering: &TypeLowering<'_>, ll: LlTy) -> String {
    lowering.display(ll).to_string()
}

fn body(lowering: &TypeLowering<'_>, ll: LlTy) -> Vec<String> {
    lowering
        .table()
        .struct_body(ll)
        .unwrap()
        .fields
        .iter()
        .map(|&f| show(lowering, f))
        .collect()
}

fn field(name: &str, ty: Idx) -> StructField {
    StructField {
        name: name.to_string(),
        ty,
        is_comptime: false,
    }
}

#[test]
fn scalars() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let u3 = pool.int(3, Signedness::Unsigned);
    let ptr = pool.pointer(Idx::U8);
    let bools = pool.vector(4, Idx::BOOL);
    let floats = pool.vector(4, Idx::F32);
    let color = pool.enum_type("Color", Idx::U8, &["red", "green", "blue"]);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let cases = [
        (Idx::VOID, "void"),
        (Idx::BOOL, "i1"),
        (u3, "i3"),
        (Idx::I128, "i128"),
        (Idx::F16, "half"),
        (Idx::F80, "x86_fp80"),
        (Idx::F128, "fp128"),
        (Idx::ANYERROR, "i16"),
        (ptr, "ptr"),
        (bools, "<4 x i1>"),
        (floats, "<4 x float>"),
        (color, "i8"),
    ];
    for (idx, expected) in cases {
        let ll = lowering.lower(idx).unwrap();
        assert_eq!(show(&lowering, ll), expected, "{idx:?}");
    }
}

#[test]
fn floats_without_a_native_format_become_integers() {
    let aarch64 = target("aarch64-unknown-linux-gnu");
    let arm = target("arm-unknown-linux-gnueabihf");
    let pool = Pool::new();

    let mut lowering = TypeLowering::new(&pool, &aarch64, strict());
    let f80 = lowering.lower(Idx::F80).unwrap();
    assert_eq!(show(&lowering, f80), "i80");

    let mut lowering = TypeLowering::new(&pool, &arm, strict());
    let f16 = lowering.lower(Idx::F16).unwrap();
    assert_eq!(show(&lowering, f16), "i16");
}

#[test]
fn lowering_is_memoized() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let s = pool.struct_type("S", ContainerLayout::Auto, &[("a", Idx::U8), ("b", Idx::U64)]);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let first = lowering.lower(s).unwrap();
    let types = lowering.table().len();
    let second = lowering.lower(s).unwrap();
    assert_eq!(first, second);
    assert_eq!(lowering.table().len(), types);
}

#[test]
fn struct_padding_is_explicit() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let s = pool.struct_type(
        "S",
        ContainerLayout::Extern,
        &[("a", Idx::U8), ("b", Idx::U64), ("c", Idx::U8)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(s).unwrap();
    assert_eq!(show(&lowering, ll), "%S");
    assert_eq!(body(&lowering, ll), ["i8", "[7 x i8]", "i64", "i8", "[7 x i8]"]);
    assert_eq!(lowering.layout_of(ll), Some(TypeLayout::new(24, 8)));

    let layout = lowering.aggregate_layout(s).unwrap().unwrap();
    assert_eq!((layout.size, layout.align), (24, 8));
    assert_eq!(lowering.field_access(s, 1).unwrap(), Some(FieldAccess::Index(2)));
    assert_eq!(lowering.field_access(s, 2).unwrap(), Some(FieldAccess::Index(3)));
}

#[test]
fn zero_size_fields_keep_their_offsets() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let trailing = pool.struct_type("T", ContainerLayout::Auto, &[("a", Idx::U32), ("z", Idx::VOID)]);
    let padded = pool.struct_type(
        "P",
        ContainerLayout::Auto,
        &[("a", Idx::U32), ("b", Idx::U8), ("z", Idx::VOID)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    assert_eq!(lowering.field_access(trailing, 0).unwrap(), Some(FieldAccess::Index(0)));
    assert_eq!(lowering.field_access(trailing, 1).unwrap(), Some(FieldAccess::PastEnd));
    assert_eq!(lowering.field_access(padded, 2).unwrap(), Some(FieldAccess::ByteOffset(5)));
    assert_eq!(lowering.field_access(padded, 3).unwrap(), None);
}

#[test]
fn comptime_fields_are_skipped() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let s = pool.declare_struct("C", ContainerLayout::Auto);
    pool.define_struct(
        s,
        vec![
            StructField {
                name: "n".to_string(),
                ty: Idx::COMPTIME_INT,
                is_comptime: true,
            },
            field("x", Idx::U16),
        ],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());
    let ll = lowering.lower(s).unwrap();
    assert_eq!(body(&lowering, ll), ["i16"]);
    assert_eq!(lowering.field_access(s, 1).unwrap(), Some(FieldAccess::Index(0)));
}

#[test]
fn self_referential_struct_terminates() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let node = pool.declare_struct("Node", ContainerLayout::Auto);
    let node_ptr = pool.pointer(node);
    let next = pool.optional(node_ptr);
    pool.define_struct(node, vec![field("value", Idx::U32), field("next", next)]);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(node).unwrap();
    assert_eq!(show(&lowering, ll), "%Node");
    assert_eq!(body(&lowering, ll), ["i32", "[4 x i8]", "ptr"]);
    assert!(!lowering.table().is_opaque(ll));
    assert_eq!(lowering.lower(next).unwrap(), lowering.lower(node_ptr).unwrap());
}

#[test]
fn mutually_recursive_structs_terminate() {
    let t = target("aarch64-apple-darwin");
    let mut pool = Pool::new();
    let a = pool.declare_struct("A", ContainerLayout::Auto);
    let b = pool.declare_struct("B", ContainerLayout::Auto);
    let a_ptr = pool.pointer(a);
    let b_ptr = pool.pointer(b);
    let a_slice = pool.slice(a);
    pool.define_struct(a, vec![field("b", b_ptr), field("tag", Idx::U8)]);
    pool.define_struct(b, vec![field("parent", a_ptr), field("children", a_slice)]);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let la = lowering.lower(a).unwrap();
    let lb = lowering.lower(b).unwrap();
    assert_eq!(body(&lowering, la), ["ptr", "i8", "[7 x i8]"]);
    assert_eq!(body(&lowering, lb), ["ptr", "{ ptr, i64 }"]);
    assert_eq!(lowering.cached_len(), 6);
}

#[test]
fn optional_representations() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let ptr = pool.pointer(Idx::U32);
    let opt_ptr = pool.optional(ptr);
    let c_ptr = pool.c_pointer(Idx::U32);
    let opt_c_ptr = pool.optional(c_ptr);
    let opt_void = pool.optional(Idx::VOID);
    let opt_u32 = pool.optional(Idx::U32);
    let opt_err = pool.optional(Idx::ANYERROR);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let lp = lowering.lower(ptr).unwrap();
    assert_eq!(lowering.lower(opt_ptr).unwrap(), lp);
    let flag = lowering.lower(opt_void).unwrap();
    assert_eq!(show(&lowering, flag), "i8");
    let ll = lowering.lower(opt_u32).unwrap();
    assert_eq!(show(&lowering, ll), "{ i32, i8, [3 x i8] }");
    let ll = lowering.lower(opt_c_ptr).unwrap();
    assert_eq!(show(&lowering, ll), "{ ptr, i8, [7 x i8] }");
    let ll = lowering.lower(opt_err).unwrap();
    assert_eq!(show(&lowering, ll), "i16");

    let layout = lowering.aggregate_layout(opt_u32).unwrap().unwrap();
    assert_eq!(layout.tag.map(|t| t.byte_offset), Some(4));
    assert!(lowering.aggregate_layout(opt_ptr).unwrap().is_none());
}

#[test]
fn error_union_representations() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let never = pool.error_set(&[]);
    let big = pool.error_union(Idx::ANYERROR, Idx::U64);
    let small = pool.error_union(Idx::ANYERROR, Idx::U8);
    let payload_only = pool.error_union(never, Idx::U32);
    let code_only = pool.error_union(Idx::ANYERROR, Idx::VOID);
    let empty = pool.error_union(never, Idx::VOID);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let cases = [
        (big, "{ i64, i16, [6 x i8] }"),
        (small, "{ i16, i8, [1 x i8] }"),
        (payload_only, "i32"),
        (code_only, "i16"),
        (empty, "void"),
    ];
    for (idx, expected) in cases {
        let ll = lowering.lower(idx).unwrap();
        assert_eq!(show(&lowering, ll), expected, "{idx:?}");
    }
    let layout = lowering.aggregate_layout(big).unwrap().unwrap();
    assert_eq!(layout.tag.map(|t| t.byte_offset), Some(8));
    assert_eq!(layout.fields[0].byte_offset, 0);
}

#[test]
fn slices_are_pointer_and_length() {
    let mut pool = Pool::new();
    let bytes = pool.const_slice(Idx::U8);
    let opt = pool.optional(bytes);

    let t = target("x86_64-unknown-linux-gnu");
    let mut lowering = TypeLowering::new(&pool, &t, strict());
    let ll = lowering.lower(bytes).unwrap();
    assert_eq!(show(&lowering, ll), "{ ptr, i64 }");
    assert_eq!(lowering.lower(opt).unwrap(), ll);

    let t = target("wasm32-unknown-unknown");
    let mut lowering = TypeLowering::new(&pool, &t, strict());
    let ll = lowering.lower(bytes).unwrap();
    assert_eq!(show(&lowering, ll), "{ ptr, i32 }");
}

#[test]
fn arrays() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let plain = pool.array(4, Idx::U16);
    let terminated = pool.array_sentinel(3, Idx::U8);
    let of_void = pool.array(4, Idx::VOID);
    let empty = pool.array(0, Idx::U32);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(plain).unwrap();
    assert_eq!(show(&lowering, ll), "[4 x i16]");
    let ll = lowering.lower(terminated).unwrap();
    assert_eq!(show(&lowering, ll), "[4 x i8]");
    let ll = lowering.lower(of_void).unwrap();
    assert_eq!(show(&lowering, ll), "[4 x i8]");
    let ll = lowering.lower(empty).unwrap();
    assert_eq!(show(&lowering, ll), "void");
}

#[test]
fn packed_containers_are_integers() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let u3 = pool.int(3, Signedness::Unsigned);
    let u5 = pool.int(5, Signedness::Unsigned);
    let flags = pool.struct_type(
        "Flags",
        ContainerLayout::Packed,
        &[("a", u3), ("b", u5), ("c", Idx::U8)],
    );
    let bits = pool.union_type(
        "Bits",
        ContainerLayout::Packed,
        None,
        &[("a", Idx::U32), ("b", Idx::F32)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(flags).unwrap();
    assert_eq!(show(&lowering, ll), "i16");
    let ll = lowering.lower(bits).unwrap();
    assert_eq!(show(&lowering, ll), "i32");
    assert!(lowering.aggregate_layout(flags).unwrap().is_none());
}

#[test]
fn tuples_are_anonymous_structs() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let tuple = pool.tuple(&[Idx::U16, Idx::U64]);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(tuple).unwrap();
    assert_eq!(show(&lowering, ll), "{ i16, [6 x i8], i64 }");
    assert_eq!(lowering.field_access(tuple, 1).unwrap(), Some(FieldAccess::Index(2)));
}

#[test]
fn tagged_union_orders_tag_by_alignment() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let tag = pool.enum_type("Tag", Idx::U8, &["int", "byte"]);
    let u = pool.union_type(
        "Value",
        ContainerLayout::Auto,
        Some(tag),
        &[("int", Idx::U64), ("byte", Idx::U8)],
    );
    let wide_tag = pool.enum_type("Wide", Idx::U32, &["a", "b"]);
    let small = pool.union_type(
        "Small",
        ContainerLayout::Auto,
        Some(wide_tag),
        &[("a", Idx::U8), ("b", Idx::U16)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(u).unwrap();
    assert_eq!(show(&lowering, ll), "%Value");
    assert_eq!(body(&lowering, ll), ["i64", "i8", "[7 x i8]"]);
    let layout = lowering.aggregate_layout(u).unwrap().unwrap();
    assert_eq!(layout.tag.map(|t| t.byte_offset), Some(8));
    assert_eq!(layout.fields[0].machine_index, Some(0));
    assert_eq!(layout.fields[1].machine_index, None);

    let ll = lowering.lower(small).unwrap();
    assert_eq!(body(&lowering, ll), ["i32", "i16", "[2 x i8]"]);
}

#[test]
fn union_payload_is_padded_to_the_largest_member() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let bytes = pool.array(6, Idx::U8);
    let u = pool.union_type(
        "U",
        ContainerLayout::Extern,
        None,
        &[("word", Idx::U32), ("bytes", bytes)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(u).unwrap();
    assert_eq!(body(&lowering, ll), ["{ i32, [4 x i8] }"]);
    assert_eq!(lowering.layout_of(ll), Some(TypeLayout::new(8, 4)));
    assert_eq!(lowering.field_access(u, 1).unwrap(), Some(FieldAccess::ByteOffset(0)));
}

#[test]
fn single_variant_union_drops_its_tag() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let tag = pool.enum_type("One", Idx::U8, &["only"]);
    let u = pool.declare_union("Only", ContainerLayout::Auto, Some(tag));
    pool.define_union(
        u,
        vec![UnionField {
            name: "only".to_string(),
            ty: Idx::U16,
        }],
    );
    let mut lowering = TypeLowering::new(&pool, &t, strict());
    let ll = lowering.lower(u).unwrap();
    assert_eq!(body(&lowering, ll), ["i16"]);
    assert!(lowering.aggregate_layout(u).unwrap().unwrap().tag.is_none());
}

#[test]
fn opaque_types_are_bodiless_named_structs() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let handle = pool.opaque("Handle");
    let mut lowering = TypeLowering::new(&pool, &t, strict());
    let ll = lowering.lower(handle).unwrap();
    assert_eq!(show(&lowering, ll), "%Handle");
    assert!(lowering.table().is_opaque(ll));
    assert_eq!(lowering.layout_of(ll), None);
}

#[test]
fn function_types_lower_through_the_call_shape() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let pair = pool.struct_type("Pair", ContainerLayout::Extern, &[("a", Idx::U8), ("b", Idx::U64)]);
    let c_fn = pool.function(&[Idx::U32, pair], Idx::U8, CallConv::C);
    let auto_fn = pool.function(&[pair], pair, CallConv::Auto);
    let mut lowering = TypeLowering::new(&pool, &t, strict());

    let ll = lowering.lower(c_fn).unwrap();
    assert_eq!(show(&lowering, ll), "i8 (i32, i64, i64)");
    let ll = lowering.lower(auto_fn).unwrap();
    assert_eq!(show(&lowering, ll), "void (ptr, ptr)");
}

#[test]
fn internal_policy_is_exposed() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let s = pool.struct_type("S", ContainerLayout::Auto, &[("a", Idx::U8)]);
    let lowering = TypeLowering::new(&pool, &t, LowerConfig::default());
    assert!(lowering.is_by_ref(s));
    assert!(!lowering.is_by_ref(Idx::U64));
    assert_eq!(lowering.c_abi().name(), "x86_64-sysv");
}
