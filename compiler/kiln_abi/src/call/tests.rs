use kiln_target::Target;
use kiln_types::{CallConv, ContainerLayout, FnType, Idx, Pool};
use pretty_assertions::assert_eq;

use super::*;
use crate::attrs::ParamAttrs;
use crate::LowerConfig;

fn target(triple: &str) -> Target {
    Target::from_triple(triple).unwrap()
}

fn signature(lowering: &TypeLowering<'_>, shape: &CallShape) -> String {
    let params: Vec<String> = shape
        .params
        .iter()
        .map(|p| lowering.display(p.ty).to_string())
        .collect();
    format!("{} ({})", lowering.display(shape.ret), params.join(", "))
}

fn fn_type(params: &[Idx], ret: Idx, cc: CallConv) -> FnType {
    FnType {
        params: params.to_vec(),
        ret,
        cc,
        varargs: false,
        noalias: 0,
    }
}

#[test]
fn sret_pointer_comes_first() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let big = pool.struct_type(
        "Big",
        ContainerLayout::Extern,
        &[("a", Idx::U64), ("b", Idx::U64), ("c", Idx::U64)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());

    let shape = lowering
        .classify_call(&fn_type(&[Idx::U32], big, CallConv::C))
        .unwrap();
    assert!(shape.sret);
    assert_eq!(signature(&lowering, &shape), "void (ptr, i32)");
    assert_eq!(shape.params[0].origin, ParamOrigin::ReturnPointer);
    assert!(shape.params[0].attrs.contains(ParamAttrs::STRUCT_RET));
    assert_eq!(shape.params[0].attrs.align, Some(8));
    assert_eq!(
        shape.params[1].origin,
        ParamOrigin::Source { index: 0, part: 0 }
    );
}

#[test]
fn zero_size_error_return_is_never_sret() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let never = pool.error_set(&[]);
    let err_void = pool.error_union(never, Idx::VOID);
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());

    for cc in [CallConv::Auto, CallConv::C] {
        let shape = lowering.classify_call(&fn_type(&[], err_void, cc)).unwrap();
        assert!(!shape.sret);
        assert_eq!(shape.return_class, ReturnClass::ErrorCode);
        assert_eq!(signature(&lowering, &shape), "i16 ()");
    }
}

#[test]
fn internal_error_union_returns_code_alongside_sret() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let result = pool.error_union(Idx::ANYERROR, Idx::U64);
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());

    let shape = lowering
        .classify_call(&fn_type(&[], result, CallConv::Auto))
        .unwrap();
    assert!(shape.sret);
    assert_eq!(signature(&lowering, &shape), "i16 (ptr)");
}

#[test]
fn error_trace_follows_sret() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let result = pool.error_union(Idx::ANYERROR, Idx::U64);
    let config = LowerConfig::default().with_error_tracing(true);
    let mut lowering = TypeLowering::new(&pool, &t, config);

    let shape = lowering
        .classify_call(&fn_type(&[Idx::U8], result, CallConv::Auto))
        .unwrap();
    let origins: Vec<ParamOrigin> = shape.params.iter().map(|p| p.origin).collect();
    assert_eq!(
        origins,
        [
            ParamOrigin::ReturnPointer,
            ParamOrigin::ErrorTrace,
            ParamOrigin::Source { index: 0, part: 0 },
        ]
    );

    // C functions never get a trace.
    let shape = lowering
        .classify_call(&fn_type(&[Idx::U8], Idx::ANYERROR, CallConv::C))
        .unwrap();
    assert_eq!(shape.params.len(), 1);
}

#[test]
fn slices_take_two_machine_params() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let bytes = pool.const_slice(Idx::U8);
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());

    let mut f = fn_type(&[Idx::VOID, bytes], Idx::VOID, CallConv::Auto);
    f.noalias = 0b10;
    let shape = lowering.classify_call(&f).unwrap();
    assert_eq!(signature(&lowering, &shape), "void (ptr, i64)");
    assert_eq!(shape.param_classes, [ParamClass::NoBits, ParamClass::Slice]);
    assert_eq!(
        shape.params[0].attrs.flags,
        ParamAttrs::NON_NULL | ParamAttrs::READ_ONLY | ParamAttrs::NO_ALIAS
    );
    assert_eq!(shape.source_params(1).count(), 2);
    assert_eq!(shape.source_params(0).count(), 0);
}

#[test]
fn by_reference_params_point_at_the_value() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let big = pool.struct_type(
        "Big",
        ContainerLayout::Extern,
        &[("a", Idx::U64), ("b", Idx::U64), ("c", Idx::U64)],
    );
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());

    let shape = lowering
        .classify_call(&fn_type(&[big], Idx::VOID, CallConv::C))
        .unwrap();
    let param = shape.params[0];
    assert_eq!(lowering.display(param.ty).to_string(), "ptr");
    assert!(param.attrs.contains(ParamAttrs::BY_VAL));
    assert_eq!(param.attrs.pointee, Some(lowering.lower(big).unwrap()));

    let shape = lowering
        .classify_call(&fn_type(&[big], Idx::VOID, CallConv::Auto))
        .unwrap();
    assert_eq!(
        shape.params[0].attrs.flags,
        ParamAttrs::NON_NULL | ParamAttrs::READ_ONLY
    );
}

#[test]
fn classifier_slots_become_machine_types() {
    let mut pool = Pool::new();
    let floats = pool.struct_type(
        "V3",
        ContainerLayout::Extern,
        &[("x", Idx::F32), ("y", Idx::F32), ("z", Idx::F32)],
    );
    let pair = pool.struct_type("P", ContainerLayout::Extern, &[("a", Idx::F64), ("b", Idx::F64)]);
    let small = pool.struct_type("S", ContainerLayout::Extern, &[("a", Idx::U8), ("b", Idx::U16)]);
    let f = fn_type(&[floats, small], pair, CallConv::C);

    let sysv = target("x86_64-unknown-linux-gnu");
    let mut lowering = TypeLowering::new(&pool, &sysv, LowerConfig::default());
    let shape = lowering.classify_call(&f).unwrap();
    assert_eq!(
        signature(&lowering, &shape),
        "{ double, double } (<2 x float>, float, i32)"
    );

    let arm64 = target("aarch64-unknown-linux-gnu");
    let mut lowering = TypeLowering::new(&pool, &arm64, LowerConfig::default());
    let shape = lowering.classify_call(&f).unwrap();
    assert_eq!(
        signature(&lowering, &shape),
        "[2 x double] ([3 x float], i32)"
    );
}

#[test]
fn wide_integers_on_windows() {
    let t = target("x86_64-pc-windows-msvc");
    let pool = Pool::new();
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());
    let shape = lowering
        .classify_call(&fn_type(&[Idx::U128], Idx::I128, CallConv::C))
        .unwrap();
    assert_eq!(signature(&lowering, &shape), "<2 x i64> (ptr)");
}

#[test]
fn promoted_integers_carry_extension() {
    let t = target("x86_64-unknown-linux-gnu");
    let pool = Pool::new();
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());
    let shape = lowering
        .classify_call(&fn_type(&[Idx::I8, Idx::U16], Idx::BOOL, CallConv::C))
        .unwrap();
    assert_eq!(signature(&lowering, &shape), "i1 (i8, i16)");
    assert_eq!(shape.params[0].attrs.flags, ParamAttrs::SIGN_EXT);
    assert_eq!(shape.params[1].attrs.flags, ParamAttrs::ZERO_EXT);
    assert_eq!(shape.ret_attrs.flags, ParamAttrs::ZERO_EXT);
}

#[test]
fn fn_shape_reads_the_pool() {
    let t = target("x86_64-unknown-linux-gnu");
    let mut pool = Pool::new();
    let mut f = fn_type(&[Idx::U32], Idx::VOID, CallConv::C);
    f.varargs = true;
    let idx = pool.function_type(f);
    let mut lowering = TypeLowering::new(&pool, &t, LowerConfig::default());
    let shape = lowering.fn_shape(idx).unwrap().unwrap();
    assert!(shape.varargs);
    let ll = lowering.lower(idx).unwrap();
    assert_eq!(lowering.display(ll).to_string(), "void (i32, ...)");
}
