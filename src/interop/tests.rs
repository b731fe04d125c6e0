//! Test suite for interop module

use super::*;
use crate::error::{BridgeError, ShapeError};
use crate::host::{HostFunction, HostSymbol, HostType, HostValue};
use crate::types::{
    self, interface_of, struct_of, Field, FloatWidth, FuncType, IntWidth, TypeRef, UintWidth,
};
use crate::value::{NativeFunction, NativeValue};
use serde_json::json;

// Test helpers
fn int(n: i64) -> NativeValue {
    NativeValue::Int(IntWidth::Isize, n)
}

fn dog_type() -> TypeRef {
    struct_of(vec![
        Field::exported("Age", types::int()),
        Field::exported("Name", types::string()),
    ])
    .named("Dog")
    .into_ref()
}

fn no_fast_path() -> Bridge {
    let mut config = BridgeConfig::default();
    config.marshal.byte_fast_path = false;
    Bridge::new(config)
}

#[test]
fn test_marshal_primitives() {
    let bridge = Bridge::default();
    assert_eq!(bridge.to_host(&NativeValue::Bool(true)).unwrap(), HostValue::from(true));
    assert_eq!(bridge.to_host(&int(-7)).unwrap(), HostValue::from(-7));
    assert_eq!(
        bridge.to_host(&NativeValue::Uint(UintWidth::U64, u64::MAX)).unwrap(),
        HostValue::Number(u64::MAX as f64)
    );
    assert_eq!(
        bridge.to_host(&NativeValue::Float(FloatWidth::F32, 0.5)).unwrap(),
        HostValue::from(0.5)
    );
    assert_eq!(bridge.to_host(&NativeValue::string("hi")).unwrap(), HostValue::from("hi"));
}

#[test]
fn test_marshal_nil_values_to_null() {
    let bridge = Bridge::default();
    for nil in [
        NativeValue::zero(&types::pointer_to(types::int())),
        NativeValue::zero(&types::any()),
        NativeValue::zero(&types::func(FuncType::default())),
    ] {
        assert!(bridge.to_host(&nil).unwrap().is_null());
    }
}

#[test]
fn test_marshal_pointer_and_interface_unwrap() {
    let bridge = Bridge::default();
    let ptr = NativeValue::pointer(types::int(), Some(int(3)));
    assert_eq!(bridge.to_host(&ptr).unwrap(), HostValue::from(3));

    let boxed = NativeValue::any(NativeValue::string("in"));
    assert_eq!(bridge.to_host(&boxed).unwrap(), HostValue::from("in"));
}

#[test]
fn test_marshal_unsafe_pointer_and_handle() {
    let bridge = Bridge::default();
    assert_eq!(
        bridge.to_host(&NativeValue::UnsafePointer(0x1000)).unwrap(),
        HostValue::from(4096)
    );

    let sym = HostValue::Symbol(HostSymbol::new("id"));
    assert_eq!(bridge.to_host(&NativeValue::Handle(sym.clone())).unwrap(), sym);
}

#[test]
fn test_marshal_unsupported_kinds() {
    let bridge = Bridge::default();
    let chan = NativeValue::zero(&types::chan_of(types::int()));
    assert_eq!(
        bridge.to_host(&chan).unwrap_err(),
        BridgeError::UnsupportedKind { kind: "chan".into() }
    );
}

#[test]
fn test_marshal_struct_skips_unexported() {
    let ty = struct_of(vec![
        Field::exported("Visible", types::int()),
        Field::private("hidden", types::int()),
    ])
    .into_ref();
    let value = NativeValue::structure(ty, vec![int(1), int(2)]).unwrap();

    let host = Bridge::default().to_host(&value).unwrap();
    assert_eq!(host.to_json(), json!({"Visible": 1}));
}

#[test]
fn test_marshal_struct_with_custom_tag_key() {
    let ty = struct_of(vec![Field::exported("Age", types::int())
        .with_tag("json", "age")
        .with_tag("host", "years")])
    .into_ref();
    let value = NativeValue::structure(ty, vec![int(4)]).unwrap();

    let mut config = BridgeConfig::default();
    config.marshal.tag_key = "host".into();

    assert_eq!(Bridge::default().to_host(&value).unwrap().to_json(), json!({"age": 4}));
    assert_eq!(Bridge::new(config).to_host(&value).unwrap().to_json(), json!({"years": 4}));
}

#[test]
fn test_marshal_map() {
    let map = NativeValue::string_map(types::int(), [("a", int(1)), ("b", int(2))]);
    let host = Bridge::default().to_host(&map).unwrap();
    assert_eq!(host.to_json(), json!({"a": 1, "b": 2}));
}

#[test]
fn test_marshal_non_string_key_map_fails_even_empty() {
    let empty = NativeValue::zero(&types::map_of(types::int(), types::string()));
    assert_eq!(
        Bridge::default().to_host(&empty).unwrap_err(),
        BridgeError::Shape(ShapeError::NonStringMapKey("int".into()))
    );
}

#[test]
fn test_marshal_results_collapse() {
    let bridge = Bridge::default();
    assert!(bridge.to_host_values(&[]).unwrap().is_undefined());
    assert_eq!(bridge.to_host_values(&[int(1)]).unwrap(), HostValue::from(1));
    assert_eq!(
        bridge.to_host_values(&[int(1), NativeValue::string("x")]).unwrap().to_json(),
        json!([1, "x"])
    );
}

#[test]
fn test_marshal_bytes_counts_fast_path() {
    let before = stats().fast_path_bytes;
    let host = Bridge::default()
        .to_host(&NativeValue::Bytes(vec![5; 64]))
        .unwrap();

    assert_eq!(host.get("length"), HostValue::from(64));
    assert!(stats().fast_path_bytes >= before + 64);
}

#[test]
fn test_marshal_bytes_result_is_plain_array() {
    let host = Bridge::default().to_host(&NativeValue::Bytes(vec![1, 2])).unwrap();
    match host {
        HostValue::Object(obj) => assert_eq!(obj.class_name(), "Array"),
        other => panic!("expected array, got {:?}", other),
    }
}

#[test]
fn test_unmarshal_integer_narrowing() {
    let bridge = Bridge::default();
    assert_eq!(
        bridge.to_native(&HostValue::from(300), &types::int8()).unwrap(),
        NativeValue::Int(IntWidth::I8, 44)
    );
    assert_eq!(
        bridge.to_native(&HostValue::from(-1), &types::uint8()).unwrap(),
        NativeValue::Uint(UintWidth::U8, 255)
    );
    assert_eq!(
        bridge.to_native(&HostValue::from(2.9), &types::int()).unwrap(),
        NativeValue::Int(IntWidth::Isize, 2)
    );
}

#[test]
fn test_unmarshal_float32_rounds() {
    let value = Bridge::default()
        .to_native(&HostValue::from(0.1), &types::float32())
        .unwrap();
    assert_eq!(value, NativeValue::Float(FloatWidth::F32, 0.1f32 as f64));
}

#[test]
fn test_unmarshal_string_of_non_string() {
    let value = Bridge::default()
        .to_native(&HostValue::from(5), &types::string())
        .unwrap();
    assert_eq!(value.as_str(), Some("<number: 5>"));
}

#[test]
fn test_unmarshal_bool_mismatch() {
    let err = Bridge::default()
        .to_native(&HostValue::from(1), &types::boolean())
        .unwrap_err();
    assert_eq!(err, BridgeError::host_mismatch("boolean", HostType::Number));
}

#[test]
fn test_unmarshal_array_reads_declared_length() {
    let host = HostValue::array(vec![1.into(), 2.into(), 3.into()]);
    let value = Bridge::default()
        .to_native(&host, &types::array_of(types::int(), 2))
        .unwrap();
    assert_eq!(value.items().map(<[NativeValue]>::len), Some(2));
}

#[test]
fn test_unmarshal_short_array_is_out_of_range() {
    let host = HostValue::array(vec![1.into()]);
    let err = Bridge::default()
        .to_native(&host, &types::array_of(types::int(), 3))
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Shape(ShapeError::IndexOutOfRange { index: 1, len: 1 })
    );
}

#[test]
fn test_unmarshal_slice_from_nullish_is_empty() {
    let bridge = Bridge::default();
    let ints = bridge
        .to_native(&HostValue::Null, &types::slice_of(types::int()))
        .unwrap();
    assert_eq!(ints.items().map(<[NativeValue]>::len), Some(0));

    let bytes = bridge.to_native(&HostValue::Undefined, &types::bytes()).unwrap();
    assert_eq!(bytes, NativeValue::Bytes(vec![]));
}

#[test]
fn test_unmarshal_slice_of_non_sequence_fails() {
    let err = Bridge::default()
        .to_native(&HostValue::from(true), &types::slice_of(types::int()))
        .unwrap_err();
    assert_eq!(err, BridgeError::host_mismatch("array", HostType::Boolean));
}

#[test]
fn test_unmarshal_rejects_invalid_lengths() {
    let huge = HostValue::object([("length", HostValue::from(1e19))]);
    for bridge in [Bridge::default(), no_fast_path()] {
        assert_eq!(
            bridge.to_native(&huge, &types::bytes()).unwrap_err(),
            BridgeError::Shape(ShapeError::InvalidLength(1e19))
        );
    }

    let fractional = HostValue::object([("length", HostValue::from(2.5))]);
    assert_eq!(
        Bridge::default()
            .to_native(&fractional, &types::slice_of(types::int()))
            .unwrap_err(),
        BridgeError::Shape(ShapeError::InvalidLength(2.5))
    );

    let negative = HostValue::object([("length", HostValue::from(-1))]);
    assert!(Bridge::default()
        .to_native(&negative, &types::array_of(types::int(), 0))
        .is_err());
}

#[test]
fn test_unmarshal_bytes_both_paths() {
    let host = HostValue::array(vec![1.into(), 2.into(), 255.into()]);
    let fast = Bridge::default().to_native(&host, &types::bytes()).unwrap();
    let slow = no_fast_path().to_native(&host, &types::bytes()).unwrap();

    assert_eq!(fast, NativeValue::Bytes(vec![1, 2, 255]));
    assert_eq!(fast, slow);
}

#[test]
fn test_unmarshal_map() {
    let host = HostValue::object([("x", 1.into()), ("y", 2.into())]);
    let ty = types::map_of(types::string(), types::int());
    let value = Bridge::default().to_native(&host, &ty).unwrap();

    assert_eq!(value.get("x"), Some(&int(1)));
    assert_eq!(value.get("y"), Some(&int(2)));
    assert_eq!(value.type_of(), ty);
}

#[test]
fn test_unmarshal_map_rejects_non_string_key() {
    let host = HostValue::object([("1", "one".into())]);
    let err = Bridge::default()
        .to_native(&host, &types::map_of(types::int(), types::string()))
        .unwrap_err();
    assert!(matches!(err, BridgeError::Shape(ShapeError::NonStringMapKey(_))));
}

#[test]
fn test_unmarshal_map_from_null_fails() {
    let err = Bridge::default()
        .to_native(&HostValue::Null, &types::map_of(types::string(), types::int()))
        .unwrap_err();
    assert_eq!(err, BridgeError::Shape(ShapeError::NullObject));
}

#[test]
fn test_unmarshal_pointer_never_nil() {
    let bridge = Bridge::default();
    let ty = types::pointer_to(types::int());

    for nullish in [HostValue::Null, HostValue::Undefined] {
        let ptr = bridge.to_native(&nullish, &ty).unwrap();
        assert!(!ptr.is_nil());
        assert_eq!(ptr.pointee(), Some(int(0)));
    }

    let ptr = bridge.to_native(&HostValue::from(9), &ty).unwrap();
    assert_eq!(ptr.pointee(), Some(int(9)));
}

#[test]
fn test_unmarshal_struct_absent_fields() {
    let ty = struct_of(vec![
        Field::exported("Age", types::int()),
        Field::exported("Owner", types::pointer_to(types::string())),
        Field::private("secret", types::string()),
    ])
    .into_ref();
    let host = HostValue::object([("secret", "leak".into())]);

    let value = Bridge::default().to_native(&host, &ty).unwrap();
    assert_eq!(value.field("Age"), Some(&int(0)));
    assert_eq!(
        value.field("Owner").and_then(NativeValue::pointee),
        Some(NativeValue::string(""))
    );
    assert_eq!(value.field("secret"), Some(&NativeValue::string("")));
}

#[test]
fn test_unmarshal_struct_null_field_is_not_absent() {
    let host = HostValue::object([("Age", HostValue::Null)]);
    let err = Bridge::default().to_native(&host, &dog_type()).unwrap_err();
    assert_eq!(err, BridgeError::host_mismatch("number", HostType::Null));
}

#[test]
fn test_unmarshal_struct_from_primitive_fails() {
    let err = Bridge::default()
        .to_native(&HostValue::from("rex"), &dog_type())
        .unwrap_err();
    assert_eq!(err, BridgeError::host_mismatch("object", HostType::String));
}

#[test]
fn test_unmarshal_unsafe_pointer_and_handle() {
    let bridge = Bridge::default();
    assert_eq!(
        bridge.to_native(&HostValue::from(4096), &types::unsafe_pointer()).unwrap(),
        NativeValue::UnsafePointer(4096)
    );

    let sym = HostValue::Symbol(HostSymbol::new("h"));
    assert_eq!(
        bridge.to_native(&sym, &types::handle()).unwrap(),
        NativeValue::Handle(sym)
    );
}

#[test]
fn test_unmarshal_unsupported_kinds() {
    let ty = types::TypeDescriptor::new(types::TypeKind::Complex128).into_ref();
    let err = Bridge::default().to_native(&HostValue::from(1), &ty).unwrap_err();
    assert_eq!(err, BridgeError::unsupported("complex128"));
}

#[test]
fn test_natural_values() {
    let bridge = Bridge::default();
    assert_eq!(bridge.natural_value(&HostValue::Null).unwrap(), None);
    assert_eq!(
        bridge.natural_value(&HostValue::from(2)).unwrap(),
        Some(NativeValue::Float(FloatWidth::F64, 2.0))
    );
    assert_eq!(
        bridge.natural_value(&HostValue::from("s")).unwrap(),
        Some(NativeValue::string("s"))
    );

    let sym = HostValue::Symbol(HostSymbol::new("k"));
    assert_eq!(
        bridge.natural_value(&sym).unwrap(),
        Some(NativeValue::Handle(sym.clone()))
    );
}

#[test]
fn test_natural_object_is_string_any_map() {
    let host = HostValue::object([("n", 1.into()), ("s", "x".into())]);
    let value = Bridge::default().natural_value(&host).unwrap().unwrap();

    assert_eq!(value.type_of().to_string(), "map[string]any");
    assert_eq!(
        value.get("n").and_then(NativeValue::dynamic),
        Some(&NativeValue::Float(FloatWidth::F64, 1.0))
    );
}

#[test]
fn test_natural_array_has_index_keys() {
    let host = HostValue::array(vec!["a".into()]);
    let value = Bridge::default().natural_value(&host).unwrap().unwrap();
    assert_eq!(
        value.get("0").and_then(NativeValue::dynamic),
        Some(&NativeValue::string("a"))
    );
}

#[test]
fn test_natural_function_is_callable() {
    let join = HostFunction::new("join", |_, args| {
        let parts: Vec<String> = args.iter().map(HostValue::to_host_string).collect();
        Ok(HostValue::from(parts.join("-")))
    });
    let value = Bridge::default()
        .natural_value(&HostValue::from(join))
        .unwrap()
        .unwrap();
    assert_eq!(value.type_of().to_string(), "func(...any) any");

    let f = value.as_func().unwrap();
    let args = NativeValue::slice(
        types::any(),
        vec![
            NativeValue::any(NativeValue::string("a")),
            NativeValue::any(NativeValue::string("b")),
        ],
    );
    let out = f.call(vec![args]).unwrap();
    assert_eq!(
        out[0].dynamic(),
        Some(&NativeValue::string("a-b"))
    );
}

#[test]
fn test_interface_capability_check() {
    let stringer = interface_of(["String"]).named("Stringer").into_ref();
    let bridge = Bridge::default();

    let err = bridge.to_native(&HostValue::from("x"), &stringer).unwrap_err();
    assert_eq!(
        err,
        BridgeError::Capability {
            interface: "Stringer".into(),
            found: "string".into(),
        }
    );

    let nil = bridge.to_native(&HostValue::Undefined, &stringer).unwrap();
    assert!(nil.is_nil());
}

#[test]
fn test_unmarshal_func_from_nullish_and_mismatch() {
    let ty = types::func(FuncType::new(vec![], vec![types::int()]));
    let bridge = Bridge::default();

    assert!(bridge.to_native(&HostValue::Null, &ty).unwrap().is_nil());
    assert_eq!(
        bridge.to_native(&HostValue::from(1), &ty).unwrap_err(),
        BridgeError::host_mismatch("function", HostType::Number)
    );
}

#[test]
fn test_host_closure_spreads_variadic_tail() {
    let count = HostFunction::new("count", |_, args| Ok(HostValue::Number(args.len() as f64)));
    let ty = types::func(FuncType::variadic(vec![types::string()], types::int(), vec![types::int()]));

    let value = Bridge::default().to_native(&HostValue::from(count), &ty).unwrap();
    let out = value
        .as_func()
        .unwrap()
        .call(vec![
            NativeValue::string("label"),
            NativeValue::slice(types::int(), vec![int(1), int(2), int(3)]),
        ])
        .unwrap();
    assert_eq!(out, vec![int(4)]);
}

#[test]
fn test_host_closure_propagates_exception() {
    let boom = HostFunction::new("boom", |_, _| Err(BridgeError::Thrown("Error: boom".into())));
    let ty = types::func(FuncType::default());

    let value = Bridge::default().to_native(&HostValue::from(boom), &ty).unwrap();
    let err = value.as_func().unwrap().call(vec![]).unwrap_err();
    assert_eq!(err, BridgeError::Thrown("Error: boom".into()));
}

#[test]
fn test_wrap_counts_calls_and_errors() {
    let noop = NativeFunction::new(FuncType::new(vec![types::int()], vec![]), |_| Ok(vec![]));
    let before = stats();

    let host = Bridge::default().wrap(noop);
    host.invoke(&[1.into()]).unwrap();
    assert!(host.invoke(&[]).is_err());

    let after = stats();
    assert!(after.functions_wrapped >= before.functions_wrapped + 1);
    assert!(after.calls_made >= before.calls_made + 2);
    assert!(after.conversion_errors >= before.conversion_errors + 1);
}

#[test]
fn test_wrap_uses_function_name() {
    let f = NativeFunction::new(FuncType::default(), |_| Ok(vec![])).named("tick");
    let host = Bridge::default().wrap(f);
    assert_eq!(host.get("name"), HostValue::from("tick"));
    assert!(host.invoke(&[]).unwrap().is_undefined());
}

#[test]
fn test_wrap_variadic_bytes() {
    let total = NativeFunction::new(
        FuncType::variadic(vec![], types::uint8(), vec![types::int()]),
        |args| {
            let sum: i64 = args[0].as_bytes().unwrap_or_default().iter().map(|b| *b as i64).sum();
            Ok(vec![NativeValue::Int(IntWidth::Isize, sum)])
        },
    );
    let host = Bridge::default().wrap(total);
    assert_eq!(
        host.invoke(&[1.into(), 2.into(), 253.into()]).unwrap(),
        HostValue::from(256)
    );
}

#[test]
fn test_wrap_variadic_too_few() {
    let f = NativeFunction::new(
        FuncType::variadic(vec![types::string()], types::int(), vec![]),
        |_| Ok(vec![]),
    );
    let err = Bridge::default().wrap(f).invoke(&[]).unwrap_err();
    assert_eq!(err, BridgeError::VariadicArity { min: 1, got: 0 });
}

#[test]
fn test_bridged_function_is_reentrant() {
    let echo = NativeFunction::new(
        FuncType::new(vec![types::any()], vec![types::any()]),
        |args| Ok(args),
    );
    let host_echo = Bridge::default().wrap(echo);

    let twice = HostFunction::new("twice", {
        let host_echo = host_echo.clone();
        move |_, args| {
            let once = host_echo.invoke(args)?;
            host_echo.invoke(&[once])
        }
    });
    assert_eq!(
        HostValue::from(twice).invoke(&["v".into()]).unwrap(),
        HostValue::from("v")
    );
}
