//! Tests for the host object model

use super::*;
use crate::error::ShapeError;
use serde_json::json;

#[test]
fn test_type_of() {
    assert_eq!(HostValue::Undefined.type_of(), HostType::Undefined);
    assert_eq!(HostValue::Null.type_of(), HostType::Null);
    assert_eq!(HostValue::from(1.5).type_of(), HostType::Number);
    assert_eq!(HostValue::from("x").type_of(), HostType::String);
    assert_eq!(HostValue::array(vec![]).type_of(), HostType::Object);
    assert_eq!(HostValue::Symbol(HostSymbol::new("s")).type_of().name(), "symbol");
}

#[test]
fn test_accessor_mismatch() {
    let err = HostValue::from("5").float().unwrap_err();
    assert_eq!(
        err,
        BridgeError::Shape(ShapeError::HostTypeMismatch {
            expected: "number",
            found: HostType::String,
        })
    );
    assert!(HostValue::Null.bool().is_err());
}

#[test]
fn test_int_truncates_toward_zero() {
    assert_eq!(HostValue::from(3.9).int().unwrap(), 3);
    assert_eq!(HostValue::from(-3.9).int().unwrap(), -3);
    assert_eq!(HostValue::from(f64::NAN).int().unwrap(), 0);
}

#[test]
fn test_to_host_string() {
    assert_eq!(HostValue::from("abc").to_host_string(), "abc");
    assert_eq!(HostValue::from(5).to_host_string(), "<number: 5>");
    assert_eq!(HostValue::from(true).to_host_string(), "<boolean: true>");
    assert_eq!(HostValue::Undefined.to_host_string(), "<undefined>");
    assert_eq!(HostValue::Null.to_host_string(), "<null>");
}

#[test]
fn test_number_to_string() {
    assert_eq!(number_to_string(5.0), "5");
    assert_eq!(number_to_string(-0.5), "-0.5");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
}

#[test]
fn test_strict_equality() {
    let a = HostValue::object([("k", HostValue::from(1))]);
    let b = HostValue::object([("k", HostValue::from(1))]);
    assert_eq!(a, a.clone());
    assert_ne!(a, b);

    let s = HostSymbol::new("tag");
    assert_eq!(HostValue::Symbol(s.clone()), HostValue::Symbol(s));
    assert_ne!(
        HostValue::Symbol(HostSymbol::new("tag")),
        HostValue::Symbol(HostSymbol::new("tag"))
    );
    assert_ne!(HostValue::from(f64::NAN), HostValue::from(f64::NAN));
}

#[test]
fn test_plain_object_keeps_insertion_order() {
    let obj = HostObject::plain();
    obj.set("b".into(), 1.into());
    obj.set("a".into(), 2.into());
    obj.set("b".into(), 3.into());

    assert_eq!(obj.keys(), vec!["b".to_string(), "a".to_string()]);
    assert_eq!(obj.get("b"), HostValue::from(3));
    assert!(obj.get("missing").is_undefined());
}

#[test]
fn test_array_grows_on_index_write() {
    let arr = HostValue::array(vec![]);
    arr.set_index(2, "x".into()).unwrap();

    assert_eq!(arr.get("length"), HostValue::from(3));
    assert!(arr.index(0).is_undefined());
    assert_eq!(arr.get("2"), HostValue::from("x"));
}

#[test]
fn test_uint8_array_stores_modulo_256() {
    let buf = HostValue::Object(HostObject::uint8_array(vec![0; 3]));
    buf.set_index(0, 257.into()).unwrap();
    buf.set_index(1, (-1).into()).unwrap();
    buf.set_index(2, 3.7.into()).unwrap();
    buf.set_index(9, 1.into()).unwrap();

    assert_eq!(buf.to_json(), json!([1, 255, 3]));
}

#[test]
fn test_set_on_primitive_fails() {
    assert!(HostValue::from(1).set("x", HostValue::Null).is_err());
    assert!(HostValue::Null.set_index(0, HostValue::Null).is_err());
}

#[test]
fn test_string_length() {
    assert_eq!(HostValue::from("héllo").get("length"), HostValue::from(5));
    assert!(HostValue::from(1).get("length").is_undefined());
}

#[test]
fn test_function_call_and_statics() {
    let double = HostFunction::new("double", |_, args| {
        Ok(HostValue::Number(args[0].float()? * 2.0))
    });
    double.set("answer".into(), 42.into());

    let value = HostValue::from(double);
    assert_eq!(value.invoke(&[21.into()]).unwrap(), HostValue::from(42));
    assert_eq!(value.get("name"), HostValue::from("double"));
    assert_eq!(value.get("answer"), HostValue::from(42));
    assert!(value.new_instance(&[]).is_err());
}

#[test]
fn test_call_missing_method() {
    let err = HostValue::object(Vec::<(String, HostValue)>::new())
        .call("nope", &[])
        .unwrap_err();
    assert!(matches!(err, BridgeError::Thrown(msg) if msg.contains("nope")));
}

#[test]
fn test_global_constructors() {
    let global = global();
    for name in ["Array", "Object", "Uint8Array"] {
        assert_eq!(global.get(name).type_of(), HostType::Function);
    }
}

#[test]
fn test_array_constructor() {
    let array = global().get("Array");
    let sized = array.new_instance(&[3.into()]).unwrap();
    assert_eq!(sized.get("length"), HostValue::from(3));

    let listed = array.new_instance(&["a".into(), "b".into()]).unwrap();
    assert_eq!(listed.to_json(), json!(["a", "b"]));

    assert!(array.new_instance(&[(-1).into()]).is_err());
    assert_eq!(array.call("isArray", &[listed]).unwrap(), HostValue::from(true));
}

#[test]
fn test_array_from_buffer() {
    let buf = HostValue::Object(HostObject::uint8_array(vec![1, 2, 3]));
    let arr = global().get("Array").call("from", &[buf]).unwrap();
    assert_eq!(arr.to_json(), json!([1, 2, 3]));
    assert_eq!(
        global().get("Array").call("isArray", &[arr]).unwrap(),
        HostValue::from(true)
    );
}

#[test]
fn test_object_keys() {
    let keys = global().get("Object");
    let obj = HostValue::object([("x", 1.into()), ("y", 2.into())]);

    assert_eq!(keys.call("keys", &[obj]).unwrap().to_json(), json!(["x", "y"]));
    assert_eq!(keys.call("keys", &[HostValue::array(vec![HostValue::Null])]).unwrap().to_json(), json!(["0"]));
    assert_eq!(keys.call("keys", &[5.into()]).unwrap().to_json(), json!([]));
    assert_eq!(
        keys.call("keys", &[HostValue::Null]).unwrap_err(),
        BridgeError::Shape(ShapeError::NullObject)
    );
}

#[test]
fn test_uint8_array_from_array_like() {
    let ctor = global().get("Uint8Array");
    let arr = HostValue::array(vec![1.into(), 300.into(), "7".into()]);
    let buf = ctor.call("from", &[arr]).unwrap();
    assert_eq!(buf.to_json(), json!([1, 44, 7]));

    let sized = ctor.new_instance(&[4.into()]).unwrap();
    assert_eq!(sized.get("length"), HostValue::from(4));
    assert!(ctor.invoke(&[]).is_err());
}

#[test]
fn test_constructors_reject_oversized_lengths() {
    let huge = HostValue::object([("length", HostValue::from(1e19))]);
    let range_error =
        |err: BridgeError| matches!(err, BridgeError::Thrown(msg) if msg.starts_with("RangeError"));

    let uint8_array = global().get("Uint8Array");
    assert!(range_error(uint8_array.new_instance(&[1e19.into()]).unwrap_err()));
    assert!(range_error(uint8_array.new_instance(&[1.5.into()]).unwrap_err()));
    assert!(range_error(uint8_array.call("from", &[huge.clone()]).unwrap_err()));
    assert!(range_error(global().get("Array").call("from", &[huge]).unwrap_err()));

    let small = HostValue::object([("length", HostValue::from(2)), ("0", HostValue::from(7))]);
    assert_eq!(uint8_array.call("from", &[small]).unwrap().to_json(), json!([7, 0]));
}

#[test]
fn test_copy_bytes() {
    let buf = HostValue::Object(HostObject::uint8_array(vec![0; 4]));
    assert_eq!(copy_bytes_to_host(&buf, &[9, 8, 7]).unwrap(), 3);
    assert_eq!(buf.to_json(), json!([9, 8, 7, 0]));

    let mut out = [0u8; 2];
    assert_eq!(copy_bytes_to_native(&mut out, &buf).unwrap(), 2);
    assert_eq!(out, [9, 8]);

    let not_buffer = HostValue::array(vec![]);
    assert!(copy_bytes_to_host(&not_buffer, &[1]).is_err());
    assert!(copy_bytes_to_native(&mut out, &not_buffer).is_err());
}

#[test]
fn test_json_round_trip() {
    let source = json!({"name": "rex", "age": 3, "tags": ["a", null], "weight": 1.5});
    let value = HostValue::from_json(&source);
    assert_eq!(value.to_json(), source);
    assert_eq!(value.get("tags").index(0), HostValue::from("a"));
}
