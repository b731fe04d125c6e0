//! Global object and built-in constructors
//!
//! The global object is created once per thread. The bridge looks up the
//! `Array`, `Object` and `Uint8Array` constructors once per thread and
//! reuses the handles; they are never mutated afterwards.

use super::{HostFunction, HostObject, HostValue, ObjectData};
use crate::error::{BridgeError, BridgeResult, ShapeError};
use tracing::debug;

thread_local! {
    static GLOBAL: HostValue = install_globals();
    static CONSTRUCTORS: Constructors = Constructors::resolve();
}

/// The per-thread global object, where embeddings bind bridged functions
pub fn global() -> HostValue {
    GLOBAL.with(Clone::clone)
}

/// Cached constructor handles
pub(crate) struct Constructors {
    pub array: HostValue,
    pub object: HostValue,
    pub uint8_array: HostValue,
}

impl Constructors {
    fn resolve() -> Self {
        let global = global();
        Self {
            array: global.get("Array"),
            object: global.get("Object"),
            uint8_array: global.get("Uint8Array"),
        }
    }

    pub(crate) fn with<R>(f: impl FnOnce(&Constructors) -> R) -> R {
        CONSTRUCTORS.with(f)
    }
}

fn install_globals() -> HostValue {
    debug!(event = "host_globals_init", "Installing host global object");

    let global = HostObject::plain();
    global.set("Array".to_string(), array_constructor().into());
    global.set("Object".to_string(), object_constructor().into());
    global.set("Uint8Array".to_string(), uint8_array_constructor().into());
    HostValue::Object(global)
}

fn arg(args: &[HostValue], i: usize) -> HostValue {
    args.get(i).cloned().unwrap_or_default()
}

fn array_constructor() -> HostFunction {
    fn build(args: &[HostValue]) -> BridgeResult<HostValue> {
        match args {
            [HostValue::Number(n)] => {
                Ok(HostValue::array(vec![HostValue::Undefined; array_length(*n)?]))
            }
            _ => Ok(HostValue::array(args.to_vec())),
        }
    }

    let ctor = HostFunction::constructor("Array", |_, args| build(args), build);
    ctor.set(
        "from".to_string(),
        HostFunction::new("from", |_, args| Ok(HostValue::array(array_like_items(&arg(args, 0))?))).into(),
    );
    ctor.set(
        "isArray".to_string(),
        HostFunction::new("isArray", |_, args| {
            let is_array = match arg(args, 0) {
                HostValue::Object(obj) => matches!(&*obj.data(), ObjectData::Array(_)),
                _ => false,
            };
            Ok(HostValue::Boolean(is_array))
        })
        .into(),
    );
    ctor
}

fn object_constructor() -> HostFunction {
    fn build(args: &[HostValue]) -> BridgeResult<HostValue> {
        match arg(args, 0) {
            value @ (HostValue::Object(_) | HostValue::Function(_)) => Ok(value),
            _ => Ok(HostValue::Object(HostObject::plain())),
        }
    }

    let ctor = HostFunction::constructor("Object", |_, args| build(args), build);
    ctor.set(
        "keys".to_string(),
        HostFunction::new("keys", |_, args| {
            let keys = match arg(args, 0) {
                HostValue::Undefined | HostValue::Null => {
                    return Err(ShapeError::NullObject.into());
                }
                HostValue::Object(obj) => obj.keys(),
                _ => Vec::new(),
            };
            Ok(HostValue::array(keys.into_iter().map(HostValue::from).collect()))
        })
        .into(),
    );
    ctor
}

fn uint8_array_constructor() -> HostFunction {
    fn build(args: &[HostValue]) -> BridgeResult<HostValue> {
        match arg(args, 0) {
            HostValue::Number(n) => Ok(HostObject::uint8_array(vec![0; array_length(n)?]).into()),
            HostValue::Undefined => Ok(HostObject::uint8_array(Vec::new()).into()),
            source => Ok(bytes_from(&source)?.into()),
        }
    }

    let ctor = HostFunction::constructor(
        "Uint8Array",
        |_, _| Err(BridgeError::Thrown("TypeError: Constructor Uint8Array requires 'new'".into())),
        build,
    );
    ctor.set(
        "from".to_string(),
        HostFunction::new("from", |_, args| Ok(bytes_from(&arg(args, 0))?.into())).into(),
    );
    ctor
}

fn bytes_from(source: &HostValue) -> BridgeResult<HostObject> {
    if let HostValue::Object(obj) = source {
        if let ObjectData::Uint8Array(bytes) = &*obj.data() {
            return Ok(HostObject::uint8_array(bytes.clone()));
        }
    }
    let bytes = array_like_items(source)?
        .iter()
        .map(|v| to_uint8(to_number(v)))
        .collect();
    Ok(HostObject::uint8_array(bytes))
}

/// Elements of an array-like value: arrays, buffers, strings, and objects
/// with a numeric `length`
fn array_like_items(value: &HostValue) -> BridgeResult<Vec<HostValue>> {
    match value {
        HostValue::Object(obj) => {
            let plain_len = match &*obj.data() {
                ObjectData::Array(items) => return Ok(items.clone()),
                ObjectData::Uint8Array(bytes) => {
                    return Ok(bytes.iter().map(|b| HostValue::Number(*b as f64)).collect());
                }
                ObjectData::Plain(props) => match props.get("length") {
                    Some(HostValue::Number(n)) if *n > 0.0 => array_length(*n)?,
                    _ => 0,
                },
            };
            Ok((0..plain_len).map(|i| obj.index(i)).collect())
        }
        HostValue::String(s) => Ok(s.chars().map(|c| HostValue::from(c.to_string())).collect()),
        _ => Ok(Vec::new()),
    }
}

/// Largest length a host array or buffer can have
pub(crate) const MAX_LENGTH: f64 = u32::MAX as f64;

/// Validate a host length: a non-negative integer no larger than `MAX_LENGTH`
fn array_length(n: f64) -> BridgeResult<usize> {
    if n < 0.0 || n.fract() != 0.0 || n > MAX_LENGTH {
        return Err(BridgeError::Thrown("RangeError: Invalid array length".into()));
    }
    Ok(n as usize)
}

/// Numeric coercion of a host value
pub(crate) fn to_number(value: &HostValue) -> f64 {
    match value {
        HostValue::Number(n) => *n,
        HostValue::Boolean(b) => f64::from(u8::from(*b)),
        HostValue::Null => 0.0,
        HostValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

/// Byte conversion used by `Uint8Array` stores: truncate, then modulo 256
pub(crate) fn to_uint8(n: f64) -> u8 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc() as i64).rem_euclid(256) as u8
}

/// Bulk copy `src` into the host buffer `dst`; returns the bytes copied
pub fn copy_bytes_to_host(dst: &HostValue, src: &[u8]) -> BridgeResult<usize> {
    if let HostValue::Object(obj) = dst {
        if let ObjectData::Uint8Array(bytes) = &mut *obj.data_mut() {
            let n = bytes.len().min(src.len());
            bytes[..n].copy_from_slice(&src[..n]);
            return Ok(n);
        }
    }
    Err(BridgeError::host_mismatch("Uint8Array", dst.type_of()))
}

/// Bulk copy the host buffer `src` into `dst`; returns the bytes copied
pub fn copy_bytes_to_native(dst: &mut [u8], src: &HostValue) -> BridgeResult<usize> {
    if let HostValue::Object(obj) = src {
        if let ObjectData::Uint8Array(bytes) = &*obj.data() {
            let n = bytes.len().min(dst.len());
            dst[..n].copy_from_slice(&bytes[..n]);
            return Ok(n);
        }
    }
    Err(BridgeError::host_mismatch("Uint8Array", src.type_of()))
}
