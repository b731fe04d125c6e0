//! Host object model - the dynamically typed side of the bridge
//!
//! Design: reference semantics like a script engine's heap.
//! - Primitives (undefined, null, boolean, number, string, symbol) are immediate
//! - Objects and functions are `Rc` handles with identity
//! - Objects are plain (ordered own properties), arrays, or `Uint8Array` buffers
//! - Functions may be constructible and carry static properties
//!
//! Borrows of object storage never outlive a single accessor, so host code
//! can call back into bridged functions while holding values.

mod builtins;

pub use builtins::{copy_bytes_to_host, copy_bytes_to_native, global};
pub(crate) use builtins::{Constructors, MAX_LENGTH};

use crate::error::{BridgeError, BridgeResult};
use serde_json::{Map, Number, Value as Json};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Runtime tag of a host value (`typeof` plus null)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Symbol,
    Object,
    Function,
}

impl HostType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Symbol => "symbol",
            Self::Object => "object",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host value
#[derive(Clone, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(HostSymbol),
    Object(HostObject),
    Function(HostFunction),
}

impl HostValue {
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Rc::from(s.as_ref()))
    }

    /// New array holding `items`
    pub fn array(items: Vec<HostValue>) -> Self {
        Self::Object(HostObject::array(items))
    }

    /// New plain object with properties in the given order
    pub fn object<I, K>(props: I) -> Self
    where
        I: IntoIterator<Item = (K, HostValue)>,
        K: Into<String>,
    {
        let obj = HostObject::plain();
        for (k, v) in props {
            obj.set(k.into(), v);
        }
        Self::Object(obj)
    }

    pub fn type_of(&self) -> HostType {
        match self {
            Self::Undefined => HostType::Undefined,
            Self::Null => HostType::Null,
            Self::Boolean(_) => HostType::Boolean,
            Self::Number(_) => HostType::Number,
            Self::String(_) => HostType::String,
            Self::Symbol(_) => HostType::Symbol,
            Self::Object(_) => HostType::Object,
            Self::Function(_) => HostType::Function,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn bool(&self) -> BridgeResult<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(BridgeError::host_mismatch("boolean", other.type_of())),
        }
    }

    pub fn float(&self) -> BridgeResult<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            other => Err(BridgeError::host_mismatch("number", other.type_of())),
        }
    }

    /// Number truncated toward zero (saturating, NaN is 0)
    pub fn int(&self) -> BridgeResult<i64> {
        self.float().map(|n| n as i64)
    }

    /// String form of any value: strings as-is, other values as `<type: repr>`
    pub fn to_host_string(&self) -> String {
        match self {
            Self::String(s) => s.to_string(),
            Self::Boolean(b) => format!("<boolean: {}>", b),
            Self::Number(n) => format!("<number: {}>", number_to_string(*n)),
            other => format!("<{}>", other.type_of()),
        }
    }

    /// Property read; non-objects read as undefined except `length` of strings
    pub fn get(&self, name: &str) -> HostValue {
        match self {
            Self::Object(obj) => obj.get(name),
            Self::Function(f) => f.get(name),
            Self::String(s) if name == "length" => {
                HostValue::Number(s.encode_utf16().count() as f64)
            }
            _ => HostValue::Undefined,
        }
    }

    pub fn set(&self, name: impl Into<String>, value: HostValue) -> BridgeResult<()> {
        match self {
            Self::Object(obj) => {
                obj.set(name.into(), value);
                Ok(())
            }
            Self::Function(f) => {
                f.set(name.into(), value);
                Ok(())
            }
            other => Err(BridgeError::host_mismatch("object", other.type_of())),
        }
    }

    pub fn index(&self, i: usize) -> HostValue {
        match self {
            Self::Object(obj) => obj.index(i),
            _ => HostValue::Undefined,
        }
    }

    pub fn set_index(&self, i: usize, value: HostValue) -> BridgeResult<()> {
        match self {
            Self::Object(obj) => {
                obj.set_index(i, value);
                Ok(())
            }
            other => Err(BridgeError::host_mismatch("object", other.type_of())),
        }
    }

    /// Call this value as a function with `this` undefined
    pub fn invoke(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        match self {
            Self::Function(f) => f.call(&HostValue::Undefined, args),
            other => Err(BridgeError::host_mismatch("function", other.type_of())),
        }
    }

    /// Call the method `name` with this value as `this`
    pub fn call(&self, name: &str, args: &[HostValue]) -> BridgeResult<HostValue> {
        match self.get(name) {
            HostValue::Function(f) => f.call(self, args),
            _ => Err(BridgeError::Thrown(format!(
                "TypeError: {}.{} is not a function",
                self.type_of(),
                name
            ))),
        }
    }

    /// `new this(...args)`
    pub fn new_instance(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        match self {
            Self::Function(f) => f.construct(args),
            other => Err(BridgeError::Thrown(format!(
                "TypeError: {} is not a constructor",
                other.type_of()
            ))),
        }
    }

    /// Structural snapshot as JSON. Functions, symbols and undefined become
    /// null; cyclic objects are not supported.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Undefined | Self::Null | Self::Symbol(_) | Self::Function(_) => Json::Null,
            Self::Boolean(b) => Json::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => Json::String(s.to_string()),
            Self::Object(obj) => match &*obj.data() {
                ObjectData::Plain(props) => {
                    let mut map = Map::new();
                    for key in props.keys() {
                        if let Some(v) = props.get(key) {
                            map.insert(key.clone(), v.to_json());
                        }
                    }
                    Json::Object(map)
                }
                ObjectData::Array(items) => Json::Array(items.iter().map(Self::to_json).collect()),
                ObjectData::Uint8Array(bytes) => {
                    Json::Array(bytes.iter().map(|b| Json::from(*b)).collect())
                }
            },
        }
    }

    /// Build host values from JSON, like `JSON.parse`
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(*b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::string(s),
            Json::Array(items) => Self::array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::object(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v)))),
        }
    }
}

impl PartialEq for HostValue {
    /// Strict equality: primitives by value, objects, functions and symbols by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a.ptr_eq(b),
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            (Self::Function(a), Self::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&number_to_string(*n)),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Symbol(sym) => write!(f, "Symbol({})", sym.description()),
            Self::Object(obj) => write!(f, "[object {}]", obj.class_name()),
            Self::Function(func) => write!(f, "[function {}]", func.name()),
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        Self::String(Rc::from(s))
    }
}

impl From<HostObject> for HostValue {
    fn from(obj: HostObject) -> Self {
        Self::Object(obj)
    }
}

impl From<HostFunction> for HostValue {
    fn from(f: HostFunction) -> Self {
        Self::Function(f)
    }
}

/// Number formatting the way the host prints numbers: integral values
/// without a fraction, `NaN`, `Infinity`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

fn number_to_json(n: f64) -> Json {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n == n.trunc() && n.abs() <= MAX_SAFE {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

/// Unique symbol; equality is identity
#[derive(Clone)]
pub struct HostSymbol(Rc<str>);

impl HostSymbol {
    pub fn new(description: &str) -> Self {
        Self(Rc::from(description))
    }

    pub fn description(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Own properties in insertion order
#[derive(Clone, Default)]
pub struct Properties {
    order: Vec<String>,
    values: HashMap<String, HostValue>,
}

impl Properties {
    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: String, value: HostValue) {
        if !self.values.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn keys(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Object storage
pub enum ObjectData {
    Plain(Properties),
    Array(Vec<HostValue>),
    Uint8Array(Vec<u8>),
}

/// Handle to a host object
#[derive(Clone)]
pub struct HostObject(Rc<RefCell<ObjectData>>);

impl HostObject {
    pub fn plain() -> Self {
        Self::from_data(ObjectData::Plain(Properties::default()))
    }

    pub fn array(items: Vec<HostValue>) -> Self {
        Self::from_data(ObjectData::Array(items))
    }

    pub fn uint8_array(bytes: Vec<u8>) -> Self {
        Self::from_data(ObjectData::Uint8Array(bytes))
    }

    fn from_data(data: ObjectData) -> Self {
        Self(Rc::new(RefCell::new(data)))
    }

    pub(crate) fn data(&self) -> Ref<'_, ObjectData> {
        self.0.borrow()
    }

    pub(crate) fn data_mut(&self) -> RefMut<'_, ObjectData> {
        self.0.borrow_mut()
    }

    pub fn class_name(&self) -> &'static str {
        match &*self.data() {
            ObjectData::Plain(_) => "Object",
            ObjectData::Array(_) => "Array",
            ObjectData::Uint8Array(_) => "Uint8Array",
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, name: &str) -> HostValue {
        match &*self.data() {
            ObjectData::Plain(props) => props.get(name).cloned().unwrap_or_default(),
            ObjectData::Array(items) => match name {
                "length" => HostValue::Number(items.len() as f64),
                _ => parse_index(name)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            },
            ObjectData::Uint8Array(bytes) => match name {
                "length" => HostValue::Number(bytes.len() as f64),
                _ => parse_index(name)
                    .and_then(|i| bytes.get(i))
                    .map(|b| HostValue::Number(*b as f64))
                    .unwrap_or_default(),
            },
        }
    }

    /// Property write. Arrays and buffers only accept index names; other
    /// names are dropped.
    pub fn set(&self, name: String, value: HostValue) {
        if let ObjectData::Plain(props) = &mut *self.data_mut() {
            props.set(name, value);
            return;
        }
        if let Some(i) = parse_index(&name) {
            self.set_index(i, value);
        }
    }

    pub fn index(&self, i: usize) -> HostValue {
        match &*self.data() {
            ObjectData::Plain(props) => props.get(&i.to_string()).cloned().unwrap_or_default(),
            ObjectData::Array(items) => items.get(i).cloned().unwrap_or_default(),
            ObjectData::Uint8Array(bytes) => bytes
                .get(i)
                .map(|b| HostValue::Number(*b as f64))
                .unwrap_or_default(),
        }
    }

    /// Index write. Arrays grow to fit; buffers ignore out-of-range writes
    /// and store numbers modulo 256.
    pub fn set_index(&self, i: usize, value: HostValue) {
        match &mut *self.data_mut() {
            ObjectData::Plain(props) => props.set(i.to_string(), value),
            ObjectData::Array(items) => {
                if i >= items.len() {
                    items.resize(i + 1, HostValue::Undefined);
                }
                items[i] = value;
            }
            ObjectData::Uint8Array(bytes) => {
                if let Some(slot) = bytes.get_mut(i) {
                    *slot = builtins::to_uint8(builtins::to_number(&value));
                }
            }
        }
    }

    /// Own enumerable property names (indices for arrays and buffers)
    pub fn keys(&self) -> Vec<String> {
        match &*self.data() {
            ObjectData::Plain(props) => props.keys().to_vec(),
            ObjectData::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            ObjectData::Uint8Array(bytes) => (0..bytes.len()).map(|i| i.to_string()).collect(),
        }
    }
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    name.parse().ok()
}

pub type HostFn = dyn Fn(&HostValue, &[HostValue]) -> BridgeResult<HostValue>;
pub type HostCtor = dyn Fn(&[HostValue]) -> BridgeResult<HostValue>;

struct FunctionData {
    name: String,
    call: Box<HostFn>,
    construct: Option<Box<HostCtor>>,
    statics: RefCell<Properties>,
}

/// Handle to a host function
#[derive(Clone)]
pub struct HostFunction(Rc<FunctionData>);

impl HostFunction {
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> BridgeResult<HostValue> + 'static,
    {
        Self(Rc::new(FunctionData {
            name: name.into(),
            call: Box::new(call),
            construct: None,
            statics: RefCell::new(Properties::default()),
        }))
    }

    /// Function usable with `new`
    pub fn constructor<F, C>(name: impl Into<String>, call: F, construct: C) -> Self
    where
        F: Fn(&HostValue, &[HostValue]) -> BridgeResult<HostValue> + 'static,
        C: Fn(&[HostValue]) -> BridgeResult<HostValue> + 'static,
    {
        Self(Rc::new(FunctionData {
            name: name.into(),
            call: Box::new(call),
            construct: Some(Box::new(construct)),
            statics: RefCell::new(Properties::default()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn call(&self, this: &HostValue, args: &[HostValue]) -> BridgeResult<HostValue> {
        (self.0.call)(this, args)
    }

    pub fn construct(&self, args: &[HostValue]) -> BridgeResult<HostValue> {
        match &self.0.construct {
            Some(construct) => construct(args),
            None => Err(BridgeError::Thrown(format!(
                "TypeError: {} is not a constructor",
                self.0.name
            ))),
        }
    }

    pub fn get(&self, name: &str) -> HostValue {
        if name == "name" {
            return HostValue::string(&self.0.name);
        }
        self.0.statics.borrow().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: String, value: HostValue) {
        self.0.statics.borrow_mut().set(name, value);
    }
}

#[cfg(test)]
mod tests;
