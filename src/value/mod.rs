//! Native values - the statically typed side of the bridge
//!
//! Design: one variant per kind, each able to report its descriptor.
//! Composite variants carry their `TypeRef` so element, key and field types
//! survive even when a container is empty.

mod reflect;

pub use reflect::Reflect;

use crate::error::{BridgeError, BridgeResult};
use crate::host::HostValue;
use crate::types::{
    self, FloatWidth, FuncType, InterfaceType, IntWidth, StructType, TypeKind, TypeRef,
    TypeVisitor, UintWidth,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable pointee storage
pub type Slot = Rc<RefCell<NativeValue>>;

#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(IntWidth, i64),
    Uint(UintWidth, u64),
    Float(FloatWidth, f64),
    String(String),
    /// `[]uint8`, eligible for the bulk copy path
    Bytes(Vec<u8>),
    Array { ty: TypeRef, items: Vec<NativeValue> },
    Slice { ty: TypeRef, items: Vec<NativeValue> },
    Map { ty: TypeRef, entries: Vec<(NativeValue, NativeValue)> },
    /// `target` is `None` for a nil pointer
    Pointer { ty: TypeRef, target: Option<Slot> },
    /// `value` is `None` for a nil interface
    Interface { ty: TypeRef, value: Option<Box<NativeValue>> },
    /// Field values in declaration order
    Struct { ty: TypeRef, fields: Vec<NativeValue> },
    /// `func` is `None` for a nil function
    Func { ty: TypeRef, func: Option<NativeFunction> },
    /// Raw address. Never dereferenced by the bridge.
    UnsafePointer(usize),
    /// Opaque reference to a host value
    Handle(HostValue),
    /// Value of a kind outside the conversion surface (channels, complex numbers)
    Unsupported { ty: TypeRef },
}

impl NativeValue {
    /// Descriptor of this value's dynamic type
    pub fn type_of(&self) -> TypeRef {
        match self {
            Self::Bool(_) => types::boolean(),
            Self::Int(width, _) => int_type(*width),
            Self::Uint(width, _) => uint_type(*width),
            Self::Float(width, _) => float_type(*width),
            Self::String(_) => types::string(),
            Self::Bytes(_) => types::bytes(),
            Self::Array { ty, .. }
            | Self::Slice { ty, .. }
            | Self::Map { ty, .. }
            | Self::Pointer { ty, .. }
            | Self::Interface { ty, .. }
            | Self::Struct { ty, .. }
            | Self::Func { ty, .. }
            | Self::Unsupported { ty } => ty.clone(),
            Self::UnsafePointer(_) => types::unsafe_pointer(),
            Self::Handle(_) => types::handle(),
        }
    }

    /// Zero value of `ty`
    pub fn zero(ty: &TypeRef) -> Self {
        ty.accept(&mut ZeroValue { ty })
    }

    // Constructors

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Slice of `elem` holding `items`
    pub fn slice(elem: TypeRef, items: Vec<NativeValue>) -> Self {
        Self::Slice {
            ty: types::slice_of(elem),
            items,
        }
    }

    /// Array of `elem` whose length is `items.len()`
    pub fn array(elem: TypeRef, items: Vec<NativeValue>) -> Self {
        Self::Array {
            ty: types::array_of(elem, items.len()),
            items,
        }
    }

    /// `map[string]value` from string-keyed entries
    pub fn string_map<I, K>(value: TypeRef, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, NativeValue)>,
        K: Into<String>,
    {
        Self::Map {
            ty: types::map_of(types::string(), value),
            entries: entries
                .into_iter()
                .map(|(k, v)| (Self::String(k.into()), v))
                .collect(),
        }
    }

    /// Pointer to `elem`; `None` is the nil pointer
    pub fn pointer(elem: TypeRef, target: Option<NativeValue>) -> Self {
        Self::Pointer {
            ty: types::pointer_to(elem),
            target: target.map(|v| Rc::new(RefCell::new(v))),
        }
    }

    /// Value boxed in the empty interface
    pub fn any(value: NativeValue) -> Self {
        Self::Interface {
            ty: types::any(),
            value: Some(Box::new(value)),
        }
    }

    pub fn func(function: NativeFunction) -> Self {
        Self::Func {
            ty: function.ty().clone(),
            func: Some(function),
        }
    }

    /// Struct of type `ty` with field values in declaration order
    pub fn structure(ty: TypeRef, fields: Vec<NativeValue>) -> BridgeResult<Self> {
        let declared = match &ty.kind {
            TypeKind::Struct(st) => st.fields.len(),
            _ => return Err(BridgeError::native_mismatch("struct", ty.to_string())),
        };
        if declared != fields.len() {
            return Err(BridgeError::native_mismatch(
                format!("{} fields", declared),
                format!("{} fields", fields.len()),
            ));
        }
        Ok(Self::Struct { ty, fields })
    }

    // Accessors

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(_, n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(_, n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(_, f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Elements of an array or slice
    pub fn items(&self) -> Option<&[NativeValue]> {
        match self {
            Self::Array { items, .. } | Self::Slice { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Struct field by declared name
    pub fn field(&self, name: &str) -> Option<&NativeValue> {
        match self {
            Self::Struct { ty, fields } => ty
                .as_struct()?
                .fields
                .iter()
                .position(|f| f.name == name)
                .and_then(|i| fields.get(i)),
            _ => None,
        }
    }

    /// Entry of a string-keyed map
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        match self {
            Self::Map { entries, .. } => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Copy of the pointee, `None` for nil or non-pointers
    pub fn pointee(&self) -> Option<NativeValue> {
        match self {
            Self::Pointer { target: Some(cell), .. } => Some(cell.borrow().clone()),
            _ => None,
        }
    }

    /// Dynamic value held by an interface
    pub fn dynamic(&self) -> Option<&NativeValue> {
        match self {
            Self::Interface { value: Some(v), .. } => Some(v),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&NativeFunction> {
        match self {
            Self::Func { func: Some(f), .. } => Some(f),
            _ => None,
        }
    }

    /// Nil pointer, interface or function
    pub fn is_nil(&self) -> bool {
        matches!(
            self,
            Self::Pointer { target: None, .. }
                | Self::Interface { value: None, .. }
                | Self::Func { func: None, .. }
        )
    }
}

fn int_type(width: IntWidth) -> TypeRef {
    match width {
        IntWidth::I8 => types::int8(),
        IntWidth::I16 => types::int16(),
        IntWidth::I32 => types::int32(),
        IntWidth::I64 => types::int64(),
        IntWidth::Isize => types::int(),
    }
}

fn uint_type(width: UintWidth) -> TypeRef {
    match width {
        UintWidth::U8 => types::uint8(),
        UintWidth::U16 => types::uint16(),
        UintWidth::U32 => types::uint32(),
        UintWidth::U64 => types::uint64(),
        UintWidth::Usize => types::uint(),
        UintWidth::Uintptr => types::uintptr(),
    }
}

fn float_type(width: FloatWidth) -> TypeRef {
    match width {
        FloatWidth::F32 => types::float32(),
        FloatWidth::F64 => types::float64(),
    }
}

/// Builds the zero value of a type
struct ZeroValue<'a> {
    ty: &'a TypeRef,
}

impl TypeVisitor for ZeroValue<'_> {
    type Output = NativeValue;

    fn visit_bool(&mut self) -> NativeValue {
        NativeValue::Bool(false)
    }

    fn visit_int(&mut self, width: IntWidth) -> NativeValue {
        NativeValue::Int(width, 0)
    }

    fn visit_uint(&mut self, width: UintWidth) -> NativeValue {
        NativeValue::Uint(width, 0)
    }

    fn visit_float(&mut self, width: FloatWidth) -> NativeValue {
        NativeValue::Float(width, 0.0)
    }

    fn visit_string(&mut self) -> NativeValue {
        NativeValue::String(String::new())
    }

    fn visit_array(&mut self, elem: &TypeRef, len: usize) -> NativeValue {
        NativeValue::Array {
            ty: self.ty.clone(),
            items: (0..len).map(|_| NativeValue::zero(elem)).collect(),
        }
    }

    fn visit_slice(&mut self, _elem: &TypeRef) -> NativeValue {
        if self.ty.is_byte_slice() {
            return NativeValue::Bytes(Vec::new());
        }
        NativeValue::Slice {
            ty: self.ty.clone(),
            items: Vec::new(),
        }
    }

    fn visit_map(&mut self, _key: &TypeRef, _value: &TypeRef) -> NativeValue {
        NativeValue::Map {
            ty: self.ty.clone(),
            entries: Vec::new(),
        }
    }

    fn visit_pointer(&mut self, _elem: &TypeRef) -> NativeValue {
        NativeValue::Pointer {
            ty: self.ty.clone(),
            target: None,
        }
    }

    fn visit_interface(&mut self, _iface: &InterfaceType) -> NativeValue {
        NativeValue::Interface {
            ty: self.ty.clone(),
            value: None,
        }
    }

    fn visit_struct(&mut self, st: &StructType) -> NativeValue {
        NativeValue::Struct {
            ty: self.ty.clone(),
            fields: st.fields.iter().map(|f| NativeValue::zero(&f.ty)).collect(),
        }
    }

    fn visit_func(&mut self, _sig: &FuncType) -> NativeValue {
        NativeValue::Func {
            ty: self.ty.clone(),
            func: None,
        }
    }

    fn visit_unsafe_pointer(&mut self) -> NativeValue {
        NativeValue::UnsafePointer(0)
    }

    fn visit_handle(&mut self) -> NativeValue {
        NativeValue::Handle(HostValue::Undefined)
    }

    fn visit_unsupported(&mut self, _kind: &TypeKind) -> NativeValue {
        NativeValue::Unsupported { ty: self.ty.clone() }
    }
}

pub type NativeFn = dyn Fn(Vec<NativeValue>) -> BridgeResult<Vec<NativeValue>>;

/// A native function value: signature plus body.
///
/// Variadic functions receive their trailing arguments packed into one
/// slice value in the last position.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    ty: TypeRef,
    body: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(sig: FuncType, body: F) -> Self
    where
        F: Fn(Vec<NativeValue>) -> BridgeResult<Vec<NativeValue>> + 'static,
    {
        Self {
            name: Rc::from("anonymous"),
            ty: types::func(sig),
            body: Rc::new(body),
        }
    }

    /// Function of an existing func descriptor
    pub fn with_type<F>(ty: TypeRef, body: F) -> BridgeResult<Self>
    where
        F: Fn(Vec<NativeValue>) -> BridgeResult<Vec<NativeValue>> + 'static,
    {
        if ty.as_func().is_none() {
            return Err(BridgeError::native_mismatch("func", ty.to_string()));
        }
        Ok(Self {
            name: Rc::from("anonymous"),
            ty,
            body: Rc::new(body),
        })
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Rc::from(name);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn signature(&self) -> &FuncType {
        match &self.ty.kind {
            TypeKind::Func(sig) => sig,
            _ => unreachable!("native function built without a func descriptor"),
        }
    }

    /// Call with one value per declared parameter
    pub fn call(&self, args: Vec<NativeValue>) -> BridgeResult<Vec<NativeValue>> {
        let sig = self.signature();
        if args.len() != sig.params.len() {
            return Err(BridgeError::Arity {
                expected: sig.params.len(),
                got: args.len(),
            });
        }

        let results = (self.body)(args)?;
        if results.len() != sig.results.len() {
            return Err(BridgeError::native_mismatch(
                format!("{} results from {}", sig.results.len(), self.name),
                format!("{} results", results.len()),
            ));
        }
        Ok(results)
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func {} {}", self.name, self.ty)
    }
}
