//! Native type descriptors
//!
//! Design: a closed tagged variant instead of runtime reflection.
//! - `TypeKind` carries the per-kind payload (element types, fields, signature)
//! - `TypeVisitor` gives one method per kind, dispatched by `TypeDescriptor::accept`
//! - Descriptors are immutable and shared through `TypeRef`
//! - Primitive descriptors are process-wide singletons (see `registry`)

mod registry;
mod visitor;

pub use registry::{
    any, boolean, bytes, float32, float64, handle, int, int16, int32, int64, int8, string, uint,
    uint16, uint32, uint64, uint8, uintptr, unsafe_pointer, TypeRegistry, REGISTRY,
};
pub(crate) use registry::{ANY_FUNC, STRING_ANY_MAP};
pub use visitor::TypeVisitor;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an immutable descriptor
pub type TypeRef = Arc<TypeDescriptor>;

/// Signed integer widths (`Isize` is the platform word)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    Isize,
}

impl IntWidth {
    /// Narrow an `i64` to this width, wrapping like a numeric cast
    #[inline]
    pub const fn wrap(self, n: i64) -> i64 {
        match self {
            Self::I8 => n as i8 as i64,
            Self::I16 => n as i16 as i64,
            Self::I32 => n as i32 as i64,
            Self::I64 => n,
            Self::Isize => n as isize as i64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::Isize => "int",
        }
    }
}

/// Unsigned integer widths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UintWidth {
    U8,
    U16,
    U32,
    U64,
    Usize,
    Uintptr,
}

impl UintWidth {
    #[inline]
    pub const fn wrap(self, n: u64) -> u64 {
        match self {
            Self::U8 => n as u8 as u64,
            Self::U16 => n as u16 as u64,
            Self::U32 => n as u32 as u64,
            Self::U64 => n,
            Self::Usize | Self::Uintptr => n as usize as u64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::Usize => "uint",
            Self::Uintptr => "uintptr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    #[inline]
    pub fn round(self, f: f64) -> f64 {
        match self {
            Self::F32 => f as f32 as f64,
            Self::F64 => f,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

/// Kind plus per-kind payload
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Bool,
    Int(IntWidth),
    Uint(UintWidth),
    Float(FloatWidth),
    Complex64,
    Complex128,
    String,
    Array { elem: TypeRef, len: usize },
    Slice(TypeRef),
    Map { key: TypeRef, value: TypeRef },
    Pointer(TypeRef),
    Interface(InterfaceType),
    Struct(StructType),
    Func(FuncType),
    Chan(TypeRef),
    UnsafePointer,
    /// Opaque reference to a host value (natural type of host symbols)
    Handle,
}

/// Method set an interface requires
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfaceType {
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructType {
    pub fields: Vec<Field>,
}

/// Struct field. Only exported fields cross the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub exported: bool,
    pub tags: BTreeMap<String, String>,
}

impl Field {
    pub fn exported(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            exported: true,
            tags: BTreeMap::new(),
        }
    }

    pub fn private(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            exported: false,
            ..Self::exported(name, ty)
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Property name on the host side: the tag's name part, else the field name.
    ///
    /// `json:"bar,omitempty"` names the property `bar`; an empty name part
    /// (`json:",omitempty"`) keeps the field name.
    pub fn host_name(&self, tag_key: &str) -> &str {
        match self.tags.get(tag_key) {
            Some(tag) => match tag.split_once(',').map_or(tag.as_str(), |(name, _)| name) {
                "" => &self.name,
                name => name,
            },
            None => &self.name,
        }
    }
}

/// Function signature. When `variadic`, the last parameter is a slice type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<TypeRef>,
    pub results: Vec<TypeRef>,
    pub variadic: bool,
}

impl FuncType {
    pub fn new(params: Vec<TypeRef>, results: Vec<TypeRef>) -> Self {
        Self {
            params,
            results,
            variadic: false,
        }
    }

    /// Variadic signature; `rest` is the element type of the trailing slice
    pub fn variadic(mut fixed: Vec<TypeRef>, rest: TypeRef, results: Vec<TypeRef>) -> Self {
        fixed.push(slice_of(rest));
        Self {
            params: fixed,
            results,
            variadic: true,
        }
    }

    /// Number of parameters before the variadic slot
    #[inline]
    pub fn fixed_arity(&self) -> usize {
        if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    /// Element type of the variadic slot
    pub fn variadic_elem(&self) -> Option<&TypeRef> {
        if !self.variadic {
            return None;
        }
        match self.params.last().map(|p| &p.kind) {
            Some(TypeKind::Slice(elem)) => Some(elem),
            _ => None,
        }
    }
}

/// Immutable description of a native type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: Option<String>,
    pub kind: TypeKind,
    /// Method set of a named type, checked against interface targets
    pub methods: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            name: None,
            kind,
            methods: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn into_ref(self) -> TypeRef {
        Arc::new(self)
    }

    /// Dispatch to the visitor method for this kind
    pub fn accept<V: TypeVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.kind {
            TypeKind::Bool => visitor.visit_bool(),
            TypeKind::Int(width) => visitor.visit_int(*width),
            TypeKind::Uint(width) => visitor.visit_uint(*width),
            TypeKind::Float(width) => visitor.visit_float(*width),
            TypeKind::String => visitor.visit_string(),
            TypeKind::Array { elem, len } => visitor.visit_array(elem, *len),
            TypeKind::Slice(elem) => visitor.visit_slice(elem),
            TypeKind::Map { key, value } => visitor.visit_map(key, value),
            TypeKind::Pointer(elem) => visitor.visit_pointer(elem),
            TypeKind::Interface(iface) => visitor.visit_interface(iface),
            TypeKind::Struct(st) => visitor.visit_struct(st),
            TypeKind::Func(sig) => visitor.visit_func(sig),
            TypeKind::UnsafePointer => visitor.visit_unsafe_pointer(),
            TypeKind::Handle => visitor.visit_handle(),
            TypeKind::Complex64 | TypeKind::Complex128 | TypeKind::Chan(_) => {
                visitor.visit_unsupported(&self.kind)
            }
        }
    }

    /// Short kind name for diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            TypeKind::Bool => "bool",
            TypeKind::Int(w) => w.name(),
            TypeKind::Uint(w) => w.name(),
            TypeKind::Float(w) => w.name(),
            TypeKind::Complex64 => "complex64",
            TypeKind::Complex128 => "complex128",
            TypeKind::String => "string",
            TypeKind::Array { .. } => "array",
            TypeKind::Slice(_) => "slice",
            TypeKind::Map { .. } => "map",
            TypeKind::Pointer(_) => "ptr",
            TypeKind::Interface(_) => "interface",
            TypeKind::Struct(_) => "struct",
            TypeKind::Func(_) => "func",
            TypeKind::Chan(_) => "chan",
            TypeKind::UnsafePointer => "unsafe.Pointer",
            TypeKind::Handle => "handle",
        }
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self.kind, TypeKind::String)
    }

    /// `[]uint8`, the byte-buffer fast path type
    pub fn is_byte_slice(&self) -> bool {
        match &self.kind {
            TypeKind::Slice(elem) => matches!(elem.kind, TypeKind::Uint(UintWidth::U8)),
            _ => false,
        }
    }

    /// Does this type's method set cover the interface?
    pub fn implements(&self, iface: &InterfaceType) -> bool {
        iface.methods.iter().all(|m| self.methods.contains(m))
    }

    pub fn as_func(&self) -> Option<&FuncType> {
        match &self.kind {
            TypeKind::Func(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match &self.kind {
            TypeKind::Struct(st) => Some(st),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "{}", name);
        }
        match &self.kind {
            TypeKind::Array { elem, len } => write!(f, "[{}]{}", len, elem),
            TypeKind::Slice(elem) => write!(f, "[]{}", elem),
            TypeKind::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeKind::Pointer(elem) => write!(f, "*{}", elem),
            TypeKind::Chan(elem) => write!(f, "chan {}", elem),
            TypeKind::Interface(iface) if iface.methods.is_empty() => write!(f, "any"),
            TypeKind::Interface(iface) => write!(f, "interface {{ {} }}", iface.methods.join("; ")),
            TypeKind::Struct(st) => {
                let fields: Vec<String> = st
                    .fields
                    .iter()
                    .map(|field| format!("{} {}", field.name, field.ty))
                    .collect();
                write!(f, "struct {{ {} }}", fields.join("; "))
            }
            TypeKind::Func(sig) => {
                let mut params: Vec<String> = sig.params.iter().map(ToString::to_string).collect();
                if sig.variadic {
                    if let (Some(last), Some(elem)) = (params.last_mut(), sig.variadic_elem()) {
                        *last = format!("...{}", elem);
                    }
                }
                let results: Vec<String> = sig.results.iter().map(ToString::to_string).collect();
                match results.len() {
                    0 => write!(f, "func({})", params.join(", ")),
                    1 => write!(f, "func({}) {}", params.join(", "), results[0]),
                    _ => write!(f, "func({}) ({})", params.join(", "), results.join(", ")),
                }
            }
            _ => write!(f, "{}", self.kind_name()),
        }
    }
}

// Constructors for composite descriptors

pub fn array_of(elem: TypeRef, len: usize) -> TypeRef {
    TypeDescriptor::new(TypeKind::Array { elem, len }).into_ref()
}

pub fn slice_of(elem: TypeRef) -> TypeRef {
    TypeDescriptor::new(TypeKind::Slice(elem)).into_ref()
}

pub fn map_of(key: TypeRef, value: TypeRef) -> TypeRef {
    TypeDescriptor::new(TypeKind::Map { key, value }).into_ref()
}

pub fn pointer_to(elem: TypeRef) -> TypeRef {
    TypeDescriptor::new(TypeKind::Pointer(elem)).into_ref()
}

pub fn chan_of(elem: TypeRef) -> TypeRef {
    TypeDescriptor::new(TypeKind::Chan(elem)).into_ref()
}

pub fn struct_of(fields: Vec<Field>) -> TypeDescriptor {
    TypeDescriptor::new(TypeKind::Struct(StructType { fields }))
}

pub fn interface_of<I, S>(methods: I) -> TypeDescriptor
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TypeDescriptor::new(TypeKind::Interface(InterfaceType {
        methods: methods.into_iter().map(Into::into).collect(),
    }))
}

pub fn func(sig: FuncType) -> TypeRef {
    TypeDescriptor::new(TypeKind::Func(sig)).into_ref()
}
