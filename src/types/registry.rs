//! Descriptor caches
//!
//! Primitive descriptors are built once per process and handed out as clones
//! of the same `Arc`. Named composite types are interned by name in a
//! concurrent map, so a type is described once however many signatures use it.

use super::{
    func, interface_of, map_of, slice_of, FloatWidth, FuncType, IntWidth, TypeDescriptor,
    TypeKind, TypeRef, UintWidth,
};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

struct Primitives {
    boolean: TypeRef,
    int: TypeRef,
    int8: TypeRef,
    int16: TypeRef,
    int32: TypeRef,
    int64: TypeRef,
    uint: TypeRef,
    uint8: TypeRef,
    uint16: TypeRef,
    uint32: TypeRef,
    uint64: TypeRef,
    uintptr: TypeRef,
    float32: TypeRef,
    float64: TypeRef,
    string: TypeRef,
    unsafe_pointer: TypeRef,
    any: TypeRef,
    bytes: TypeRef,
    handle: TypeRef,
}

static PRIMITIVES: Lazy<Primitives> = Lazy::new(|| {
    let prim = |kind: TypeKind| TypeDescriptor::new(kind).into_ref();
    let uint8 = prim(TypeKind::Uint(UintWidth::U8));

    Primitives {
        boolean: prim(TypeKind::Bool),
        int: prim(TypeKind::Int(IntWidth::Isize)),
        int8: prim(TypeKind::Int(IntWidth::I8)),
        int16: prim(TypeKind::Int(IntWidth::I16)),
        int32: prim(TypeKind::Int(IntWidth::I32)),
        int64: prim(TypeKind::Int(IntWidth::I64)),
        uint: prim(TypeKind::Uint(UintWidth::Usize)),
        uint16: prim(TypeKind::Uint(UintWidth::U16)),
        uint32: prim(TypeKind::Uint(UintWidth::U32)),
        uint64: prim(TypeKind::Uint(UintWidth::U64)),
        uintptr: prim(TypeKind::Uint(UintWidth::Uintptr)),
        float32: prim(TypeKind::Float(FloatWidth::F32)),
        float64: prim(TypeKind::Float(FloatWidth::F64)),
        string: prim(TypeKind::String),
        unsafe_pointer: prim(TypeKind::UnsafePointer),
        any: interface_of(Vec::<String>::new()).into_ref(),
        bytes: slice_of(uint8.clone()),
        handle: prim(TypeKind::Handle),
        uint8,
    }
});

macro_rules! primitive_accessors {
    ($($name:ident),* $(,)?) => {
        $(
            #[inline]
            pub fn $name() -> TypeRef {
                PRIMITIVES.$name.clone()
            }
        )*
    };
}

primitive_accessors!(
    boolean, int, int8, int16, int32, int64, uint, uint8, uint16, uint32, uint64, uintptr,
    float32, float64, string, unsafe_pointer, any, bytes, handle,
);

/// `map[string]any`, the natural type of host objects
pub(crate) static STRING_ANY_MAP: Lazy<TypeRef> = Lazy::new(|| map_of(string(), any()));

/// `func(...any) any`, the natural type of host functions
pub(crate) static ANY_FUNC: Lazy<TypeRef> =
    Lazy::new(|| func(FuncType::variadic(Vec::new(), any(), vec![any()])));

/// Interning table for named types
#[derive(Default)]
pub struct TypeRegistry {
    named: DashMap<String, TypeRef>,
}

/// Process-wide registry
pub static REGISTRY: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a named descriptor. The first registration under a name wins;
    /// later calls return the existing handle. Anonymous descriptors are
    /// returned as-is.
    pub fn intern(&self, descriptor: TypeDescriptor) -> TypeRef {
        let Some(name) = descriptor.name.clone() else {
            return descriptor.into_ref();
        };

        self.named
            .entry(name)
            .or_insert_with(|| {
                trace!(event = "type_interned", ty = %descriptor, "Type descriptor interned");
                descriptor.into_ref()
            })
            .clone()
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.named.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }
}
