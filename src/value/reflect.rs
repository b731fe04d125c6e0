//! Descriptors and values for plain Rust types

use super::NativeValue;
use crate::types::{self, FloatWidth, IntWidth, TypeRef, UintWidth};
use std::collections::HashMap;

/// A Rust type with a fixed native descriptor.
///
/// `from_native` is strict about widths: an `int32` value does not read back
/// as `i64`.
pub trait Reflect: Sized {
    fn descriptor() -> TypeRef;
    fn into_native(self) -> NativeValue;
    fn from_native(value: &NativeValue) -> Option<Self>;
}

impl Reflect for bool {
    fn descriptor() -> TypeRef {
        types::boolean()
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Bool(self)
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! reflect_int {
    ($($ty:ty => $width:ident, $desc:ident);* $(;)?) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> TypeRef {
                    types::$desc()
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::Int(IntWidth::$width, self as i64)
                }

                fn from_native(value: &NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::Int(IntWidth::$width, n) => Some(*n as $ty),
                        _ => None,
                    }
                }
            }
        )*
    };
}

macro_rules! reflect_uint {
    ($($ty:ty => $width:ident, $desc:ident);* $(;)?) => {
        $(
            impl Reflect for $ty {
                fn descriptor() -> TypeRef {
                    types::$desc()
                }

                fn into_native(self) -> NativeValue {
                    NativeValue::Uint(UintWidth::$width, self as u64)
                }

                fn from_native(value: &NativeValue) -> Option<Self> {
                    match value {
                        NativeValue::Uint(UintWidth::$width, n) => Some(*n as $ty),
                        _ => None,
                    }
                }
            }
        )*
    };
}

reflect_int! {
    i8 => I8, int8;
    i16 => I16, int16;
    i32 => I32, int32;
    i64 => I64, int64;
    isize => Isize, int;
}

reflect_uint! {
    u8 => U8, uint8;
    u16 => U16, uint16;
    u32 => U32, uint32;
    u64 => U64, uint64;
    usize => Usize, uint;
}

impl Reflect for f32 {
    fn descriptor() -> TypeRef {
        types::float32()
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Float(FloatWidth::F32, self as f64)
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Float(FloatWidth::F32, f) => Some(*f as f32),
            _ => None,
        }
    }
}

impl Reflect for f64 {
    fn descriptor() -> TypeRef {
        types::float64()
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Float(FloatWidth::F64, self)
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Float(FloatWidth::F64, f) => Some(*f),
            _ => None,
        }
    }
}

impl Reflect for String {
    fn descriptor() -> TypeRef {
        types::string()
    }

    fn into_native(self) -> NativeValue {
        NativeValue::String(self)
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

/// Slices. `Vec<u8>` becomes `NativeValue::Bytes`.
impl<T: Reflect> Reflect for Vec<T> {
    fn descriptor() -> TypeRef {
        types::slice_of(T::descriptor())
    }

    fn into_native(self) -> NativeValue {
        let items: Vec<NativeValue> = self.into_iter().map(Reflect::into_native).collect();
        let ty = Self::descriptor();
        if ty.is_byte_slice() {
            let bytes = items.iter().filter_map(NativeValue::as_u64).map(|b| b as u8).collect();
            return NativeValue::Bytes(bytes);
        }
        NativeValue::Slice { ty, items }
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Bytes(bytes) => bytes
                .iter()
                .map(|b| T::from_native(&NativeValue::Uint(UintWidth::U8, *b as u64)))
                .collect(),
            NativeValue::Slice { items, .. } | NativeValue::Array { items, .. } => {
                items.iter().map(T::from_native).collect()
            }
            _ => None,
        }
    }
}

/// `map[string]T`
impl<T: Reflect> Reflect for HashMap<String, T> {
    fn descriptor() -> TypeRef {
        types::map_of(types::string(), T::descriptor())
    }

    fn into_native(self) -> NativeValue {
        NativeValue::Map {
            ty: Self::descriptor(),
            entries: self
                .into_iter()
                .map(|(k, v)| (NativeValue::String(k), v.into_native()))
                .collect(),
        }
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Map { entries, .. } => entries
                .iter()
                .map(|(k, v)| Some((k.as_str()?.to_owned(), T::from_native(v)?)))
                .collect(),
            _ => None,
        }
    }
}

/// `*T`; `None` is the nil pointer
impl<T: Reflect> Reflect for Option<T> {
    fn descriptor() -> TypeRef {
        types::pointer_to(T::descriptor())
    }

    fn into_native(self) -> NativeValue {
        NativeValue::pointer(T::descriptor(), self.map(Reflect::into_native))
    }

    fn from_native(value: &NativeValue) -> Option<Self> {
        match value {
            NativeValue::Pointer { target: Some(slot), .. } => {
                T::from_native(&slot.borrow()).map(Some)
            }
            NativeValue::Pointer { target: None, .. } => Some(None),
            _ => None,
        }
    }
}
