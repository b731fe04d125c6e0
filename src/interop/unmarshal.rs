//! Host → native conversions
//!
//! One visitor method per target kind. Failures abort the whole conversion;
//! the only permissive cases are absent struct properties and null or
//! undefined pointer targets.

use super::{record_fast_path, Bridge};
use crate::error::{BridgeError, BridgeResult, ShapeError};
use crate::host::{copy_bytes_to_native, Constructors, HostValue, MAX_LENGTH};
use crate::logging::{log_fast_path, log_type_conversion};
use crate::types::{
    self, FloatWidth, FuncType, IntWidth, InterfaceType, StructType, TypeKind, TypeRef,
    TypeVisitor, UintWidth,
};
use crate::value::NativeValue;
use std::cell::RefCell;
use std::rc::Rc;

impl Bridge {
    /// Convert a host value to the native shape `ty` describes
    pub fn to_native(&self, value: &HostValue, ty: &TypeRef) -> BridgeResult<NativeValue> {
        log_type_conversion(value.type_of().name(), ty.kind_name());
        ty.accept(&mut Unmarshal {
            bridge: self,
            value,
            ty,
        })
    }
}

struct Unmarshal<'a> {
    bridge: &'a Bridge,
    value: &'a HostValue,
    ty: &'a TypeRef,
}

impl Unmarshal<'_> {
    /// Length of a host sequence. Must be an integer in `0..=MAX_LENGTH`.
    fn length(&self) -> BridgeResult<usize> {
        match self.value.get("length") {
            HostValue::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= MAX_LENGTH => {
                Ok(n as usize)
            }
            HostValue::Number(n) => Err(ShapeError::InvalidLength(n).into()),
            _ => Err(BridgeError::host_mismatch("array", self.value.type_of())),
        }
    }

    fn elements(&self, elem: &TypeRef, len: usize) -> BridgeResult<Vec<NativeValue>> {
        (0..len)
            .map(|i| self.bridge.to_native(&self.value.index(i), elem))
            .collect()
    }

    fn bytes(&self, len: usize) -> BridgeResult<Vec<u8>> {
        if self.bridge.byte_fast_path() {
            let uint8_array = Constructors::with(|c| c.uint8_array.clone());
            let buffer = uint8_array.call("from", &[self.value.clone()])?;
            let mut bytes = vec![0; len];
            let copied = copy_bytes_to_native(&mut bytes, &buffer)?;
            record_fast_path(copied);
            log_fast_path("to_native", copied);
            return Ok(bytes);
        }

        let elem = types::uint8();
        self.elements(&elem, len)?
            .iter()
            .map(|b| {
                b.as_u64()
                    .map(|n| n as u8)
                    .ok_or_else(|| BridgeError::native_mismatch("uint8", b.type_of().to_string()))
            })
            .collect()
    }
}

/// Value of a struct field whose property is absent: the zero value, except
/// pointers, which get fresh zero-valued storage
fn absent_value(ty: &TypeRef) -> NativeValue {
    match &ty.kind {
        TypeKind::Pointer(elem) => NativeValue::Pointer {
            ty: ty.clone(),
            target: Some(Rc::new(RefCell::new(NativeValue::zero(elem)))),
        },
        _ => NativeValue::zero(ty),
    }
}

impl TypeVisitor for Unmarshal<'_> {
    type Output = BridgeResult<NativeValue>;

    fn visit_bool(&mut self) -> Self::Output {
        self.value.bool().map(NativeValue::Bool)
    }

    fn visit_int(&mut self, width: IntWidth) -> Self::Output {
        Ok(NativeValue::Int(width, width.wrap(self.value.int()?)))
    }

    fn visit_uint(&mut self, width: UintWidth) -> Self::Output {
        Ok(NativeValue::Uint(width, width.wrap(self.value.int()? as u64)))
    }

    fn visit_float(&mut self, width: FloatWidth) -> Self::Output {
        Ok(NativeValue::Float(width, width.round(self.value.float()?)))
    }

    fn visit_string(&mut self) -> Self::Output {
        Ok(NativeValue::String(self.value.to_host_string()))
    }

    fn visit_array(&mut self, elem: &TypeRef, len: usize) -> Self::Output {
        let available = self.length()?;
        if available < len {
            return Err(ShapeError::IndexOutOfRange {
                index: available,
                len: available,
            }
            .into());
        }

        Ok(NativeValue::Array {
            ty: self.ty.clone(),
            items: self.elements(elem, len)?,
        })
    }

    fn visit_slice(&mut self, elem: &TypeRef) -> Self::Output {
        if self.value.is_nullish() {
            return Ok(NativeValue::zero(self.ty));
        }

        let len = self.length()?;
        if self.ty.is_byte_slice() {
            return self.bytes(len).map(NativeValue::Bytes);
        }

        Ok(NativeValue::Slice {
            ty: self.ty.clone(),
            items: self.elements(elem, len)?,
        })
    }

    fn visit_map(&mut self, key: &TypeRef, value: &TypeRef) -> Self::Output {
        if !key.is_string() {
            return Err(ShapeError::NonStringMapKey(key.to_string()).into());
        }

        let object = Constructors::with(|c| c.object.clone());
        let keys = object.call("keys", &[self.value.clone()])?;
        let count = match keys.get("length") {
            HostValue::Number(n) => n as usize,
            _ => 0,
        };

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let name = keys.index(i).to_host_string();
            let item = self.bridge.to_native(&self.value.get(&name), value)?;
            entries.push((NativeValue::String(name), item));
        }

        Ok(NativeValue::Map {
            ty: self.ty.clone(),
            entries,
        })
    }

    fn visit_pointer(&mut self, elem: &TypeRef) -> Self::Output {
        let pointee = if self.value.is_nullish() {
            NativeValue::zero(elem)
        } else {
            self.bridge.to_native(self.value, elem)?
        };

        Ok(NativeValue::Pointer {
            ty: self.ty.clone(),
            target: Some(Rc::new(RefCell::new(pointee))),
        })
    }

    fn visit_interface(&mut self, iface: &InterfaceType) -> Self::Output {
        let Some(natural) = self.bridge.natural_value(self.value)? else {
            return Ok(NativeValue::Interface {
                ty: self.ty.clone(),
                value: None,
            });
        };

        let natural_ty = natural.type_of();
        if !natural_ty.implements(iface) {
            return Err(BridgeError::Capability {
                interface: self.ty.to_string(),
                found: natural_ty.to_string(),
            });
        }

        Ok(NativeValue::Interface {
            ty: self.ty.clone(),
            value: Some(Box::new(natural)),
        })
    }

    fn visit_struct(&mut self, st: &StructType) -> Self::Output {
        if !matches!(self.value, HostValue::Object(_) | HostValue::Function(_)) {
            return Err(BridgeError::host_mismatch("object", self.value.type_of()));
        }

        let fields = st
            .fields
            .iter()
            .map(|field| {
                if !field.exported {
                    return Ok(NativeValue::zero(&field.ty));
                }
                match self.value.get(field.host_name(self.bridge.tag_key())) {
                    HostValue::Undefined => Ok(absent_value(&field.ty)),
                    prop => self.bridge.to_native(&prop, &field.ty),
                }
            })
            .collect::<BridgeResult<Vec<_>>>()?;

        Ok(NativeValue::Struct {
            ty: self.ty.clone(),
            fields,
        })
    }

    fn visit_func(&mut self, _sig: &FuncType) -> Self::Output {
        match self.value {
            HostValue::Function(_) => Ok(NativeValue::Func {
                ty: self.ty.clone(),
                func: Some(self.bridge.host_closure(self.value.clone(), self.ty.clone())?),
            }),
            HostValue::Undefined | HostValue::Null => Ok(NativeValue::Func {
                ty: self.ty.clone(),
                func: None,
            }),
            other => Err(BridgeError::host_mismatch("function", other.type_of())),
        }
    }

    fn visit_unsafe_pointer(&mut self) -> Self::Output {
        Ok(NativeValue::UnsafePointer(self.value.int()? as usize))
    }

    fn visit_handle(&mut self) -> Self::Output {
        Ok(NativeValue::Handle(self.value.clone()))
    }

    fn visit_unsupported(&mut self, _kind: &TypeKind) -> Self::Output {
        Err(BridgeError::unsupported(self.ty.kind_name()))
    }
}
