//! Native → host conversions

use super::{record_fast_path, Bridge};
use crate::error::{BridgeError, BridgeResult, ShapeError};
use crate::host::{copy_bytes_to_host, Constructors, HostValue};
use crate::logging::log_fast_path;
use crate::types::{TypeKind, TypeRef, UintWidth};
use crate::value::NativeValue;

impl Bridge {
    /// Convert a native value to a fresh host value
    pub fn to_host(&self, value: &NativeValue) -> BridgeResult<HostValue> {
        match value {
            NativeValue::Bool(b) => Ok(HostValue::Boolean(*b)),
            NativeValue::Int(_, n) => Ok(HostValue::Number(*n as f64)),
            NativeValue::Uint(_, n) => Ok(HostValue::Number(*n as f64)),
            NativeValue::Float(_, f) => Ok(HostValue::Number(*f)),
            NativeValue::String(s) => Ok(HostValue::string(s)),
            NativeValue::Bytes(bytes) if self.byte_fast_path() => bytes_to_host(bytes),
            NativeValue::Bytes(bytes) => {
                let items: Vec<NativeValue> = bytes
                    .iter()
                    .map(|b| NativeValue::Uint(UintWidth::U8, *b as u64))
                    .collect();
                self.sequence_to_host(&items)
            }
            NativeValue::Array { items, .. } | NativeValue::Slice { items, .. } => {
                self.sequence_to_host(items)
            }
            NativeValue::Map { ty, entries } => self.map_to_host(ty, entries),
            NativeValue::Pointer { target: None, .. } => Ok(HostValue::Null),
            NativeValue::Pointer { target: Some(slot), .. } => {
                let pointee = slot.borrow().clone();
                self.to_host(&pointee)
            }
            NativeValue::Interface { value: None, .. } => Ok(HostValue::Null),
            NativeValue::Interface { value: Some(inner), .. } => self.to_host(inner),
            NativeValue::Struct { ty, fields } => self.struct_to_host(ty, fields),
            NativeValue::Func { func: None, .. } => Ok(HostValue::Null),
            NativeValue::Func { func: Some(f), .. } => Ok(self.wrap(f.clone())),
            NativeValue::UnsafePointer(addr) => Ok(HostValue::Number(*addr as f64)),
            NativeValue::Handle(value) => Ok(value.clone()),
            NativeValue::Unsupported { ty } => Err(BridgeError::unsupported(ty.kind_name())),
        }
    }

    /// Collapse a result list: none → undefined, one → the value, more → array
    pub fn to_host_values(&self, values: &[NativeValue]) -> BridgeResult<HostValue> {
        match values {
            [] => Ok(HostValue::Undefined),
            [single] => self.to_host(single),
            many => self.sequence_to_host(many),
        }
    }

    fn sequence_to_host(&self, items: &[NativeValue]) -> BridgeResult<HostValue> {
        let array = Constructors::with(|c| c.array.clone());
        let host = array.new_instance(&[HostValue::Number(items.len() as f64)])?;
        for (i, item) in items.iter().enumerate() {
            host.set_index(i, self.to_host(item)?)?;
        }
        Ok(host)
    }

    fn map_to_host(
        &self,
        ty: &TypeRef,
        entries: &[(NativeValue, NativeValue)],
    ) -> BridgeResult<HostValue> {
        match &ty.kind {
            TypeKind::Map { key, .. } if key.is_string() => {}
            TypeKind::Map { key, .. } => {
                return Err(ShapeError::NonStringMapKey(key.to_string()).into());
            }
            _ => return Err(BridgeError::native_mismatch("map", ty.to_string())),
        }

        let host = new_object()?;
        for (key, value) in entries {
            let name = key
                .as_str()
                .ok_or_else(|| BridgeError::native_mismatch("string key", key.type_of().to_string()))?;
            host.set(name, self.to_host(value)?)?;
        }
        Ok(host)
    }

    fn struct_to_host(&self, ty: &TypeRef, fields: &[NativeValue]) -> BridgeResult<HostValue> {
        let st = ty
            .as_struct()
            .ok_or_else(|| BridgeError::native_mismatch("struct", ty.to_string()))?;
        if st.fields.len() != fields.len() {
            return Err(BridgeError::native_mismatch(
                format!("{} fields", st.fields.len()),
                format!("{} fields", fields.len()),
            ));
        }

        let host = new_object()?;
        for (field, value) in st.fields.iter().zip(fields) {
            if !field.exported {
                continue;
            }
            host.set(field.host_name(self.tag_key()), self.to_host(value)?)?;
        }
        Ok(host)
    }
}

fn new_object() -> BridgeResult<HostValue> {
    Constructors::with(|c| c.object.clone()).new_instance(&[])
}

/// Bulk copy into a fresh `Uint8Array`, then `Array.from` it
fn bytes_to_host(bytes: &[u8]) -> BridgeResult<HostValue> {
    let (array, uint8_array) = Constructors::with(|c| (c.array.clone(), c.uint8_array.clone()));

    let buffer = uint8_array.new_instance(&[HostValue::Number(bytes.len() as f64)])?;
    let copied = copy_bytes_to_host(&buffer, bytes)?;
    record_fast_path(copied);
    log_fast_path("to_host", copied);

    array.call("from", &[buffer])
}
