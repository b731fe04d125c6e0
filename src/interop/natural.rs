//! Natural conversion: the default native counterpart of a host value,
//! chosen from its runtime tag alone

use super::Bridge;
use crate::error::BridgeResult;
use crate::host::HostValue;
use crate::types::{FloatWidth, ANY_FUNC, STRING_ANY_MAP};
use crate::value::NativeValue;

impl Bridge {
    /// `None` for undefined and null; otherwise bool, float64, string,
    /// an opaque handle for symbols, `map[string]any` for objects and
    /// `func(...any) any` for functions
    pub fn natural_value(&self, value: &HostValue) -> BridgeResult<Option<NativeValue>> {
        let native = match value {
            HostValue::Undefined | HostValue::Null => return Ok(None),
            HostValue::Boolean(b) => NativeValue::Bool(*b),
            HostValue::Number(n) => NativeValue::Float(FloatWidth::F64, *n),
            HostValue::String(s) => NativeValue::String(s.to_string()),
            HostValue::Symbol(_) => NativeValue::Handle(value.clone()),
            HostValue::Object(_) => self.to_native(value, &STRING_ANY_MAP)?,
            HostValue::Function(_) => NativeValue::Func {
                ty: ANY_FUNC.clone(),
                func: Some(self.host_closure(value.clone(), ANY_FUNC.clone())?),
            },
        };
        Ok(Some(native))
    }
}
