//! Function bridge in both directions
//!
//! `wrap` turns a native function into a host function; `host_closure`
//! turns a host function into a native one with a given signature.

use super::{record_call, record_error, record_wrap, Bridge};
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostFunction, HostValue};
use crate::logging::{self, log_bridge_call, log_bridge_error, log_bridge_return, log_wrap, perf};
use crate::types::{FuncType, TypeRef};
use crate::value::{NativeFunction, NativeValue};

impl Bridge {
    /// Wrap a native function as a host-callable function
    pub fn wrap(&self, function: NativeFunction) -> HostValue {
        log_wrap(function.name(), &function.ty().to_string());
        record_wrap();

        let bridge = self.clone();
        let name = function.name().to_string();
        HostFunction::new(name, move |_this, args| bridge.invoke_native(&function, args)).into()
    }

    /// One host call into a wrapped native function
    fn invoke_native(&self, function: &NativeFunction, args: &[HostValue]) -> BridgeResult<HostValue> {
        record_call();
        log_bridge_call(function.name(), args.len());
        let _perf = logging::performance_tracking().then(|| perf::track(function.name()));

        let result = self.call_native(function, args);
        if let Err(e) = &result {
            record_error();
            log_bridge_error(function.name(), e.category(), &e.to_string());
        }
        result
    }

    fn call_native(&self, function: &NativeFunction, args: &[HostValue]) -> BridgeResult<HostValue> {
        let native_args = self.convert_args(function.signature(), args)?;
        let results = function.call(native_args)?;
        log_bridge_return(function.name(), results.len());
        self.to_host_values(&results)
    }

    /// Unmarshal host arguments positionally, packing a variadic tail
    /// into one slice value
    fn convert_args(&self, sig: &FuncType, args: &[HostValue]) -> BridgeResult<Vec<NativeValue>> {
        let fixed = sig.fixed_arity();
        if !sig.variadic && args.len() != fixed {
            return Err(BridgeError::Arity {
                expected: fixed,
                got: args.len(),
            });
        }
        if sig.variadic && args.len() < fixed {
            return Err(BridgeError::VariadicArity {
                min: fixed,
                got: args.len(),
            });
        }

        let mut native_args = Vec::with_capacity(sig.params.len());
        for (arg, ty) in args.iter().zip(&sig.params[..fixed]) {
            native_args.push(self.to_native(arg, ty)?);
        }

        if let (Some(elem), Some(slice_ty)) = (sig.variadic_elem(), sig.params.last()) {
            let rest = args[fixed..]
                .iter()
                .map(|arg| self.to_native(arg, elem))
                .collect::<BridgeResult<Vec<_>>>()?;
            native_args.push(pack_variadic(slice_ty, rest)?);
        }

        Ok(native_args)
    }

    /// Native function of type `ty` that calls the host function `func`
    pub(crate) fn host_closure(&self, func: HostValue, ty: TypeRef) -> BridgeResult<NativeFunction> {
        let name = match &func {
            HostValue::Function(f) => f.name().to_string(),
            other => return Err(BridgeError::host_mismatch("function", other.type_of())),
        };

        let bridge = self.clone();
        let sig_ty = ty.clone();
        let function = NativeFunction::with_type(ty, move |args| {
            let sig = sig_ty
                .as_func()
                .ok_or_else(|| BridgeError::native_mismatch("func", sig_ty.to_string()))?;
            bridge.call_host(&func, sig, args)
        })?;
        Ok(function.named(&name))
    }

    /// Marshal arguments, invoke the host function and unmarshal its result
    fn call_host(
        &self,
        func: &HostValue,
        sig: &FuncType,
        args: Vec<NativeValue>,
    ) -> BridgeResult<Vec<NativeValue>> {
        let variadic_slot = sig.variadic.then(|| sig.params.len().saturating_sub(1));

        let mut host_args = Vec::with_capacity(args.len());
        for (i, arg) in args.iter().enumerate() {
            if Some(i) == variadic_slot {
                spread_variadic(self, arg, &mut host_args)?;
            } else {
                host_args.push(self.to_host(arg)?);
            }
        }

        let result = func.invoke(&host_args)?;
        match sig.results.as_slice() {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![self.to_native(&result, single)?]),
            many => many
                .iter()
                .enumerate()
                .map(|(i, ty)| self.to_native(&result.index(i), ty))
                .collect(),
        }
    }
}

fn pack_variadic(slice_ty: &TypeRef, rest: Vec<NativeValue>) -> BridgeResult<NativeValue> {
    if !slice_ty.is_byte_slice() {
        return Ok(NativeValue::Slice {
            ty: slice_ty.clone(),
            items: rest,
        });
    }

    rest.iter()
        .map(|b| {
            b.as_u64()
                .map(|n| n as u8)
                .ok_or_else(|| BridgeError::native_mismatch("uint8", b.type_of().to_string()))
        })
        .collect::<BridgeResult<Vec<u8>>>()
        .map(NativeValue::Bytes)
}

/// Push each element of a variadic slice as its own host argument
fn spread_variadic(
    bridge: &Bridge,
    arg: &NativeValue,
    host_args: &mut Vec<HostValue>,
) -> BridgeResult<()> {
    match arg {
        NativeValue::Slice { items, .. } => {
            for item in items {
                host_args.push(bridge.to_host(item)?);
            }
        }
        NativeValue::Bytes(bytes) => {
            host_args.extend(bytes.iter().map(|b| HostValue::Number(*b as f64)));
        }
        other => host_args.push(bridge.to_host(other)?),
    }
    Ok(())
}
