//! Type-directed value marshalling between native code and a dynamic host
//!
//! Native functions of arbitrary signature become host functions, and host
//! values convert to any requested native shape, with no per-function glue.

// Core modules
pub mod config;
pub mod error;
pub mod host;
pub mod interop;
pub mod logging;
pub mod types;
pub mod value;

// Re-export commonly used items
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult, ConfigError, ShapeError};
pub use host::{global, HostFunction, HostObject, HostSymbol, HostType, HostValue};
pub use interop::{reset_stats, stats, Bridge, InteropStats};
pub use types::{Field, FuncType, TypeDescriptor, TypeKind, TypeRef, TypeVisitor};
pub use value::{NativeFunction, NativeValue, Reflect};

/// Wrap a native function as a host-callable function using the default
/// configuration. Bind the result with `global().set(name, value)`.
pub fn wrap_as_host_function(function: NativeFunction) -> HostValue {
    Bridge::default().wrap(function)
}

/// Convert an arbitrary host value to the native shape `ty` describes,
/// using the default configuration
pub fn convert_host_value_to_native(value: &HostValue, ty: &TypeRef) -> BridgeResult<NativeValue> {
    Bridge::default().to_native(value, ty).map_err(|e| {
        interop::record_error();
        e
    })
}
