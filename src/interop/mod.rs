//! Interoperability - marshal values and calls across the host boundary
//!
//! Design: type-directed conversion with no per-function glue
//!
//! Architecture:
//! - `marshal.rs` - native → host (driven by the value's descriptor)
//! - `unmarshal.rs` - host → native (driven by the target descriptor)
//! - `natural.rs` - default native counterpart of a host value
//! - `call.rs` - function bridge in both directions

mod call;
mod marshal;
mod natural;
mod unmarshal;

use crate::config::BridgeConfig;
use crate::host::Constructors;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Conversion entry point carrying an immutable configuration.
///
/// Cheap to clone; wrapped functions keep their own clone.
#[derive(Debug, Clone)]
pub struct Bridge {
    config: Arc<BridgeConfig>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[inline]
    fn tag_key(&self) -> &str {
        &self.config.marshal.tag_key
    }

    #[inline]
    fn byte_fast_path(&self) -> bool {
        self.config.marshal.byte_fast_path
    }
}

/// Initialize interop subsystem: logging plus this thread's constructor cache
pub fn init() {
    crate::logging::init();
    Constructors::with(|_| ());
}

static CALLS_MADE: AtomicUsize = AtomicUsize::new(0);
static CONVERSION_ERRORS: AtomicUsize = AtomicUsize::new(0);
static FAST_PATH_BYTES: AtomicUsize = AtomicUsize::new(0);
static FUNCTIONS_WRAPPED: AtomicUsize = AtomicUsize::new(0);

/// Get interop statistics
pub fn stats() -> InteropStats {
    InteropStats {
        calls_made: CALLS_MADE.load(Ordering::Relaxed),
        conversion_errors: CONVERSION_ERRORS.load(Ordering::Relaxed),
        fast_path_bytes: FAST_PATH_BYTES.load(Ordering::Relaxed),
        functions_wrapped: FUNCTIONS_WRAPPED.load(Ordering::Relaxed),
    }
}

/// Clear all counters
pub fn reset_stats() {
    for counter in [&CALLS_MADE, &CONVERSION_ERRORS, &FAST_PATH_BYTES, &FUNCTIONS_WRAPPED] {
        counter.store(0, Ordering::Relaxed);
    }
}

/// Interop statistics for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InteropStats {
    /// Host calls into bridged functions
    pub calls_made: usize,
    /// Failed bridged calls and failed top-level conversions
    pub conversion_errors: usize,
    /// Bytes moved by the bulk copy path, both directions
    pub fast_path_bytes: usize,
    /// Native functions wrapped for the host
    pub functions_wrapped: usize,
}

#[inline]
pub(crate) fn record_call() {
    CALLS_MADE.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_error() {
    CONVERSION_ERRORS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn record_fast_path(bytes: usize) {
    FAST_PATH_BYTES.fetch_add(bytes, Ordering::Relaxed);
}

#[inline]
fn record_wrap() {
    FUNCTIONS_WRAPPED.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests;
