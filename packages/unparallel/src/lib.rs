//! Single-flight serialization of an asynchronous operation.
//!
//! Wrap an upstream async operation that must never run more than once at a
//! time, and get back a handle that any number of concurrent callers may
//! invoke: calls are queued, the upstream operation is driven one invocation
//! at a time, and each caller receives the outcome of the invocation made for
//! its turn, in strict arrival order.

#[macro_use]
extern crate tracing;

mod serial;

pub use crate::serial::api::*;

/// Error types
pub mod error {
    pub use crate::serial::error::*;
}

/// Future types
pub mod future {
    pub use crate::serial::api::future::*;
}
