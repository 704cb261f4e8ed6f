//! Store client implementations.

pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
