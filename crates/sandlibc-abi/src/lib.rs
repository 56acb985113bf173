//! # sandlibc-abi
//!
//! The process-wide sandlibc runtime.
//!
//! A C program sees one heap, one stream table and one `errno`. This crate
//! keeps a single [`sandlibc_core::Runtime`] over a [`NativeHost`] behind a
//! lock and exposes the C-shaped entry points as free functions:
//!
//! ```text
//! caller -> entry point (this crate) -> with_runtime -> Runtime<NativeHost> -> core
//! ```
//!
//! Entry points never block on themselves: a call made while the runtime is
//! already borrowed on the same thread (from an `atexit` handler, say) fails
//! with [`RuntimeAccessError::Reentrant`] and the entry point returns its C
//! failure value.

#[macro_use]
mod macros;

pub mod malloc_abi;
pub mod native_host;
pub mod runtime_state;
pub mod stdio_abi;
pub mod stdlib_abi;
pub mod time_abi;

pub use native_host::{NativeHost, NativeHostConfig};
pub use runtime_state::{RuntimeAccessError, install, shutdown, with_runtime};
