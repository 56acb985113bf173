//! # sandlibc-core
//!
//! Safe Rust implementation of the small C runtime a sandboxed
//! linear-memory program links against: a block allocator over host-grown
//! pages, buffered streams over a host console and host-fetched resources,
//! calendar conversion and formatting, and the `<string.h>` primitives.
//!
//! Everything is owned by an explicit [`Runtime`] value over a
//! [`sandlibc_membrane::Host`]. No `unsafe` code is permitted.

#![deny(unsafe_code)]

pub mod assert;
pub mod errno;
pub mod malloc;
pub mod runtime;
pub mod stdio;
pub mod stdlib;
pub mod string;
pub mod time;

pub use runtime::{Runtime, RuntimeConfig};
