//! # sandlibc-membrane
//!
//! The boundary between the sandlibc runtime and the environment hosting it.
//!
//! A sandboxed linear-memory target has no operating system underneath it.
//! Everything the runtime needs from the outside world goes through the
//! [`Host`] trait: growing linear memory, the heap base, a console sink,
//! asynchronous resource fetches, a timezone offset and process termination.
//!
//! The crate also owns the diagnostic taxonomy ([`Diagnostic`]) shared by
//! every runtime component, and the environment-driven configuration.

pub mod config;
pub mod diag;
pub mod host;
pub mod memory;
pub mod sim;

pub use config::{DiagnosticMode, diagnostic_mode};
pub use diag::{Diagnostic, DiagnosticClass, DiagnosticCounts, DiagnosticPolicy};
pub use host::{FetchStatus, FetchTicket, Host, PAGE_SIZE};
pub use memory::PagedMemory;
pub use sim::{ConsoleTap, SimHost, SimHostBuilder};
