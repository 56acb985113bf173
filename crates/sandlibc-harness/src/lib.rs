//! Conformance testing harness for sandlibc.
//!
//! This crate provides:
//! - Fixtures: JSON case files naming a runtime function, its inputs and the
//!   expected output and `errno`
//! - Execution: each case runs against a fresh runtime over a `SimHost`
//! - Verification and diffing of actual against expected output
//! - Reports: markdown for people, JSON (with fixture digests) for tools
//! - Structured JSONL logs, including allocator lifecycle traces

#![forbid(unsafe_code)]

pub mod alloc_trace;
pub mod diff;
pub mod error;
pub mod executor;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet, LoadedFixture};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
