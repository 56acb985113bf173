//! Stream entry points.
//!
//! Streams are identified by [`StreamId`]; the standard streams are
//! [`StreamId::STDIN`], [`StreamId::STDOUT`] and [`StreamId::STDERR`].

use core::fmt;

use sandlibc_core::stdio::{EOF, PollReport, StreamId};

use crate::runtime_state::with_runtime;

/// `fopen`. Only `"rb"`; the stream is readable after a
/// [`poll_resources`] that reports it ready.
pub fn fopen(name: &str, mode: &str) -> Option<StreamId> {
    with_runtime(|rt| rt.fopen(name, mode)).ok().flatten()
}

/// `fclose`. 0 or `EOF`.
pub fn fclose(stream: StreamId) -> i32 {
    with_runtime(|rt| rt.fclose(stream)).unwrap_or(EOF)
}

/// Collects files loaded since the last poll.
pub fn poll_resources() -> PollReport {
    with_runtime(|rt| rt.poll_resources()).unwrap_or_default()
}

/// `fgetc`. The next byte, or `EOF`.
pub fn fgetc(stream: StreamId) -> i32 {
    with_runtime(|rt| rt.fgetc(stream)).unwrap_or(EOF)
}

/// `fputc`. `byte`, or `EOF`.
pub fn fputc(byte: u8, stream: StreamId) -> i32 {
    with_runtime(|rt| rt.fputc(byte, stream)).unwrap_or(EOF)
}

/// `fputs` of the NUL-terminated string in `s`.
pub fn fputs(s: &[u8], stream: StreamId) -> i32 {
    with_runtime(|rt| rt.fputs(s, stream)).unwrap_or(EOF)
}

/// `fflush`. `None` flushes every stream.
pub fn fflush(stream: Option<StreamId>) -> i32 {
    with_runtime(|rt| rt.fflush(stream)).unwrap_or(EOF)
}

/// Backs [`crate::sl_printf!`].
pub fn printf(args: fmt::Arguments<'_>) -> i32 {
    with_runtime(|rt| rt.print(args)).unwrap_or(-1)
}

/// Backs [`crate::sl_eprintf!`].
pub fn eprintf(args: fmt::Arguments<'_>) -> i32 {
    with_runtime(|rt| rt.eprint(args)).unwrap_or(-1)
}
