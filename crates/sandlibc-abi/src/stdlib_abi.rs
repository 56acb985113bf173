//! Process state and `<stdlib.h>`: `errno`, numeric conversion, `rand`,
//! exit handlers and process termination.

use crate::runtime_state::with_runtime;

/// Current `errno`.
pub fn errno() -> i32 {
    with_runtime(|rt| rt.errno()).unwrap_or(0)
}

pub fn set_errno(value: i32) {
    let _ = with_runtime(|rt| rt.set_errno(value));
}

/// `perror` on the process `stderr`.
pub fn perror(msg: &str) {
    let _ = with_runtime(|rt| rt.perror(msg));
}

/// `strtol`: value and bytes consumed. `errno` is set on range or base
/// errors.
pub fn strtol(s: &[u8], base: i32) -> (i64, usize) {
    with_runtime(|rt| rt.strtol(s, base)).unwrap_or((0, 0))
}

pub fn strtoul(s: &[u8], base: i32) -> (u64, usize) {
    with_runtime(|rt| rt.strtoul(s, base)).unwrap_or((0, 0))
}

pub fn strtod(s: &[u8]) -> (f64, usize) {
    with_runtime(|rt| rt.strtod(s)).unwrap_or((0.0, 0))
}

pub fn atoi(s: &[u8]) -> i32 {
    sandlibc_core::stdlib::atoi(s)
}

pub fn atol(s: &[u8]) -> i64 {
    sandlibc_core::stdlib::atol(s)
}

pub fn atof(s: &[u8]) -> f64 {
    sandlibc_core::stdlib::atof(s)
}

pub fn rand() -> i32 {
    with_runtime(|rt| rt.rand()).unwrap_or(0)
}

pub fn srand(seed: u32) {
    let _ = with_runtime(|rt| rt.srand(seed));
}

/// `atexit`. Handlers run while the runtime is borrowed, so entry points
/// called from one fail as reentrant.
pub fn atexit(handler: impl FnOnce() + Send + 'static) -> i32 {
    with_runtime(|rt| rt.atexit(handler)).unwrap_or(-1)
}

pub fn at_quick_exit(handler: impl FnOnce() + Send + 'static) -> i32 {
    with_runtime(|rt| rt.at_quick_exit(handler)).unwrap_or(-1)
}

/// `quick_exit`: `at_quick_exit` handlers, then process exit without
/// flushing.
pub fn quick_exit(status: i32) -> ! {
    let outcome = with_runtime(|rt| {
        rt.quick_exit(status);
    });
    if let Err(err) = outcome {
        eprintln!("sandlibc: quick_exit: {err}");
    }
    std::process::exit(status)
}

/// `abort`.
pub fn abort() -> ! {
    let outcome = with_runtime(|rt| {
        rt.abort();
    });
    if let Err(err) = outcome {
        eprintln!("sandlibc: abort: {err}");
    }
    std::process::exit(sandlibc_core::stdlib::ABORT_STATUS)
}

/// `exit`: handlers, flush, then process exit with `status`.
pub fn exit(status: i32) -> ! {
    let outcome = with_runtime(|rt| {
        rt.exit(status);
    });
    if let Err(err) = outcome {
        eprintln!("sandlibc: exit: {err}");
    }
    std::process::exit(status)
}
