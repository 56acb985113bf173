//! `<time.h>` entry points.

use sandlibc_core::time::Calendar;

use crate::runtime_state::with_runtime;

/// `time`. Seconds since the epoch, or -1.
pub fn time() -> i64 {
    with_runtime(|rt| rt.time()).unwrap_or(-1)
}

/// `clock`. Processor time in `CLOCKS_PER_SEC` units, or -1.
pub fn clock() -> i64 {
    with_runtime(|rt| rt.clock()).unwrap_or(-1)
}

/// `gmtime`. Returns a copy of the shared record.
pub fn gmtime(t: i64) -> Option<Calendar> {
    with_runtime(|rt| rt.gmtime(t).copied()).ok().flatten()
}

/// `localtime` at the host's fixed offset. Returns a copy.
pub fn localtime(t: i64) -> Option<Calendar> {
    with_runtime(|rt| rt.localtime(t).copied()).ok().flatten()
}

/// `mktime`. Fields are read as UTC.
pub fn mktime(cal: &Calendar) -> i64 {
    with_runtime(|rt| rt.mktime(cal)).unwrap_or(-1)
}

/// `strftime` into `out`. Bytes written before the NUL, or 0.
pub fn strftime(out: &mut [u8], format: &[u8], cal: &Calendar) -> usize {
    with_runtime(|rt| rt.strftime(out, format, cal)).unwrap_or(0)
}
