//! Standard library supplements: numeric conversion, sorting and
//! searching, integer arithmetic, pseudo-random numbers and exit handlers.

pub mod conversion;
pub mod exit;
pub mod rand;
pub mod sort;

pub use conversion::{
    ConversionStatus, Parsed, atof, atoi, atol, strtod, strtof, strtol, strtoul,
};
pub use exit::{ATEXIT_MAX, ExitHandlers};
pub use rand::{RAND_MAX, Rand};
pub use sort::{bsearch, qsort};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Status `abort` terminates with (128 + `SIGABRT`).
pub const ABORT_STATUS: i32 = 134;

/// Quotient and remainder of a truncating division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotient<T> {
    pub quot: T,
    pub rem: T,
}

/// `div`: truncating division. `None` for a zero divisor or `MIN / -1`.
#[must_use]
pub fn div(numer: i32, denom: i32) -> Option<Quotient<i32>> {
    let quot = numer.checked_div(denom)?;
    Some(Quotient {
        quot,
        rem: numer - quot * denom,
    })
}

/// `ldiv`: [`div`] for `long`.
#[must_use]
pub fn ldiv(numer: i64, denom: i64) -> Option<Quotient<i64>> {
    let quot = numer.checked_div(denom)?;
    Some(Quotient {
        quot,
        rem: numer - quot * denom,
    })
}

/// `lldiv`. `long long` and `long` are both 64 bits wide.
#[must_use]
pub fn lldiv(numer: i64, denom: i64) -> Option<Quotient<i64>> {
    ldiv(numer, denom)
}

/// `abs`. `i32::MIN` maps to itself.
#[must_use]
pub const fn abs(value: i32) -> i32 {
    value.wrapping_abs()
}

/// `labs`. `i64::MIN` maps to itself.
#[must_use]
pub const fn labs(value: i64) -> i64 {
    value.wrapping_abs()
}

/// `llabs`.
#[must_use]
pub const fn llabs(value: i64) -> i64 {
    labs(value)
}
