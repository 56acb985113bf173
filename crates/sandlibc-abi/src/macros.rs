//! Formatted output macros over the process runtime.

/// `printf` with Rust formatting, to the process `stdout` stream.
///
/// Evaluates to the bytes written, or -1.
///
/// ```ignore
/// sl_printf!("score: {}\n", score);
/// ```
#[macro_export]
macro_rules! sl_printf {
    ($($arg:tt)*) => {
        $crate::stdio_abi::printf(::core::format_args!($($arg)*))
    };
}

/// `fprintf(stderr, ...)` with Rust formatting.
#[macro_export]
macro_rules! sl_eprintf {
    ($($arg:tt)*) => {
        $crate::stdio_abi::eprintf(::core::format_args!($($arg)*))
    };
}
