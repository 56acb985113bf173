//! Fatal assertions.

/// Checks a condition at runtime; on failure prints
/// `Assertion failed at <file> : <line>` and the message to `stderr`, then
/// exits the program with status 1 through [`crate::Runtime::exit`].
///
/// ```ignore
/// rt_assert!(rt, len <= capacity);
/// rt_assert!(rt, len <= capacity, "len {len} over {capacity}");
/// ```
#[macro_export]
macro_rules! rt_assert {
    ($rt:expr, $cond:expr $(,)?) => {
        if !$cond {
            $rt.assert_fail(::core::stringify!($cond), ::core::file!(), ::core::line!())
        }
    };
    ($rt:expr, $cond:expr, $($msg:tt)+) => {
        if !$cond {
            $rt.assert_fail(
                &::std::format!($($msg)+),
                ::core::file!(),
                ::core::line!(),
            )
        }
    };
}

#[cfg(test)]
mod tests {
    use sandlibc_membrane::{ConsoleTap, SimHost};

    use crate::Runtime;

    fn runtime(tap: &ConsoleTap) -> Runtime<SimHost> {
        Runtime::new(SimHost::builder().console(tap.clone()).build())
    }

    #[test]
    fn passing_assertion_is_silent() {
        let tap = ConsoleTap::new();
        let mut rt = runtime(&tap);
        let len = 3;
        rt_assert!(rt, len < 4);
        rt_assert!(rt, len == 3, "len was {len}");
        assert_eq!(tap.chunk_count(), 0);
    }

    #[test]
    fn failing_assertion_reports_and_exits() {
        let tap = ConsoleTap::new();
        let mut rt = runtime(&tap);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rt_assert!(rt, 1 + 1 == 3);
        }));
        let panic = outcome.expect_err("assertion must terminate");
        let status = panic
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert!(status.contains("status 1"), "{status}");
        let text = tap.text();
        assert!(text.starts_with("Assertion failed at "), "{text}");
        assert!(text.contains(file!()));
        assert!(text.ends_with("\n\t1 + 1 == 3\n"), "{text}");
    }

    #[test]
    fn custom_message_is_formatted() {
        let tap = ConsoleTap::new();
        let mut rt = runtime(&tap);
        let limit = 2;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            rt_assert!(rt, limit > 5, "limit {limit} too small");
        }));
        assert!(outcome.is_err());
        assert!(tap.text().ends_with("\tlimit 2 too small\n"));
    }
}
