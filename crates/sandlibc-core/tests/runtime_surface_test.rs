use std::panic::{AssertUnwindSafe, catch_unwind};

use sandlibc_core::errno::{EINVAL, ENOMEM, ENOTSUP, ERANGE};
use sandlibc_core::malloc::HeapLimits;
use sandlibc_core::stdlib::{ABORT_STATUS, RAND_MAX};
use sandlibc_core::time::Calendar;
use sandlibc_core::{Runtime, RuntimeConfig, rt_assert};
use sandlibc_membrane::{ConsoleTap, Host, SimHost};

fn runtime(tap: &ConsoleTap) -> Runtime<SimHost> {
    Runtime::new(SimHost::builder().console(tap.clone()).build())
}

fn single_page_runtime(tap: &ConsoleTap) -> Runtime<SimHost> {
    let config = RuntimeConfig {
        heap: HeapLimits {
            max_pages: 1,
            ..HeapLimits::default()
        },
        ..RuntimeConfig::default()
    };
    Runtime::with_config(SimHost::builder().console(tap.clone()).build(), config)
}

fn terminated_with<T: std::fmt::Debug>(outcome: std::thread::Result<T>) -> String {
    *outcome
        .expect_err("process kept running")
        .downcast::<String>()
        .expect("panic message")
}

#[test]
fn grants_are_usable_linear_memory() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let grant = rt.malloc(100).expect("grant");
    rt.bytes_mut(grant)[..5].copy_from_slice(b"hello");
    let grown = rt.realloc(Some(grant), 5000).expect("grown");
    assert_eq!(&rt.bytes(grown)[..5], b"hello");

    let zeroed = rt.calloc(16, 4).expect("zeroed");
    assert!(rt.bytes(zeroed).iter().all(|&b| b == 0));

    rt.free(grown);
    rt.free(zeroed);
    assert_eq!(rt.heap().live_count(), 0);
    assert_eq!(tap.chunk_count(), 0);
}

#[test]
fn free_misuse_is_reported_not_fatal() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let grant = rt.malloc(32).expect("grant");
    rt.free_address(grant.addr());
    rt.free_address(grant.addr());
    assert!(tap.text().starts_with("ERROR: Double free: block"));
    assert_eq!(rt.errno(), EINVAL);

    tap.clear();
    rt.free_address(3);
    assert_eq!(
        tap.text(),
        "ERROR: Index out of bounds: Invalid ptr given to free\n"
    );
    rt.free_address(0);
    assert_eq!(rt.diagnostic_counts().misuse, 2);
}

#[test]
fn realloc_by_address_moves_contents() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let first = rt.realloc_address(0, 8);
    assert_ne!(first, 0);
    rt.memset(first, b'z', 8);
    let moved = rt.realloc_address(first, 4096);
    assert_ne!(moved, 0);
    assert_eq!(&rt.host().memory()[moved..moved + 8], b"zzzzzzzz");
    assert_eq!(rt.realloc_address(moved + 1, 16), 0);
    assert!(tap.text().contains("Invalid ptr given to realloc"));
}

#[test]
fn exhaustion_sets_enomem() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert!(rt.malloc(usize::MAX / 2).is_none());
    assert_eq!(rt.errno(), ENOMEM);
    assert_eq!(tap.chunk_count(), 0);
}

#[test]
fn memmove_handles_overlap_and_bounds() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let grant = rt.malloc(16).expect("grant");
    rt.bytes_mut(grant)[..10].copy_from_slice(b"0123456789");
    assert_eq!(rt.memmove(grant.addr() + 2, grant.addr(), 6), 6);
    assert_eq!(&rt.bytes(grant)[..10], b"0101234589");
    assert_eq!(rt.memmove(grant.addr(), grant.addr() + 4, 4), 4);
    assert_eq!(&rt.bytes(grant)[..4], b"2345");

    let end = rt.host().memory().len();
    assert_eq!(rt.memmove(end - 2, grant.addr(), 4), 0);
    assert!(tap.text().contains("Invalid ptr given to memmove"));
}

#[test]
fn memmove_works_with_the_heap_exhausted() {
    let tap = ConsoleTap::new();
    let mut rt = single_page_runtime(&tap);
    let grant = rt.malloc(16).expect("grant");
    for size in [4096, 1024, 256, 64, 16, 1] {
        while rt.malloc(size).is_some() {}
    }
    assert!(rt.malloc(1).is_none());
    assert_eq!(rt.errno(), ENOMEM);
    rt.set_errno(0);
    let before = rt.heap().stats();

    rt.bytes_mut(grant)[..10].copy_from_slice(b"0123456789");
    assert_eq!(rt.memmove(grant.addr() + 2, grant.addr(), 6), 6);
    assert_eq!(&rt.bytes(grant)[..10], b"0101234589");
    assert_eq!(rt.memmove(grant.addr(), grant.addr() + 4, 4), 4);
    assert_eq!(&rt.bytes(grant)[..10], b"2345234589");

    assert_eq!(rt.heap().stats(), before);
    assert_eq!(rt.errno(), 0);
    assert_eq!(tap.chunk_count(), 0);
}

#[test]
fn memmove_leaves_free_heap_space_alone() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let grant = rt.malloc(64).expect("grant");
    let at = grant.addr();
    rt.free(grant);
    rt.heap_mut().drain_lifecycle_logs();

    // Spans the released header and its payload.
    rt.host_mut().memory_mut()[at - 4..at + 8].copy_from_slice(b"abcdefghijkl");
    assert_eq!(rt.memmove(at + 32, at - 4, 12), 12);
    assert_eq!(&rt.host().memory()[at + 32..at + 44], b"abcdefghijkl");
    assert_eq!(&rt.host().memory()[at - 4..at + 8], b"abcdefghijkl");

    assert_eq!(rt.memmove(at - 2, at - 4, 12), 12);
    assert_eq!(&rt.host().memory()[at - 4..at + 10], b"ababcdefghijkl");
    assert!(rt.heap_mut().drain_lifecycle_logs().is_empty());
    assert_eq!(rt.heap().live_count(), 0);
}

#[test]
fn integer_conversions_saturate_with_erange() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert_eq!(rt.strtol(b"  -0x1A rest\0", 0), (-26, 7));
    assert_eq!(rt.strtol(b"0777", 0), (511, 4));
    assert_eq!(rt.errno(), 0);

    assert_eq!(rt.strtol(b"99999999999999999999", 10), (i64::MAX, 20));
    assert_eq!(rt.errno(), ERANGE);
    rt.set_errno(0);
    assert_eq!(rt.strtoul(b"-1", 10), (u64::MAX, 2));
    assert_eq!(rt.errno(), 0);

    assert_eq!(rt.strtol(b"12", 99), (0, 0));
    assert_eq!(rt.errno(), EINVAL);
    rt.set_errno(0);
    assert_eq!(rt.strtoul(b"12", -2), (0, 0));
    assert_eq!(rt.errno(), EINVAL);

    assert_eq!(rt.atoi(b" 42abc"), 42);
    assert_eq!(rt.atol(b"-7000000000"), -7_000_000_000);
    assert_eq!(tap.chunk_count(), 0);
}

#[test]
fn float_conversions() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert_eq!(rt.strtod(b"1.5e3 m"), (1500.0, 5));
    assert_eq!(rt.strtod(b"0x1.8p1"), (3.0, 7));
    let (inf, end) = rt.strtod(b"-INFINITY");
    assert_eq!((inf, end), (f64::NEG_INFINITY, 9));
    let (nan, end) = rt.strtof(b"nan(7)");
    assert_eq!((nan.to_bits(), end), (0x7fc0_0007, 6));
    assert_eq!(rt.errno(), 0);

    assert_eq!(rt.strtod(b"1e999"), (f64::INFINITY, 5));
    assert_eq!(rt.errno(), ERANGE);
    assert_eq!(rt.atof(b"  2.25"), 2.25);
}

#[test]
fn qsort_and_bsearch_over_linear_memory() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let grant = rt.malloc(8).expect("grant");
    rt.bytes_mut(grant)[..8].copy_from_slice(b"hdfbgaec");
    let by_byte = |a: &[u8], b: &[u8]| i32::from(a[0]) - i32::from(b[0]);

    rt.qsort(grant.addr(), 8, 1, by_byte);
    assert_eq!(&rt.bytes(grant)[..8], b"abcdefgh");
    assert_eq!(rt.bsearch(b"f", grant.addr(), 8, 1, by_byte), grant.addr() + 5);
    assert_eq!(rt.bsearch(b"z", grant.addr(), 8, 1, by_byte), 0);

    let end = rt.host().memory().len();
    rt.qsort(end - 4, 8, 1, by_byte);
    assert_eq!(rt.errno(), EINVAL);
    assert!(tap.text().contains("Invalid ptr given to qsort"));
    assert_eq!(rt.bsearch(b"a", grant.addr(), usize::MAX, 2, by_byte), 0);
    assert!(tap.text().contains("Invalid ptr given to bsearch"));
}

#[test]
fn quick_exit_runs_only_its_handlers() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let seen = tap.clone();
    assert_eq!(rt.atexit(move || seen.push(b"[atexit]")), 0);
    for tag in [&b"[quick 1]"[..], &b"[quick 2]"[..]] {
        let seen = tap.clone();
        assert_eq!(rt.at_quick_exit(move || seen.push(tag)), 0);
    }
    rt.print(format_args!("buffered"));

    let message = terminated_with(catch_unwind(AssertUnwindSafe(|| rt.quick_exit(5))));
    assert!(message.contains("status 5"));
    assert_eq!(tap.text(), "[quick 2][quick 1]");
}

#[test]
fn abort_skips_handlers_and_buffers() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let seen = tap.clone();
    rt.atexit(move || seen.push(b"[atexit]"));
    rt.print(format_args!("buffered"));

    let message = terminated_with(catch_unwind(AssertUnwindSafe(|| rt.abort())));
    assert!(message.contains(&format!("status {ABORT_STATUS}")));
    assert_eq!(tap.text(), "Program aborted\n");
}

#[test]
fn strcoll_is_unsupported() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert_eq!(rt.strcoll(b"a\0", b"b\0"), 0);
    assert_eq!(rt.errno(), ENOTSUP);
    assert_eq!(tap.text(), "ERROR: strcoll not yet implemented\n");
}

#[test]
fn local_time_comes_from_the_host_offset() {
    let tap = ConsoleTap::new();
    let mut rt = Runtime::new(
        SimHost::builder()
            .console(tap.clone())
            .now(1_234_567_890)
            .utc_offset_minutes(300)
            .build(),
    );
    let now = rt.time();
    let local = *rt.localtime(now).expect("local");
    assert_eq!((local.tm_hour, local.tm_isdst), (18, -1));
    let utc = *rt.gmtime(now).expect("utc");
    assert_eq!((utc.tm_hour, utc.tm_isdst), (23, 0));

    let mut out = [0u8; 32];
    let n = rt.strftime(&mut out, b"%H:%M %z\0", &local);
    assert_eq!(&out[..n], b"18:31 -0500");
    let n = rt.strftime(&mut out, b"%H:%M %z\0", &utc);
    assert_eq!(&out[..n], b"23:31 +0000");

    assert_eq!(rt.mktime(&utc), now);
    assert_eq!(
        rt.ctime(now).as_deref(),
        Some("Fri Feb 13 18:31:30 2009\n")
    );
}

#[test]
fn unrepresentable_time_sets_eoverflow() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert!(rt.gmtime(i64::MAX).is_none());
    assert_eq!(rt.errno(), sandlibc_core::errno::EOVERFLOW);
    assert_eq!(rt.asctime(&Calendar::default()), "Sun Jan  0 00:00:00 1900\n");
}

#[test]
fn clock_follows_host_milliseconds() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    assert_eq!(rt.clock(), 0);
    rt.host_mut().advance_clock(1500);
    assert_eq!(rt.clock(), 1500);
}

#[test]
fn rand_is_seeded_and_bounded() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    rt.srand(7);
    let first: Vec<i32> = (0..8).map(|_| rt.rand()).collect();
    rt.srand(7);
    let again: Vec<i32> = (0..8).map(|_| rt.rand()).collect();
    assert_eq!(first, again);
    assert!(first.iter().all(|&r| (0..=RAND_MAX).contains(&r)));
}

#[test]
fn unseeded_rand_follows_seed_one() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    let unseeded: Vec<i32> = (0..3).map(|_| rt.rand()).collect();
    assert_eq!(unseeded, [790_006_712, 175_262_839, 1_762_087_165]);
    rt.srand(1);
    assert_eq!(rt.rand(), 790_006_712);
}

#[test]
fn failed_assertion_prints_location_and_exits() {
    let tap = ConsoleTap::new();
    let mut rt = runtime(&tap);
    rt_assert!(rt, 1 + 1 == 2);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        rt_assert!(rt, rt.errno() == 99, "errno was {}", rt.errno());
    }));
    assert!(outcome.is_err());
    let text = tap.text();
    assert!(text.starts_with("Assertion failed at "));
    assert!(text.ends_with("\n\terrno was 0\n"));
}
