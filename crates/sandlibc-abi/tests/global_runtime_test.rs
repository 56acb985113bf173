//! Entry points over the process-wide runtime.
//!
//! Every test installs its own runtime; the lock keeps them from sharing
//! one.

use std::path::PathBuf;

use parking_lot::Mutex;
use sandlibc_abi::{
    NativeHostConfig, RuntimeAccessError, install, malloc_abi, shutdown, sl_eprintf, sl_printf,
    stdio_abi, stdlib_abi, time_abi, with_runtime,
};
use sandlibc_core::RuntimeConfig;
use sandlibc_core::errno::{ENOENT, ERANGE};
use sandlibc_core::stdio::{EOF, StreamId};
use sandlibc_membrane::{ConsoleTap, DiagnosticMode};

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

fn fresh(tag: &str, offset: i32) -> (ConsoleTap, PathBuf) {
    let root = std::env::temp_dir().join(format!("sandlibc-abi-{}-{tag}", std::process::id()));
    std::fs::create_dir_all(&root).expect("scratch dir");
    let tap = ConsoleTap::new();
    let host = NativeHostConfig {
        resource_root: root.clone(),
        utc_offset_minutes: offset,
        capture: Some(tap.clone()),
        ..NativeHostConfig::default()
    };
    let runtime = RuntimeConfig {
        diagnostics: DiagnosticMode::Report,
        ..RuntimeConfig::default()
    };
    install(host, runtime).expect("install");
    (tap, root)
}

#[test]
fn heap_round_trip() {
    let _serial = SERIAL.lock();
    let (tap, _) = fresh("heap", 0);

    let a = malloc_abi::malloc(64);
    assert_ne!(a, 0);
    assert_eq!(malloc_abi::poke(a, b"payload"), 7);
    let b = malloc_abi::realloc(a, 10_000);
    assert_ne!(b, 0);
    assert_eq!(malloc_abi::peek(b, 7), b"payload");

    let z = malloc_abi::calloc(8, 8);
    assert_eq!(malloc_abi::peek(z, 64), vec![0; 64]);

    malloc_abi::free(b);
    malloc_abi::free(z);
    malloc_abi::free(0);
    assert_eq!(with_runtime(|rt| rt.heap().live_count()), Ok(0));
    assert_eq!(tap.chunk_count(), 0);

    malloc_abi::free(z);
    assert!(tap.text().starts_with("ERROR: Double free"));
}

#[test]
fn files_load_from_the_resource_root() {
    let _serial = SERIAL.lock();
    let (_tap, root) = fresh("files", 0);
    std::fs::write(root.join("scores.txt"), b"42\n").expect("write");

    let id = stdio_abi::fopen("scores.txt", "rb").expect("slot");
    assert_eq!(stdio_abi::fgetc(id), EOF);
    let report = stdio_abi::poll_resources();
    assert_eq!(report.ready, vec![id]);
    assert_eq!(stdio_abi::fgetc(id), i32::from(b'4'));
    assert_eq!(stdio_abi::fgetc(id), i32::from(b'2'));
    assert_eq!(stdio_abi::fclose(id), 0);

    let missing = stdio_abi::fopen("nope.txt", "rb").expect("slot");
    assert_eq!(stdio_abi::poll_resources().failed, vec![missing]);
    assert_eq!(stdlib_abi::errno(), ENOENT);
}

#[test]
fn formatted_output_is_buffered_per_stream() {
    let _serial = SERIAL.lock();
    let (tap, _) = fresh("printf", 0);

    sl_printf!("frame {}", 7);
    assert_eq!(tap.chunk_count(), 0);
    sl_eprintf!("oops\n");
    assert_eq!(tap.text(), "oops\n");
    assert_eq!(stdio_abi::fputs(b" done\n\0", StreamId::STDOUT), 6);
    assert_eq!(tap.text(), "oops\nframe 7 done\n");

    assert_eq!(stdio_abi::fputc(b'!', StreamId::STDOUT), i32::from(b'!'));
    assert_eq!(stdio_abi::fflush(None), 0);
    assert!(tap.text().ends_with('!'));
}

#[test]
fn time_entry_points_use_the_fixed_offset() {
    let _serial = SERIAL.lock();
    fresh("time", -60);

    assert!(time_abi::time() > 0);
    assert!(time_abi::clock() >= 0);
    let utc = time_abi::gmtime(1_234_567_890).expect("utc");
    assert_eq!(utc.tm_hour, 23);
    let local = time_abi::localtime(1_234_567_890).expect("local");
    assert_eq!((local.tm_hour, local.tm_mday), (0, 14));
    assert_eq!(time_abi::mktime(&utc), 1_234_567_890);

    let mut out = [0u8; 32];
    let n = time_abi::strftime(&mut out, b"%d %b %H %z\0", &local);
    assert_eq!(&out[..n], b"14 Feb 00 +0100");
}

#[test]
fn nested_entry_is_rejected() {
    let _serial = SERIAL.lock();
    let (tap, _) = fresh("nested", 0);

    let inner = with_runtime(|_| with_runtime(|rt| rt.errno()));
    assert_eq!(inner, Ok(Err(RuntimeAccessError::Reentrant)));
    let nested_malloc = with_runtime(|_| malloc_abi::malloc(16));
    assert_eq!(nested_malloc, Ok(0));
    assert_eq!(with_runtime(|rt| rt.heap().live_count()), Ok(0));
    assert!(with_runtime(|_| ()).is_ok());
    assert_eq!(tap.chunk_count(), 0);
}

#[test]
fn shutdown_flushes_pending_output() {
    let _serial = SERIAL.lock();
    let (tap, _) = fresh("shutdown", 0);

    sl_printf!("unterminated");
    assert_eq!(tap.chunk_count(), 0);
    shutdown().expect("shutdown");
    assert_eq!(tap.text(), "unterminated");
}

#[test]
fn rand_and_atexit_registration() {
    let _serial = SERIAL.lock();
    fresh("stdlib", 0);

    stdlib_abi::srand(99);
    let a = stdlib_abi::rand();
    stdlib_abi::srand(99);
    assert_eq!(stdlib_abi::rand(), a);
    assert_eq!(stdlib_abi::atexit(|| {}), 0);
    stdlib_abi::set_errno(5);
    assert_eq!(stdlib_abi::errno(), 5);
}

#[test]
fn conversions_report_range_errors_through_errno() {
    let _serial = SERIAL.lock();
    fresh("convert", 0);

    assert_eq!(stdlib_abi::strtol(b"0x7f;", 16), (127, 4));
    assert_eq!(stdlib_abi::errno(), 0);
    assert_eq!(stdlib_abi::strtoul(b"99999999999999999999999", 10).0, u64::MAX);
    assert_eq!(stdlib_abi::errno(), ERANGE);
    stdlib_abi::set_errno(0);
    assert_eq!(stdlib_abi::strtod(b"-0.5x"), (-0.5, 4));
    assert_eq!(stdlib_abi::atoi(b"12"), 12);
    assert_eq!(stdlib_abi::atol(b"-12"), -12);
    assert_eq!(stdlib_abi::atof(b"1e1"), 10.0);
    assert_eq!(stdlib_abi::at_quick_exit(|| {}), 0);
    assert_eq!(stdlib_abi::errno(), 0);
}
