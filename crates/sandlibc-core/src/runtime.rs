//! The runtime context.
//!
//! [`Runtime`] owns the host, the heap, the stream table, the shared
//! calendar record and the small bits of process state (`errno`, the random
//! generator, exit handlers). Its methods present the C-shaped surface:
//! failures become sentinel returns, `errno` updates and reports on the
//! diagnostic sink instead of `Result`s.

use core::fmt;

use sandlibc_membrane::{
    Diagnostic, DiagnosticClass, DiagnosticCounts, DiagnosticMode, DiagnosticPolicy, Host,
    diagnostic_mode,
};

use crate::errno::{self, EINVAL, EMFILE, ENOBUFS, ENOENT, ENOMEM, ENOTSUP, ERANGE};
use crate::malloc::{AllocError, Allocation, BlockAllocator, HeapLimits};
use crate::stdio::{BufMode, EOF, PollReport, StdioError, StreamId, StreamTable, Whence};
use crate::stdlib::{self, ABORT_STATUS, ConversionStatus, ExitHandlers, Parsed, Rand};
use crate::string::{self, str::cstr};
use crate::time::{self, CLOCKS_PER_SEC, Calendar};

/// Runtime-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub diagnostics: DiagnosticMode,
    pub heap: HeapLimits,
}

impl RuntimeConfig {
    /// Default limits with the diagnostic mode taken from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            diagnostics: diagnostic_mode(),
            heap: HeapLimits::default(),
        }
    }
}

/// Process state of one sandboxed program.
pub struct Runtime<H: Host> {
    host: H,
    config: RuntimeConfig,
    heap: BlockAllocator,
    streams: StreamTable,
    calendar: Calendar,
    diagnostics: DiagnosticPolicy,
    errno: i32,
    rand: Rand,
    exit_handlers: ExitHandlers,
    quick_exit_handlers: ExitHandlers,
}

impl<H: Host> fmt::Debug for Runtime<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("heap", &self.heap.stats())
            .field("open_streams", &self.streams.open_count())
            .field("errno", &self.errno)
            .finish_non_exhaustive()
    }
}

impl<H: Host> Runtime<H> {
    /// Runtime with default limits that reports diagnostics.
    pub fn new(host: H) -> Self {
        Self::with_config(host, RuntimeConfig::default())
    }

    pub fn with_config(host: H, config: RuntimeConfig) -> Self {
        Self {
            host,
            config,
            heap: BlockAllocator::new(config.heap),
            streams: StreamTable::new(),
            calendar: Calendar::default(),
            diagnostics: DiagnosticPolicy::new(),
            errno: 0,
            rand: Rand::default(),
            exit_handlers: ExitHandlers::new(),
            quick_exit_handlers: ExitHandlers::new(),
        }
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn heap(&self) -> &BlockAllocator {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut BlockAllocator {
        &mut self.heap
    }

    pub fn streams(&self) -> &StreamTable {
        &self.streams
    }

    // -----------------------------------------------------------------------
    // Diagnostics and errno
    // -----------------------------------------------------------------------

    /// Diagnostic sink. Counts always; prints `ERROR: <message>` straight to
    /// the host console in report mode, bypassing stream buffers.
    pub fn report(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.record(diagnostic);
        if self.config.diagnostics.emits() {
            let line = format!("ERROR: {diagnostic}\n");
            self.host.emit_bytes(line.as_bytes());
        }
    }

    pub fn diagnostic_counts(&self) -> DiagnosticCounts {
        self.diagnostics.snapshot()
    }

    pub fn errno(&self) -> i32 {
        self.errno
    }

    pub fn set_errno(&mut self, value: i32) {
        self.errno = value;
    }

    fn misuse(&mut self, diagnostic: &Diagnostic) {
        self.errno = match diagnostic.class() {
            DiagnosticClass::Misuse => EINVAL,
            DiagnosticClass::Unsupported => ENOTSUP,
        };
        self.report(diagnostic);
    }

    fn alloc_failed(&mut self, err: AllocError) {
        match err {
            AllocError::Exhausted { .. } | AllocError::Overflow => self.errno = ENOMEM,
            AllocError::Misuse(diag) => self.misuse(&diag),
        }
    }

    fn stdio_failed(&mut self, err: StdioError) {
        match err {
            StdioError::TableFull => self.errno = EMFILE,
            StdioError::NotReady | StdioError::EndOfData => {}
            StdioError::OutOfRange { .. } => self.errno = EINVAL,
            StdioError::NoBufferSpace => self.errno = ENOBUFS,
            StdioError::Alloc(err) => self.alloc_failed(err),
            StdioError::Misuse(diag) => self.misuse(&diag),
        }
    }

    // -----------------------------------------------------------------------
    // Memory
    // -----------------------------------------------------------------------

    /// `malloc`. `None` with `errno = ENOMEM` when the heap is exhausted.
    pub fn malloc(&mut self, size: usize) -> Option<Allocation> {
        match self.heap.allocate(&mut self.host, size) {
            Ok(grant) => Some(grant),
            Err(err) => {
                self.alloc_failed(err);
                None
            }
        }
    }

    /// `calloc`: zeroed `count * size` bytes.
    pub fn calloc(&mut self, count: usize, size: usize) -> Option<Allocation> {
        match self.heap.calloc(&mut self.host, count, size) {
            Ok(grant) => Some(grant),
            Err(err) => {
                self.alloc_failed(err);
                None
            }
        }
    }

    /// `realloc`. On failure the old grant stays valid.
    pub fn realloc(&mut self, grant: Option<Allocation>, size: usize) -> Option<Allocation> {
        match self.heap.resize(&mut self.host, grant, size) {
            Ok(grant) => Some(grant),
            Err(err) => {
                self.alloc_failed(err);
                None
            }
        }
    }

    /// `free`. Misuse is reported and otherwise ignored.
    pub fn free(&mut self, grant: Allocation) {
        if let Err(err) = self.heap.release(grant) {
            self.alloc_failed(err);
        }
    }

    /// Resolves a raw pointer to its live grant, reporting misuse.
    pub fn lookup(&mut self, op: &'static str, addr: usize) -> Option<Allocation> {
        match self.heap.lookup_address(op, addr) {
            Ok(grant) => Some(grant),
            Err(diag) => {
                self.misuse(&diag);
                None
            }
        }
    }

    /// `free` by address. 0 is a no-op.
    pub fn free_address(&mut self, addr: usize) {
        if let Err(err) = self.heap.release_address(addr) {
            self.alloc_failed(err);
        }
    }

    /// `realloc` by address. Returns the new address or 0.
    pub fn realloc_address(&mut self, addr: usize, size: usize) -> usize {
        let current = if addr == 0 {
            None
        } else {
            match self.lookup("realloc", addr) {
                Some(grant) => Some(grant),
                None => return 0,
            }
        };
        self.realloc(current, size).map_or(0, |g| g.addr())
    }

    /// Bytes of a live grant.
    pub fn bytes(&self, grant: Allocation) -> &[u8] {
        self.host.memory().get(grant.range()).unwrap_or(&[])
    }

    /// Bytes of a live grant, writable.
    pub fn bytes_mut(&mut self, grant: Allocation) -> &mut [u8] {
        self.host.memory_mut().get_mut(grant.range()).unwrap_or(&mut [])
    }

    /// Checks that `n` bytes at `addr` lie inside linear memory, reporting
    /// the address otherwise.
    fn in_memory(&mut self, op: &'static str, addr: usize, n: usize) -> bool {
        let len = self.host.memory().len();
        if addr.checked_add(n).is_some_and(|end| end <= len) {
            return true;
        }
        self.misuse(&Diagnostic::PointerOutOfBounds { op, addr });
        false
    }

    /// `memmove` over linear memory.
    ///
    /// The move happens in place and never touches the heap, so it works
    /// with the heap exhausted and with addresses in free heap space.
    /// Ranges outside memory are reported and nothing is moved.
    pub fn memmove(&mut self, dest: usize, src: usize, n: usize) -> usize {
        if !self.in_memory("memmove", dest, n) || !self.in_memory("memmove", src, n) {
            return 0;
        }
        if n > 0 && dest != src {
            self.host.memory_mut().copy_within(src..src + n, dest);
        }
        n
    }

    /// Fills `len` bytes at `addr` with `value`, clamped to memory.
    pub fn memset(&mut self, addr: usize, value: u8, len: usize) -> usize {
        let memory = self.host.memory_mut();
        match memory.get_mut(addr..) {
            Some(tail) => string::memset(tail, value, len),
            None => 0,
        }
    }

    /// `strcoll`. Locales are not supported: reported, returns 0.
    pub fn strcoll(&mut self, _a: &[u8], _b: &[u8]) -> i32 {
        self.misuse(&Diagnostic::Unsupported { op: "strcoll" });
        0
    }

    // -----------------------------------------------------------------------
    // Streams
    // -----------------------------------------------------------------------

    /// `fopen`. Only `"rb"` is supported; the stream becomes readable once
    /// [`Self::poll_resources`] sees the data arrive.
    pub fn fopen(&mut self, name: &str, mode: &str) -> Option<StreamId> {
        match self.streams.open(&mut self.heap, &mut self.host, name, mode) {
            Ok(id) => Some(id),
            Err(err) => {
                self.stdio_failed(err);
                None
            }
        }
    }

    /// `freopen`.
    pub fn freopen(&mut self, name: &str, mode: &str, id: StreamId) -> Option<StreamId> {
        match self
            .streams
            .reopen(&mut self.heap, &mut self.host, id, name, mode)
        {
            Ok(id) => Some(id),
            Err(err) => {
                self.stdio_failed(err);
                None
            }
        }
    }

    /// `fclose`. 0 or `EOF`.
    pub fn fclose(&mut self, id: StreamId) -> i32 {
        match self.streams.close(&mut self.heap, &mut self.host, id) {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// Collects resources the host finished loading. Call once per frame.
    pub fn poll_resources(&mut self) -> PollReport {
        let report = self.streams.poll(&mut self.heap, &mut self.host);
        if !report.failed.is_empty() {
            self.errno = ENOENT;
        }
        report
    }

    pub fn is_ready(&self, id: StreamId) -> bool {
        self.streams.is_ready(id)
    }

    /// `fgetc`: the next byte, or `EOF`.
    pub fn fgetc(&mut self, id: StreamId) -> i32 {
        match self.streams.read_char(&self.host, id) {
            Ok(byte) => i32::from(byte),
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// `getchar`.
    pub fn getchar(&mut self) -> i32 {
        self.fgetc(StreamId::STDIN)
    }

    /// `fgets`: bytes read, newline kept and NUL written after them.
    /// `None` when nothing could be read.
    pub fn fgets(&mut self, buf: &mut [u8], id: StreamId) -> Option<usize> {
        match self.streams.read_line(&self.host, id, buf) {
            Ok(n) => Some(n),
            Err(err) => {
                self.stdio_failed(err);
                None
            }
        }
    }

    /// `fread` on bytes.
    pub fn fread(&mut self, buf: &mut [u8], id: StreamId) -> usize {
        match self.streams.read(&self.host, id, buf) {
            Ok(n) => n,
            Err(err) => {
                self.stdio_failed(err);
                0
            }
        }
    }

    /// `ungetc`. Returns `byte` or `EOF`.
    pub fn ungetc(&mut self, byte: u8, id: StreamId) -> i32 {
        match self.streams.unget(&mut self.host, id, byte) {
            Ok(byte) => i32::from(byte),
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// `fputc`. Returns `byte` or `EOF`.
    pub fn fputc(&mut self, byte: u8, id: StreamId) -> i32 {
        match self.streams.write_char(&mut self.host, id, byte) {
            Ok(byte) => i32::from(byte),
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// `putchar`.
    pub fn putchar(&mut self, byte: u8) -> i32 {
        self.fputc(byte, StreamId::STDOUT)
    }

    /// `fputs` of the string in `s`. Non-negative or `EOF`.
    pub fn fputs(&mut self, s: &[u8], id: StreamId) -> i32 {
        match self.streams.write(&mut self.host, id, cstr(s)) {
            Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// `puts`: the string and a newline to `stdout`.
    pub fn puts(&mut self, s: &[u8]) -> i32 {
        let written = self.fputs(s, StreamId::STDOUT);
        if written == EOF || self.putchar(b'\n') == EOF {
            return EOF;
        }
        written.saturating_add(1)
    }

    /// `fwrite` of bytes. Returns the count accepted.
    pub fn fwrite(&mut self, bytes: &[u8], id: StreamId) -> usize {
        match self.streams.write(&mut self.host, id, bytes) {
            Ok(n) => n,
            Err(err) => {
                self.stdio_failed(err);
                0
            }
        }
    }

    /// `fprintf` with Rust formatting. Bytes written, or -1.
    pub fn fprint(&mut self, id: StreamId, args: fmt::Arguments<'_>) -> i32 {
        match self.streams.write_args(&mut self.host, id, args) {
            Ok(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    /// `printf`.
    pub fn print(&mut self, args: fmt::Arguments<'_>) -> i32 {
        self.fprint(StreamId::STDOUT, args)
    }

    /// `fprintf(stderr, ...)`.
    pub fn eprint(&mut self, args: fmt::Arguments<'_>) -> i32 {
        self.fprint(StreamId::STDERR, args)
    }

    /// `fflush`. `None` flushes every stream.
    pub fn fflush(&mut self, id: Option<StreamId>) -> i32 {
        let Some(id) = id else {
            self.streams.flush_all(&mut self.host);
            return 0;
        };
        match self.streams.flush(&mut self.host, id) {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                EOF
            }
        }
    }

    /// `fseek` with C whence codes. 0 or -1.
    pub fn fseek(&mut self, id: StreamId, offset: i64, whence: i32) -> i32 {
        let Some(whence) = Whence::from_posix(whence) else {
            self.errno = EINVAL;
            return -1;
        };
        match self.streams.seek(id, offset, whence) {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    /// `ftell`. -1 on failure.
    pub fn ftell(&mut self, id: StreamId) -> i64 {
        match self.streams.tell(id) {
            Ok(pos) => i64::try_from(pos).unwrap_or(-1),
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    /// `rewind`.
    pub fn rewind(&mut self, id: StreamId) {
        if let Err(err) = self.streams.rewind(id) {
            self.stdio_failed(err);
        }
    }

    /// `fgetpos`.
    pub fn fgetpos(&mut self, id: StreamId) -> Option<usize> {
        match self.streams.tell(id) {
            Ok(pos) => Some(pos),
            Err(err) => {
                self.stdio_failed(err);
                None
            }
        }
    }

    /// `fsetpos`. 0 or -1.
    pub fn fsetpos(&mut self, id: StreamId, pos: usize) -> i32 {
        let offset = i64::try_from(pos).unwrap_or(i64::MAX);
        match self.streams.seek(id, offset, Whence::Set) {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    pub fn feof(&self, id: StreamId) -> bool {
        self.streams.eof(id)
    }

    pub fn ferror(&self, id: StreamId) -> bool {
        self.streams.error(id)
    }

    /// `clearerr`.
    pub fn clearerr(&mut self, id: StreamId) {
        if let Err(err) = self.streams.clear_error(id) {
            self.stdio_failed(err);
        }
    }

    /// `perror`: `"<msg>: <strerror(errno)>\n"` on `stderr`.
    pub fn perror(&mut self, msg: &str) {
        let text = errno::strerror(self.errno);
        if msg.is_empty() {
            self.eprint(format_args!("{text}\n"));
        } else {
            self.eprint(format_args!("{msg}: {text}\n"));
        }
    }

    /// `setvbuf` with a null buffer: a buffer of `size` bytes in `mode`
    /// (`_IOFBF`, `_IOLBF` or `_IONBF`). 0 or -1.
    pub fn setvbuf(&mut self, id: StreamId, mode: i32, size: usize) -> i32 {
        let Some(mode) = BufMode::from_posix(mode) else {
            self.misuse(&Diagnostic::UnknownBufferMode { mode });
            return -1;
        };
        match self
            .streams
            .set_buffer_mode(&mut self.heap, &mut self.host, id, mode, size)
        {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    /// `setvbuf` with a caller buffer. The grant stays owned by the caller.
    pub fn setvbuf_user(&mut self, id: StreamId, grant: Allocation, mode: BufMode) -> i32 {
        match self.streams.set_user_buffer(&mut self.heap, id, grant, mode) {
            Ok(()) => 0,
            Err(err) => {
                self.stdio_failed(err);
                -1
            }
        }
    }

    /// Bytes held in the buffer of `id`: pending output, or fetched data.
    pub fn buffered(&self, id: StreamId) -> &[u8] {
        self.streams.buffered(&self.host, id).unwrap_or(&[])
    }

    /// `remove`. Not supported: reported, returns -1.
    pub fn remove(&mut self, _path: &str) -> i32 {
        self.misuse(&Diagnostic::Unsupported { op: "remove" });
        -1
    }

    /// `rename`. Not supported: reported, returns -1.
    pub fn rename(&mut self, _from: &str, _to: &str) -> i32 {
        self.misuse(&Diagnostic::Unsupported { op: "rename" });
        -1
    }

    /// `tmpnam`. Not supported: reported, returns `None`.
    pub fn tmpnam(&mut self) -> Option<String> {
        self.misuse(&Diagnostic::Unsupported { op: "tmpnam" });
        None
    }

    /// `tmpfile`. Not supported: reported, returns `None`.
    pub fn tmpfile(&mut self) -> Option<StreamId> {
        self.misuse(&Diagnostic::Unsupported { op: "tmpfile" });
        None
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// `time`: seconds since the epoch.
    pub fn time(&self) -> i64 {
        self.host.now_epoch_seconds()
    }

    /// `clock`: processor time in [`CLOCKS_PER_SEC`] units.
    pub fn clock(&self) -> i64 {
        self.host.clock_millis() * (CLOCKS_PER_SEC / 1000)
    }

    /// `gmtime`. The record is shared and overwritten by the next
    /// conversion.
    pub fn gmtime(&mut self, t: i64) -> Option<&Calendar> {
        self.convert(t, 0, false)
    }

    /// `localtime`, with the host's zone offset at `t`.
    pub fn localtime(&mut self, t: i64) -> Option<&Calendar> {
        let minutes_west = self.host.local_time_offset(t);
        self.convert(t, minutes_west, true)
    }

    fn convert(&mut self, t: i64, minutes_west: i32, local: bool) -> Option<&Calendar> {
        match time::to_calendar(t, minutes_west) {
            Some(mut cal) => {
                if local {
                    cal.tm_isdst = -1;
                }
                self.calendar = cal;
                Some(&self.calendar)
            }
            None => {
                self.errno = errno::EOVERFLOW;
                None
            }
        }
    }

    /// `mktime`. Fields are read as UTC; see [`time::from_calendar`].
    pub fn mktime(&self, cal: &Calendar) -> i64 {
        time::from_calendar(cal)
    }

    /// `asctime`.
    pub fn asctime(&self, cal: &Calendar) -> String {
        time::asctime(cal)
    }

    /// `ctime`: `asctime(localtime(t))`.
    pub fn ctime(&mut self, t: i64) -> Option<String> {
        self.localtime(t).map(time::asctime)
    }

    /// `strftime`. Local records take `%z` from the host offset.
    pub fn strftime(&self, out: &mut [u8], format: &[u8], cal: &Calendar) -> usize {
        let minutes_west = if cal.tm_isdst == 0 {
            0
        } else {
            self.host.local_time_offset(time::from_calendar(cal))
        };
        time::strftime(out, format, cal, minutes_west)
    }

    // -----------------------------------------------------------------------
    // Numeric conversion
    // -----------------------------------------------------------------------

    fn converted<T>(&mut self, parsed: Parsed<T>) -> (T, usize) {
        match parsed.status {
            ConversionStatus::Success => {}
            ConversionStatus::OutOfRange => self.errno = ERANGE,
            ConversionStatus::InvalidBase => self.errno = EINVAL,
        }
        (parsed.value, parsed.end)
    }

    /// `strtol`/`strtoll`: the value and the bytes consumed. Out of range
    /// saturates with `errno = ERANGE`; a bad base is `EINVAL`.
    pub fn strtol(&mut self, s: &[u8], base: i32) -> (i64, usize) {
        let parsed = match u32::try_from(base) {
            Ok(base) => stdlib::strtol(s, base),
            Err(_) => stdlib::strtol(s, 1),
        };
        self.converted(parsed)
    }

    /// `strtoul`/`strtoull`.
    pub fn strtoul(&mut self, s: &[u8], base: i32) -> (u64, usize) {
        let parsed = match u32::try_from(base) {
            Ok(base) => stdlib::strtoul(s, base),
            Err(_) => stdlib::strtoul(s, 1),
        };
        self.converted(parsed)
    }

    /// `strtod`.
    pub fn strtod(&mut self, s: &[u8]) -> (f64, usize) {
        self.converted(stdlib::strtod(s))
    }

    /// `strtof`.
    pub fn strtof(&mut self, s: &[u8]) -> (f32, usize) {
        self.converted(stdlib::strtof(s))
    }

    /// `atoi`. Leaves `errno` alone.
    pub fn atoi(&self, s: &[u8]) -> i32 {
        stdlib::atoi(s)
    }

    /// `atol`/`atoll`.
    pub fn atol(&self, s: &[u8]) -> i64 {
        stdlib::atol(s)
    }

    /// `atof`.
    pub fn atof(&self, s: &[u8]) -> f64 {
        stdlib::atof(s)
    }

    // -----------------------------------------------------------------------
    // Sorting and searching
    // -----------------------------------------------------------------------

    /// `qsort` over `num` elements of `size` bytes at `base`.
    pub fn qsort(
        &mut self,
        base: usize,
        num: usize,
        size: usize,
        compare: impl FnMut(&[u8], &[u8]) -> i32,
    ) {
        let Some(len) = num.checked_mul(size) else {
            self.misuse(&Diagnostic::PointerOutOfBounds { op: "qsort", addr: base });
            return;
        };
        if self.in_memory("qsort", base, len) {
            stdlib::qsort(&mut self.host.memory_mut()[base..base + len], size, compare);
        }
    }

    /// `bsearch`: address of an element of the sorted array at `base` that
    /// compares equal to `key`, or 0.
    pub fn bsearch(
        &mut self,
        key: &[u8],
        base: usize,
        num: usize,
        size: usize,
        compare: impl FnMut(&[u8], &[u8]) -> i32,
    ) -> usize {
        let Some(len) = num.checked_mul(size) else {
            self.misuse(&Diagnostic::PointerOutOfBounds { op: "bsearch", addr: base });
            return 0;
        };
        if !self.in_memory("bsearch", base, len) {
            return 0;
        }
        let array = &self.host.memory()[base..base + len];
        stdlib::bsearch(key, array, size, compare).map_or(0, |index| base + index * size)
    }

    // -----------------------------------------------------------------------
    // Process
    // -----------------------------------------------------------------------

    /// `rand`.
    pub fn rand(&mut self) -> i32 {
        self.rand.next()
    }

    /// `srand`.
    pub fn srand(&mut self, seed: u32) {
        self.rand.seed(seed);
    }

    /// `atexit`. 0, or -1 when the handler table is full.
    pub fn atexit(&mut self, handler: impl FnOnce() + Send + 'static) -> i32 {
        if self.exit_handlers.register(handler) {
            0
        } else {
            self.errno = ENOMEM;
            -1
        }
    }

    /// `at_quick_exit`. 0, or -1 when the handler table is full.
    pub fn at_quick_exit(&mut self, handler: impl FnOnce() + Send + 'static) -> i32 {
        if self.quick_exit_handlers.register(handler) {
            0
        } else {
            self.errno = ENOMEM;
            -1
        }
    }

    /// `quick_exit`: runs the `at_quick_exit` handlers newest first and
    /// ends the process. `atexit` handlers do not run and buffered output
    /// is not flushed.
    pub fn quick_exit(&mut self, status: i32) -> ! {
        self.quick_exit_handlers.run();
        self.host.terminate(status)
    }

    /// `abort`: writes `Program aborted` straight to the console and ends
    /// the process with [`ABORT_STATUS`]. No handlers run and buffered
    /// output is dropped.
    pub fn abort(&mut self) -> ! {
        self.host.emit_bytes(b"Program aborted\n");
        self.host.terminate(ABORT_STATUS)
    }

    /// `exit`: runs exit handlers newest first, flushes every stream and
    /// ends the process through the host.
    pub fn exit(&mut self, status: i32) -> ! {
        self.exit_handlers.run();
        self.streams.flush_all(&mut self.host);
        self.host.terminate(status)
    }

    /// Failed assertion: prints the location and message to `stderr`, then
    /// exits with status 1. Used by [`crate::rt_assert!`].
    pub fn assert_fail(&mut self, message: &str, file: &str, line: u32) -> ! {
        self.eprint(format_args!(
            "Assertion failed at {file} : {line}\n\t{message}\n"
        ));
        self.exit(1)
    }
}
