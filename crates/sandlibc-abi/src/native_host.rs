//! Process-backed host.
//!
//! Linear memory is a [`PagedMemory`] owned by the host. Console output goes
//! to the process `stdout` (or a [`ConsoleTap`] when capturing), resources
//! are files under a root directory, and time comes from the system clocks
//! through `libc`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use sandlibc_membrane::sim::{DEFAULT_HEAP_BASE, DEFAULT_MAX_MEMORY_PAGES};
use sandlibc_membrane::{ConsoleTap, FetchStatus, FetchTicket, Host, PAGE_SIZE, PagedMemory};

/// Directory resources are read from.
pub const RESOURCE_ROOT_ENV: &str = "SANDLIBC_RESOURCE_ROOT";
/// Fixed zone offset in minutes west of UTC.
pub const UTC_OFFSET_ENV: &str = "SANDLIBC_UTC_OFFSET_MINUTES";

/// Settings for a [`NativeHost`].
#[derive(Debug, Clone)]
pub struct NativeHostConfig {
    /// Resource names resolve relative to this directory.
    pub resource_root: PathBuf,
    /// Minutes west of UTC reported for every instant.
    pub utc_offset_minutes: i32,
    /// Linear-memory ceiling in pages.
    pub max_pages: usize,
    /// When set, console output is recorded here instead of written to
    /// `stdout`.
    pub capture: Option<ConsoleTap>,
}

impl Default for NativeHostConfig {
    fn default() -> Self {
        Self {
            resource_root: PathBuf::from("."),
            utc_offset_minutes: 0,
            max_pages: DEFAULT_MAX_MEMORY_PAGES,
            capture: None,
        }
    }
}

impl NativeHostConfig {
    /// Defaults overridden by `SANDLIBC_RESOURCE_ROOT` and
    /// `SANDLIBC_UTC_OFFSET_MINUTES`. Unparseable offsets are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var(RESOURCE_ROOT_ENV) {
            config.resource_root = PathBuf::from(root);
        }
        if let Some(offset) = std::env::var(UTC_OFFSET_ENV)
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.utc_offset_minutes = offset;
        }
        config
    }
}

/// [`Host`] backed by the running process.
#[derive(Debug)]
pub struct NativeHost {
    memory: PagedMemory,
    config: NativeHostConfig,
    fetches: BTreeMap<FetchTicket, Option<Vec<u8>>>,
    next_ticket: u32,
}

impl NativeHost {
    #[must_use]
    pub fn new(config: NativeHostConfig) -> Self {
        let initial_pages = DEFAULT_HEAP_BASE / PAGE_SIZE + 1;
        Self {
            memory: PagedMemory::new(initial_pages, config.max_pages),
            config,
            fetches: BTreeMap::new(),
            next_ticket: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &NativeHostConfig {
        &self.config
    }

    /// Fetches started but not yet polled.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.fetches.len()
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        confined.then(|| self.config.resource_root.join(relative))
    }
}

fn clock_seconds_and_millis(clock: libc::clockid_t) -> Option<(i64, i64)> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
    if rc != 0 {
        return None;
    }
    let secs = i64::from(ts.tv_sec);
    let millis = secs * 1000 + i64::from(ts.tv_nsec) / 1_000_000;
    Some((secs, millis))
}

impl Host for NativeHost {
    fn grow_linear_memory(&mut self, pages: usize) -> Option<usize> {
        self.memory.grow(pages)
    }

    fn heap_base_address(&self) -> usize {
        DEFAULT_HEAP_BASE
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.as_mut_slice()
    }

    fn emit_bytes(&mut self, bytes: &[u8]) {
        if let Some(tap) = &self.config.capture {
            tap.push(bytes);
            return;
        }
        let mut out = std::io::stdout().lock();
        // Console failures have nowhere to be reported.
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }

    fn fetch_resource(&mut self, name: &str) -> FetchTicket {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let data = self.resolve(name).and_then(|path| std::fs::read(path).ok());
        self.fetches.insert(ticket, data);
        ticket
    }

    fn poll_fetch(&mut self, ticket: FetchTicket) -> FetchStatus {
        match self.fetches.remove(&ticket) {
            Some(Some(bytes)) => FetchStatus::Ready(bytes),
            Some(None) | None => FetchStatus::Failed,
        }
    }

    fn local_time_offset(&self, _epoch_seconds: i64) -> i32 {
        self.config.utc_offset_minutes
    }

    fn now_epoch_seconds(&self) -> i64 {
        clock_seconds_and_millis(libc::CLOCK_REALTIME).map_or(-1, |(secs, _)| secs)
    }

    fn clock_millis(&self) -> i64 {
        clock_seconds_and_millis(libc::CLOCK_PROCESS_CPUTIME_ID).map_or(-1, |(_, millis)| millis)
    }

    fn terminate(&mut self, status: i32) -> ! {
        std::process::exit(status)
    }
}
