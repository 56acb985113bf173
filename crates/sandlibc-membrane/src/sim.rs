//! Deterministic in-process host.
//!
//! `SimHost` backs linear memory with a [`PagedMemory`], records every
//! console flush, serves resources from an in-memory table and lets the
//! caller decide when pending fetches complete. Tests and the conformance
//! harness drive the runtime through it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::{FetchStatus, FetchTicket, Host, PAGE_SIZE};
use crate::memory::PagedMemory;

/// Default heap base: one data page plus 1 KiB of stack/static area.
pub const DEFAULT_HEAP_BASE: usize = PAGE_SIZE + 1024;

/// Default linear-memory ceiling for simulated hosts.
pub const DEFAULT_MAX_MEMORY_PAGES: usize = 64;

/// Shared record of console output.
///
/// Cloning yields another view of the same record, so output stays
/// observable after the host has been moved into a runtime.
#[derive(Debug, Clone, Default)]
pub struct ConsoleTap {
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ConsoleTap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one emitted chunk.
    pub fn push(&self, bytes: &[u8]) {
        self.chunks.lock().push(bytes.to_vec());
    }

    /// Every chunk emitted so far, in order.
    #[must_use]
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().clone()
    }

    /// Number of sink invocations so far.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().len()
    }

    /// All output concatenated, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        let chunks = self.chunks.lock();
        let joined: Vec<u8> = chunks.iter().flatten().copied().collect();
        String::from_utf8_lossy(&joined).into_owned()
    }

    pub fn clear(&self) {
        self.chunks.lock().clear();
    }
}

#[derive(Debug)]
struct PendingFetch {
    name: String,
    released: bool,
}

/// Builder for [`SimHost`].
#[derive(Debug, Clone)]
pub struct SimHostBuilder {
    heap_base: usize,
    max_pages: usize,
    utc_offset_minutes: i32,
    now: i64,
    deliver_immediately: bool,
    console: ConsoleTap,
    resources: HashMap<String, Vec<u8>>,
}

impl Default for SimHostBuilder {
    fn default() -> Self {
        Self {
            heap_base: DEFAULT_HEAP_BASE,
            max_pages: DEFAULT_MAX_MEMORY_PAGES,
            utc_offset_minutes: 0,
            now: 0,
            deliver_immediately: false,
            console: ConsoleTap::new(),
            resources: HashMap::new(),
        }
    }
}

impl SimHostBuilder {
    #[must_use]
    pub fn heap_base(mut self, addr: usize) -> Self {
        self.heap_base = addr;
        self
    }

    /// Ceiling on linear memory, counting the pages below the heap base.
    #[must_use]
    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages;
        self
    }

    /// Minutes west of UTC reported by `local_time_offset`.
    #[must_use]
    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    #[must_use]
    pub fn now(mut self, epoch_seconds: i64) -> Self {
        self.now = epoch_seconds;
        self
    }

    /// Completes fetches on the first poll instead of waiting for
    /// [`SimHost::release_fetches`].
    #[must_use]
    pub fn deliver_immediately(mut self, yes: bool) -> Self {
        self.deliver_immediately = yes;
        self
    }

    /// Routes console output into an existing tap.
    #[must_use]
    pub fn console(mut self, tap: ConsoleTap) -> Self {
        self.console = tap;
        self
    }

    #[must_use]
    pub fn resource(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(name.into(), bytes.into());
        self
    }

    #[must_use]
    pub fn build(self) -> SimHost {
        let initial_pages = self.heap_base / PAGE_SIZE + 1;
        SimHost {
            memory: PagedMemory::new(initial_pages, self.max_pages),
            heap_base: self.heap_base,
            console: self.console,
            resources: self.resources,
            fetches: BTreeMap::new(),
            next_ticket: 1,
            deliver_immediately: self.deliver_immediately,
            utc_offset_minutes: self.utc_offset_minutes,
            now: self.now,
            clock_millis: 0,
            grow_calls: 0,
        }
    }
}

/// In-process [`Host`] with scripted behaviour.
#[derive(Debug)]
pub struct SimHost {
    memory: PagedMemory,
    heap_base: usize,
    console: ConsoleTap,
    resources: HashMap<String, Vec<u8>>,
    fetches: BTreeMap<FetchTicket, PendingFetch>,
    next_ticket: u32,
    deliver_immediately: bool,
    utc_offset_minutes: i32,
    now: i64,
    clock_millis: i64,
    grow_calls: usize,
}

impl Default for SimHost {
    fn default() -> Self {
        SimHostBuilder::default().build()
    }
}

impl SimHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> SimHostBuilder {
        SimHostBuilder::default()
    }

    #[must_use]
    pub fn console(&self) -> &ConsoleTap {
        &self.console
    }

    /// Makes `name` fetchable. Replaces earlier content.
    pub fn add_resource(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.resources.insert(name.into(), bytes.into());
    }

    /// Lets every outstanding fetch complete on its next poll.
    pub fn release_fetches(&mut self) {
        for fetch in self.fetches.values_mut() {
            fetch.released = true;
        }
    }

    /// Fetches started but not yet collected.
    #[must_use]
    pub fn pending_fetches(&self) -> usize {
        self.fetches.len()
    }

    /// Names of fetches started but not yet collected, in ticket order.
    #[must_use]
    pub fn pending_fetch_names(&self) -> Vec<String> {
        self.fetches.values().map(|f| f.name.clone()).collect()
    }

    pub fn set_now(&mut self, epoch_seconds: i64) {
        self.now = epoch_seconds;
    }

    pub fn advance_clock(&mut self, millis: i64) {
        self.clock_millis += millis;
    }

    pub fn set_utc_offset_minutes(&mut self, minutes: i32) {
        self.utc_offset_minutes = minutes;
    }

    /// Number of `grow_linear_memory` calls that succeeded.
    #[must_use]
    pub fn grow_calls(&self) -> usize {
        self.grow_calls
    }

    #[must_use]
    pub fn memory_pages(&self) -> usize {
        self.memory.pages()
    }
}

impl Host for SimHost {
    fn grow_linear_memory(&mut self, pages: usize) -> Option<usize> {
        let base = self.memory.grow(pages)?;
        self.grow_calls += 1;
        Some(base)
    }

    fn heap_base_address(&self) -> usize {
        self.heap_base
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.as_mut_slice()
    }

    fn emit_bytes(&mut self, bytes: &[u8]) {
        self.console.push(bytes);
    }

    fn fetch_resource(&mut self, name: &str) -> FetchTicket {
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.fetches.insert(
            ticket,
            PendingFetch {
                name: name.to_owned(),
                released: self.deliver_immediately,
            },
        );
        ticket
    }

    fn poll_fetch(&mut self, ticket: FetchTicket) -> FetchStatus {
        match self.fetches.get(&ticket) {
            None => return FetchStatus::Failed,
            Some(fetch) if !fetch.released => return FetchStatus::Pending,
            Some(_) => {}
        }
        let Some(fetch) = self.fetches.remove(&ticket) else {
            return FetchStatus::Failed;
        };
        match self.resources.get(&fetch.name) {
            Some(bytes) => FetchStatus::Ready(bytes.clone()),
            None => FetchStatus::Failed,
        }
    }

    fn local_time_offset(&self, _epoch_seconds: i64) -> i32 {
        self.utc_offset_minutes
    }

    fn now_epoch_seconds(&self) -> i64 {
        self.now
    }

    fn clock_millis(&self) -> i64 {
        self.clock_millis
    }

    fn terminate(&mut self, status: i32) -> ! {
        panic!("sandlibc terminated with status {status}");
    }
}
