//! Host primitives.
//!
//! The runtime never touches the environment directly. Each primitive below
//! is supplied by whatever embeds the runtime: a browser shim, a native test
//! double ([`crate::SimHost`]), or a process-backed host.

/// Size of one linear-memory page. Growth always happens in whole pages.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Handle for an in-flight resource fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchTicket(pub u32);

/// Progress of an asynchronous resource fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// Data has not arrived yet; poll again next frame.
    Pending,
    /// The whole resource is available.
    Ready(Vec<u8>),
    /// The resource does not exist or could not be loaded.
    Failed,
}

/// Services the runtime requires from its embedding environment.
///
/// All methods are called from the single thread that owns the runtime.
pub trait Host {
    /// Extends linear memory by `pages` whole pages.
    ///
    /// Returns the address of the first new page, or `None` when the
    /// memory cannot grow.
    fn grow_linear_memory(&mut self, pages: usize) -> Option<usize>;

    /// First address available to the allocator at process start.
    fn heap_base_address(&self) -> usize;

    /// The whole linear memory.
    fn memory(&self) -> &[u8];

    /// The whole linear memory, writable.
    fn memory_mut(&mut self) -> &mut [u8];

    /// Console sink. One call per flushed chunk.
    fn emit_bytes(&mut self, bytes: &[u8]);

    /// Starts loading the named resource.
    fn fetch_resource(&mut self, name: &str) -> FetchTicket;

    /// Reports the state of a fetch started with [`Host::fetch_resource`].
    ///
    /// `Ready` is returned once; the host may forget the ticket afterwards.
    fn poll_fetch(&mut self, ticket: FetchTicket) -> FetchStatus;

    /// Minutes west of UTC at `epoch_seconds` (positive behind UTC).
    fn local_time_offset(&self, epoch_seconds: i64) -> i32;

    /// Wall-clock time in seconds since the epoch.
    fn now_epoch_seconds(&self) -> i64;

    /// Milliseconds of processor time since start.
    fn clock_millis(&self) -> i64;

    /// Ends the process. Never returns.
    fn terminate(&mut self, status: i32) -> !;
}
