//! Stream slot state.

use sandlibc_membrane::FetchTicket;

use super::buffer::{BufMode, BufferStorage};

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Closed,
    /// Waiting for the host to deliver the named resource.
    Opening(FetchTicket),
    Ready,
    /// Open but without a data source: `stdin`, or a fetch that failed.
    Unavailable,
}

/// One entry of the stream table.
#[derive(Debug)]
pub struct Stream {
    pub(crate) state: StreamState,
    pub(crate) error: bool,
    pub(crate) eof: bool,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
    pub(crate) mode: BufMode,
    pub(crate) storage: BufferStorage,
    /// Reserved array for standard output slots.
    pub(crate) reserved: Option<Box<[u8]>>,
    /// Usable buffer bytes.
    pub(crate) capacity: usize,
    /// Next byte to read, or bytes pending a flush.
    pub(crate) cursor: usize,
    /// Bytes of fetched data in the buffer.
    pub(crate) extent: usize,
    pub(crate) name: Option<String>,
}

impl Stream {
    pub(crate) fn closed() -> Self {
        Self {
            state: StreamState::Closed,
            error: false,
            eof: false,
            readable: false,
            writable: false,
            mode: BufMode::Full,
            storage: BufferStorage::Empty,
            reserved: None,
            capacity: 0,
            cursor: 0,
            extent: 0,
            name: None,
        }
    }

    /// `stdin`: present, but nothing will ever arrive on it.
    pub(crate) fn standard_input() -> Self {
        Self {
            state: StreamState::Unavailable,
            error: true,
            eof: true,
            name: Some("stdin".to_owned()),
            ..Self::closed()
        }
    }

    /// `stdout`/`stderr`: writable through a reserved buffer.
    pub(crate) fn standard_output(name: &str, mode: BufMode, reserved_size: usize) -> Self {
        Self {
            state: StreamState::Ready,
            writable: true,
            mode,
            storage: BufferStorage::Reserved,
            reserved: Some(vec![0; reserved_size].into_boxed_slice()),
            capacity: reserved_size,
            name: Some(name.to_owned()),
            ..Self::closed()
        }
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state != StreamState::Closed
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == StreamState::Ready
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub fn mode(&self) -> BufMode {
        self.mode
    }

    #[must_use]
    pub fn storage(&self) -> BufferStorage {
        self.storage
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Bytes waiting for a flush on a writable stream.
    #[must_use]
    pub fn pending(&self) -> usize {
        if self.writable { self.cursor } else { 0 }
    }

    /// Bytes of fetched data on a readable stream.
    #[must_use]
    pub fn extent(&self) -> usize {
        self.extent
    }

    pub(crate) fn buffer<'a>(&'a self, memory: &'a [u8]) -> &'a [u8] {
        match self.storage {
            BufferStorage::Empty => &[],
            BufferStorage::Reserved => self.reserved.as_deref().unwrap_or_default(),
            BufferStorage::Owned(alloc) | BufferStorage::Borrowed(alloc) => {
                memory.get(alloc.range()).unwrap_or_default()
            }
        }
    }

    pub(crate) fn buffer_mut<'a>(&'a mut self, memory: &'a mut [u8]) -> &'a mut [u8] {
        match self.storage {
            BufferStorage::Empty => &mut [],
            BufferStorage::Reserved => self.reserved.as_deref_mut().unwrap_or_default(),
            BufferStorage::Owned(alloc) | BufferStorage::Borrowed(alloc) => {
                memory.get_mut(alloc.range()).unwrap_or_default()
            }
        }
    }
}
