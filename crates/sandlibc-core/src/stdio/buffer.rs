//! Stream buffering modes and buffer storage.
//!
//! A stream buffer lives in one of three places: a reserved array owned by
//! the slot itself (only the standard output slots have one), an allocator
//! grant owned by the stream, or an allocator grant lent by the caller.

use crate::malloc::Allocation;

/// Buffering mode constants matching C `_IOFBF`, `_IOLBF`, `_IONBF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufMode {
    /// Fully buffered: flush when buffer is full.
    Full,
    /// Line buffered: flush on newline or buffer full.
    Line,
    /// Unbuffered: every write reaches the sink immediately.
    None,
}

/// C constant values for the setvbuf mode argument.
pub const IOFBF: i32 = 0;
pub const IOLBF: i32 = 1;
pub const IONBF: i32 = 2;

impl BufMode {
    /// Convert from the C integer constant.
    pub fn from_posix(mode: i32) -> Option<BufMode> {
        match mode {
            IOFBF => Some(BufMode::Full),
            IOLBF => Some(BufMode::Line),
            IONBF => Some(BufMode::None),
            _ => Option::None,
        }
    }

    pub fn to_posix(self) -> i32 {
        match self {
            BufMode::Full => IOFBF,
            BufMode::Line => IOLBF,
            BufMode::None => IONBF,
        }
    }
}

/// Location of a stream's buffer bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStorage {
    /// No buffer.
    Empty,
    /// The slot's reserved array.
    Reserved,
    /// Allocator grant released when the stream closes or rebuffers.
    Owned(Allocation),
    /// Caller grant; the stream never releases it.
    Borrowed(Allocation),
}

impl BufferStorage {
    /// Grant the stream must release, if any.
    pub fn owned(&self) -> Option<Allocation> {
        match self {
            BufferStorage::Owned(alloc) => Some(*alloc),
            _ => None,
        }
    }

    /// Whether the bytes are in linear memory.
    pub fn in_linear_memory(&self) -> bool {
        matches!(self, BufferStorage::Owned(_) | BufferStorage::Borrowed(_))
    }
}
