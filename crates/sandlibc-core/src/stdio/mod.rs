//! Buffered stream I/O.
//!
//! Implements `<stdio.h>` streams over host byte sinks and host-fetched
//! resources. Output is buffered per stream and reaches the host console
//! on flush; input comes from resources the host loads asynchronously.

pub mod buffer;
pub mod stream;
pub mod table;

pub use buffer::{BufMode, BufferStorage, IOFBF, IOLBF, IONBF};
pub use stream::{Stream, StreamState};
pub use table::{PollReport, StreamTable};

use sandlibc_membrane::Diagnostic;

use crate::malloc::AllocError;

/// Default stream buffer size.
pub const BUFSIZ: usize = 512;
/// Stream slots, standard streams included.
pub const FOPEN_MAX: usize = 16;
/// End-of-data / failure sentinel of the C surface.
pub const EOF: i32 = -1;

/// Temporary file names are not supported, so no name fits.
pub const L_TMPNAM: usize = 0;
pub const TMP_MAX: u32 = 0;

/// Whence values of the C surface.
pub const SEEK_CUR: i32 = 0;
pub const SEEK_END: i32 = 1;
pub const SEEK_SET: i32 = 2;

/// Index of a slot in the stream table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) usize);

impl StreamId {
    pub const STDIN: StreamId = StreamId(0);
    pub const STDOUT: StreamId = StreamId(1);
    pub const STDERR: StreamId = StreamId(2);

    /// Slot `index`, if within the table.
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        (index < FOPEN_MAX).then_some(Self(index))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Reference point of a seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the data.
    Set,
    /// From the current cursor.
    Cur,
    /// From the end of the data. Not supported.
    End,
}

impl Whence {
    pub fn from_posix(whence: i32) -> Option<Whence> {
        match whence {
            SEEK_SET => Some(Whence::Set),
            SEEK_CUR => Some(Whence::Cur),
            SEEK_END => Some(Whence::End),
            _ => None,
        }
    }
}

/// Stream operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StdioError {
    #[error("all stream slots are in use")]
    TableFull,
    #[error("stream data has not arrived")]
    NotReady,
    #[error("end of data")]
    EndOfData,
    #[error("position {target} is outside 0..={extent}")]
    OutOfRange { target: i64, extent: usize },
    #[error("stream buffer has no room")]
    NoBufferSpace,
    #[error("stream buffer allocation failed: {0}")]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Misuse(#[from] Diagnostic),
}

impl StdioError {
    /// The diagnostic to report, if this failure is one.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            StdioError::Misuse(diag) | StdioError::Alloc(AllocError::Misuse(diag)) => Some(diag),
            _ => None,
        }
    }
}
